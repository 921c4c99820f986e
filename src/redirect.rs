//! The conventional `<iconv.h>` entry points.
//!
//! Each function is an unmangled C-ABI symbol whose whole body is one direct
//! call into [`crate::provider`]. Arguments go through in the same order, the
//! return value comes back untouched, and `errno` is whatever libiconv left.
//! Nothing here logs, validates or keeps state.

use core::ffi::{c_char, c_int, c_void};

use libc::size_t;

use crate::iconv_t;
use crate::provider;

/// Opens a conversion descriptor from `fromcode` to `tocode` via `libiconv_open`.
///
/// Returns `(iconv_t)-1` with `errno` set when libiconv rejects the pair.
///
/// # Safety
///
/// Same contract as `libiconv_open`: both arguments must point to
/// NUL-terminated strings that stay valid for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn iconv_open(tocode: *const c_char, fromcode: *const c_char) -> iconv_t {
    // SAFETY: arguments are forwarded verbatim; the caller upholds libiconv's contract.
    unsafe { provider::libiconv_open(tocode, fromcode) }
}

/// Converts bytes through `libiconv`, advancing both cursors in place.
///
/// Returns the number of irreversible conversions, or `(size_t)-1` with
/// `errno` set to `EILSEQ`, `EINVAL` or `E2BIG`.
///
/// # Safety
///
/// Same contract as `libiconv`: `cd` must be a live descriptor and every
/// non-null cursor must describe memory valid for its stated length.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn iconv(
    cd: iconv_t,
    inbuf: *mut *mut c_char,
    inbytesleft: *mut size_t,
    outbuf: *mut *mut c_char,
    outbytesleft: *mut size_t,
) -> size_t {
    // SAFETY: arguments are forwarded verbatim; the caller upholds libiconv's contract.
    unsafe { provider::libiconv(cd, inbuf, inbytesleft, outbuf, outbytesleft) }
}

/// Releases a conversion descriptor through `libiconv_close`.
///
/// # Safety
///
/// `cd` must come from [`iconv_open`] and must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn iconv_close(cd: iconv_t) -> c_int {
    // SAFETY: the handle is passed through unread; libiconv owns its validity.
    unsafe { provider::libiconv_close(cd) }
}

/// Queries or changes descriptor options through `libiconvctl`.
///
/// `request` is one of the codes in [`crate::control`]; `argument` is read or
/// written by libiconv according to that code.
///
/// # Safety
///
/// `cd` must be a live descriptor and `argument` must point to whatever
/// libiconv expects for `request`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn iconvctl(cd: iconv_t, request: c_int, argument: *mut c_void) -> c_int {
    // SAFETY: arguments are forwarded verbatim; the caller upholds libiconv's contract.
    unsafe { provider::libiconvctl(cd, request, argument) }
}
