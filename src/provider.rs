//! Imports of GNU libiconv's distinctly named entry points.
//!
//! libiconv exports its implementation as `libiconv_open`, `libiconv`,
//! `libiconv_close` and `libiconvctl` (its `<iconv.h>` maps the conventional
//! names onto these with macros). Declaring them here, and nowhere else, keeps
//! the redirection explicit: the forwards in this crate can only reach these
//! symbols, never the C library's `iconv*`.
//!
//! With the `link-libiconv` feature the block requests `-liconv`; without it
//! the symbols must come from the final link line.

use core::ffi::{c_char, c_int, c_void};

use libc::size_t;

use crate::iconv_t;

#[cfg_attr(feature = "link-libiconv", link(name = "iconv"))]
unsafe extern "C" {
    /// libiconv's `iconv_open`.
    pub fn libiconv_open(tocode: *const c_char, fromcode: *const c_char) -> iconv_t;

    /// libiconv's `iconv`.
    pub fn libiconv(
        cd: iconv_t,
        inbuf: *mut *mut c_char,
        inbytesleft: *mut size_t,
        outbuf: *mut *mut c_char,
        outbytesleft: *mut size_t,
    ) -> size_t;

    /// libiconv's `iconv_close`.
    pub fn libiconv_close(cd: iconv_t) -> c_int;

    /// libiconv's `iconvctl`.
    pub fn libiconvctl(cd: iconv_t, request: c_int, argument: *mut c_void) -> c_int;
}
