#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(clippy::undocumented_unsafe_blocks)]

//! Redirection of the conventional iconv entry points to GNU libiconv.
//!
//! A link closure can carry two providers of `iconv_open`/`iconv`/`iconv_close`:
//! the platform C library and a vendored GNU libiconv. libiconv also ships its
//! implementation under the distinct names `libiconv_open`, `libiconv`,
//! `libiconv_close` and `libiconvctl`. This crate defines the conventional
//! symbols and forwards each call, argument for argument, to those distinct
//! names so callers compiled against `<iconv.h>` always reach libiconv no
//! matter which provider the loader would otherwise pick.
//!
//! # Layers
//!
//! - [`iconv_open`], [`iconv`], [`iconv_close`] and [`iconvctl`] are the raw
//!   C-ABI forwards. They hold no state, never inspect the [`iconv_t`] handle
//!   and leave every status value and `errno` exactly as libiconv set them.
//! - [`provider`] declares the libiconv symbols the forwards call.
//! - [`Session`] is a safe owner of one conversion handle for Rust callers. It
//!   goes through the raw forwards like any C caller would.
//!
//! # Linking
//!
//! The build must make the `libiconv*` symbols available. Enabling the
//! `link-libiconv` feature asks the linker for `-liconv`; otherwise the final
//! link line is expected to supply them. Dependants that only reach this crate
//! through C code should call [`force_link`] once so the forwards are kept.
//!
//! ```ignore
//! use iconv_shim::Session;
//!
//! let mut session = Session::open("UTF-8", "ISO-8859-1")?;
//! let converted = session.convert_all(b"caf\xe9")?;
//! assert_eq!(converted.bytes, "café".as_bytes());
//! assert_eq!(converted.irreversible, 0);
//! session.close()?;
//! # Ok::<(), iconv_shim::ConversionError>(())
//! ```

use core::ffi::c_void;

pub mod control;
mod error;
pub mod provider;
mod redirect;
mod session;
mod trace;

pub use crate::control::SessionFlag;
pub use crate::error::ConversionError;
pub use crate::redirect::{iconv, iconv_close, iconv_open, iconvctl};
pub use crate::session::{Converted, Progress, Session};

/// Opaque conversion handle, identical in representation to C's `iconv_t`.
///
/// The handle is created and destroyed by libiconv. The raw forwards pass it
/// through without reading, copying or owning what it points to.
#[allow(non_camel_case_types)]
pub type iconv_t = *mut c_void;

/// Status returned by [`iconv`] when the conversion stopped on an error.
pub const CONVERT_FAILED: usize = usize::MAX;

/// Returns the `(iconv_t)-1` sentinel that [`iconv_open`] yields on failure.
#[inline]
pub const fn invalid_handle() -> iconv_t {
    core::ptr::without_provenance_mut(usize::MAX)
}

/// Reports whether `cd` is the `(iconv_t)-1` failure sentinel.
#[inline]
pub fn is_invalid_handle(cd: iconv_t) -> bool {
    cd.addr() == usize::MAX
}

/// Keeps the conventional entry points in the final link.
///
/// Archive members are only pulled in when something references them. A Rust
/// binary whose iconv callers all live in C objects can call this once so the
/// linker resolves `iconv_open` and friends against this crate.
#[inline(never)]
pub fn force_link() {
    let _ = core::hint::black_box([
        redirect::iconv_open as *const (),
        redirect::iconv as *const (),
        redirect::iconv_close as *const (),
        redirect::iconvctl as *const (),
    ]);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_handle_is_all_ones() {
        let cd = invalid_handle();
        assert!(is_invalid_handle(cd));
        assert_eq!(cd.addr(), usize::MAX);
        assert!(!is_invalid_handle(core::ptr::null_mut()));
    }

    #[test]
    fn convert_failed_matches_size_t_minus_one() {
        assert_eq!(CONVERT_FAILED, usize::MAX);
        assert_eq!(CONVERT_FAILED as isize, -1);
    }

    #[test]
    fn force_link_is_callable() {
        force_link();
    }

    #[test]
    fn handle_has_pointer_layout() {
        assert_eq!(size_of::<iconv_t>(), size_of::<usize>());
        assert_eq!(align_of::<iconv_t>(), align_of::<usize>());
    }
}
