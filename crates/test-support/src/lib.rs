#![deny(rustdoc::broken_intra_doc_links)]

//! Shared test utilities for the iconv-shim workspace.
//!
//! The shim forwards to GNU libiconv's `libiconv*` symbols, which a test
//! machine may not have. This crate provides a small provider with the same C
//! contract, backed by `encoding_rs`:
//!
//! - [`reference_iconv_open`], [`reference_iconv`], [`reference_iconv_close`]
//!   and [`reference_iconvctl`] are the provider itself, callable directly so
//!   tests can compare a forwarded call against a direct one.
//! - [`export_libiconv!`] defines the unmangled `libiconv*` symbols inside the
//!   invoking test binary, which is what the shim's forwards link against.
//! - [`calls`] counts, per thread, how often each exported symbol was hit.
//!
//! Supported charsets are ASCII, ISO-8859-1, UTF-16LE/BE and every stateless
//! WHATWG encoding `encoding_rs` can both decode and encode. ISO-2022-KR is
//! accepted as a target only; it is there to exercise shift state, so flush
//! and reset calls have something to do. Like libiconv, `//TRANSLIT`
//! and `//IGNORE` suffixes on the target name preset the matching flags.

use std::cell::Cell;

mod charset;
mod provider;
pub mod requests;

pub use crate::provider::{
    reference_iconv, reference_iconv_close, reference_iconv_open, reference_iconvctl,
};

/// How many times each exported `libiconv*` symbol ran on the current thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `libiconv_open` calls.
    pub open: usize,
    /// `libiconv` calls.
    pub convert: usize,
    /// `libiconv_close` calls.
    pub close: usize,
    /// `libiconvctl` calls.
    pub control: usize,
}

/// Identifies an exported symbol for [`record`].
#[doc(hidden)]
#[derive(Debug, Clone, Copy)]
pub enum Call {
    Open,
    Convert,
    Close,
    Control,
}

thread_local! {
    static CALLS: Cell<CallCounts> = const {
        Cell::new(CallCounts {
            open: 0,
            convert: 0,
            close: 0,
            control: 0,
        })
    };
}

/// Snapshot of this thread's call counters.
pub fn calls() -> CallCounts {
    CALLS.with(Cell::get)
}

#[doc(hidden)]
pub fn record(call: Call) {
    CALLS.with(|cell| {
        let mut counts = cell.get();
        match call {
            Call::Open => counts.open += 1,
            Call::Convert => counts.convert += 1,
            Call::Close => counts.close += 1,
            Call::Control => counts.control += 1,
        }
        cell.set(counts);
    });
}

/// Defines `libiconv_open`, `libiconv`, `libiconv_close` and `libiconvctl` in
/// the invoking crate, bound to the reference provider.
///
/// Invoke it exactly once per test binary. The symbols have to live in the
/// test binary's own objects so the linker sees them whichever order the
/// archives come in.
#[macro_export]
macro_rules! export_libiconv {
    () => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn libiconv_open(
            tocode: *const ::core::ffi::c_char,
            fromcode: *const ::core::ffi::c_char,
        ) -> *mut ::core::ffi::c_void {
            $crate::record($crate::Call::Open);
            // SAFETY: the caller's contract is the provider's contract.
            unsafe { $crate::reference_iconv_open(tocode, fromcode) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn libiconv(
            cd: *mut ::core::ffi::c_void,
            inbuf: *mut *mut ::core::ffi::c_char,
            inbytesleft: *mut usize,
            outbuf: *mut *mut ::core::ffi::c_char,
            outbytesleft: *mut usize,
        ) -> usize {
            $crate::record($crate::Call::Convert);
            // SAFETY: the caller's contract is the provider's contract.
            unsafe { $crate::reference_iconv(cd, inbuf, inbytesleft, outbuf, outbytesleft) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn libiconv_close(
            cd: *mut ::core::ffi::c_void,
        ) -> ::core::ffi::c_int {
            $crate::record($crate::Call::Close);
            // SAFETY: the caller's contract is the provider's contract.
            unsafe { $crate::reference_iconv_close(cd) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn libiconvctl(
            cd: *mut ::core::ffi::c_void,
            request: ::core::ffi::c_int,
            argument: *mut ::core::ffi::c_void,
        ) -> ::core::ffi::c_int {
            $crate::record($crate::Call::Control);
            // SAFETY: the caller's contract is the provider's contract.
            unsafe { $crate::reference_iconvctl(cd, request, argument) }
        }
    };
}
