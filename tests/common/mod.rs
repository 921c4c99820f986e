//! Helpers shared by the integration tests.
//!
//! Every test binary that includes this module gets the reference provider
//! bound to the `libiconv*` symbols the shim forwards to.

#![allow(dead_code)]

use std::ffi::{CStr, c_char, c_int};

use iconv_shim::{CONVERT_FAILED, iconv_t};

test_support::export_libiconv!();

/// Signature shared by `iconv` and the reference provider's `iconv`.
pub type ConvertFn =
    unsafe extern "C" fn(iconv_t, *mut *mut c_char, *mut usize, *mut *mut c_char, *mut usize) -> usize;

/// Observable effects of a single conversion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: usize,
    pub errno: Option<c_int>,
    pub read: usize,
    pub output: Vec<u8>,
}

pub fn errno() -> c_int {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Opens a descriptor through the shim's `iconv_open`.
pub fn open_via_shim(to: &CStr, from: &CStr) -> iconv_t {
    unsafe { iconv_shim::iconv_open(to.as_ptr(), from.as_ptr()) }
}

/// Opens a descriptor by calling the provider directly.
pub fn open_direct(to: &CStr, from: &CStr) -> iconv_t {
    unsafe { test_support::reference_iconv_open(to.as_ptr(), from.as_ptr()) }
}

/// Runs one conversion call with an output buffer of `capacity` bytes.
pub fn run(convert: ConvertFn, cd: iconv_t, input: &[u8], capacity: usize) -> Outcome {
    let mut output = vec![0u8; capacity];
    let mut inbuf = input.as_ptr().cast_mut().cast::<c_char>();
    let mut inleft = input.len();
    let mut outbuf = output.as_mut_ptr().cast::<c_char>();
    let mut outleft = output.len();
    let status = unsafe { convert(cd, &raw mut inbuf, &raw mut inleft, &raw mut outbuf, &raw mut outleft) };
    let errno = (status == CONVERT_FAILED).then(errno);
    output.truncate(capacity - outleft);
    Outcome {
        status,
        errno,
        read: input.len() - inleft,
        output,
    }
}
