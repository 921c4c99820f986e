//! `iconvctl` request codes understood by the reference provider.
//!
//! Values follow GNU libiconv's `<iconv.h>`. Anything else fails with `EINVAL`.

use core::ffi::c_int;

/// Identity check.
pub const TRIVIALP: c_int = 0;
/// Read the transliteration flag.
pub const GET_TRANSLITERATE: c_int = 1;
/// Write the transliteration flag.
pub const SET_TRANSLITERATE: c_int = 2;
/// Read the discard-illegal-sequence flag.
pub const GET_DISCARD_ILSEQ: c_int = 3;
/// Write the discard-illegal-sequence flag.
pub const SET_DISCARD_ILSEQ: c_int = 4;
