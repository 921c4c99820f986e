//! `iconvctl` request codes.
//!
//! The values mirror GNU libiconv's `<iconv.h>`. [`crate::iconvctl`] passes
//! them through without looking at them; they are listed here so Rust callers
//! do not need the C header.

use core::ffi::c_int;

/// Writes 1 to `*(int *)argument` when the conversion is the identity.
pub const ICONV_TRIVIALP: c_int = 0;
/// Reads the transliteration flag into `*(int *)argument`.
pub const ICONV_GET_TRANSLITERATE: c_int = 1;
/// Sets transliteration from `*(const int *)argument`.
pub const ICONV_SET_TRANSLITERATE: c_int = 2;
/// Reads the "discard illegal sequences" flag into `*(int *)argument`.
pub const ICONV_GET_DISCARD_ILSEQ: c_int = 3;
/// Sets the "discard illegal sequences" flag from `*(const int *)argument`.
pub const ICONV_SET_DISCARD_ILSEQ: c_int = 4;
/// Installs libiconv's `struct iconv_hooks`.
pub const ICONV_SET_HOOKS: c_int = 5;
/// Installs libiconv's `struct iconv_fallbacks`.
pub const ICONV_SET_FALLBACKS: c_int = 6;
/// Reads the "discard invalid input" flag into `*(int *)argument`.
pub const ICONV_GET_DISCARD_INVALID: c_int = 7;
/// Sets the "discard invalid input" flag from `*(const int *)argument`.
pub const ICONV_SET_DISCARD_INVALID: c_int = 8;
/// Reads the "discard non-identical conversions" flag into `*(int *)argument`.
pub const ICONV_GET_DISCARD_NON_IDENTICAL: c_int = 9;
/// Sets the "discard non-identical conversions" flag from `*(const int *)argument`.
pub const ICONV_SET_DISCARD_NON_IDENTICAL: c_int = 10;

/// Boolean descriptor options that `iconvctl` can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionFlag {
    /// Approximate unmappable characters instead of failing.
    Transliterate,
    /// Skip illegal input sequences and unmappable characters.
    DiscardIlseq,
    /// Skip invalid input only.
    DiscardInvalid,
    /// Skip characters that cannot be converted exactly.
    DiscardNonIdentical,
}

impl SessionFlag {
    /// Request code that reads this flag.
    #[must_use]
    pub const fn get_request(self) -> c_int {
        match self {
            Self::Transliterate => ICONV_GET_TRANSLITERATE,
            Self::DiscardIlseq => ICONV_GET_DISCARD_ILSEQ,
            Self::DiscardInvalid => ICONV_GET_DISCARD_INVALID,
            Self::DiscardNonIdentical => ICONV_GET_DISCARD_NON_IDENTICAL,
        }
    }

    /// Request code that writes this flag.
    #[must_use]
    pub const fn set_request(self) -> c_int {
        self.get_request() + 1
    }
}
