use core::ffi::c_int;
use std::io;

use crate::session::Progress;

/// Errors reported by [`Session`](crate::Session).
///
/// The raw entry points never produce this type; they hand back libiconv's
/// status values and `errno` as-is. `Session` reads `errno` after a failed
/// call and sorts it into one of these variants.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// An encoding name contained an interior NUL byte.
    #[error("invalid encoding name: {0:?}")]
    InvalidName(String),

    /// The provider does not support converting between these encodings.
    #[error("conversion from {from} to {to} is not supported")]
    Unsupported {
        /// Source encoding.
        from: String,
        /// Target encoding.
        to: String,
    },

    /// The input holds a sequence that is illegal in the source encoding.
    #[error("illegal input sequence after {} input bytes", .progress.read)]
    IllegalSequence {
        /// What was converted before the offending sequence.
        progress: Progress,
    },

    /// The input ends inside a multibyte sequence.
    #[error("incomplete multibyte sequence after {} input bytes", .progress.read)]
    IncompleteInput {
        /// What was converted before the partial sequence.
        progress: Progress,
    },

    /// There is not enough room left in the output buffer.
    #[error("output buffer full after {} bytes", .progress.written)]
    OutputFull {
        /// What was converted before the buffer filled up.
        progress: Progress,
    },

    /// An `iconvctl` request was rejected.
    #[error("iconvctl request {request} failed: {source}")]
    Control {
        /// The request code that failed.
        request: c_int,
        /// Underlying OS error.
        source: io::Error,
    },

    /// Any other failure reported through `errno`.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ConversionError {
    /// Classifies a failed conversion call from its `errno` value.
    pub(crate) fn from_convert(err: io::Error, progress: Progress) -> Self {
        match err.raw_os_error() {
            Some(libc::EILSEQ) => Self::IllegalSequence { progress },
            Some(libc::EINVAL) => Self::IncompleteInput { progress },
            Some(libc::E2BIG) => Self::OutputFull { progress },
            _ => Self::Io(err),
        }
    }

    /// Partial progress made before the conversion stopped, if any.
    pub fn progress(&self) -> Option<Progress> {
        match self {
            Self::IllegalSequence { progress }
            | Self::IncompleteInput { progress }
            | Self::OutputFull { progress } => Some(*progress),
            _ => None,
        }
    }
}
