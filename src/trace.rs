//! Session lifecycle tracing (no-ops without the `tracing` feature).

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

#[cfg(feature = "tracing")]
use crate::ConversionError;

/// Trace a successful session open.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_open(to: &str, from: &str) {
    debug!(
        target: "iconv_shim::session",
        operation = "open",
        to = to,
        from = from,
        "opened {} -> {}",
        from,
        to
    );
}

/// Trace a successful session open - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_open(_to: &str, _from: &str) {}

/// Trace a rejected session open.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_open_failed(to: &str, from: &str, error: &ConversionError) {
    debug!(
        target: "iconv_shim::session",
        operation = "open",
        to = to,
        from = from,
        %error,
        "open {} -> {} failed",
        from,
        to
    );
}

/// Trace a rejected session open - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_open_failed<E>(_to: &str, _from: &str, _error: &E) {}

/// Trace a conversion call that stopped early.
///
/// `OutputFull` is routine for callers that convert in chunks, so it is
/// reported at trace level; everything else at debug.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_convert_failed(error: &ConversionError) {
    if matches!(error, ConversionError::OutputFull { .. }) {
        trace!(target: "iconv_shim::session", operation = "convert", %error);
    } else {
        debug!(target: "iconv_shim::session", operation = "convert", %error);
    }
}

/// Trace a conversion call that stopped early - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_convert_failed<E>(_error: &E) {}

/// Trace a session close and its status.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_close(status: i32) {
    trace!(target: "iconv_shim::session", operation = "close", status = status);
}

/// Trace a session close - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_close(_status: i32) {}
