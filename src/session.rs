//! Safe ownership of a single conversion descriptor.
//!
//! [`Session`] calls the conventional entry points exported by this crate, so
//! everything it does reaches libiconv through the same redirection C callers
//! use. Unlike the raw layer it owns its handle and closes it on drop.

use core::ffi::{c_char, c_int};
use core::{mem, ptr};
use std::ffi::CString;
use std::io;

use crate::control::{ICONV_TRIVIALP, SessionFlag};
use crate::error::ConversionError;
use crate::trace::{trace_close, trace_convert_failed, trace_open, trace_open_failed};
use crate::{CONVERT_FAILED, iconv, iconv_close, iconv_open, iconv_t, iconvctl};
use crate::{invalid_handle, is_invalid_handle};

/// Growth step for [`Session::convert_all`] when the output runs out of room.
const MIN_CHUNK: usize = 64;

/// Bytes consumed and produced by one conversion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Input bytes consumed.
    pub read: usize,
    /// Output bytes written.
    pub written: usize,
    /// Characters converted to an approximation rather than exactly.
    ///
    /// libiconv only reports this count on success. In the progress attached
    /// to a [`ConversionError`] it is always 0, even if substitutions happened
    /// before the call stopped.
    pub irreversible: usize,
}

impl Progress {
    fn offset_by(self, read: usize, written: usize) -> Self {
        Self {
            read: self.read + read,
            written: self.written + written,
            irreversible: self.irreversible,
        }
    }
}

/// Output of [`Session::convert_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Converted {
    /// The converted bytes, including any trailing reset sequence.
    pub bytes: Vec<u8>,
    /// Irreversible conversions summed over the calls that succeeded.
    ///
    /// Calls that stopped with a full output buffer report no count, so this
    /// is a lower bound whenever the output had to grow.
    pub irreversible: usize,
}

/// An open conversion descriptor.
#[derive(Debug)]
pub struct Session {
    cd: iconv_t,
    from: String,
    to: String,
}

// SAFETY: libiconv descriptors carry no thread affinity. Calls on one
// descriptor must not overlap, which `&mut self` on every converting or
// configuring method guarantees, and `Session` is not `Sync`.
unsafe impl Send for Session {}

impl Session {
    /// Opens a conversion from `from` to `to`, argument order as in `iconv_open`.
    pub fn open(to: &str, from: &str) -> Result<Self, ConversionError> {
        let to_c = CString::new(to).map_err(|_| ConversionError::InvalidName(to.to_owned()))?;
        let from_c =
            CString::new(from).map_err(|_| ConversionError::InvalidName(from.to_owned()))?;

        // SAFETY: both pointers are NUL-terminated and outlive the call.
        let cd = unsafe { iconv_open(to_c.as_ptr(), from_c.as_ptr()) };
        if is_invalid_handle(cd) {
            let err = io::Error::last_os_error();
            let error = if err.raw_os_error() == Some(libc::EINVAL) {
                ConversionError::Unsupported {
                    from: from.to_owned(),
                    to: to.to_owned(),
                }
            } else {
                ConversionError::Io(err)
            };
            trace_open_failed(to, from, &error);
            return Err(error);
        }

        trace_open(to, from);
        Ok(Self {
            cd,
            from: from.to_owned(),
            to: to.to_owned(),
        })
    }

    /// Source encoding name as passed to [`Session::open`].
    pub fn source_encoding(&self) -> &str {
        &self.from
    }

    /// Target encoding name as passed to [`Session::open`].
    pub fn target_encoding(&self) -> &str {
        &self.to
    }

    /// The underlying descriptor. The session keeps ownership.
    pub fn as_raw(&self) -> iconv_t {
        self.cd
    }

    /// Converts as much of `input` into `output` as fits.
    ///
    /// On failure the error carries how far the call got; the session stays
    /// usable and the caller resumes from `input[progress.read..]`. The
    /// irreversible count of a failed call is lost, see [`Progress::irreversible`].
    pub fn convert(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, ConversionError> {
        let mut inbuf = input.as_ptr().cast_mut().cast::<c_char>();
        let mut inleft = input.len();
        let mut outbuf = output.as_mut_ptr().cast::<c_char>();
        let mut outleft = output.len();

        // SAFETY: the cursors describe two live slices and libiconv only reads
        // through `inbuf`.
        let status = unsafe {
            iconv(
                self.cd,
                &raw mut inbuf,
                &raw mut inleft,
                &raw mut outbuf,
                &raw mut outleft,
            )
        };
        let progress = Progress {
            read: input.len() - inleft,
            written: output.len() - outleft,
            irreversible: 0,
        };
        Self::check(status, progress)
    }

    /// Writes the sequence that returns the output to its initial shift state.
    ///
    /// Returns the number of bytes written. Stateless encodings write nothing.
    pub fn finish(&mut self, output: &mut [u8]) -> Result<usize, ConversionError> {
        let mut outbuf = output.as_mut_ptr().cast::<c_char>();
        let mut outleft = output.len();

        // SAFETY: a null input cursor asks for a flush; the output cursor
        // describes a live slice.
        let status = unsafe {
            iconv(
                self.cd,
                ptr::null_mut(),
                ptr::null_mut(),
                &raw mut outbuf,
                &raw mut outleft,
            )
        };
        let progress = Progress {
            written: output.len() - outleft,
            ..Progress::default()
        };
        Self::check(status, progress).map(|progress| progress.written)
    }

    /// Drops any pending shift state without producing output.
    pub fn reset(&mut self) -> Result<(), ConversionError> {
        // SAFETY: all-null cursors are the documented reset call.
        let status = unsafe {
            iconv(
                self.cd,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        Self::check(status, Progress::default()).map(drop)
    }

    /// Converts all of `input`, flushes the shift state and returns the bytes
    /// together with the irreversible count.
    pub fn convert_all(&mut self, input: &[u8]) -> Result<Converted, ConversionError> {
        let mut output = Vec::with_capacity(input.len().max(MIN_CHUNK));
        let mut read = 0;
        let mut irreversible = 0;

        loop {
            let start = output.len();
            output.resize(output.capacity().max(start + MIN_CHUNK), 0);
            match self.convert(&input[read..], &mut output[start..]) {
                Ok(progress) => {
                    output.truncate(start + progress.written);
                    irreversible += progress.irreversible;
                    break;
                }
                Err(ConversionError::OutputFull { progress }) => {
                    output.truncate(start + progress.written);
                    read += progress.read;
                    output.reserve(output.len().max(MIN_CHUNK));
                }
                Err(err) => return Err(Self::offset(err, read, start)),
            }
        }

        loop {
            let start = output.len();
            output.resize(output.capacity().max(start + MIN_CHUNK), 0);
            match self.finish(&mut output[start..]) {
                Ok(written) => {
                    output.truncate(start + written);
                    return Ok(Converted {
                        bytes: output,
                        irreversible,
                    });
                }
                Err(ConversionError::OutputFull { progress }) => {
                    output.truncate(start + progress.written);
                    output.reserve(output.len().max(MIN_CHUNK));
                }
                Err(err) => return Err(Self::offset(err, input.len(), start)),
            }
        }
    }

    /// Reports whether the conversion is the identity.
    pub fn is_trivial(&self) -> Result<bool, ConversionError> {
        let mut value: c_int = 0;
        self.control(ICONV_TRIVIALP, &mut value)?;
        Ok(value != 0)
    }

    /// Reads a boolean descriptor option.
    pub fn flag(&self, flag: SessionFlag) -> Result<bool, ConversionError> {
        let mut value: c_int = 0;
        self.control(flag.get_request(), &mut value)?;
        Ok(value != 0)
    }

    /// Changes a boolean descriptor option.
    pub fn set_flag(&mut self, flag: SessionFlag, enabled: bool) -> Result<(), ConversionError> {
        let mut value = c_int::from(enabled);
        self.control(flag.set_request(), &mut value)
    }

    /// Closes the descriptor and reports libiconv's status.
    pub fn close(mut self) -> Result<(), ConversionError> {
        let cd = mem::replace(&mut self.cd, invalid_handle());
        // SAFETY: `cd` came from `iconv_open` and is closed exactly once; the
        // sentinel left behind stops `Drop` from closing it again.
        let status = unsafe { iconv_close(cd) };
        let err = (status != 0).then(io::Error::last_os_error);
        trace_close(status);
        err.map_or(Ok(()), |err| Err(err.into()))
    }

    fn control(&self, request: c_int, value: &mut c_int) -> Result<(), ConversionError> {
        // SAFETY: every request issued here reads or writes one `int` through
        // `argument`, and `value` is a live `int`.
        let status = unsafe { iconvctl(self.cd, request, ptr::from_mut(value).cast()) };
        if status == 0 {
            Ok(())
        } else {
            Err(ConversionError::Control {
                request,
                source: io::Error::last_os_error(),
            })
        }
    }

    fn check(status: usize, progress: Progress) -> Result<Progress, ConversionError> {
        if status == CONVERT_FAILED {
            let error = ConversionError::from_convert(io::Error::last_os_error(), progress);
            trace_convert_failed(&error);
            Err(error)
        } else {
            Ok(Progress {
                irreversible: status,
                ..progress
            })
        }
    }

    fn offset(err: ConversionError, read: usize, written: usize) -> ConversionError {
        match err {
            ConversionError::IllegalSequence { progress } => ConversionError::IllegalSequence {
                progress: progress.offset_by(read, written),
            },
            ConversionError::IncompleteInput { progress } => ConversionError::IncompleteInput {
                progress: progress.offset_by(read, written),
            },
            other => other,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if is_invalid_handle(self.cd) {
            return;
        }
        // SAFETY: the handle is still open and is never used after this call.
        let status = unsafe { iconv_close(self.cd) };
        trace_close(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::calls;

    fn assert_send<T: Send>() {}

    #[test]
    fn session_is_send() {
        assert_send::<Session>();
    }

    #[test]
    fn latin1_to_utf8_end_to_end() {
        let mut session = Session::open("UTF-8", "ISO-8859-1").unwrap();
        let mut output = [0u8; 16];
        let progress = session.convert(b"caf\xe9", &mut output).unwrap();
        assert_eq!(progress.read, 4);
        assert_eq!(progress.irreversible, 0);
        assert_eq!(&output[..progress.written], "café".as_bytes());
        session.close().unwrap();
    }

    #[test]
    fn names_are_kept() {
        let session = Session::open("UTF-8", "ISO-8859-1").unwrap();
        assert_eq!(session.source_encoding(), "ISO-8859-1");
        assert_eq!(session.target_encoding(), "UTF-8");
        assert!(!is_invalid_handle(session.as_raw()));
    }

    #[test]
    fn unsupported_pair_is_reported() {
        let err = Session::open("KLINGON", "UTF-8").unwrap_err();
        match err {
            ConversionError::Unsupported { from, to } => {
                assert_eq!(from, "UTF-8");
                assert_eq!(to, "KLINGON");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn interior_nul_never_reaches_the_provider() {
        let before = calls();
        let err = Session::open("UTF\0-8", "ISO-8859-1").unwrap_err();
        assert!(matches!(err, ConversionError::InvalidName(name) if name == "UTF\0-8"));
        assert_eq!(calls().open, before.open);
    }

    #[test]
    fn output_full_reports_partial_progress() {
        let mut session = Session::open("UTF-8", "ISO-8859-1").unwrap();
        let mut output = [0u8; 4];
        let err = session.convert(b"caf\xe9", &mut output).unwrap_err();
        let progress = err.progress().unwrap();
        assert!(matches!(err, ConversionError::OutputFull { .. }));
        assert_eq!(progress.read, 3);
        assert_eq!(progress.written, 3);
        assert_eq!(&output[..3], b"caf");
    }

    #[test]
    fn incomplete_input_stops_before_partial_sequence() {
        let mut session = Session::open("ISO-8859-1", "UTF-8").unwrap();
        let mut output = [0u8; 8];
        let err = session.convert(b"ab\xc3", &mut output).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::IncompleteInput {
                progress: Progress { read: 2, written: 2, .. }
            }
        ));

        let progress = session.convert(b"\xc3\xa9", &mut output).unwrap();
        assert_eq!(&output[..progress.written], b"\xe9");
    }

    #[test]
    fn convert_all_grows_the_output() {
        let input = "é".repeat(200);
        let mut session = Session::open("UTF-8", "UTF-8").unwrap();
        let converted = session.convert_all(input.as_bytes()).unwrap();
        assert_eq!(converted.bytes, input.as_bytes());
        assert_eq!(converted.irreversible, 0);
    }

    #[test]
    fn convert_all_reports_absolute_position() {
        // UTF-16 doubles ASCII, so the first chunk fills up halfway through.
        let mut input = vec![b'a'; 150];
        input.push(0xff);
        let mut session = Session::open("UTF-16LE", "UTF-8").unwrap();
        let err = session.convert_all(&input).unwrap_err();
        match err {
            ConversionError::IllegalSequence { progress } => {
                assert_eq!(progress.read, 150);
                assert_eq!(progress.written, 300);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn finish_and_reset_on_stateless_encodings() {
        let mut session = Session::open("UTF-8", "ISO-8859-1").unwrap();
        let mut output = [0u8; 8];
        assert_eq!(session.finish(&mut output).unwrap(), 0);
        session.reset().unwrap();
    }

    #[test]
    fn latin1_covers_the_c1_range() {
        let mut session = Session::open("UTF-8", "ISO-8859-1").unwrap();
        let converted = session.convert_all(b"\x80\x9f").unwrap();
        assert_eq!(converted.bytes, "\u{80}\u{9f}".as_bytes());

        let mut session = Session::open("ISO-8859-1", "UTF-8").unwrap();
        let converted = session.convert_all("\u{80}".as_bytes()).unwrap();
        assert_eq!(converted.bytes, b"\x80");
    }

    #[test]
    fn convert_all_counts_substitutions() {
        let mut session = Session::open("ASCII//TRANSLIT", "UTF-8").unwrap();
        let converted = session.convert_all("né".as_bytes()).unwrap();
        assert_eq!(converted.bytes, b"n?");
        assert_eq!(converted.irreversible, 1);
    }

    #[test]
    fn failed_call_reports_no_irreversible_count() {
        let mut session = Session::open("ASCII//TRANSLIT", "UTF-8").unwrap();
        let mut output = [0u8; 2];
        let err = session.convert("éé!".as_bytes(), &mut output).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::OutputFull {
                progress: Progress { read: 4, written: 2, irreversible: 0 }
            }
        ));
        assert_eq!(&output, b"??");
    }

    #[test]
    fn finish_writes_the_shift_back_sequence() {
        let mut session = Session::open("ISO-2022-KR", "UTF-8").unwrap();
        let mut output = [0u8; 16];
        let progress = session.convert("a한".as_bytes(), &mut output).unwrap();
        assert_eq!(&output[..progress.written], b"a\x1b$)C\x0e\x47\x51");

        let err = session.finish(&mut []).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::OutputFull {
                progress: Progress { written: 0, .. }
            }
        ));

        assert_eq!(session.finish(&mut output).unwrap(), 1);
        assert_eq!(output[0], 0x0f);
        assert_eq!(session.finish(&mut output).unwrap(), 0);
    }

    #[test]
    fn reset_drops_the_shift_state() {
        let mut session = Session::open("ISO-2022-KR", "UTF-8").unwrap();
        let mut output = [0u8; 16];
        session.convert("한".as_bytes(), &mut output).unwrap();
        session.reset().unwrap();
        assert_eq!(session.finish(&mut output).unwrap(), 0);

        // Back in the initial state, so the designation is written again.
        let progress = session.convert("한".as_bytes(), &mut output).unwrap();
        assert_eq!(&output[..progress.written], b"\x1b$)C\x0e\x47\x51");
    }

    #[test]
    fn convert_all_ends_in_the_initial_shift_state() {
        let mut session = Session::open("ISO-2022-KR", "UTF-8").unwrap();
        let converted = session.convert_all("한a한".as_bytes()).unwrap();
        assert_eq!(converted.bytes, b"\x1b$)C\x0e\x47\x51\x0fa\x0e\x47\x51\x0f");

        let mut output = [0u8; 4];
        assert_eq!(session.finish(&mut output).unwrap(), 0);
    }

    #[test]
    fn convert_all_flushes_after_growing() {
        // Every shift costs a byte, so the output outgrows the 160 input bytes.
        let input = "a한".repeat(40);
        let mut session = Session::open("ISO-2022-KR", "UTF-8").unwrap();
        let converted = session.convert_all(input.as_bytes()).unwrap();
        assert_eq!(converted.bytes.len(), 8 + 39 * 5 + 1);
        assert!(converted.bytes.starts_with(b"a\x1b$)C\x0e"));
        assert_eq!(converted.bytes.last(), Some(&0x0f));
    }

    #[test]
    fn flags_round_trip() {
        let mut session = Session::open("ASCII", "UTF-8").unwrap();
        assert!(!session.is_trivial().unwrap());
        assert!(!session.flag(SessionFlag::Transliterate).unwrap());

        session.set_flag(SessionFlag::Transliterate, true).unwrap();
        assert!(session.flag(SessionFlag::Transliterate).unwrap());

        let mut output = [0u8; 8];
        let progress = session.convert("né".as_bytes(), &mut output).unwrap();
        assert_eq!(&output[..progress.written], b"n?");
        assert_eq!(progress.irreversible, 1);
    }

    #[test]
    fn discard_ilseq_skips_bad_input() {
        let mut session = Session::open("ASCII", "UTF-8").unwrap();
        session.set_flag(SessionFlag::DiscardIlseq, true).unwrap();
        let converted = session.convert_all(b"a\xffb").unwrap();
        assert_eq!(converted.bytes, b"ab");
    }

    #[test]
    fn unsupported_flag_is_a_control_error() {
        let mut session = Session::open("UTF-8", "UTF-8").unwrap();
        assert!(session.is_trivial().unwrap());
        let err = session
            .set_flag(SessionFlag::DiscardNonIdentical, true)
            .unwrap_err();
        assert!(matches!(
            err,
            ConversionError::Control { request, .. } if request == SessionFlag::DiscardNonIdentical.set_request()
        ));
    }

    #[test]
    fn drop_closes_once() {
        let before = calls();
        let session = Session::open("UTF-8", "UTF-8").unwrap();
        drop(session);
        assert_eq!(calls().close, before.close + 1);

        let session = Session::open("UTF-8", "UTF-8").unwrap();
        session.close().unwrap();
        assert_eq!(calls().close, before.close + 2);
    }
}
