//! The reference provider's C entry points.

use core::ffi::{CStr, c_char, c_int, c_void};
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::charset::{Charset, Decoded, Target};
use crate::requests;

/// Open descriptors keyed by handle address.
static DESCRIPTORS: Mutex<BTreeMap<usize, Descriptor>> = Mutex::new(BTreeMap::new());
static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(1);

const CONVERT_FAILED: usize = usize::MAX;

#[derive(Debug)]
struct Descriptor {
    from: Charset,
    to: Target,
    transliterate: bool,
    discard_ilseq: bool,
}

/// Result of one conversion call, with cursor movement even on failure.
struct Step {
    read: usize,
    written: usize,
    result: Result<usize, c_int>,
}

impl Descriptor {
    fn convert(&mut self, input: &[u8], output: &mut [u8]) -> Step {
        let mut read = 0;
        let mut written = 0;
        let mut irreversible = 0;
        let fail = |read, written, code| Step {
            read,
            written,
            result: Err(code),
        };

        while read < input.len() {
            let (ch, len) = match self.from.decode_one(&input[read..]) {
                Decoded::Char(ch, len) => (ch, len),
                Decoded::Incomplete => return fail(read, written, libc::EINVAL),
                Decoded::Illegal(len) if self.discard_ilseq => {
                    read += len;
                    continue;
                }
                Decoded::Illegal(_) => return fail(read, written, libc::EILSEQ),
            };

            let mut buf = [0u8; 16];
            let (n, next) = match self.to.encode_one(ch, &mut buf) {
                Some(encoded) => encoded,
                None if self.transliterate => {
                    irreversible += 1;
                    self.to.encode_one('?', &mut buf).unwrap_or((0, self.to))
                }
                None if self.discard_ilseq => {
                    irreversible += 1;
                    (0, self.to)
                }
                None => return fail(read, written, libc::EILSEQ),
            };

            if n > output.len() - written {
                return fail(read, written, libc::E2BIG);
            }
            output[written..written + n].copy_from_slice(&buf[..n]);
            written += n;
            read += len;
            self.to = next;
        }

        Step {
            read,
            written,
            result: Ok(irreversible),
        }
    }

    /// Writes the reset sequence into `output` and returns to the initial
    /// state. Nothing is written, and the state is kept, if it does not fit.
    fn flush(&mut self, output: &mut [u8]) -> Result<usize, c_int> {
        let sequence = self.to.reset_sequence();
        let slot = output.get_mut(..sequence.len()).ok_or(libc::E2BIG)?;
        slot.copy_from_slice(sequence);
        self.to = self.to.initial();
        Ok(sequence.len())
    }
}

fn descriptors() -> MutexGuard<'static, BTreeMap<usize, Descriptor>> {
    DESCRIPTORS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Stores `code` in the calling thread's `errno`.
///
/// Callers set it last, after every lock is released, since locking can
/// itself touch `errno`.
fn set_errno(code: c_int) {
    #[cfg(target_os = "linux")]
    // SAFETY: `__errno_location` returns this thread's errno slot.
    unsafe {
        *libc::__errno_location() = code;
    }

    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "dragonfly"
    ))]
    // SAFETY: `__error` returns this thread's errno slot.
    unsafe {
        *libc::__error() = code;
    }

    #[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
    // SAFETY: `__errno` returns this thread's errno slot.
    unsafe {
        *libc::__errno() = code;
    }
}

fn open(tocode: &CStr, fromcode: &CStr) -> Result<*mut c_void, c_int> {
    let tocode = tocode.to_str().map_err(|_| libc::EINVAL)?;
    let fromcode = fromcode.to_str().map_err(|_| libc::EINVAL)?;

    let mut target = tocode.split("//");
    let to = Target::lookup(target.next().unwrap_or_default()).ok_or(libc::EINVAL)?;
    let from = fromcode
        .split("//")
        .next()
        .and_then(Charset::lookup)
        .ok_or(libc::EINVAL)?;

    let mut descriptor = Descriptor {
        from,
        to,
        transliterate: false,
        discard_ilseq: false,
    };
    for suffix in target {
        if suffix.eq_ignore_ascii_case("TRANSLIT") {
            descriptor.transliterate = true;
        } else if suffix.eq_ignore_ascii_case("IGNORE") {
            descriptor.discard_ilseq = true;
        }
    }

    let id = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    descriptors().insert(id, descriptor);
    Ok(ptr::without_provenance_mut(id))
}

/// Reference `iconv_open`.
///
/// # Safety
///
/// Both arguments must be NUL-terminated strings.
pub unsafe extern "C" fn reference_iconv_open(
    tocode: *const c_char,
    fromcode: *const c_char,
) -> *mut c_void {
    // SAFETY: the caller passes NUL-terminated strings.
    let (tocode, fromcode) = unsafe { (CStr::from_ptr(tocode), CStr::from_ptr(fromcode)) };
    match open(tocode, fromcode) {
        Ok(cd) => cd,
        Err(code) => {
            set_errno(code);
            ptr::without_provenance_mut(usize::MAX)
        }
    }
}

/// Reference `iconv`.
///
/// A null `inbuf` (or `*inbuf`) writes the target's reset sequence to a
/// non-null output cursor, or just drops the shift state when the output
/// cursor is null too.
///
/// # Safety
///
/// Non-null cursors must describe memory valid for the stated lengths.
pub unsafe extern "C" fn reference_iconv(
    cd: *mut c_void,
    inbuf: *mut *mut c_char,
    inbytesleft: *mut usize,
    outbuf: *mut *mut c_char,
    outbytesleft: *mut usize,
) -> usize {
    // SAFETY: forwarded from the caller's contract.
    let result = unsafe { convert(cd, inbuf, inbytesleft, outbuf, outbytesleft) };
    match result {
        Ok(irreversible) => irreversible,
        Err(code) => {
            set_errno(code);
            CONVERT_FAILED
        }
    }
}

unsafe fn convert(
    cd: *mut c_void,
    inbuf: *mut *mut c_char,
    inbytesleft: *mut usize,
    outbuf: *mut *mut c_char,
    outbytesleft: *mut usize,
) -> Result<usize, c_int> {
    let mut table = descriptors();
    let descriptor = table.get_mut(&cd.addr()).ok_or(libc::EBADF)?;

    // SAFETY: `inbuf` is checked for null before it is read.
    if inbuf.is_null() || unsafe { (*inbuf).is_null() } {
        // SAFETY: `outbuf` is checked for null before it is read.
        if outbuf.is_null() || unsafe { (*outbuf).is_null() } {
            descriptor.to = descriptor.to.initial();
            return Ok(0);
        }
        // SAFETY: a non-null output cursor holds `*outbytesleft` writable bytes.
        let output = unsafe { core::slice::from_raw_parts_mut((*outbuf).cast::<u8>(), *outbytesleft) };
        let written = descriptor.flush(output)?;
        // SAFETY: `written` bytes of the output buffer were just filled.
        unsafe {
            *outbuf = (*outbuf).add(written);
            *outbytesleft -= written;
        }
        return Ok(0);
    }

    // SAFETY: the caller guarantees `*inbuf` holds `*inbytesleft` readable bytes.
    let input = unsafe { core::slice::from_raw_parts((*inbuf).cast::<u8>(), *inbytesleft) };
    // SAFETY: a non-null output cursor holds `*outbytesleft` writable bytes.
    let output: &mut [u8] = unsafe {
        if outbuf.is_null() || (*outbuf).is_null() {
            &mut []
        } else {
            core::slice::from_raw_parts_mut((*outbuf).cast::<u8>(), *outbytesleft)
        }
    };

    let step = descriptor.convert(input, output);

    // SAFETY: the cursors stay within the buffers they describe.
    unsafe {
        *inbuf = (*inbuf).add(step.read);
        *inbytesleft -= step.read;
        if step.written > 0 {
            *outbuf = (*outbuf).add(step.written);
            *outbytesleft -= step.written;
        }
    }
    step.result
}

/// Reference `iconv_close`. Closing an unknown or already closed handle fails
/// with `EBADF`.
///
/// # Safety
///
/// Always safe; `unsafe` only to match the C signature.
pub unsafe extern "C" fn reference_iconv_close(cd: *mut c_void) -> c_int {
    let removed = descriptors().remove(&cd.addr()).is_some();
    if removed {
        0
    } else {
        set_errno(libc::EBADF);
        -1
    }
}

/// Reference `iconvctl`, supporting the codes in [`crate::requests`].
///
/// # Safety
///
/// `argument` must point to a live `int`.
pub unsafe extern "C" fn reference_iconvctl(
    cd: *mut c_void,
    request: c_int,
    argument: *mut c_void,
) -> c_int {
    // SAFETY: forwarded from the caller's contract.
    let result = unsafe { control(cd, request, argument.cast::<c_int>()) };
    match result {
        Ok(()) => 0,
        Err(code) => {
            set_errno(code);
            -1
        }
    }
}

unsafe fn control(cd: *mut c_void, request: c_int, argument: *mut c_int) -> Result<(), c_int> {
    let mut table = descriptors();
    let descriptor = table.get_mut(&cd.addr()).ok_or(libc::EBADF)?;
    if argument.is_null() {
        return Err(libc::EINVAL);
    }

    // SAFETY: `argument` is non-null and the caller guarantees it is a live `int`.
    unsafe {
        match request {
            requests::TRIVIALP => {
                *argument = c_int::from(descriptor.to == Target::Stateless(descriptor.from));
            }
            requests::GET_TRANSLITERATE => *argument = c_int::from(descriptor.transliterate),
            requests::SET_TRANSLITERATE => descriptor.transliterate = *argument != 0,
            requests::GET_DISCARD_ILSEQ => *argument = c_int::from(descriptor.discard_ilseq),
            requests::SET_DISCARD_ILSEQ => descriptor.discard_ilseq = *argument != 0,
            _ => return Err(libc::EINVAL),
        }
    }
    Ok(())
}
