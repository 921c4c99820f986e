//! Character sets known to the reference provider.

use encoding_rs::{
    DecoderResult, EUC_KR, Encoding, EncoderResult, ISO_2022_JP, REPLACEMENT, UTF_8, UTF_16BE, UTF_16LE,
};

/// Longest byte sequence tried before declaring the input illegal.
const MAX_SEQUENCE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Charset {
    Ascii,
    /// ISO-8859-1: every byte is the code point of the same value.
    Latin1,
    Utf16 { big_endian: bool },
    Web(&'static Encoding),
}

/// Outcome of decoding the first character of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decoded {
    /// A complete character and the number of bytes it took.
    Char(char, usize),
    /// The buffer ends in the middle of a character.
    Incomplete,
    /// The first `n` bytes are not a character.
    Illegal(usize),
}

impl Charset {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_uppercase();
        match name.as_str() {
            "ASCII" | "US-ASCII" | "ANSI_X3.4-1968" => return Some(Self::Ascii),
            // WHATWG maps these labels to windows-1252, which differs in 0x80..=0x9F.
            "ISO-8859-1" | "ISO_8859-1" | "ISO8859-1" | "LATIN1" | "L1" | "CP819" => {
                return Some(Self::Latin1);
            }
            "UTF-16LE" => return Some(Self::Utf16 { big_endian: false }),
            "UTF-16BE" => return Some(Self::Utf16 { big_endian: true }),
            _ => {}
        }

        let encoding = Encoding::for_label(name.as_bytes())?;
        // Stateful and decode-only encodings need more than one-character steps.
        if encoding == REPLACEMENT
            || encoding == ISO_2022_JP
            || encoding.output_encoding() != encoding
        {
            return None;
        }
        Some(Self::Web(encoding))
    }

    pub(crate) fn decode_one(self, input: &[u8]) -> Decoded {
        match self {
            Self::Ascii => match input.first() {
                Some(&byte) if byte.is_ascii() => Decoded::Char(char::from(byte), 1),
                Some(_) => Decoded::Illegal(1),
                None => Decoded::Incomplete,
            },
            Self::Latin1 => match input.first() {
                Some(&byte) => Decoded::Char(char::from(byte), 1),
                None => Decoded::Incomplete,
            },
            Self::Utf16 { big_endian: false } => decode_with(UTF_16LE, input),
            Self::Utf16 { big_endian: true } => decode_with(UTF_16BE, input),
            Self::Web(encoding) => decode_with(encoding, input),
        }
    }

    /// Encodes `ch` into `out`, returning the byte count, or `None` when the
    /// charset has no representation for it.
    pub(crate) fn encode_one(self, ch: char, out: &mut [u8; 16]) -> Option<usize> {
        match self {
            Self::Ascii => ch.is_ascii().then(|| {
                out[0] = ch as u8;
                1
            }),
            Self::Latin1 => u8::try_from(ch).ok().map(|byte| {
                out[0] = byte;
                1
            }),
            Self::Utf16 { big_endian } => {
                let mut units = [0u16; 2];
                let units = ch.encode_utf16(&mut units);
                for (i, unit) in units.iter().enumerate() {
                    let bytes = if big_endian {
                        unit.to_be_bytes()
                    } else {
                        unit.to_le_bytes()
                    };
                    out[i * 2..i * 2 + 2].copy_from_slice(&bytes);
                }
                Some(units.len() * 2)
            }
            Self::Web(encoding) if encoding == UTF_8 => Some(ch.encode_utf8(out).len()),
            Self::Web(encoding) => {
                let mut utf8 = [0u8; 4];
                let mut encoder = encoding.new_encoder();
                let (result, _, written) =
                    encoder.encode_from_utf8_without_replacement(ch.encode_utf8(&mut utf8), out, true);
                match result {
                    EncoderResult::InputEmpty => Some(written),
                    EncoderResult::OutputFull | EncoderResult::Unmappable(_) => None,
                }
            }
        }
    }
}

/// A conversion target, which may carry output shift state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Stateless(Charset),
    Iso2022Kr(Iso2022Kr),
}

impl Target {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        if name.trim().eq_ignore_ascii_case("ISO-2022-KR") {
            return Some(Self::Iso2022Kr(Iso2022Kr::default()));
        }
        Charset::lookup(name).map(Self::Stateless)
    }

    /// Encodes `ch`, returning the byte count and the state that follows it.
    /// The caller commits the new state only once the bytes fit.
    pub(crate) fn encode_one(self, ch: char, out: &mut [u8; 16]) -> Option<(usize, Self)> {
        match self {
            Self::Stateless(charset) => charset.encode_one(ch, out).map(|n| (n, self)),
            Self::Iso2022Kr(state) => state
                .encode_one(ch, out)
                .map(|(n, next)| (n, Self::Iso2022Kr(next))),
        }
    }

    /// Bytes that return the output to the initial shift state.
    pub(crate) fn reset_sequence(self) -> &'static [u8] {
        match self {
            Self::Iso2022Kr(Iso2022Kr { shifted: true, .. }) => &[SI],
            _ => &[],
        }
    }

    pub(crate) fn initial(self) -> Self {
        match self {
            Self::Stateless(_) => self,
            Self::Iso2022Kr(_) => Self::Iso2022Kr(Iso2022Kr::default()),
        }
    }
}

const DESIGNATE_KSC5601: &[u8; 4] = b"\x1b$)C";
const SO: u8 = 0x0e;
const SI: u8 = 0x0f;

/// Output state of ISO-2022-KR (RFC 1557): ASCII, plus KS X 1001 between
/// SO and SI once the designation escape has been written on the line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Iso2022Kr {
    designated: bool,
    shifted: bool,
}

impl Iso2022Kr {
    fn encode_one(self, ch: char, out: &mut [u8; 16]) -> Option<(usize, Self)> {
        let mut next = self;
        let mut n = 0;

        if ch.is_ascii() {
            let byte = ch as u8;
            if matches!(byte, SO | SI | 0x1b) {
                return None;
            }
            if next.shifted {
                out[n] = SI;
                n += 1;
                next.shifted = false;
            }
            out[n] = byte;
            if matches!(byte, b'\n' | b'\r') {
                next.designated = false;
            }
            return Some((n + 1, next));
        }

        let mut utf8 = [0u8; 4];
        let mut euc = [0u8; 16];
        let mut encoder = EUC_KR.new_encoder();
        let (result, _, written) =
            encoder.encode_from_utf8_without_replacement(ch.encode_utf8(&mut utf8), &mut euc, true);
        // Only the KS X 1001 rows of EUC-KR, not the Unified Hangul extension.
        if result != EncoderResult::InputEmpty
            || written != 2
            || !euc[..2].iter().all(|byte| (0xa1..=0xfe).contains(byte))
        {
            return None;
        }

        if !next.designated {
            out[..4].copy_from_slice(DESIGNATE_KSC5601);
            n = 4;
            next.designated = true;
        }
        if !next.shifted {
            out[n] = SO;
            n += 1;
            next.shifted = true;
        }
        out[n] = euc[0] - 0x80;
        out[n + 1] = euc[1] - 0x80;
        Some((n + 2, next))
    }
}

fn decode_with(encoding: &'static Encoding, input: &[u8]) -> Decoded {
    for len in 1..=input.len().min(MAX_SEQUENCE) {
        let mut decoder = encoding.new_decoder_without_bom_handling();
        let mut buf = [0u8; 16];
        let (result, read, written) =
            decoder.decode_to_utf8_without_replacement(&input[..len], &mut buf, false);
        match result {
            DecoderResult::Malformed(_, after) => {
                let bad = read.saturating_sub(usize::from(after)).max(1);
                return Decoded::Illegal(bad);
            }
            DecoderResult::InputEmpty if written > 0 => {
                return std::str::from_utf8(&buf[..written])
                    .ok()
                    .and_then(|s| s.chars().next())
                    .map_or(Decoded::Illegal(len), |ch| Decoded::Char(ch, len));
            }
            DecoderResult::InputEmpty => {}
            DecoderResult::OutputFull => return Decoded::Illegal(len),
        }
    }

    if input.len() < MAX_SEQUENCE {
        Decoded::Incomplete
    } else {
        Decoded::Illegal(MAX_SEQUENCE)
    }
}
