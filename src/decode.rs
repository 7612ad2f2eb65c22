//! Text decoding for target and guess lines.
//!
//! Lines arrive as raw bytes. [`LineDecoder`] turns them into `String`s under a
//! configured encoding and reports malformed input as a [`DecodeError`] instead
//! of substituting replacement characters, so a garbled guess can never match a
//! target by accident. [`detect_encoding`] sniffs the encoding of a target file
//! sample when the operator did not name one.
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("line of {len} bytes is not valid {encoding}")]
    Malformed { encoding: &'static str, len: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("unknown encoding label: {0}")]
    UnknownLabel(String),
    #[error("cannot detect encoding: target sample is empty")]
    EmptySample,
    #[error("cannot confidently detect encoding (best guess {guess}); pass --encoding")]
    Undetermined { guess: &'static str },
    #[error("encoding {0} is not ASCII-compatible; convert the file to UTF-8 first")]
    NotAsciiCompatible(&'static str),
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Strip a trailing `\n` or `\r\n`. Nothing else is removed.
pub fn strip_line_terminator(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}

/// Strict decoder for a single encoding.
#[derive(Debug, Clone, Copy)]
pub struct LineDecoder {
    encoding: &'static Encoding,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self { encoding: UTF_8 }
    }
}

impl LineDecoder {
    /// Lines are split on the `\n` byte, so only encodings that keep ASCII
    /// bytes as-is (no UTF-16, no ISO-2022-JP) are accepted.
    pub fn new(encoding: &'static Encoding) -> Result<Self, EncodingError> {
        if !encoding.is_ascii_compatible() {
            return Err(EncodingError::NotAsciiCompatible(encoding.name()));
        }
        Ok(Self { encoding })
    }

    /// Resolve a WHATWG label such as `utf-8`, `latin1` or `windows-1251`.
    pub fn for_label(label: &str) -> Result<Self, EncodingError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))?;
        Self::new(encoding)
    }

    /// Drop a UTF-8 byte order mark from the first line of a stream.
    pub fn strip_bom<'a>(&self, first_line: &'a [u8]) -> &'a [u8] {
        if self.encoding == UTF_8 {
            first_line.strip_prefix(UTF8_BOM).unwrap_or(first_line)
        } else {
            first_line
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decode one line (terminator already stripped).
    pub fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        self.encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|s| s.into_owned())
            .ok_or(DecodeError::Malformed {
                encoding: self.encoding.name(),
                len: bytes.len(),
            })
    }
}

/// Result of sniffing a target sample.
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub encoding: &'static Encoding,
    pub confident: bool,
}

/// Guess the encoding of `sample`. A byte order mark wins; valid UTF-8
/// (including plain ASCII) is taken as UTF-8; anything else goes through
/// `chardetng`, and a guess it is not confident about is an error rather than
/// a fallback. Encodings a line-oriented reader cannot split are rejected.
pub fn detect_encoding(sample: &[u8]) -> Result<Detection, EncodingError> {
    if sample.is_empty() {
        return Err(EncodingError::EmptySample);
    }
    if let Some((encoding, _)) = Encoding::for_bom(sample) {
        LineDecoder::new(encoding)?;
        return Ok(Detection {
            encoding,
            confident: true,
        });
    }
    if std::str::from_utf8(sample).is_ok() {
        return Ok(Detection {
            encoding: UTF_8,
            confident: true,
        });
    }
    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    let (encoding, confident) = detector.guess_assess(None, true);
    if !confident {
        return Err(EncodingError::Undetermined {
            guess: encoding.name(),
        });
    }
    LineDecoder::new(encoding)?;
    Ok(Detection {
        encoding,
        confident,
    })
}
