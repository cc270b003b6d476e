//! Capture decoding: raw capture file → markup text.
//!
//! Gzipped captures (`*.gz`) are inflated first. The bytes are then read as
//! UTF-8, falling back to an escape-aware Latin-1 decoding: every byte is
//! one code point and backslash escapes (`\n`, `\xHH`, `\uHHHH`, …) are
//! resolved. A malformed escape makes the fallback fail, and the capture is
//! reported as undecodable.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::{debug, trace};

use sitecorpus_shared::{Result, SiteCorpusError};

/// Outcome of decoding one capture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Markup text, possibly empty.
    Text(String),
    /// No decoding attempt succeeded.
    Undecodable,
}

/// Read and decode a capture file.
///
/// I/O errors opening or reading the file propagate; decoding problems
/// (corrupt gzip stream, invalid text) yield [`Decoded::Undecodable`].
pub fn read_markup(path: &Path) -> Result<Decoded> {
    let raw = std::fs::read(path).map_err(|e| SiteCorpusError::io(path, e))?;

    let is_gzip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    let bytes = if is_gzip {
        let mut inflated = Vec::new();
        if let Err(e) = GzDecoder::new(raw.as_slice()).read_to_end(&mut inflated) {
            debug!(path = %path.display(), error = %e, "gzip stream could not be inflated");
            return Ok(Decoded::Undecodable);
        }
        inflated
    } else {
        raw
    };

    Ok(decode_bytes(bytes))
}

/// UTF-8 first, escape-aware Latin-1 second.
pub fn decode_bytes(bytes: Vec<u8>) -> Decoded {
    match String::from_utf8(bytes) {
        Ok(text) => Decoded::Text(text),
        Err(e) => {
            trace!(valid_up_to = e.utf8_error().valid_up_to(), "not utf-8, trying fallback");
            match decode_escaped_latin1(e.as_bytes()) {
                Some(text) => Decoded::Text(text),
                None => Decoded::Undecodable,
            }
        }
    }
}

/// Decode bytes as Latin-1 while resolving backslash escapes.
/// Returns `None` on a malformed or truncated escape.
fn decode_escaped_latin1(bytes: &[u8]) -> Option<String> {
    let mut out = String::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied().peekable();

    while let Some(byte) = iter.next() {
        if byte != b'\\' {
            out.push(char::from(byte));
            continue;
        }

        let escaped = match iter.next()? {
            b'\n' => continue,
            b'\\' => '\\',
            b'\'' => '\'',
            b'"' => '"',
            b'a' => '\u{07}',
            b'b' => '\u{08}',
            b'f' => '\u{0C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'v' => '\u{0B}',
            b'x' => hex_char(&mut iter, 2)?,
            b'u' => hex_char(&mut iter, 4)?,
            b'U' => hex_char(&mut iter, 8)?,
            octal @ b'0'..=b'7' => octal_char(octal, &mut iter)?,
            other => {
                // Unknown escapes are kept verbatim.
                out.push('\\');
                char::from(other)
            }
        };
        out.push(escaped);
    }

    Some(out)
}

fn hex_char(iter: &mut impl Iterator<Item = u8>, digits: usize) -> Option<char> {
    let mut value = 0u32;
    for _ in 0..digits {
        let digit = char::from(iter.next()?).to_digit(16)?;
        value = value * 16 + digit;
    }
    char::from_u32(value)
}

fn octal_char(first: u8, iter: &mut std::iter::Peekable<impl Iterator<Item = u8>>) -> Option<char> {
    let mut value = u32::from(first - b'0');
    for _ in 0..2 {
        match iter.peek() {
            Some(&(d @ b'0'..=b'7')) => {
                value = value * 8 + u32::from(d - b'0');
                iter.next();
            }
            _ => break,
        }
    }
    char::from_u32(value)
}
