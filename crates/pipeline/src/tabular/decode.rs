//! Ordered text decoding for CSV sources.
//!
//! Encodings are tried in the configured order and the first that accepts the
//! bytes wins. Every attempt yields a tagged outcome so a total failure can
//! report what each encoding said.

use cairn_core::{Error, TextEncoding};

const UNDEFINED_1252: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Outcome of decoding with a single encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Decoded(String),
    Rejected { encoding: TextEncoding, reason: String },
}

/// Decode `bytes` with one encoding.
pub fn attempt(bytes: &[u8], encoding: TextEncoding) -> Attempt {
    let rejected = |reason: String| Attempt::Rejected { encoding, reason };
    match encoding {
        TextEncoding::Utf8 => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            match std::str::from_utf8(bytes) {
                Ok(text) => Attempt::Decoded(text.to_string()),
                Err(e) => rejected(e.to_string()),
            }
        }
        // Every byte maps to the code point of the same value.
        TextEncoding::Latin1 => Attempt::Decoded(bytes.iter().map(|&b| char::from(b)).collect()),
        TextEncoding::Windows1252 => {
            // The WHATWG table maps these to C1 controls; the code page leaves them undefined.
            if let Some(pos) = bytes.iter().position(|b| UNDEFINED_1252.contains(b)) {
                return rejected(format!("byte 0x{:02x} at position {pos} is undefined", bytes[pos]));
            }
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            Attempt::Decoded(text.into_owned())
        }
    }
}

/// Decode with the first encoding in `order` that accepts `bytes`.
pub fn decode_text(bytes: &[u8], order: &[TextEncoding]) -> Result<(String, TextEncoding), Error> {
    let mut rejections = Vec::with_capacity(order.len());
    for &encoding in order {
        match attempt(bytes, encoding) {
            Attempt::Decoded(text) => {
                if !rejections.is_empty() {
                    tracing::debug!(encoding = encoding.label(), rejected = ?rejections, "decoded after fallback");
                }
                return Ok((text, encoding));
            }
            Attempt::Rejected { encoding, reason } => rejections.push(format!("{}: {reason}", encoding.label())),
        }
    }

    if rejections.is_empty() {
        return Err(Error::UndecodableText("no encodings configured".to_string()));
    }
    Err(Error::UndecodableText(rejections.join("; ")))
}
