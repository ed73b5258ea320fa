//! Text extraction — best-effort plain-text body from a fetched message.
//!
//! Preference order for structured payloads:
//! 1. first `text/plain` part with content
//! 2. first `text/html` part with content
//! 3. the payload's own body
//!
//! Parts are scanned in document order, descending one level into
//! container parts. Extraction never fails; malformed content yields `""`.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::warn;

use crate::mailbox::{Message, MessagePart, Payload};

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

/// Standard alphabet, padding optional.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// URL-safe alphabet (what Gmail emits), padding optional.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Content decoding failure. Recovered locally as an empty body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decode base64 content into text with CRLF normalized to LF.
///
/// Accepts both the standard and URL-safe alphabets, with or without
/// padding. Embedded whitespace is ignored. Invalid UTF-8 sequences are
/// replaced rather than rejected.
pub fn decode_base64(data: &str) -> Result<String, DecodeError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let engine = if compact.contains(['-', '_']) {
        &URL_SAFE_LENIENT
    } else {
        &STANDARD_LENIENT
    };
    let bytes = engine.decode(compact.as_bytes())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}

/// Extract the readable body of a message.
pub fn extract_text(msg: &Message) -> String {
    match &msg.payload {
        Payload::Raw(text) => text.clone(),
        Payload::Structured(root) => extract_structured(&msg.id, root),
    }
}

fn extract_structured(id: &str, root: &MessagePart) -> String {
    let data = find_part(root, "text/plain")
        .or_else(|| find_part(root, "text/html"))
        .or_else(|| root.data());

    let Some(data) = data else {
        return String::new();
    };

    match decode_base64(data) {
        Ok(text) => text,
        Err(e) => {
            warn!(id = %id, error = %e, "Failed to decode message body");
            String::new()
        }
    }
}

/// First part of `mime_type` carrying content, searching one level deep.
fn find_part<'a>(root: &'a MessagePart, mime_type: &str) -> Option<&'a str> {
    root.parts
        .iter()
        .flat_map(|part| std::iter::once(part).chain(part.parts.iter()))
        .filter(|part| part.mime_type.eq_ignore_ascii_case(mime_type))
        .find_map(MessagePart::data)
}
