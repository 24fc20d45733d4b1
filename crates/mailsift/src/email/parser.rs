//! Message parsing and attachment extraction.

use log::{debug, warn};
use mail_parser::decoders::base64::base64_decode;
use mail_parser::decoders::quoted_printable::quoted_printable_decode;
use mail_parser::{
    ContentType, Encoding, HeaderValue, Message, MessageParser, MessagePart, MimeHeaders, PartType,
};

use super::error::{EmailError, Result};

/// A named file carried by a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Filename declared by the MIME part.
    pub name: String,
    /// Part payload after transfer decoding, charset untouched.
    pub content: Vec<u8>,
}

/// A decoded message split into headers and body.
pub struct ParsedMessage<'x> {
    message: Message<'x>,
    body: &'x [u8],
}

impl<'x> ParsedMessage<'x> {
    /// Parses an RFC 822 message from already charset-normalized bytes.
    pub fn parse(decoded: &'x [u8]) -> Result<Self> {
        let message = MessageParser::default()
            .parse(decoded)
            .ok_or_else(|| EmailError::ParseError("Failed to parse email message".to_string()))?;

        if message.root_part().headers.is_empty() {
            return Err(EmailError::ParseError(
                "Message has no header block".to_string(),
            ));
        }

        let body = body_start(decoded).map_or(&decoded[decoded.len()..], |at| &decoded[at..]);

        Ok(Self { message, body })
    }

    /// Looks up a top-level header by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&HeaderValue<'x>> {
        self.message
            .root_part()
            .headers
            .iter()
            .find(|h| h.name.as_str().eq_ignore_ascii_case(name))
            .map(|h| &h.value)
    }

    /// Returns true when the top-level header block contains `name`.
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// The parsed top-level `Content-Type`, if present and understood.
    pub fn content_type(&self) -> Option<&ContentType<'_>> {
        self.message.root_part().content_type()
    }

    pub fn subject(&self) -> Option<&str> {
        self.message.subject()
    }

    /// Raw body bytes following the header/body separator.
    pub fn body(&self) -> &[u8] {
        self.body
    }

    /// Collects every part that declares a filename.
    ///
    /// Fails when `Content-Type` is missing or unparseable. Non-multipart
    /// messages, and multipart messages without a boundary, carry no
    /// attachments. A truncated part stream yields whatever parts were
    /// recovered before the damage.
    pub fn extract_attachments(&self) -> Result<Vec<Attachment>> {
        if !self.has_header("Content-Type") {
            return Err(EmailError::ParseError(
                "Missing Content-Type header".to_string(),
            ));
        }

        let content_type = self
            .content_type()
            .filter(|ct| !ct.ctype().trim().is_empty())
            .ok_or_else(|| EmailError::ParseError("Malformed Content-Type header".to_string()))?;

        if !content_type.ctype().eq_ignore_ascii_case("multipart") {
            debug!(
                "Message is {}, not multipart; no attachments",
                media_type(content_type)
            );
            return Ok(Vec::new());
        }

        if content_type
            .attribute("boundary")
            .map_or(true, |b| b.is_empty())
        {
            warn!("Multipart message declares no boundary; no attachments");
            return Ok(Vec::new());
        }

        let mut attachments = Vec::new();

        // Part 0 is the message itself.
        for part in self.message.parts.iter().skip(1) {
            if matches!(part.body, PartType::Multipart(_)) {
                continue;
            }

            // No filename means inline content.
            let Some(name) = part.attachment_name() else {
                continue;
            };

            let content = self.payload(part);
            debug!("Found attachment: {} ({} bytes)", name, content.len());

            attachments.push(Attachment {
                name: name.to_string(),
                content,
            });
        }

        debug!("Extracted {} attachments", attachments.len());
        Ok(attachments)
    }

    /// Transfer-decoded bytes of a leaf part. Text parts are cut from the
    /// raw message instead of using the parser's charset-converted text.
    fn payload(&self, part: &MessagePart<'_>) -> Vec<u8> {
        if !part.is_text() {
            return part.contents().to_vec();
        }

        let range = part.raw_body_offset() as usize..part.raw_end_offset() as usize;
        let Some(raw) = self.message.raw_message().get(range) else {
            warn!("Part offsets out of range, keeping parser output");
            return part.contents().to_vec();
        };

        let decoded = match part.encoding {
            Encoding::Base64 => base64_decode(raw),
            Encoding::QuotedPrintable => quoted_printable_decode(raw),
            Encoding::None => Some(raw.to_vec()),
        };
        decoded.unwrap_or_else(|| {
            warn!("Invalid transfer encoding in text part, storing raw bytes");
            raw.to_vec()
        })
    }
}

fn media_type(ct: &ContentType<'_>) -> String {
    match ct.subtype() {
        Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
        None => ct.ctype().to_string(),
    }
}

/// Offset of the first body byte, after the first empty line.
fn body_start(raw: &[u8]) -> Option<usize> {
    let crlf = find(raw, b"\r\n\r\n").map(|at| at + 4);
    let lf = find(raw, b"\n\n").map(|at| at + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
