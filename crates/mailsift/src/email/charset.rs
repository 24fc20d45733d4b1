//! Legacy Cyrillic charset detection for raw messages.
//!
//! Detection is a plain substring scan over the whole payload, not a parse
//! of the declared `charset=` parameter. A message that merely mentions
//! `windows-1251` anywhere (a header, a quoted body) is decoded as such.

use std::borrow::Cow;

use encoding_rs::{Encoding, KOI8_R, WINDOWS_1251};
use log::debug;

use super::error::{EmailError, Result};

const WINDOWS_1251_TOKEN: &[u8] = b"windows-1251";
const KOI8_R_TOKEN: &[u8] = b"koi8-r";

/// Returns the legacy encoding hinted at by `raw`, if any.
///
/// windows-1251 wins when both tokens are present. Matching is
/// case-sensitive.
pub fn detect(raw: &[u8]) -> Option<&'static Encoding> {
    if contains(raw, WINDOWS_1251_TOKEN) {
        Some(WINDOWS_1251)
    } else if contains(raw, KOI8_R_TOKEN) {
        Some(KOI8_R)
    } else {
        None
    }
}

/// Decodes `raw` to UTF-8 when it carries a legacy charset token, otherwise
/// hands the bytes back untouched.
pub fn normalize(raw: &[u8]) -> Result<Cow<'_, [u8]>> {
    let Some(encoding) = detect(raw) else {
        debug!("No legacy charset token found, treating message as UTF-8");
        return Ok(Cow::Borrowed(raw));
    };

    debug!("Found {} token, decoding whole message", encoding.name());
    encoding
        .decode_without_bom_handling_and_without_replacement(raw)
        .map(|text| Cow::Owned(text.into_owned().into_bytes()))
        .ok_or_else(|| {
            EmailError::ParseError(format!("message is not valid {}", encoding.name()))
        })
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
