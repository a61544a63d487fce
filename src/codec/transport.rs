//! Wire string framing (codec layer 2).
//!
//! The printed value tree is base64 encoded (standard alphabet, `=` padding)
//! and framed as `LAZYBARS:v<version>:<base64>`.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::constants::{EXPORT_PREFIX, EXPORT_VERSION, MAX_EXPORT_LEN};
use crate::error::{LayoutError, LayoutResult};

/// Frames value tree text as an export string.
#[must_use]
pub fn encode_wire(text: &str) -> String {
    format!(
        "{EXPORT_PREFIX}:v{EXPORT_VERSION}:{}",
        STANDARD.encode(text.as_bytes())
    )
}

/// Unframes an export string back into value tree text.
///
/// Surrounding whitespace and line breaks inside the encoded body (as left
/// by chat clients and mail) are ignored.
pub fn decode_wire(input: &str) -> LayoutResult<String> {
    let input = input.trim();
    if input.len() > MAX_EXPORT_LEN {
        return Err(LayoutError::decode(format!(
            "export string is {} bytes, the limit is {MAX_EXPORT_LEN}",
            input.len()
        )));
    }

    let rest = input
        .strip_prefix(EXPORT_PREFIX)
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or_else(|| LayoutError::decode(format!("missing '{EXPORT_PREFIX}:' prefix")))?;

    let (version, body) = rest
        .split_once(':')
        .ok_or_else(|| LayoutError::decode("missing version field"))?;
    let version = parse_version(version)?;
    if version > EXPORT_VERSION {
        return Err(LayoutError::VersionUnsupported {
            found: version,
            supported: EXPORT_VERSION,
        });
    }

    let body: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if body.is_empty() {
        return Err(LayoutError::decode("export string has no content"));
    }
    let bytes = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| LayoutError::decode(format!("invalid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|_| LayoutError::decode("decoded content is not UTF-8"))
}

/// Parses `v<digits>`; version 0 is never valid.
fn parse_version(field: &str) -> LayoutResult<u32> {
    let digits = field
        .strip_prefix('v')
        .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| LayoutError::decode(format!("invalid version field '{field}'")))?;
    match digits.parse::<u32>() {
        Ok(0) => Err(LayoutError::decode("version 0 is not valid")),
        Ok(version) => Ok(version),
        // More digits than fit: certainly newer than anything supported
        Err(_) => Err(LayoutError::VersionUnsupported {
            found: u32::MAX,
            supported: EXPORT_VERSION,
        }),
    }
}
