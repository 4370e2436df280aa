//! Outer container: the `projectData` property list of a project bundle.
//!
//! The payload the decoder works on is the base64 `<data>` element that
//! follows `<key>NS.data</key>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use roxmltree::{Document, ParsingOptions};
use std::fs;
use std::path::Path;

use crate::ExtractError;

/// File inside a `.band` bundle that holds the archived project.
pub const PROJECT_DATA_FILE: &str = "projectData";

const BINARY_PLIST_MAGIC: &[u8] = b"bplist";

/// Extract and decode the `NS.data` payload from an XML property list.
pub fn unwrap_plist(xml: &str) -> Result<Vec<u8>, ExtractError> {
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    let doc = Document::parse_with_options(xml, options)?;
    let data = doc
        .descendants()
        .filter(|n| n.has_tag_name("key") && n.text().map(str::trim) == Some("NS.data"))
        .find_map(|key| key.next_sibling_element().filter(|n| n.has_tag_name("data")))
        .ok_or(ExtractError::MissingData)?;

    let encoded: String = data
        .text()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let payload = STANDARD.decode(encoded)?;
    log::debug!("[GB] NS.data payload is {} bytes", payload.len());
    Ok(payload)
}

/// Read a payload from `path`.
///
/// A directory is treated as a `.band` bundle and its `projectData` is
/// unwrapped. A file is unwrapped as a property list unless `raw` is set, in
/// which case it already holds the decoded payload.
pub fn load_payload(path: &Path, raw: bool) -> Result<Vec<u8>, ExtractError> {
    let file = if path.is_dir() {
        path.join(PROJECT_DATA_FILE)
    } else {
        path.to_path_buf()
    };
    let bytes = fs::read(&file).map_err(|source| ExtractError::Read {
        path: file.clone(),
        source,
    })?;
    if raw && !path.is_dir() {
        return Ok(bytes);
    }
    if bytes.starts_with(BINARY_PLIST_MAGIC) {
        return Err(ExtractError::BinaryPlist(file));
    }
    let xml = std::str::from_utf8(&bytes).map_err(|_| ExtractError::NotXml(file.clone()))?;
    unwrap_plist(xml)
}
