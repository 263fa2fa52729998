//! Destination file name resolution for downloads saved into a directory.
//!
//! Order of preference:
//! 1. `Content-Disposition: ...; filename*=UTF-8''<percent-encoded>`
//! 2. `Content-Disposition: ...; filename="<name>"`
//! 3. Last non-empty path segment of the (final, post-redirect) URL
//! 4. [`FALLBACK_DOWNLOAD_NAME`]
//!
//! Whatever is picked is reduced to a single safe path component, so a
//! hostile header cannot direct the write outside the destination directory.

use crate::constants::FALLBACK_DOWNLOAD_NAME;
use crate::utils::fs::sanitize_file_name;
use regex::Regex;
use reqwest::Url;

/// Picks the local file name for a response.
pub fn resolve_file_name(content_disposition: Option<&str>, url: &Url) -> String {
    content_disposition
        .and_then(content_disposition_filename)
        .map(|name| sanitize_file_name(&name))
        .filter(|name| !name.is_empty())
        .or_else(|| url_file_name(url))
        .unwrap_or_else(|| FALLBACK_DOWNLOAD_NAME.to_string())
}

/// Extracts the file name from a `Content-Disposition` header value.
///
/// The extended `filename*` parameter wins over the plain one.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    if let Ok(extended) = Regex::new(r#"(?i)(?:^|;)\s*filename\*\s*=\s*"?([^';"]*)'[^']*'([^;"]+)"?"#)
        && let Some(caps) = extended.captures(header)
    {
        let charset = caps.get(1).map_or("", |m| m.as_str());
        let raw = caps.get(2).map_or("", |m| m.as_str()).trim();
        let decoded = percent_decode(raw);
        let name = if charset.eq_ignore_ascii_case("utf-8") || charset.is_empty() {
            String::from_utf8_lossy(&decoded).into_owned()
        } else {
            decoded.iter().map(|&b| char::from(b)).collect()
        };
        if !name.is_empty() {
            return Some(name);
        }
    }

    let plain = Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*(?:"((?:[^"\\]|\\.)*)"|([^;]+))"#).ok()?;
    let caps = plain.captures(header)?;
    let name = match (caps.get(1), caps.get(2)) {
        (Some(quoted), _) => quoted.as_str().replace("\\\"", "\"").replace("\\\\", "\\"),
        (None, Some(token)) => token.as_str().trim().to_string(),
        (None, None) => return None,
    };
    (!name.is_empty()).then_some(name)
}

fn url_file_name(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    let decoded = String::from_utf8_lossy(&percent_decode(segment)).into_owned();
    let name = sanitize_file_name(&decoded);
    (!name.is_empty()).then_some(name)
}

fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2]))
        {
            out.push(hi << 4 | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    char::from(byte).to_digit(16).map(|d| d as u8)
}
