//! Simulated document loading.
//!
//! Navigation here never touches the network: the "document" is derived
//! from the URL itself. `data:` URLs carry their markup inline, which is
//! enough to model title and favicon resolution deterministically.

use percent_encoding::percent_decode_str;
use url::{Origin, Url};

use crate::errors::TabhubError;

/// Result of a completed (simulated) navigation
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct LoadedDocument {
    /// The caller-supplied URL, verbatim
    pub url: String,
    pub title: String,
    pub favicon: Option<String>,
}

/// Reject URLs the url crate cannot parse
pub(crate) fn validate(url: &str) -> Result<(), TabhubError> {
    Url::parse(url).map(|_| ()).map_err(|e| TabhubError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Load the document a URL denotes and derive its title and favicon
pub(crate) fn load(url: &str) -> Result<LoadedDocument, TabhubError> {
    let parsed = Url::parse(url).map_err(|e| TabhubError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let title = match parsed.scheme() {
        "data" => data_url_title(parsed.path()),
        "about" => parsed.path().to_string(),
        _ => parsed
            .host_str()
            .map(str::to_string)
            .unwrap_or_else(|| url.to_string()),
    };

    // Only origin-bearing schemes get the conventional /favicon.ico
    let favicon = match parsed.origin() {
        origin @ Origin::Tuple(..) => {
            Some(format!("{}/favicon.ico", origin.ascii_serialization()))
        }
        Origin::Opaque(_) => None,
    };

    Ok(LoadedDocument {
        url: url.to_string(),
        title,
        favicon,
    })
}

/// Title of an inline `data:` document: the content of the first `<title>`
/// element if present, otherwise the tag-stripped body text
fn data_url_title(path: &str) -> String {
    let body = match path.split_once(',') {
        Some((_media_type, body)) => body,
        // Malformed data URL with no comma; treat the whole path as body
        None => path,
    };
    let decoded = percent_decode_str(body).decode_utf8_lossy();
    match title_element(&decoded) {
        Some(title) => title,
        None => strip_tags(&decoded),
    }
}

/// Extract the content of the first `<title>...</title>`, case-insensitive
fn title_element(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let content_start = open + lower[open..].find('>')? + 1;
    let content_end = content_start + lower[content_start..].find("</title")?;
    Some(html[content_start..content_end].trim().to_string())
}

/// Drop markup, collapse whitespace
fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "navigation_test.rs"]
mod navigation_test;
