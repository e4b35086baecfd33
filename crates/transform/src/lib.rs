//! Content sniffing and XML-to-JSON conversion.
//!
//! Text payloads that look like XML are converted to an equivalent nested
//! JSON document before publishing. Attributes are dropped, XML declarations
//! and comments are ignored, and a malformed document degrades into a JSON
//! error envelope instead of failing the publish.

mod xml;

pub use xml::xml_to_json;

/// Errors produced while converting an XML payload.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("invalid xml: {0}")]
    Xml(String),

    #[error("no root element")]
    NoRoot,
}

/// Returns `true` if the payload should be treated as XML.
///
/// Best-effort heuristic: the first non-whitespace character is `<`.
/// Producers that know their content type should say so instead of relying
/// on this sniff.
pub fn looks_like_xml(content: &str) -> bool {
    content.trim_start().starts_with('<')
}

/// Prepares a text payload for publishing.
///
/// XML-looking content is converted to its JSON representation; everything
/// else passes through unchanged. A parse failure yields an error-describing
/// JSON document rather than an `Err`, so publishing always proceeds with
/// some payload.
pub fn prepare_content(content: &str) -> String {
    if !looks_like_xml(content) {
        return content.to_owned();
    }
    match xml_to_json(content) {
        Ok(value) => value.to_string(),
        Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
    }
}
