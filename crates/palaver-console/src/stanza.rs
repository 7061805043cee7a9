//! Well-formedness check for raw stanzas.
//!
//! `/rawxml` sends user-typed XML straight to the transport. Before that we
//! make sure it parses as one XML document, and pull out what the session
//! needs to decide whether an answer is expected.

use crate::error::StanzaError;

/// What the root element of a stanza says about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StanzaInfo {
    /// Root element name, e.g. `iq`.
    pub name: String,
    /// `type` attribute.
    pub kind: Option<String>,
    /// `id` attribute.
    pub id: Option<String>,
}

impl StanzaInfo {
    /// True for `iq` stanzas of type `get` or `set`, which get exactly one
    /// answer.
    pub fn expects_reply(&self) -> bool {
        self.name == "iq" && matches!(self.kind.as_deref(), Some("get" | "set"))
    }
}

/// Check that `raw` is a well-formed document and describe its root.
///
/// Entities, attribute quoting, duplicate attributes and CDATA sections all
/// follow XML 1.0. Document type declarations are refused.
pub fn check(raw: &str) -> Result<StanzaInfo, StanzaError> {
    if raw.trim().is_empty() {
        return Err(StanzaError::Empty);
    }
    let document =
        roxmltree::Document::parse(raw).map_err(|err| StanzaError::Malformed(err.to_string()))?;
    let root = document.root_element();
    Ok(StanzaInfo {
        name: root.tag_name().name().to_string(),
        kind: root.attribute("type").map(str::to_string),
        id: root.attribute("id").map(str::to_string),
    })
}
