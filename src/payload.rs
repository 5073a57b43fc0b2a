//! Events and wire messages exchanged with the history server

use crate::analysis::AnalysisReport;
use crate::dom::{ElementRef, generate_unique_css_selector, generate_xpath};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Maximum number of characters of element text carried by a selection
pub const MAX_TEXT_CHARS: usize = 100;

/// A selected element, as reported to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSelected {
    pub tag_name: String,

    /// Empty when the element has no id
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub class_name: String,

    pub xpath: String,

    pub css_selector: String,

    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub role: Option<String>,

    /// The analysis report, forwarded untouched
    #[serde(default)]
    pub analysis: serde_json::Value,

    #[serde(default)]
    pub url: String,

    pub timestamp: DateTime<Utc>,
}

impl ElementSelected {
    /// Package an element and its analysis for transport
    pub fn capture(element: ElementRef<'_>, analysis: &AnalysisReport, url: impl Into<String>) -> Self {
        Self {
            tag_name: element.tag_name().to_string(),
            id: element.id().unwrap_or_default().to_string(),
            class_name: element.class_name().unwrap_or_default().to_string(),
            xpath: generate_xpath(element),
            css_selector: generate_unique_css_selector(element),
            attributes: element
                .attributes()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            text: truncate_text(&element.text_content()),
            role: element.role().map(str::to_string),
            analysis: analysis.to_value(),
            url: url.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Collapse whitespace and cut to [`MAX_TEXT_CHARS`] characters
pub fn truncate_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_TEXT_CHARS)
        .collect()
}

/// One stored selection, as served back to viewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: i64,
    pub tag_name: String,
    pub element_id: String,
    pub class_name: String,
    pub url: String,
    pub xpath: String,
    pub css_selector: String,
    pub attributes: serde_json::Value,
    pub element_text: String,
    pub timestamp: String,
    pub full_data: serde_json::Value,
}

/// Messages sent by inspectors to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    ElementSelected(ElementSelected),
}

/// Messages sent by the server to every connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    History(Vec<HistoryRecord>),
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::dom::{DomTree, ElementNode};

    fn form() -> DomTree {
        DomTree::new(
            ElementNode::new("body").with_child(
                ElementNode::new("form").with_child(
                    ElementNode::new("button")
                        .with_attribute("id", "save")
                        .with_attribute("class", "btn primary")
                        .with_attribute("role", "button")
                        .with_attribute("data-testid", "save-button")
                        .with_text("  Save\n   changes  "),
                ),
            ),
        )
    }

    #[test]
    fn test_capture_fields() {
        let tree = form();
        let button = tree.get_element_by_id("save").unwrap();
        let report = Analyzer::new().analyze_element(&tree, Some(button.node_id()));

        let event = ElementSelected::capture(button, &report, "https://example.com/form");

        assert_eq!(event.tag_name, "button");
        assert_eq!(event.id, "save");
        assert_eq!(event.class_name, "btn primary");
        assert_eq!(event.css_selector, "#save");
        assert_eq!(event.xpath, "//*[@id=\"save\"]");
        assert_eq!(event.text, "Save changes");
        assert_eq!(event.role.as_deref(), Some("button"));
        assert_eq!(event.attributes.len(), 4);
        assert_eq!(event.analysis, report.to_value());
    }

    #[test]
    fn test_text_is_capped_on_char_boundaries() {
        let long = "é".repeat(250);
        let cut = truncate_text(&long);
        assert_eq!(cut.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_client_message_wire_format() {
        let tree = form();
        let button = tree.get_element_by_id("save").unwrap();
        let event = ElementSelected::capture(button, &AnalysisReport::empty(), "about:blank");

        let json = serde_json::to_value(ClientMessage::ElementSelected(event.clone())).unwrap();
        assert_eq!(json["type"], "elementSelected");
        assert_eq!(json["data"]["tagName"], "button");
        assert_eq!(json["data"]["cssSelector"], "#save");

        let parsed: ClientMessage = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, ClientMessage::ElementSelected(event));
    }

    #[test]
    fn test_server_error_wire_format() {
        let json = serde_json::to_string(&ServerMessage::Error("bad message".to_string())).unwrap();
        assert_eq!(json, r#"{"type":"error","data":"bad message"}"#);
    }
}
