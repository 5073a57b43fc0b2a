//! DOM snapshot and navigation module
//!
//! This module provides the document model the analysis engine reads:
//! - ElementNode: Serializable snapshot of an element and its subtree
//! - DomTree: Arena-backed document with stable element handles
//! - Selector: CSS subset matcher used for lookups and uniqueness checks
//! - SelectorPair: Generated CSS path and XPath for one element

pub mod element;
pub mod query;
pub mod selector;
pub mod tree;

pub use element::{BoundingBox, ElementNode};
pub use query::{Selector, escape_identifier};
pub use selector::{SelectorPair, generate_css_selector, generate_unique_css_selector, generate_xpath, resolve_xpath};
pub use tree::{DocumentId, DomTree, ElementRef, NodeId};

use crate::error::Result;
use headless_chrome::Tab;
use std::sync::Arc;

/// Extract the DOM tree from a browser tab
pub fn extract_dom(tab: &Arc<Tab>) -> Result<DomTree> {
    DomTree::from_tab(tab)
}

/// Load a DOM tree from a JSON snapshot, dropping non-rendered elements
pub fn load_snapshot(json: &str) -> Result<DomTree> {
    let mut root: ElementNode = serde_json::from_str(json)?;
    root.simplify();
    Ok(DomTree::new(root))
}
