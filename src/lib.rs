//! # element-inspector
//!
//! Inspect DOM elements in a live page: analyze where they sit in the document,
//! which elements resemble or relate to them, and how to find them again.
//!
//! ## Features
//!
//! - **Structural analysis**: depth, sibling statistics, container and pattern-group signatures
//! - **Similarity and relationships**: repeated siblings, labels, table rows and list items
//! - **Selectors**: CSS path and XPath generation, with uniqueness checks and re-resolution
//! - **History server**: SQLite-backed selection history with WebSocket fan-out (`server` feature)
//! - **Reporter**: WebSocket client with bounded reconnects (`transport` feature)
//!
//! ## Analyzing a snapshot
//!
//! ```rust
//! use element_inspector::{Analyzer, DomTree, ElementNode};
//!
//! let tree = DomTree::new(
//!     ElementNode::new("body").with_child(
//!         ElementNode::new("ul")
//!             .with_child(ElementNode::new("li").with_attribute("class", "item"))
//!             .with_child(ElementNode::new("li").with_attribute("class", "item")),
//!     ),
//! );
//! let item = tree.query_selector("li.item").unwrap().unwrap();
//!
//! let mut analyzer = Analyzer::new();
//! let report = analyzer.analyze_element(&tree, Some(item.node_id()));
//!
//! assert_eq!(report.relationships.len(), 1);
//! assert!(report.structure.unwrap().is_repeating);
//! ```
//!
//! ## Inspecting a live page
//!
//! ```rust,no_run
//! use element_inspector::{BrowserSession, InspectionSession, LaunchOptions};
//!
//! # fn main() -> element_inspector::Result<()> {
//! let browser = BrowserSession::launch(LaunchOptions::default())?;
//! browser.navigate("https://example.com")?;
//! let tree = browser.extract_document()?;
//!
//! let heading = tree
//!     .query_selector("h1")?
//!     .ok_or_else(|| element_inspector::InspectorError::ElementNotFound("h1".into()))?
//!     .node_id();
//!
//! let mut session = InspectionSession::new();
//! session.start()?;
//! let hover = session.hover(&tree, heading)?;
//! println!("{}", hover.label);
//!
//! let selected = session.select(&tree, heading, &browser.current_url()?)?;
//! println!("{}", serde_json::to_string_pretty(&selected)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`dom`]: Document snapshots, element handles, selector matching and generation
//! - [`analysis`]: The analysis engine and its [`Analyzer`] facade
//! - [`session`]: The idle/active inspection state machine
//! - [`payload`]: Selection events and wire messages
//! - [`browser`]: Browser session management and configuration
//! - [`transport`]: WebSocket reporter (requires `transport` feature)
//! - [`server`]: History server (requires `server` feature)
//! - [`error`]: Error types and result aliases

pub mod analysis;
pub mod browser;
pub mod dom;
pub mod error;
pub mod payload;
pub mod session;

#[cfg(feature = "transport")]
pub mod transport;

#[cfg(feature = "server")]
pub mod server;

pub use analysis::{AnalysisReport, Analyzer, AttributeFilter, ElementKind};
pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
pub use dom::{DomTree, ElementNode, ElementRef, NodeId, SelectorPair};
pub use error::{InspectorError, Result};
pub use payload::{ClientMessage, ElementSelected, HistoryRecord, ServerMessage};
pub use session::{Hover, InspectionSession, SessionState};

#[cfg(feature = "transport")]
pub use transport::{ConnectionState, ReconnectPolicy, Reporter};

#[cfg(feature = "server")]
pub use server::{ServerConfig, SqliteHistoryStore};
