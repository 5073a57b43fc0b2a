//! Browser session management
//!
//! The browser only supplies documents to inspect: launch or attach to
//! Chrome, navigate, and snapshot the page into a [`DomTree`](crate::dom::DomTree).

pub mod config;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use session::BrowserSession;
