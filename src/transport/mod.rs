//! Client side of the history server protocol
//!
//! The [`Reporter`] owns one WebSocket connection with an explicit
//! [`ConnectionState`] and a bounded [`ReconnectPolicy`].

pub mod reporter;
pub mod state;

pub use reporter::Reporter;
pub use state::{ConnectionEvent, ConnectionState, ReconnectPolicy};
