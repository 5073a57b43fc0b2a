use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle of the reporter's connection to the history server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Things that happen to a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Dial,
    Established,
    Failed,
    Closed,
}

impl ConnectionState {
    /// The state reached by applying `event`, or `None` if it cannot happen here
    pub fn next(self, event: ConnectionEvent) -> Option<ConnectionState> {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match (self, event) {
            (Disconnected, Dial) => Some(Connecting),
            (Connecting, Established) => Some(Connected),
            (Connecting, Failed) => Some(Disconnected),
            (Connected, Closed | Failed) => Some(Disconnected),
            _ => None,
        }
    }
}

/// Bounded reconnection schedule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Connection attempts before giving up
    pub max_retries: u32,

    /// Base wait between attempts, in milliseconds
    pub delay_ms: u64,

    /// Upper bound of the random extra wait, in milliseconds
    pub jitter_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay_ms: 2000,
            jitter_ms: 250,
        }
    }
}

impl ReconnectPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the attempt budget
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Builder method: set the base delay
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay_ms = delay.as_millis() as u64;
        self
    }

    /// Builder method: set the jitter bound
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter_ms = jitter.as_millis() as u64;
        self
    }

    /// Total attempts a connect call may make; always at least one
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Wait before the next attempt
    pub fn backoff(&self) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        Duration::from_millis(self.delay_ms + jitter)
    }
}
