use crate::error::{InspectorError, Result};
use crate::payload::{ClientMessage, ElementSelected, ServerMessage};
use crate::transport::state::{ConnectionEvent, ConnectionState, ReconnectPolicy};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client that forwards selections to the history server
pub struct Reporter {
    url: String,
    policy: ReconnectPolicy,
    state: ConnectionState,
    failed_attempts: u32,
    socket: Option<WsStream>,
}

impl Reporter {
    /// Create a disconnected reporter for `url` (e.g. `ws://localhost:3000/ws`)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            policy: ReconnectPolicy::default(),
            state: ConnectionState::Disconnected,
            failed_attempts: 0,
            socket: None,
        }
    }

    /// Builder method: replace the reconnect policy
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Failed attempts made by the most recent connect
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    fn apply(&mut self, event: ConnectionEvent) {
        match self.state.next(event) {
            Some(next) => {
                log::trace!("Connection {:?} -> {:?} on {:?}", self.state, next, event);
                self.state = next;
            }
            None => log::warn!("Ignoring {:?} while {:?}", event, self.state),
        }
    }

    /// Connect, retrying per the policy. A no-op when already connected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        self.failed_attempts = 0;
        let attempts = self.policy.attempts();

        while self.failed_attempts < attempts {
            self.apply(ConnectionEvent::Dial);
            match tokio_tungstenite::connect_async(self.url.as_str()).await {
                Ok((socket, _)) => {
                    self.socket = Some(socket);
                    self.apply(ConnectionEvent::Established);
                    log::info!("Connected to {}", self.url);
                    return Ok(());
                }
                Err(e) => {
                    self.apply(ConnectionEvent::Failed);
                    self.failed_attempts += 1;
                    log::warn!(
                        "Connection to {} failed ({}/{}): {}",
                        self.url,
                        self.failed_attempts,
                        attempts,
                        e
                    );
                    if self.failed_attempts < attempts {
                        tokio::time::sleep(self.policy.backoff()).await;
                    }
                }
            }
        }

        Err(InspectorError::RetriesExhausted {
            url: self.url.clone(),
            attempts,
        })
    }

    /// Send a selection. A failed send triggers one reconnect and one resend.
    pub async fn report(&mut self, event: &ElementSelected) -> Result<()> {
        self.send(&ClientMessage::ElementSelected(event.clone())).await
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.connect().await?;

        match self.send_text(&json).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("Send to {} failed, reconnecting: {}", self.url, e);
                self.drop_socket();
                self.connect().await?;
                self.send_text(&json).await
            }
        }
    }

    async fn send_text(&mut self, json: &str) -> Result<()> {
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| InspectorError::Transport("not connected".to_string()))?;
        socket
            .send(Message::Text(json.to_string().into()))
            .await
            .map_err(|e| InspectorError::Transport(e.to_string()))
    }

    /// Wait for the next message from the server; `None` once the server hangs up
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>> {
        loop {
            let Some(socket) = self.socket.as_mut() else {
                return Ok(None);
            };

            match socket.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(serde_json::from_str(&text)?)),
                Some(Ok(Message::Close(_))) | None => {
                    self.drop_socket();
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.drop_socket();
                    return Err(InspectorError::Transport(e.to_string()));
                }
            }
        }
    }

    /// Close the connection gracefully
    pub async fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None).await {
                log::debug!("Error while closing {}: {}", self.url, e);
            }
            self.apply(ConnectionEvent::Closed);
        }
    }

    fn drop_socket(&mut self) {
        if self.socket.take().is_some() {
            self.apply(ConnectionEvent::Closed);
        }
    }
}
