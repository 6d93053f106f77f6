//! Per-session notification channel.

use std::sync::Arc;
use std::time::Duration;

use forum_client_core::Identity;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ChatError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Marker the legacy notification text embeds the message id behind.
const LEGACY_MESSAGE_MARKER: &str = "Message: ";

/// A parsed inbound notification frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotificationEvent {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub notification_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub initiator: Option<Identity>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl NotificationEvent {
    /// Id of the chat message this event announces.
    ///
    /// The structured field wins; older frames only embed the id in the
    /// human-readable text.
    #[must_use]
    pub fn chat_message_id(&self) -> Option<String> {
        if let Some(id) = &self.message_id {
            return Some(id.clone());
        }
        self.message.as_deref().and_then(extract_legacy_message_id)
    }
}

/// Pull the message id out of the legacy notification text
/// (`"Message: <id> was sent by ..."`).
#[must_use]
pub fn extract_legacy_message_id(text: &str) -> Option<String> {
    let (_, rest) = text.split_once(LEGACY_MESSAGE_MARKER)?;
    rest.split_whitespace().next().map(|id| id.to_string())
}

/// Parse one inbound text frame into a notification event.
///
/// Frames that are valid JSON but carry nothing actionable parse to
/// `None`; invalid JSON is an error the read loop drops with a warning.
pub fn parse_notification_frame(text: &str) -> Result<Option<NotificationEvent>> {
    let event: NotificationEvent = serde_json::from_str(text)?;
    if event.notification_id.is_none() && event.message.is_none() && event.message_id.is_none() {
        return Ok(None);
    }
    Ok(Some(event))
}

/// Channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub connect_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Build the per-session channel endpoint from the API base URL.
pub fn notifications_url(base_url: &str, access_token: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" => "ws",
        "wss" => "wss",
        other => {
            return Err(ChatError::InvalidUrl(format!(
                "unsupported scheme: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ChatError::InvalidUrl(base_url.to_string()))?;
    let base_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base_path}/ws/notifications/{access_token}"));
    Ok(url)
}

/// Live notification channel for one session.
///
/// The access token is baked into the endpoint path, so the channel does
/// not survive a token rotation: it never reconnects on its own, and an
/// expired token keeps the current connection but cannot re-establish it.
/// After a successful refresh, build a new channel with
/// [`NotificationChannel::for_session`] and connect that one.
pub struct NotificationChannel {
    url: Url,
    config: ChannelConfig,
    state: Arc<RwLock<ConnectionState>>,
    writer: Arc<Mutex<Option<WsWriter>>>,
    incoming_tx: mpsc::UnboundedSender<NotificationEvent>,
    incoming_rx: Arc<Mutex<mpsc::UnboundedReceiver<NotificationEvent>>>,
    read_task: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl NotificationChannel {
    /// Channel for the current session with default config.
    pub fn for_session(base_url: &str, access_token: &str) -> Result<Self> {
        Self::with_config(base_url, access_token, ChannelConfig::default())
    }

    /// Channel for the current session with custom config.
    pub fn with_config(base_url: &str, access_token: &str, config: ChannelConfig) -> Result<Self> {
        let url = notifications_url(base_url, access_token)?;
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Ok(Self {
            url,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            writer: Arc::new(Mutex::new(None)),
            incoming_tx,
            incoming_rx: Arc::new(Mutex::new(incoming_rx)),
            read_task: Arc::new(Mutex::new(None)),
        })
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Connect and start the background read loop.
    pub async fn connect(&self) -> Result<()> {
        let mut state_guard = self.state.write().await;
        if *state_guard == ConnectionState::Connected {
            return Err(ChatError::AlreadyConnected);
        }
        *state_guard = ConnectionState::Connecting;
        drop(state_guard);

        let connected = match timeout(
            self.config.connect_timeout,
            connect_async(self.url.as_str()),
        )
        .await
        {
            Ok(Ok(pair)) => pair,
            Ok(Err(error)) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ChatError::WebSocket(error.to_string()));
            }
            Err(_) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ChatError::Timeout(format!(
                    "connection timeout after {:?}",
                    self.config.connect_timeout
                )));
            }
        };

        let (stream, _response) = connected;
        let (writer, mut reader) = stream.split();
        *self.writer.lock().await = Some(writer);
        *self.state.write().await = ConnectionState::Connected;

        let incoming_tx = self.incoming_tx.clone();
        let state = Arc::clone(&self.state);
        let writer_handle = Arc::clone(&self.writer);

        let task = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match parse_notification_frame(text.as_str()) {
                        Ok(Some(event)) => {
                            if let Some(notification_id) = event.notification_id.clone() {
                                acknowledge(&writer_handle, &notification_id).await;
                            }
                            if incoming_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(error) => {
                            warn!(%error, "dropping unparsable notification frame");
                        }
                    },
                    Ok(WsMessage::Ping(payload)) => {
                        debug!(bytes = payload.len(), "notification channel ping");
                    }
                    Ok(WsMessage::Pong(_)) => {}
                    Ok(WsMessage::Close(_)) => break,
                    Ok(WsMessage::Binary(_)) => {}
                    Ok(WsMessage::Frame(_)) => {}
                    Err(error) => {
                        warn!(%error, "notification channel read error");
                        break;
                    }
                }
            }

            *state.write().await = ConnectionState::Disconnected;
        });

        *self.read_task.lock().await = Some(task);
        Ok(())
    }

    /// Close the channel and stop the read loop. No further events are
    /// produced; events already queued can still be drained.
    pub async fn close(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(error) = writer.send(WsMessage::Close(None)).await {
                debug!(%error, "close frame not delivered");
            }
        }
        if let Some(task) = self.read_task.lock().await.take() {
            task.abort();
        }
        *self.state.write().await = ConnectionState::Disconnected;
        Ok(())
    }

    /// Next parsed notification from the live channel.
    pub async fn recv(&self) -> Option<NotificationEvent> {
        self.incoming_rx.lock().await.recv().await
    }
}

// Every delivered notification gets an ack so the backend stops
// redelivering it. Best effort: a failed ack only logs.
async fn acknowledge(writer: &Arc<Mutex<Option<WsWriter>>>, notification_id: &str) {
    let payload = json!({
        "type": "notification_ack",
        "notification_id": notification_id,
    })
    .to_string();
    let mut guard = writer.lock().await;
    let Some(writer) = guard.as_mut() else {
        return;
    };
    if let Err(error) = writer.send(WsMessage::Text(payload.into())).await {
        warn!(%error, "failed to acknowledge notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_message_id_wins_over_legacy_text() {
        let event = NotificationEvent {
            kind: Some("notification".to_string()),
            notification_id: Some("n1".to_string()),
            message: Some("Message: legacy-id was sent by investor with id 3".to_string()),
            message_id: Some("structured-id".to_string()),
            initiator: None,
            created_at: None,
        };
        assert_eq!(event.chat_message_id().as_deref(), Some("structured-id"));
    }

    #[test]
    fn legacy_marker_extraction() {
        assert_eq!(
            extract_legacy_message_id("Message: 66b2aa00 was sent by startup with id 9"),
            Some("66b2aa00".to_string())
        );
        assert_eq!(extract_legacy_message_id("Message: solo-id"), Some("solo-id".to_string()));
        assert_eq!(extract_legacy_message_id("no marker here"), None);
        assert_eq!(extract_legacy_message_id("Message: "), None);
    }

    #[test]
    fn parse_full_frame() {
        let text = serde_json::json!({
            "type": "notification",
            "notification_id": "n1",
            "message": "Message: m9 was sent by investor with id 3",
            "message_id": "m9",
            "initiator": {"user_id": 7, "namespace": "investor", "namespace_id": 3},
            "created_at": "2024-05-01T10:00:00Z",
        })
        .to_string();
        let event = parse_notification_frame(&text)
            .expect("frame parses")
            .expect("frame is actionable");
        assert_eq!(event.notification_id.as_deref(), Some("n1"));
        assert_eq!(event.chat_message_id().as_deref(), Some("m9"));
    }

    #[test]
    fn parse_legacy_frame_without_structured_id() {
        let text = r#"{"message": "Message: m9 was sent by investor with id 3"}"#;
        let event = parse_notification_frame(text)
            .expect("frame parses")
            .expect("frame is actionable");
        assert_eq!(event.message_id, None);
        assert_eq!(event.chat_message_id().as_deref(), Some("m9"));
    }

    #[test]
    fn parse_empty_object_is_not_actionable() {
        assert!(parse_notification_frame("{}").expect("frame parses").is_none());
    }

    #[test]
    fn parse_invalid_json_is_an_error() {
        assert!(parse_notification_frame("Message: m9").is_err());
    }

    #[test]
    fn notifications_url_swaps_schemes_and_appends_the_token() {
        let url = notifications_url("http://localhost:8000", "tok.en.x").expect("ws url");
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/notifications/tok.en.x");

        let url = notifications_url("https://forum.example.com/", "abc").expect("wss url");
        assert_eq!(url.as_str(), "wss://forum.example.com/ws/notifications/abc");
    }

    #[test]
    fn notifications_url_rejects_other_schemes() {
        let result = notifications_url("ftp://forum.example.com", "abc");
        assert!(matches!(result, Err(ChatError::InvalidUrl(_))));
    }
}
