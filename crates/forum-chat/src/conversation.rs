//! Conversation controller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use forum_api_client::{ApiClient, Message, Room, SendMessageRequest};
use forum_client_core::{Identity, NamespaceKind};
use tracing::{debug, warn};

use crate::channel::{NotificationChannel, NotificationEvent};
use crate::error::{ChatError, Result};

/// Lifecycle of one open conversation view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Closed,
    Loading,
    Idle,
    Sending,
}

struct Inner {
    state: ConversationState,
    messages: Vec<Message>,
    last_send_failure: Option<String>,
}

/// One chat room's view state: the ordered message sequence plus the
/// `Closed → Loading → Idle ⇄ Sending` machine around it.
///
/// The sequence is append-only. History load, channel-triggered fetches,
/// and local sends may complete in any order; every completion appends
/// and re-checks that the conversation is still open, so results arriving
/// after [`Conversation::close`] are discarded instead of applied.
/// Duplicate delivery is not de-duplicated: a sent message may appear
/// once from the 201 response and once more via the channel.
pub struct Conversation {
    room_id: String,
    api: Arc<ApiClient>,
    inner: Mutex<Inner>,
}

impl Conversation {
    pub fn new(api: Arc<ApiClient>, room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            api,
            inner: Mutex::new(Inner {
                state: ConversationState::Closed,
                messages: Vec::new(),
                last_send_failure: None,
            }),
        }
    }

    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    #[must_use]
    pub fn state(&self) -> ConversationState {
        self.lock().state
    }

    /// Snapshot of the message sequence in arrival order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    #[must_use]
    pub fn last_send_failure(&self) -> Option<String> {
        self.lock().last_send_failure.clone()
    }

    /// Open the conversation and load its history.
    ///
    /// A failed history fetch is not fatal: the conversation comes up idle
    /// with an empty sequence and stays usable for new messages.
    pub async fn open(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.state != ConversationState::Closed {
                return Err(ChatError::AlreadyOpen);
            }
            inner.state = ConversationState::Loading;
        }

        match self.api.conversation_messages(&self.room_id).await {
            Ok(history) => {
                let mut inner = self.lock();
                if inner.state == ConversationState::Closed {
                    debug!(room = %self.room_id, "history arrived after close; discarding");
                    return Ok(());
                }
                inner.messages.extend(history);
                if inner.state == ConversationState::Loading {
                    inner.state = ConversationState::Idle;
                }
            }
            Err(error) => {
                warn!(room = %self.room_id, %error, "history fetch failed; starting empty");
                let mut inner = self.lock();
                if inner.state == ConversationState::Loading {
                    inner.state = ConversationState::Idle;
                }
            }
        }
        Ok(())
    }

    /// Apply one channel event: fetch the announced message and append it.
    ///
    /// Events without a resolvable message id and events for a closed
    /// conversation are dropped.
    pub async fn handle_notification(&self, event: &NotificationEvent) -> Result<()> {
        if self.state() == ConversationState::Closed {
            return Ok(());
        }
        let Some(message_id) = event.chat_message_id() else {
            debug!(room = %self.room_id, "notification without a message id");
            return Ok(());
        };
        let message = self.api.message(&message_id).await?;

        let mut inner = self.lock();
        if inner.state == ConversationState::Closed {
            debug!(
                room = %self.room_id,
                message = %message_id,
                "message arrived after close; discarding"
            );
            return Ok(());
        }
        inner.messages.push(message);
        Ok(())
    }

    /// Send a message as the current identity.
    ///
    /// Rejected locally, with no network traffic, when no identity is
    /// available or another send is still in flight.
    pub async fn send(&self, content: impl Into<String>) -> Result<Message> {
        let author = self
            .api
            .session()
            .current_identity()
            .ok_or(ChatError::NoIdentity)?;

        {
            let mut inner = self.lock();
            match inner.state {
                ConversationState::Closed => return Err(ChatError::Closed),
                ConversationState::Sending => return Err(ChatError::SendInFlight),
                ConversationState::Loading | ConversationState::Idle => {}
            }
            inner.state = ConversationState::Sending;
            inner.last_send_failure = None;
        }

        let request = SendMessageRequest {
            room: self.room_id.clone(),
            author,
            content: content.into(),
        };
        let result = self.api.send_message(&request).await;

        let mut inner = self.lock();
        if inner.state == ConversationState::Sending {
            inner.state = ConversationState::Idle;
        }
        match result {
            Ok(message) => {
                if inner.state == ConversationState::Closed {
                    debug!(room = %self.room_id, "send completed after close; discarding");
                    return Err(ChatError::Closed);
                }
                inner.messages.push(message.clone());
                Ok(message)
            }
            Err(error) => {
                inner.last_send_failure = Some(error.to_string());
                Err(ChatError::Api(error))
            }
        }
    }

    /// Drain channel events into this conversation until it closes.
    pub async fn pump(&self, channel: &NotificationChannel) {
        while let Some(event) = channel.recv().await {
            if self.state() == ConversationState::Closed {
                break;
            }
            if let Err(error) = self.handle_notification(&event).await {
                warn!(room = %self.room_id, %error, "failed to apply notification");
            }
        }
    }

    /// Close the view. The in-memory sequence is discarded and any late
    /// results are ignored.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.state = ConversationState::Closed;
        inner.messages.clear();
        inner.last_send_failure = None;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a room with a startup and send the opening message.
///
/// Initiating a chat is an investor-side action; the backend enforces it
/// and we reject locally before any network call.
pub async fn start_conversation(
    api: &ApiClient,
    startup: Identity,
    content: impl Into<String>,
) -> Result<Room> {
    let author = api
        .session()
        .current_identity()
        .ok_or(ChatError::NoIdentity)?;
    if author.namespace != NamespaceKind::Investor {
        return Err(ChatError::NotInvestor);
    }
    let room = api.create_conversation([author, startup]).await?;
    let request = SendMessageRequest {
        room: room.id.clone(),
        author,
        content: content.into(),
    };
    api.send_message(&request).await?;
    Ok(room)
}
