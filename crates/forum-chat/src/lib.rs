//! Real-time side of the forum client.
//!
//! Two pieces:
//! - the per-session notification channel over WebSocket
//! - the conversation controller that owns one room's message sequence
//!   and reconciles history, channel events, and local sends

pub mod channel;
pub mod conversation;
pub mod error;

pub use channel::{
    ChannelConfig, ConnectionState, NotificationChannel, NotificationEvent,
    extract_legacy_message_id, notifications_url, parse_notification_frame,
};
pub use conversation::{Conversation, ConversationState, start_conversation};
pub use error::{ChatError, Result};
