//! Wire types for the forum REST API.

use chrono::{DateTime, Utc};
use forum_client_core::{Identity, NamespaceKind};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub email: String,
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Read-only catalog entry from the startups listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Startup {
    pub startup_id: i64,
    pub user: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InvestorCabinet {
    pub investor_id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartupCabinet {
    pub startup_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectNamespaceRequest {
    pub name_space_id: i64,
    pub name_space_name: NamespaceKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateConversationRequest {
    pub participants: Vec<Identity>,
}

/// A conversation between exactly the participants fixed at creation.
///
/// The create endpoint labels the id `conversation_id`; listings have used
/// both `id` and the raw `_id` object-id shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Room {
    #[serde(
        alias = "_id",
        alias = "conversation_id",
        deserialize_with = "object_id"
    )]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub participants: Vec<Identity>,
}

/// One chat message. Append-only per room; ordering is server-assigned
/// arrival order.
///
/// `room` and `author` are lenient because historical send responses
/// echoed only a subset of the stored document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    #[serde(alias = "_id", deserialize_with = "object_id")]
    pub id: String,
    #[serde(default, deserialize_with = "optional_object_id")]
    pub room: Option<String>,
    #[serde(default)]
    pub author: Option<Identity>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub room: String,
    pub author: Identity,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notification {
    #[serde(alias = "_id", deserialize_with = "object_id")]
    pub id: String,
    pub initiator: Identity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
}

// Ids arrive either as plain strings or in the mongo extended-JSON shape
// {"$oid": "..."}.
#[derive(Deserialize)]
#[serde(untagged)]
enum ObjectIdRepr {
    Plain(String),
    Extended {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

impl From<ObjectIdRepr> for String {
    fn from(repr: ObjectIdRepr) -> Self {
        match repr {
            ObjectIdRepr::Plain(id) => id,
            ObjectIdRepr::Extended { oid } => oid,
        }
    }
}

fn object_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    ObjectIdRepr::deserialize(deserializer).map(String::from)
}

fn optional_object_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ObjectIdRepr>::deserialize(deserializer).map(|value| value.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_decodes_plain_ids() {
        let message: Message = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "room": "r1",
            "author": {"user_id": 7, "namespace": "investor", "namespace_id": 3},
            "content": "hi",
        }))
        .expect("message decodes");
        assert_eq!(message.id, "m1");
        assert_eq!(message.room.as_deref(), Some("r1"));
        assert_eq!(message.content, "hi");
    }

    #[test]
    fn message_decodes_extended_object_ids() {
        let message: Message = serde_json::from_value(serde_json::json!({
            "_id": {"$oid": "66b2aa00"},
            "room": {"$oid": "66b2bb00"},
            "author": {"user_id": 7, "namespace": "startup", "namespace_id": 9},
            "content": "hello",
        }))
        .expect("message decodes");
        assert_eq!(message.id, "66b2aa00");
        assert_eq!(message.room.as_deref(), Some("66b2bb00"));
    }

    #[test]
    fn message_tolerates_sparse_send_echo() {
        let message: Message = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "content": "hi",
        }))
        .expect("message decodes");
        assert_eq!(message.id, "m1");
        assert_eq!(message.room, None);
        assert_eq!(message.author, None);
    }

    #[test]
    fn room_accepts_all_observed_id_labels() {
        for payload in [
            serde_json::json!({"id": "r1", "name": "a-b"}),
            serde_json::json!({"_id": {"$oid": "r1"}, "name": "a-b"}),
            serde_json::json!({"conversation_id": "r1", "participants": []}),
        ] {
            let room: Room = serde_json::from_value(payload).expect("room decodes");
            assert_eq!(room.id, "r1");
        }
    }

    #[test]
    fn notification_decodes() {
        let notification: Notification = serde_json::from_value(serde_json::json!({
            "id": "n1",
            "initiator": {"user_id": 7, "namespace": "investor", "namespace_id": 3},
            "message": "Message: m9 was sent by investor with id 3",
            "created_at": "2024-05-01T10:00:00Z",
            "url": "/users/7/investors/3/",
        }))
        .expect("notification decodes");
        assert_eq!(notification.id, "n1");
        assert_eq!(notification.url.as_deref(), Some("/users/7/investors/3/"));
    }
}
