//! Typed endpoints over the gateway.

use reqwest::{Method, Response, StatusCode};

use crate::error::{ApiError, Result};
use crate::gateway::{ApiClient, decode_body, decode_json_response, http_error};
use crate::types::{
    CreateConversationRequest, InvestorCabinet, Message, Notification, Room,
    SelectNamespaceRequest, SendMessageRequest, Startup, StartupCabinet,
};
use forum_client_core::Identity;

impl ApiClient {
    #[must_use]
    pub fn login_path() -> &'static str {
        "/users/login/"
    }

    #[must_use]
    pub fn token_refresh_path() -> &'static str {
        "/users/token/refresh/"
    }

    #[must_use]
    pub fn logout_path() -> &'static str {
        "/users/logout/"
    }

    #[must_use]
    pub fn startups_path() -> &'static str {
        "/startups/"
    }

    #[must_use]
    pub fn select_namespace_path() -> &'static str {
        "/users/select-namespace/"
    }

    #[must_use]
    pub fn user_investors_path(user_id: i64) -> String {
        format!("/users/{user_id}/investors/")
    }

    #[must_use]
    pub fn user_startups_path(user_id: i64) -> String {
        format!("/users/{user_id}/startups/")
    }

    #[must_use]
    pub fn conversations_path() -> &'static str {
        "/communications/conversations"
    }

    #[must_use]
    pub fn conversation_create_path() -> &'static str {
        "/communications/conversations/create"
    }

    #[must_use]
    pub fn conversation_messages_path(room_id: &str) -> String {
        format!("/communications/conversations/{}/messages", room_id.trim())
    }

    #[must_use]
    pub fn message_path(message_id: &str) -> String {
        format!("/communications/messages/{}", message_id.trim())
    }

    #[must_use]
    pub fn message_send_path() -> &'static str {
        "/communications/messages/send"
    }

    #[must_use]
    pub fn notifications_path() -> &'static str {
        "/notifications/"
    }

    #[must_use]
    pub fn notification_path(notification_id: &str) -> String {
        format!("/notifications/{}/", notification_id.trim())
    }

    /// Blacklist the refresh token and end the session server-side.
    pub async fn logout(&self) -> Result<()> {
        let response = self
            .request::<serde_json::Value>(Method::POST, Self::logout_path(), None)
            .await?;
        expect_success(response).await
    }

    pub async fn startups(&self) -> Result<Vec<Startup>> {
        self.get_json(Self::startups_path()).await
    }

    pub async fn investor_cabinets(&self, user_id: i64) -> Result<Vec<InvestorCabinet>> {
        self.get_json(&Self::user_investors_path(user_id)).await
    }

    pub async fn startup_cabinets(&self, user_id: i64) -> Result<Vec<StartupCabinet>> {
        self.get_json(&Self::user_startups_path(user_id)).await
    }

    /// Switch the acting namespace; the backend re-issues claims through
    /// the response cookies.
    pub async fn select_namespace(&self, request: &SelectNamespaceRequest) -> Result<()> {
        let response = self
            .request(Method::POST, Self::select_namespace_path(), Some(request))
            .await?;
        expect_success(response).await
    }

    pub async fn conversations(&self) -> Result<Vec<Room>> {
        self.get_json(Self::conversations_path()).await
    }

    /// Create a room for exactly two participants (one investor, one
    /// startup, in either order).
    pub async fn create_conversation(&self, participants: [Identity; 2]) -> Result<Room> {
        let request = CreateConversationRequest {
            participants: participants.to_vec(),
        };
        self.post_json(Self::conversation_create_path(), &request)
            .await
    }

    pub async fn conversation_messages(&self, room_id: &str) -> Result<Vec<Message>> {
        self.get_json(&Self::conversation_messages_path(room_id))
            .await
    }

    pub async fn message(&self, message_id: &str) -> Result<Message> {
        self.get_json(&Self::message_path(message_id)).await
    }

    /// Send a message. Anything but 201 is a failed send.
    pub async fn send_message(&self, request: &SendMessageRequest) -> Result<Message> {
        let response = self
            .request(Method::POST, Self::message_send_path(), Some(request))
            .await?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|error| ApiError::Network {
            message: error.to_string(),
        })?;
        if status != StatusCode::CREATED {
            return Err(http_error(status, &bytes));
        }
        decode_body(&bytes)
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        self.get_json(Self::notifications_path()).await
    }

    /// Mark a notification read (the backend drops the caller from its
    /// receiver list).
    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<Notification> {
        let response = self
            .request::<serde_json::Value>(
                Method::PUT,
                &Self::notification_path(notification_id),
                None,
            )
            .await?;
        decode_json_response(response).await
    }
}

async fn expect_success(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let bytes = response.bytes().await.map_err(|error| ApiError::Network {
        message: error.to_string(),
    })?;
    Err(http_error(status, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers_are_deterministic() {
        assert_eq!(ApiClient::login_path(), "/users/login/");
        assert_eq!(ApiClient::token_refresh_path(), "/users/token/refresh/");
        assert_eq!(ApiClient::startups_path(), "/startups/");
        assert_eq!(ApiClient::user_investors_path(42), "/users/42/investors/");
        assert_eq!(ApiClient::user_startups_path(42), "/users/42/startups/");
        assert_eq!(
            ApiClient::conversations_path(),
            "/communications/conversations"
        );
        assert_eq!(
            ApiClient::conversation_messages_path(" 66b2aa00 "),
            "/communications/conversations/66b2aa00/messages"
        );
        assert_eq!(
            ApiClient::message_path("m1"),
            "/communications/messages/m1"
        );
        assert_eq!(
            ApiClient::message_send_path(),
            "/communications/messages/send"
        );
        assert_eq!(ApiClient::notification_path("n1"), "/notifications/n1/");
    }
}
