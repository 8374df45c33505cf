//! Message I/O collaborator.
//!
//! The engine never talks to the chat platform itself. An implementation of
//! [`MessageIo`] wraps the platform client; errors come back as
//! `anyhow::Error` and are wrapped into [`Error::MessageIo`](crate::Error).

use async_trait::async_trait;
use hookwire_core::{AsyncData, Message, MessageMetadata};
use serde::{Deserialize, Serialize};

/// Where a message lives or should be posted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTarget {
    pub team_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_url: Option<String>,
    #[serde(default)]
    pub is_home: bool,
}

impl MessageTarget {
    pub fn channel(
        team_id: impl Into<String>,
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            team_id: team_id.into(),
            user_id: user_id.into(),
            channel_id: Some(channel_id.into()),
            ..Self::default()
        }
    }

    /// The home tab of `user_id`.
    pub fn home(team_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            user_id: user_id.into(),
            is_home: true,
            ..Self::default()
        }
    }

    pub fn with_ts(mut self, ts: impl Into<String>) -> Self {
        self.message_ts = Some(ts.into());
        self
    }

    pub fn with_response_url(mut self, url: impl Into<String>) -> Self {
        self.response_url = Some(url.into());
        self
    }

    pub fn from_async_data(data: &AsyncData) -> Self {
        Self {
            team_id: data.team_id.clone(),
            user_id: data.user_id.clone(),
            channel_id: data.channel_id.clone(),
            message_ts: data.message_ts.clone(),
            response_url: data.response_url.clone(),
            is_home: data.is_home,
        }
    }
}

/// A message as read back from the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub ts: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
    /// Private field of a home tab or modal view.
    #[serde(default)]
    pub private_metadata: Option<String>,
}

#[async_trait]
pub trait MessageIo: Send + Sync {
    /// Post a new message. Returns its timestamp when the platform assigned a
    /// durable identity (channel posts), `None` for response-URL replies.
    async fn create_message(
        &self,
        message: &Message,
        target: &MessageTarget,
    ) -> anyhow::Result<Option<String>>;

    async fn update_message(&self, message: &Message, target: &MessageTarget)
    -> anyhow::Result<()>;

    /// Publish the home tab. Surfaces do not echo metadata, so the encoded
    /// envelope travels in `private_metadata`.
    async fn publish_surface(
        &self,
        message: &Message,
        private_metadata: &str,
        target: &MessageTarget,
    ) -> anyhow::Result<()>;

    async fn open_view(
        &self,
        message: &Message,
        private_metadata: &str,
        trigger_id: &str,
    ) -> anyhow::Result<()>;

    async fn fetch_message(&self, target: &MessageTarget) -> anyhow::Result<StoredMessage>;
}
