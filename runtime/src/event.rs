//! Inbound event model.
//!
//! Only the fields the orchestrator reads are modelled; unknown fields in the
//! platform payloads are ignored.

use hookwire_core::{BlockAction, MessageMetadata, SourceInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub team_id: String,
    pub user_id: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub trigger_id: Option<String>,
}

impl SlashCommand {
    pub fn source(&self) -> SourceInfo {
        SourceInfo::new(self.team_id.clone(), self.user_id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    BlockActions,
    ViewSubmission,
    ViewClosed,
    Shortcut,
    MessageAction,
    BlockSuggestion,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionType::BlockActions => "block_actions",
            InteractionType::ViewSubmission => "view_submission",
            InteractionType::ViewClosed => "view_closed",
            InteractionType::Shortcut => "shortcut",
            InteractionType::MessageAction => "message_action",
            InteractionType::BlockSuggestion => "block_suggestion",
            InteractionType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: String,
}

impl IdRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// The message an interaction happened on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerMessage {
    pub ts: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    Home,
    Modal,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewInfo {
    #[serde(rename = "type", default)]
    pub kind: ViewType,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub callback_id: Option<String>,
    #[serde(default)]
    pub private_metadata: Option<String>,
    /// Submitted input values, keyed by block then action id.
    #[serde(default)]
    pub state: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseUrl {
    pub response_url: String,
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionCallback {
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub team: IdRef,
    pub user: IdRef,
    #[serde(default)]
    pub channel: Option<IdRef>,
    #[serde(default)]
    pub message: Option<ContainerMessage>,
    #[serde(default)]
    pub view: Option<ViewInfo>,
    #[serde(default)]
    pub actions: Vec<BlockAction>,
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub response_urls: Vec<ResponseUrl>,
    #[serde(default)]
    pub callback_id: Option<String>,
    #[serde(default)]
    pub trigger_id: Option<String>,
}

impl InteractionCallback {
    pub fn source(&self) -> SourceInfo {
        SourceInfo::new(self.team.id.clone(), self.user.id.clone())
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel.as_ref().map(|c| c.id.as_str())
    }

    pub fn is_home(&self) -> bool {
        self.view
            .as_ref()
            .is_some_and(|v| v.kind == ViewType::Home)
    }

    pub fn private_metadata(&self) -> Option<&str> {
        self.view.as_ref().and_then(|v| v.private_metadata.as_deref())
    }
}
