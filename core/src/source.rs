use crate::metadata::MessageMetadata;
use serde::{Deserialize, Serialize};

/// Provenance of the actor that triggered a render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceInfo {
    pub team_id: String,
    pub user_id: String,
}

impl SourceInfo {
    pub fn new(team_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Async continuation descriptor.
///
/// Identifies the message a resumed value must be rendered into and the state
/// hook that receives it. Either `message_ts` (durable message) or
/// `response_url` is set; without a durable identity the as-created
/// `metadata` travels along so the envelope can still be decoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsyncData {
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
    #[serde(default)]
    pub hook_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl AsyncData {
    pub fn source(&self) -> SourceInfo {
        SourceInfo::new(self.team_id.clone(), self.user_id.clone())
    }

    /// Same message, pointed at another state hook.
    pub fn for_hook(&self, hook_index: usize) -> Self {
        Self {
            hook_index,
            ..self.clone()
        }
    }

    pub fn has_durable_identity(&self) -> bool {
        self.channel_id.is_some() && self.message_ts.is_some()
    }
}
