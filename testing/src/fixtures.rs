//! Event builders and demo flows.

use hookwire_core::prelude::*;
use hookwire_core::MessageMetadata;
use hookwire_runtime::{
    ContainerMessage, IdRef, InteractionCallback, InteractionType, ResponseUrl, SlashCommand,
    ViewInfo, ViewType,
};

pub const TEAM: &str = "T0001";
pub const USER: &str = "U0001";
pub const CHANNEL: &str = "C0001";
pub const RESPONSE_URL: &str = "https://hooks.example.test/actions/T0001/1";

pub fn slash(command: &str, text: &str) -> SlashCommand {
    SlashCommand {
        command: command.to_string(),
        text: text.to_string(),
        team_id: TEAM.to_string(),
        user_id: USER.to_string(),
        channel_id: Some(CHANNEL.to_string()),
        response_url: Some(RESPONSE_URL.to_string()),
        trigger_id: Some("trigger-1".to_string()),
    }
}

fn interaction(kind: InteractionType) -> InteractionCallback {
    InteractionCallback {
        kind,
        team: IdRef::new(TEAM),
        user: IdRef::new(USER),
        channel: None,
        message: None,
        view: None,
        actions: Vec::new(),
        response_url: None,
        response_urls: Vec::new(),
        callback_id: None,
        trigger_id: Some("trigger-2".to_string()),
    }
}

fn actions(action_ids: &[&str]) -> Vec<BlockAction> {
    action_ids.iter().map(|id| BlockAction::new(*id)).collect()
}

/// A click on a channel message carrying `metadata`.
pub fn block_actions(
    ts: &str,
    metadata: Option<MessageMetadata>,
    action_ids: &[&str],
) -> InteractionCallback {
    InteractionCallback {
        channel: Some(IdRef::new(CHANNEL)),
        message: Some(ContainerMessage {
            ts: ts.to_string(),
            text: None,
            metadata,
        }),
        actions: actions(action_ids),
        response_url: Some(RESPONSE_URL.to_string()),
        ..interaction(InteractionType::BlockActions)
    }
}

/// A click inside a home tab or modal, where the envelope lives in the
/// private field.
pub fn view_block_actions(
    kind: ViewType,
    private_metadata: &str,
    action_ids: &[&str],
) -> InteractionCallback {
    InteractionCallback {
        view: Some(ViewInfo {
            kind,
            private_metadata: Some(private_metadata.to_string()),
            ..ViewInfo::default()
        }),
        actions: actions(action_ids),
        ..interaction(InteractionType::BlockActions)
    }
}

pub fn view_submission(private_metadata: &str, state: serde_json::Value) -> InteractionCallback {
    InteractionCallback {
        view: Some(ViewInfo {
            kind: ViewType::Modal,
            private_metadata: Some(private_metadata.to_string()),
            state: Some(state),
            ..ViewInfo::default()
        }),
        response_urls: vec![ResponseUrl {
            response_url: RESPONSE_URL.to_string(),
            channel_id: Some(CHANNEL.to_string()),
        }],
        ..interaction(InteractionType::ViewSubmission)
    }
}

pub fn shortcut(kind: InteractionType, callback_id: &str) -> InteractionCallback {
    InteractionCallback {
        callback_id: Some(callback_id.to_string()),
        channel: (kind == InteractionType::MessageAction).then(|| IdRef::new(CHANNEL)),
        response_url: Some(RESPONSE_URL.to_string()),
        ..interaction(kind)
    }
}

/// One state hook and one increment callback.
pub fn counter_flow() -> Flow {
    Flow::new("counter", |ctx| {
        let step = ctx
            .props()
            .get("step")
            .and_then(|v| v.as_i64())
            .unwrap_or(1);
        let (count, set_count) = use_state(ctx, 0i64)?;
        let increment = use_callback_sync(ctx, move |_| set_count.set(count + step))?;
        Ok(View::new()
            .text(format!("Count: {}", count))
            .block(Block::section_with(
                format!("*Count:* {}", count),
                Element::button(increment, format!("+{}", step)),
            )))
    })
}
