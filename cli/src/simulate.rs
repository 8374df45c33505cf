//! Replays a slash command and a series of button clicks against the demo
//! counter flow, the way a platform would deliver them.

use crate::console::ConsoleIo;
use anyhow::{Context, Result, anyhow};
use hookwire_core::prelude::*;
use hookwire_runtime::{
    App, AppBuilder, ContainerMessage, IdRef, InteractionCallback, InteractionType,
    RuntimeConfig, SlashCommand,
};
use std::sync::Arc;
use tracing::info;

const TEAM: &str = "T-SIM";
const USER: &str = "U-SIM";
const CHANNEL: &str = "C-SIM";

fn counter_flow() -> Flow {
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

fn build_app(io: Arc<ConsoleIo>, config: &RuntimeConfig) -> Result<App> {
    let mut builder = AppBuilder::new();
    let counter = builder.add_flow(counter_flow())?;
    builder.add_slash("/counter", move |ctx, cmd| {
        let counter = counter.clone();
        async move {
            let step: i64 = cmd.text.trim().parse().unwrap_or(1);
            ctx.start_flow_and_post(&counter, FlowProps::new().with("step", step))
                .await?;
            Ok::<_, hookwire_runtime::Error>(None)
        }
    });
    Ok(builder.build(io, config.clone()))
}

/// Returns the text of the message after the last click.
pub async fn run_simulate_command(
    config: &RuntimeConfig,
    clicks: u32,
    step: i64,
    quiet: bool,
) -> Result<String> {
    let io = if quiet { ConsoleIo::quiet() } else { ConsoleIo::new() };
    simulate(Arc::new(io), config, clicks, step).await
}

async fn simulate(
    io: Arc<ConsoleIo>,
    config: &RuntimeConfig,
    clicks: u32,
    step: i64,
) -> Result<String> {
    let app = build_app(io.clone(), config)?;

    let reply = app
        .handle_slash_command(SlashCommand {
            command: "/counter".to_string(),
            text: step.to_string(),
            team_id: TEAM.to_string(),
            user_id: USER.to_string(),
            channel_id: Some(CHANNEL.to_string()),
            ..SlashCommand::default()
        })
        .await;
    if let Some(reply) = reply {
        return Err(anyhow!(
            "slash command failed: {}",
            reply.text.unwrap_or_default()
        ));
    }

    // `start_flow_and_post` went through the console collaborator, which
    // hands out one timestamp per post.
    let mut current = io
        .latest()
        .context("counter flow was not posted")?;

    for click in 1..=clicks {
        let action_id = current
            .message
            .action_ids()
            .first()
            .map(|id| id.to_string())
            .context("rendered message has no button")?;
        info!(click, action_id = %action_id, "clicking");
        app.handle_interaction(InteractionCallback {
            kind: InteractionType::BlockActions,
            team: IdRef::new(TEAM),
            user: IdRef::new(USER),
            channel: Some(IdRef::new(CHANNEL)),
            message: Some(ContainerMessage {
                ts: current.ts.clone(),
                text: current.message.text.clone(),
                metadata: current.message.metadata.clone(),
            }),
            view: None,
            actions: vec![BlockAction::new(action_id)],
            response_url: None,
            response_urls: Vec::new(),
            callback_id: None,
            trigger_id: None,
        })
        .await?;
        current = io
            .posted(&current.ts)
            .context("clicked message disappeared")?;
    }

    Ok(current.message.text.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_clicks_accumulate() {
        let io = Arc::new(ConsoleIo::quiet());
        let text = simulate(io, &RuntimeConfig::default(), 3, 2).await.unwrap();
        assert_eq!(text, "Count: 6");
    }

    #[tokio::test]
    async fn test_zero_clicks_shows_initial_render() {
        let io = Arc::new(ConsoleIo::quiet());
        let text = simulate(io, &RuntimeConfig::default(), 0, 5).await.unwrap();
        assert_eq!(text, "Count: 0");
    }
}
