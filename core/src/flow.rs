//! # Flow: Multi-Pass Orchestration
//!
//! A `Flow` is a named render function plus policy flags. Every logical
//! operation on it is one of three shapes:
//!
//! * **Fresh render**: one pass over an empty ledger.
//! * **Interactive update**: decode, populate pass, [`CallbackDispatch`],
//!   commit pass, encode.
//! * **Async resumption**: the same skeleton with a [`StateResume`] mutation.
//!
//! Alternate mutation sources plug into the skeleton through [`Mutation`].

use crate::context::{EffectContext, EffectFn, RenderContext};
use crate::document::{BlockAction, Message, View};
use crate::error::{Error, Result};
use crate::hook::SharedLedger;
use crate::metadata::{DecodedEnvelope, Envelope, MessageMetadata, MetadataCodec};
use crate::props::FlowProps;
use crate::source::{AsyncData, SourceInfo};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, Span, debug, info_span};
use uuid::Uuid;

pub type RenderFn = Arc<dyn Fn(&mut RenderContext) -> Result<View> + Send + Sync>;

/// Steps of one logical operation, used to tag spans and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Populate,
    Mutate,
    Commit,
    Encode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Populate => "populate",
            Stage::Mutate => "mutate",
            Stage::Commit => "commit",
            Stage::Encode => "encode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowOptions {
    /// The flow may be posted or updated outside an interaction
    /// acknowledgment (direct post, continuation update).
    pub can_update_without_interaction: bool,
}

/// The change applied between the populate and commit passes.
#[async_trait]
pub trait Mutation: Send + Sync {
    fn describe(&self) -> String;

    async fn apply(&self, ctx: &mut RenderContext) -> Result<()>;
}

/// Invoke the callbacks referenced by the inbound actions, in order.
#[derive(Debug, Clone, Default)]
pub struct CallbackDispatch {
    pub actions: Vec<BlockAction>,
}

impl CallbackDispatch {
    pub fn new(actions: Vec<BlockAction>) -> Self {
        Self { actions }
    }
}

#[async_trait]
impl Mutation for CallbackDispatch {
    fn describe(&self) -> String {
        format!("callback dispatch ({} actions)", self.actions.len())
    }

    async fn apply(&self, ctx: &mut RenderContext) -> Result<()> {
        for action in &self.actions {
            ctx.trigger_callback(&action.action_id, action.clone()).await?;
        }
        Ok(())
    }
}

/// Write resumed values straight into state hooks.
#[derive(Debug, Clone, Default)]
pub struct StateResume {
    pub values: Vec<(usize, Value)>,
}

impl StateResume {
    pub fn single(index: usize, value: Value) -> Self {
        Self {
            values: vec![(index, value)],
        }
    }
}

#[async_trait]
impl Mutation for StateResume {
    fn describe(&self) -> String {
        let indices: Vec<usize> = self.values.iter().map(|(i, _)| *i).collect();
        format!("state resume {:?}", indices)
    }

    async fn apply(&self, ctx: &mut RenderContext) -> Result<()> {
        for (index, value) in &self.values {
            ctx.update_state(*index, value.clone())?;
        }
        Ok(())
    }
}

/// Output of a fresh render.
pub struct FreshRender {
    pub message: Message,
    /// Present when the pass declared start effects.
    pub continuation: Option<Continuation>,
}

#[derive(Clone)]
pub struct Flow {
    name: String,
    options: FlowOptions,
    render: RenderFn,
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish()
    }
}

impl Flow {
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&mut RenderContext) -> Result<View> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            options: FlowOptions::default(),
            render: Arc::new(render),
        }
    }

    pub fn with_options(mut self, options: FlowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn can_update_without_interaction(mut self, enabled: bool) -> Self {
        self.options.can_update_without_interaction = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> FlowOptions {
        self.options
    }

    fn span(&self) -> Span {
        info_span!(
            "flow",
            hookwire.flow = %self.name,
            hookwire.op = %Uuid::new_v4()
        )
    }

    fn run_pass(&self, ctx: &mut RenderContext, stage: Stage) -> Result<View> {
        debug!(stage = %stage, mode = ?ctx.mode(), "render pass");
        ctx.begin_pass();
        let view = (self.render)(ctx)?;
        ctx.finish()?;
        Ok(view)
    }

    /// Render a brand new instance of the flow.
    pub fn render_fresh(
        &self,
        props: FlowProps,
        source: SourceInfo,
        codec: &MetadataCodec,
    ) -> Result<FreshRender> {
        let span = self.span();
        let _enter = span.enter();

        let mut ctx = RenderContext::fresh(self.name.clone(), props, source);
        let view = self.run_pass(&mut ctx, Stage::Commit)?;

        let envelope = Envelope::new(self.name.clone(), ctx.ledger(), ctx.props().clone());
        debug!(stage = %Stage::Encode, hooks = envelope.ledger.len(), "encoding envelope");
        let metadata = codec.encode(None, &envelope, &view.event_payload)?;
        let message = assemble(view, metadata, false);

        let effects = ctx.take_effects();
        let continuation = if effects.is_empty() {
            None
        } else {
            debug!(effects = effects.len(), "start effects pending");
            Some(Continuation {
                flow: self.clone(),
                source: ctx.source().clone(),
                ledger: ctx.shared_ledger(),
                effects,
            })
        };

        Ok(FreshRender {
            message,
            continuation,
        })
    }

    /// Re-render an existing instance: populate, mutate, commit.
    pub async fn render_update(
        &self,
        decoded: DecodedEnvelope,
        source: SourceInfo,
        async_data: Option<AsyncData>,
        codec: &MetadataCodec,
        mutation: &dyn Mutation,
    ) -> Result<Message> {
        let span = self.span();
        async move {
            debug!(
                stage = %Stage::Decode,
                hooks = decoded.envelope.ledger.len(),
                "decoded envelope"
            );
            if decoded.envelope.flow != self.name {
                return Err(Error::UnknownFlow(decoded.envelope.flow));
            }
            let DecodedEnvelope { envelope, original } = decoded;

            let mut ctx = RenderContext::resume(envelope, source, async_data);
            self.run_pass(&mut ctx, Stage::Populate)?;

            debug!(stage = %Stage::Mutate, mutation = %mutation.describe(), "applying mutation");
            mutation.apply(&mut ctx).await?;

            let view = self.run_pass(&mut ctx, Stage::Commit)?;

            let envelope = Envelope::new(self.name.clone(), ctx.ledger(), ctx.props().clone());
            debug!(stage = %Stage::Encode, hooks = envelope.ledger.len(), "encoding envelope");
            let metadata = codec.encode(Some(&original), &envelope, &view.event_payload)?;
            Ok(assemble(view, metadata, true))
        }
        .instrument(span)
        .await
    }
}

fn assemble(view: View, metadata: MessageMetadata, replace_original: bool) -> Message {
    Message {
        text: view.text,
        blocks: view.blocks,
        metadata: Some(metadata),
        replace_original,
        ..Message::default()
    }
}

/// Deferred start effects of a fresh render.
///
/// Owns everything it needs; the orchestrator hands it the identity of the
/// created message and runs it detached from the request.
pub struct Continuation {
    flow: Flow,
    source: SourceInfo,
    ledger: SharedLedger,
    effects: Vec<EffectFn>,
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("flow", &self.flow.name)
            .field("effects", &self.effects.len())
            .finish()
    }
}

impl Continuation {
    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Run the effects, then resume the flow with whatever state they wrote.
    pub async fn run(
        self,
        decoded: DecodedEnvelope,
        async_data: AsyncData,
        codec: &MetadataCodec,
    ) -> Result<Message> {
        let effect_ctx = EffectContext {
            source: self.source.clone(),
            async_data: async_data.clone(),
        };
        for effect in self.effects {
            effect(effect_ctx.clone()).await?;
        }

        let produced: Vec<(usize, Value)> = self.ledger.lock().states().collect();
        let stored = &decoded.envelope.ledger;
        let values = produced
            .into_iter()
            .filter(|(index, value)| stored.get(*index).map(|h| h.value()).as_ref() != Some(value))
            .collect();
        let mutation = StateResume { values };

        self.flow
            .render_update(decoded, self.source, Some(async_data), codec, &mutation)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, Element};
    use crate::error::SequenceMismatch;
    use crate::hook::{Hook, HookKind, HookLedger};
    use crate::hooks::{use_callback, use_callback_sync, use_effect, use_state};
    use crate::metadata::METADATA_KEY;
    use serde_json::json;

    fn counter() -> Flow {
        Flow::new("counter", |ctx| {
            let (count, set_count) = use_state(ctx, 0i64)?;
            let increment = use_callback_sync(ctx, move |_| set_count.set(count + 1))?;
            Ok(View::new()
                .text(format!("Count: {}", count))
                .block(Block::actions(vec![Element::button(increment, "+1")])))
        })
    }

    fn source() -> SourceInfo {
        SourceInfo::new("T1", "U1")
    }

    fn decode(message: &Message, codec: &MetadataCodec) -> DecodedEnvelope {
        codec.decode(message.metadata.as_ref(), None).unwrap()
    }

    #[tokio::test]
    async fn test_counter_increments_on_click() {
        let codec = MetadataCodec::default();
        let flow = counter();

        let fresh = flow.render_fresh(FlowProps::new(), source(), &codec).unwrap();
        assert!(fresh.continuation.is_none());
        assert_eq!(fresh.message.text.as_deref(), Some("Count: 0"));

        let decoded = decode(&fresh.message, &codec);
        assert_eq!(
            decoded.envelope.ledger,
            HookLedger::from_hooks(vec![Hook::state(json!(0)), Hook::callback("hw_counter_cb_1")])
        );

        let click = CallbackDispatch::new(vec![BlockAction::new("hw_counter_cb_1")]);
        let updated = flow
            .render_update(decoded, source(), None, &codec, &click)
            .await
            .unwrap();

        assert_eq!(updated.text.as_deref(), Some("Count: 1"));
        assert!(updated.replace_original);
        let ledger = decode(&updated, &codec).envelope.ledger;
        assert_eq!(ledger.get(0).unwrap().value(), json!(1));
        assert_eq!(ledger.callback_index("hw_counter_cb_1"), Some(1));
    }

    #[tokio::test]
    async fn test_async_callback_is_awaited_before_commit() {
        let codec = MetadataCodec::default();
        let flow = Flow::new("poll", |ctx| {
            let (votes, set_votes) = use_state(ctx, Vec::<String>::new())?;
            let tally = votes.clone();
            let vote = use_callback(ctx, move |action| {
                let set_votes = set_votes.clone();
                let mut tally = tally.clone();
                async move {
                    tokio::task::yield_now().await;
                    tally.push(action.selected_value().unwrap_or("yes").to_string());
                    set_votes.set(tally)
                }
            })?;
            Ok(View::new()
                .text(format!("votes: {}", votes.join(",")))
                .block(Block::actions(vec![Element::button(vote, "vote")])))
        });

        let fresh = flow.render_fresh(FlowProps::new(), source(), &codec).unwrap();
        let click = CallbackDispatch::new(vec![BlockAction::new("hw_poll_cb_1")]);
        let updated = flow
            .render_update(decode(&fresh.message, &codec), source(), None, &codec, &click)
            .await
            .unwrap();

        assert_eq!(updated.text.as_deref(), Some("votes: yes"));
        let ledger = decode(&updated, &codec).envelope.ledger;
        assert_eq!(ledger.get(0).unwrap().value(), json!(["yes"]));
    }

    #[tokio::test]
    async fn test_callback_ids_are_stable_across_resumptions() {
        let codec = MetadataCodec::default();
        let flow = counter();
        let fresh = flow.render_fresh(FlowProps::new(), source(), &codec).unwrap();

        let noop = StateResume::default();
        let first = flow
            .render_update(decode(&fresh.message, &codec), source(), None, &codec, &noop)
            .await
            .unwrap();
        let second = flow
            .render_update(decode(&fresh.message, &codec), source(), None, &codec, &noop)
            .await
            .unwrap();
        assert_eq!(first.action_ids(), second.action_ids());
        assert_eq!(first.action_ids(), fresh.message.action_ids());
    }

    #[tokio::test]
    async fn test_branching_render_is_rejected() {
        let codec = MetadataCodec::default();
        let flow = Flow::new("parity", |ctx| {
            let (count, set_count) = use_state(ctx, 0i64)?;
            if count % 2 == 0 {
                use_callback_sync(ctx, move |_| set_count.set(count + 1))?;
            }
            Ok(View::new().text(count.to_string()))
        });

        let fresh = flow.render_fresh(FlowProps::new(), source(), &codec).unwrap();
        let click = CallbackDispatch::new(vec![BlockAction::new("hw_parity_cb_1")]);
        let err = flow
            .render_update(decode(&fresh.message, &codec), source(), None, &codec, &click)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::HookSequenceMismatch(SequenceMismatch::LengthDiffers { .. })
        ));
    }

    #[tokio::test]
    async fn test_declaring_more_hooks_than_stored() {
        let codec = MetadataCodec::default();
        let mut metadata = MessageMetadata::new("hookwire");
        metadata.event_payload.insert(
            METADATA_KEY.into(),
            json!({"f": "counter", "h": [{"k": "state", "d": 5}]}),
        );
        let decoded = codec.decode(Some(&metadata), None).unwrap();

        let err = counter()
            .render_update(decoded, source(), None, &codec, &StateResume::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::HookSequenceMismatch(SequenceMismatch::OutOfRange {
                index: 1,
                declared: HookKind::Callback,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unknown_callback_and_foreign_flow() {
        let codec = MetadataCodec::default();
        let flow = counter();
        let fresh = flow.render_fresh(FlowProps::new(), source(), &codec).unwrap();

        let forged = CallbackDispatch::new(vec![BlockAction::new("hw_counter_cb_9")]);
        let err = flow
            .render_update(decode(&fresh.message, &codec), source(), None, &codec, &forged)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCallback(_)));

        let other = Flow::new("other", |_| Ok(View::new()));
        let err = other
            .render_update(
                decode(&fresh.message, &codec),
                source(),
                None,
                &codec,
                &StateResume::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownFlow(name) if name == "counter"));
    }

    #[tokio::test]
    async fn test_effect_runs_once_through_continuation() {
        let codec = MetadataCodec::default();
        let runs = Arc::new(parking_lot::Mutex::new(0usize));
        let counted = Arc::clone(&runs);

        let flow = Flow::new("loader", move |ctx| {
            let (status, set_status) = use_state(ctx, "loading".to_string())?;
            let counted = Arc::clone(&counted);
            use_effect(ctx, move |_| async move {
                *counted.lock() += 1;
                set_status.set("ready".to_string())
            })?;
            Ok(View::new().text(status))
        });

        let fresh = flow.render_fresh(FlowProps::new(), source(), &codec).unwrap();
        assert_eq!(fresh.message.text.as_deref(), Some("loading"));
        let continuation = fresh.continuation.unwrap();
        assert_eq!(continuation.effect_count(), 1);

        let decoded = decode(&fresh.message, &codec);
        let updated = continuation
            .run(decoded, AsyncData::default(), &codec)
            .await
            .unwrap();
        assert_eq!(updated.text.as_deref(), Some("ready"));
        assert_eq!(*runs.lock(), 1);

        // A later resumption re-declares the effect but never runs it.
        flow.render_update(
            decode(&updated, &codec),
            source(),
            None,
            &codec,
            &StateResume::default(),
        )
        .await
        .unwrap();
        assert_eq!(*runs.lock(), 1);
    }

    #[tokio::test]
    async fn test_fragments_and_foreign_keys_survive_updates() {
        let codec = MetadataCodec::default();
        let flow = Flow::new("tagged", |ctx| {
            let (n, _) = use_state(ctx, 1u8)?;
            Ok(View::new().payload("last_seen", n))
        });

        let fresh = flow.render_fresh(FlowProps::new(), source(), &codec).unwrap();
        let mut metadata = fresh.message.metadata.clone().unwrap();
        metadata.event_payload.insert("external".into(), json!(true));
        let decoded = codec.decode(Some(&metadata), None).unwrap();

        let updated = flow
            .render_update(decoded, source(), None, &codec, &StateResume::single(0, json!(4)))
            .await
            .unwrap();
        let payload = updated.metadata.unwrap().event_payload;
        assert_eq!(payload["external"], json!(true));
        assert_eq!(payload["last_seen"], json!(4));
    }
}
