//! # Reconciliation Orchestrator
//!
//! Decides, per inbound event, which flow runs and how its output reaches
//! the platform: a fresh message, an update of an existing one, a home tab
//! publish, or a modal.

use crate::builder::AppBuilder;
use crate::config::{AppOptions, RuntimeConfig};
use crate::continuation::{ContinuationDispatcher, deliver, private_field};
use crate::error::{Error, Result};
use crate::event::{InteractionCallback, InteractionType, SlashCommand};
use crate::io::{MessageIo, MessageTarget};
use hookwire_core::{
    AsyncData, AsyncSetter, BoxFuture, CallbackDispatch, Continuation, DecodedEnvelope, Flow,
    FlowProps, Message, MetadataCodec, SourceInfo, StateResume,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

pub type SlashHandler = Arc<
    dyn Fn(EventContext, SlashCommand) -> BoxFuture<'static, Result<Option<Message>>> + Send + Sync,
>;

pub type ShortcutHandler =
    Arc<dyn Fn(EventContext, InteractionCallback) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Called with the submission of a modal opened from a flow.
pub type ViewSubmittedHandler = ShortcutHandler;

/// A registered flow, handed out by [`AppBuilder::add_flow`].
#[derive(Debug, Clone)]
pub struct FlowHandle {
    flow: Flow,
}

impl FlowHandle {
    pub(crate) fn new(flow: Flow) -> Self {
        Self { flow }
    }

    pub fn name(&self) -> &str {
        self.flow.name()
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }
}

pub(crate) struct AppInner {
    pub(crate) flows: HashMap<String, Flow>,
    pub(crate) slashes: HashMap<String, SlashHandler>,
    pub(crate) unknown_slash: Option<SlashHandler>,
    pub(crate) global_shortcuts: HashMap<String, ShortcutHandler>,
    pub(crate) message_shortcuts: HashMap<String, ShortcutHandler>,
    pub(crate) unknown_shortcut: Option<ShortcutHandler>,
    pub(crate) view_submitted: HashMap<String, ViewSubmittedHandler>,
    pub(crate) io: Arc<dyn MessageIo>,
    pub(crate) codec: MetadataCodec,
    pub(crate) dispatcher: ContinuationDispatcher,
    pub(crate) options: AppOptions,
    pub(crate) config: RuntimeConfig,
}

#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub(crate) fn from_inner(inner: AppInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn codec(&self) -> &MetadataCodec {
        &self.inner.codec
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn flow(&self, name: &str) -> Option<FlowHandle> {
        self.inner.flows.get(name).cloned().map(FlowHandle::new)
    }

    fn lookup(&self, decoded: &DecodedEnvelope) -> Result<&Flow> {
        self.inner
            .flows
            .get(decoded.flow())
            .ok_or_else(|| hookwire_core::Error::UnknownFlow(decoded.flow().to_string()).into())
    }

    fn context(&self, target: MessageTarget, trigger_id: Option<String>) -> EventContext {
        EventContext {
            app: self.clone(),
            source: SourceInfo::new(target.team_id.clone(), target.user_id.clone()),
            target,
            trigger_id,
        }
    }

    /// Route a slash command. Errors are turned into a user-facing message.
    pub async fn handle_slash_command(&self, cmd: SlashCommand) -> Option<Message> {
        debug!(command = %cmd.command, team = %cmd.team_id, "handling slash command");
        let command = cmd.command.clone();
        let ctx = self.context(
            MessageTarget {
                team_id: cmd.team_id.clone(),
                user_id: cmd.user_id.clone(),
                channel_id: cmd.channel_id.clone(),
                response_url: cmd.response_url.clone(),
                ..MessageTarget::default()
            },
            cmd.trigger_id.clone(),
        );

        let handler = self
            .inner
            .slashes
            .get(&command)
            .or(self.inner.unknown_slash.as_ref())
            .cloned();
        let result = match handler {
            Some(handler) => handler(ctx, cmd).await,
            None => Err(Error::UnknownCommand(command.clone())),
        };

        match result {
            Ok(message) => message,
            Err(err) => {
                error!(command = %command, error = %err, "slash command failed");
                Some(self.inner.options.format_error(&err))
            }
        }
    }

    pub async fn handle_interaction(&self, interaction: InteractionCallback) -> Result<()> {
        debug!(kind = %interaction.kind, team = %interaction.team.id, "handling interaction");
        match interaction.kind {
            InteractionType::BlockActions => self.handle_block_actions(interaction).await,
            InteractionType::ViewSubmission => self.handle_view_submission(interaction).await,
            InteractionType::Shortcut => {
                self.handle_shortcut(&self.inner.global_shortcuts, interaction)
                    .await
            }
            InteractionType::MessageAction => {
                self.handle_shortcut(&self.inner.message_shortcuts, interaction)
                    .await
            }
            other => Err(Error::UnsupportedInteraction(other.to_string())),
        }
    }

    async fn handle_block_actions(&self, interaction: InteractionCallback) -> Result<()> {
        let metadata = interaction
            .message
            .as_ref()
            .and_then(|m| m.metadata.as_ref());
        let decoded = self
            .inner
            .codec
            .decode(metadata, interaction.private_metadata())?;
        let flow = self.lookup(&decoded)?;

        let source = interaction.source();
        let is_home = interaction.is_home();
        let target = if is_home {
            MessageTarget::home(source.team_id.clone(), source.user_id.clone())
        } else {
            MessageTarget {
                team_id: source.team_id.clone(),
                user_id: source.user_id.clone(),
                channel_id: interaction.channel_id().map(str::to_string),
                message_ts: interaction.message.as_ref().map(|m| m.ts.clone()),
                response_url: interaction.response_url.clone(),
                is_home: false,
            }
        };
        let async_data = AsyncData {
            team_id: source.team_id.clone(),
            user_id: source.user_id.clone(),
            channel_id: target.channel_id.clone(),
            message_ts: target.message_ts.clone(),
            response_url: target.response_url.clone(),
            is_home,
            hook_index: 0,
            metadata: None,
        };

        let mutation = CallbackDispatch::new(interaction.actions);
        let message = flow
            .render_update(
                decoded,
                source,
                Some(async_data),
                &self.inner.codec,
                &mutation,
            )
            .await?;

        deliver(self.inner.io.as_ref(), &self.inner.codec, &message, &target).await
    }

    async fn handle_view_submission(&self, interaction: InteractionCallback) -> Result<()> {
        let metadata = interaction
            .message
            .as_ref()
            .and_then(|m| m.metadata.as_ref());
        let decoded = self
            .inner
            .codec
            .decode(metadata, interaction.private_metadata())?;
        let handler = self
            .inner
            .view_submitted
            .get(decoded.flow())
            .cloned()
            .ok_or_else(|| Error::UnknownViewSubmission(decoded.flow().to_string()))?;

        let (response_url, channel_id) = match interaction.response_urls.first() {
            Some(url) => (Some(url.response_url.clone()), url.channel_id.clone()),
            None => (interaction.response_url.clone(), None),
        };
        let ctx = self.context(
            MessageTarget {
                team_id: interaction.team.id.clone(),
                user_id: interaction.user.id.clone(),
                channel_id,
                response_url,
                ..MessageTarget::default()
            },
            interaction.trigger_id.clone(),
        );
        handler(ctx, interaction).await
    }

    async fn handle_shortcut(
        &self,
        shortcuts: &HashMap<String, ShortcutHandler>,
        interaction: InteractionCallback,
    ) -> Result<()> {
        let callback_id = interaction.callback_id.clone().unwrap_or_default();
        let ctx = self.context(
            MessageTarget {
                team_id: interaction.team.id.clone(),
                user_id: interaction.user.id.clone(),
                channel_id: interaction.channel_id().map(str::to_string),
                response_url: interaction.response_url.clone(),
                ..MessageTarget::default()
            },
            interaction.trigger_id.clone(),
        );

        let handler = shortcuts
            .get(&callback_id)
            .or(self.inner.unknown_shortcut.as_ref())
            .cloned();
        match handler {
            Some(handler) => handler(ctx, interaction).await,
            None => Err(Error::UnknownShortcut(callback_id)),
        }
    }

    /// Feed a value produced outside any request into the state hook the
    /// descriptor points at, then update the message.
    pub async fn resume_async(&self, descriptor: AsyncData, value: Value) -> Result<()> {
        debug!(hook = descriptor.hook_index, home = descriptor.is_home, "resuming async state");
        let target = MessageTarget::from_async_data(&descriptor);
        let decoded = self.recover_envelope(&descriptor, &target).await?;
        let flow = self.lookup(&decoded)?;

        let mutation = StateResume::single(descriptor.hook_index, value);
        let source = descriptor.source();
        let message = flow
            .render_update(
                decoded,
                source,
                Some(descriptor),
                &self.inner.codec,
                &mutation,
            )
            .await?;

        deliver(self.inner.io.as_ref(), &self.inner.codec, &message, &target).await
    }

    /// Typed form of [`App::resume_async`].
    pub async fn resume_with<T: Serialize>(&self, setter: &AsyncSetter<T>, value: T) -> Result<()> {
        let (descriptor, value) = setter.prepare(value)?;
        self.resume_async(descriptor, value).await
    }

    /// Read the envelope back from the stored message, falling back to the
    /// metadata the descriptor carries.
    async fn recover_envelope(
        &self,
        descriptor: &AsyncData,
        target: &MessageTarget,
    ) -> Result<DecodedEnvelope> {
        let codec = &self.inner.codec;
        let has_fallback = descriptor.metadata.is_some();

        if descriptor.has_durable_identity() || descriptor.is_home {
            match self.inner.io.fetch_message(target).await {
                Ok(stored) => {
                    let private = stored.private_metadata.as_deref();
                    match codec.decode(stored.metadata.as_ref(), private) {
                        Ok(decoded) => return Ok(decoded),
                        Err(err) if has_fallback => debug!(
                            error = %err,
                            "stored envelope unusable, using descriptor metadata"
                        ),
                        Err(err) => return Err(err.into()),
                    }
                }
                Err(err) if has_fallback => {
                    debug!(error = %err, "fetch failed, using descriptor metadata")
                }
                Err(err) => return Err(Error::MessageIo(err)),
            }
        }

        Ok(codec.decode(descriptor.metadata.as_ref(), None)?)
    }

    /// Publish a flow on the home tab of `user_id`.
    pub async fn update_home<F, Fut>(
        &self,
        team_id: impl Into<String>,
        user_id: impl Into<String>,
        updater: F,
    ) -> Result<()>
    where
        F: FnOnce(EventContext) -> Fut,
        Fut: Future<Output = Result<Option<Message>>>,
    {
        let target = MessageTarget::home(team_id, user_id);
        let ctx = self.context(target.clone(), None);
        let message = updater(ctx).await?.ok_or(Error::HomeRequiresMessage)?;

        let private = private_field(&self.inner.codec, &message)?;
        self.inner
            .io
            .publish_surface(&message, &private, &target)
            .await
            .map_err(Error::MessageIo)
    }

    /// Create the message, then hand its effects to the dispatcher.
    async fn create_with_continuation(
        &self,
        message: Message,
        target: MessageTarget,
        continuation: Option<Continuation>,
    ) -> Result<()> {
        let ts = self
            .inner
            .io
            .create_message(&message, &target)
            .await
            .map_err(Error::MessageIo)?;
        debug!(durable = ts.is_some(), "message created");

        if let Some(continuation) = continuation {
            let durable = ts.is_some();
            let async_data = AsyncData {
                team_id: target.team_id.clone(),
                user_id: target.user_id.clone(),
                channel_id: target.channel_id.clone(),
                message_ts: ts,
                response_url: if durable { None } else { target.response_url.clone() },
                is_home: target.is_home,
                hook_index: 0,
                metadata: if durable { None } else { message.metadata.clone() },
            };
            self.inner
                .dispatcher
                .dispatch(continuation, message.metadata, async_data);
        }
        Ok(())
    }
}

/// Handler-facing view of one inbound event.
#[derive(Clone)]
pub struct EventContext {
    app: App,
    source: SourceInfo,
    target: MessageTarget,
    trigger_id: Option<String>,
}

impl EventContext {
    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.target.channel_id.as_deref()
    }

    pub fn trigger_id(&self) -> Option<&str> {
        self.trigger_id.as_deref()
    }

    /// Render a flow for the triggering event.
    ///
    /// Flows that can update without interaction are posted to the channel
    /// right away and `None` is returned; otherwise the message is handed
    /// back for the caller to respond with.
    pub async fn start_flow(
        &self,
        handle: &FlowHandle,
        props: FlowProps,
    ) -> Result<Option<Message>> {
        let flow = handle.flow();
        let fresh = flow.render_fresh(props, self.source.clone(), &self.app.inner.codec)?;

        if flow.options().can_update_without_interaction {
            if self.target.channel_id.is_none() {
                return Err(Error::MissingChannel);
            }
            let target = MessageTarget {
                response_url: None,
                ..self.target.clone()
            };
            self.app
                .create_with_continuation(fresh.message, target, fresh.continuation)
                .await?;
            return Ok(None);
        }

        if fresh.continuation.is_some() {
            return Err(Error::EffectsRequireUpdate(flow.name().to_string()));
        }
        Ok(Some(fresh.message))
    }

    /// Render a flow and always post it as a new message.
    pub async fn start_flow_and_post(&self, handle: &FlowHandle, props: FlowProps) -> Result<()> {
        if self.target.channel_id.is_none() && self.target.response_url.is_none() {
            return Err(Error::MissingChannel);
        }
        let fresh = handle
            .flow()
            .render_fresh(props, self.source.clone(), &self.app.inner.codec)?;
        self.app
            .create_with_continuation(fresh.message, self.target.clone(), fresh.continuation)
            .await
    }

    pub async fn start_flow_typed<T: Serialize>(
        &self,
        handle: &FlowHandle,
        props: &T,
    ) -> Result<Option<Message>> {
        self.start_flow(handle, FlowProps::from_typed(props)?).await
    }

    pub async fn start_flow_and_post_typed<T: Serialize>(
        &self,
        handle: &FlowHandle,
        props: &T,
    ) -> Result<()> {
        self.start_flow_and_post(handle, FlowProps::from_typed(props)?)
            .await
    }

    /// Open `message` as a modal. The envelope rides in the view's private
    /// field since modals do not echo message metadata.
    pub async fn open_modal(&self, message: &Message, trigger_id: &str) -> Result<()> {
        if !message.is_modal() {
            return Err(Error::NotAModal);
        }
        let private = private_field(&self.app.inner.codec, message)?;
        self.app
            .inner
            .io
            .open_view(message, &private, trigger_id)
            .await
            .map_err(Error::MessageIo)
    }
}
