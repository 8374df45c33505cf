use crate::app::{
    App, AppInner, EventContext, FlowHandle, ShortcutHandler, SlashHandler, ViewSubmittedHandler,
};
use crate::config::{AppOptions, RuntimeConfig};
use crate::continuation::ContinuationDispatcher;
use crate::error::{Error, Result};
use crate::event::{InteractionCallback, SlashCommand};
use crate::io::MessageIo;
use futures_util::FutureExt;
use hookwire_core::{BoxFuture, Flow, Message};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

fn slash_handler<F, Fut>(handler: F) -> SlashHandler
where
    F: Fn(EventContext, SlashCommand) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Message>>> + Send + 'static,
{
    Arc::new(
        move |ctx, cmd| -> BoxFuture<'static, Result<Option<Message>>> {
            handler(ctx, cmd).boxed()
        },
    )
}

fn shortcut_handler<F, Fut>(handler: F) -> ShortcutHandler
where
    F: Fn(EventContext, InteractionCallback) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(
        move |ctx, interaction| -> BoxFuture<'static, Result<()>> {
            handler(ctx, interaction).boxed()
        },
    )
}

/// Collects flows and event handlers, then builds an [`App`].
#[derive(Default)]
pub struct AppBuilder {
    flows: HashMap<String, Flow>,
    slashes: HashMap<String, SlashHandler>,
    unknown_slash: Option<SlashHandler>,
    global_shortcuts: HashMap<String, ShortcutHandler>,
    message_shortcuts: HashMap<String, ShortcutHandler>,
    unknown_shortcut: Option<ShortcutHandler>,
    view_submitted: HashMap<String, ViewSubmittedHandler>,
    options: AppOptions,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flow. Names identify flows inside message metadata, so they
    /// must be unique.
    pub fn add_flow(&mut self, flow: Flow) -> Result<FlowHandle> {
        if self.flows.contains_key(flow.name()) {
            return Err(Error::DuplicateFlow(flow.name().to_string()));
        }
        self.flows.insert(flow.name().to_string(), flow.clone());
        Ok(FlowHandle::new(flow))
    }

    pub fn add_slash<F, Fut>(&mut self, command: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(EventContext, SlashCommand) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Message>>> + Send + 'static,
    {
        self.slashes.insert(command.into(), slash_handler(handler));
        self
    }

    pub fn handle_unknown_slash<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(EventContext, SlashCommand) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Message>>> + Send + 'static,
    {
        self.unknown_slash = Some(slash_handler(handler));
        self
    }

    pub fn add_global_shortcut<F, Fut>(
        &mut self,
        callback_id: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(EventContext, InteractionCallback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.global_shortcuts
            .insert(callback_id.into(), shortcut_handler(handler));
        self
    }

    pub fn add_message_shortcut<F, Fut>(
        &mut self,
        callback_id: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(EventContext, InteractionCallback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.message_shortcuts
            .insert(callback_id.into(), shortcut_handler(handler));
        self
    }

    pub fn handle_unknown_shortcut<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(EventContext, InteractionCallback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.unknown_shortcut = Some(shortcut_handler(handler));
        self
    }

    /// Handle submissions of modals rendered by `flow`.
    pub fn on_view_submitted<F, Fut>(&mut self, flow: &FlowHandle, handler: F) -> &mut Self
    where
        F: Fn(EventContext, InteractionCallback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.view_submitted
            .insert(flow.name().to_string(), shortcut_handler(handler));
        self
    }

    pub fn options(&mut self, options: AppOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn build(self, io: Arc<dyn MessageIo>, config: RuntimeConfig) -> App {
        let codec = config.codec();
        let dispatcher = ContinuationDispatcher::new(Arc::clone(&io), codec.clone());
        App::from_inner(AppInner {
            flows: self.flows,
            slashes: self.slashes,
            unknown_slash: self.unknown_slash,
            global_shortcuts: self.global_shortcuts,
            message_shortcuts: self.message_shortcuts,
            unknown_shortcut: self.unknown_shortcut,
            view_submitted: self.view_submitted,
            io,
            codec,
            dispatcher,
            options: self.options,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookwire_core::View;

    #[test]
    fn test_duplicate_flow_names_are_rejected() {
        let mut builder = AppBuilder::new();
        let handle = builder
            .add_flow(Flow::new("poll", |_| Ok(View::new())))
            .unwrap();
        assert_eq!(handle.name(), "poll");

        let err = builder
            .add_flow(Flow::new("poll", |_| Ok(View::new().text("again"))))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateFlow(name) if name == "poll"));
    }
}
