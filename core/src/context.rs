//! # Render Context
//!
//! Per-pass object handed to a flow's render function. It owns the cursor
//! over the hook ledger and enforces that every pass declares the same
//! ordered hook kinds.
//!
//! The ledger itself is shared (`Arc<Mutex<_>>`) between the passes of one
//! logical operation and the setters those passes handed out, so a setter
//! captured in a callback during the populate pass writes the ledger the
//! commit pass reads.

use crate::document::BlockAction;
use crate::error::{Error, Result, SequenceMismatch};
use crate::hook::{Hook, HookKind, HookLedger, SharedLedger};
use crate::metadata::Envelope;
use crate::props::FlowProps;
use crate::source::{AsyncData, SourceInfo};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for async boxed futures used by callbacks and effects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// In-memory callback handler. Never serialized; rebound on every pass.
pub type CallbackFn = Arc<dyn Fn(BlockAction) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// One-shot start effect.
pub type EffectFn = Box<dyn FnOnce(EffectContext) -> BoxFuture<'static, Result<()>> + Send>;

/// Generate the callback identifier for a hook. Deterministic in the flow name
/// and the hook position, so it stays valid for the life of the message.
pub fn callback_id(flow: &str, index: usize) -> String {
    format!("hw_{}_cb_{:x}", flow, index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    /// No prior ledger: declarations are appended.
    Fresh,
    /// Declarations are matched positionally against the ledger.
    Resume,
}

/// What a start effect gets to work with once the message exists.
#[derive(Debug, Clone)]
pub struct EffectContext {
    pub source: SourceInfo,
    pub async_data: AsyncData,
}

/// Writes one state hook of the current ledger.
#[derive(Debug, Clone)]
pub struct StateSetter {
    ledger: SharedLedger,
    index: usize,
}

impl StateSetter {
    pub fn set(&self, value: Value) -> Result<()> {
        self.ledger.lock().update_state(self.index, value)
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

pub struct RenderContext {
    flow: String,
    mode: PassMode,
    cursor: usize,
    declared: Vec<HookKind>,
    ledger: SharedLedger,
    handlers: HashMap<usize, CallbackFn>,
    effects: Vec<EffectFn>,
    props: FlowProps,
    source: SourceInfo,
    async_data: Option<AsyncData>,
}

impl RenderContext {
    /// Context for a first render with an empty ledger.
    pub fn fresh(flow: impl Into<String>, props: FlowProps, source: SourceInfo) -> Self {
        Self::with_ledger(
            flow.into(),
            PassMode::Fresh,
            HookLedger::new(),
            props,
            source,
            None,
        )
    }

    /// Context resuming from a decoded envelope.
    pub fn resume(envelope: Envelope, source: SourceInfo, async_data: Option<AsyncData>) -> Self {
        let Envelope {
            flow,
            ledger,
            props,
        } = envelope;
        Self::with_ledger(flow, PassMode::Resume, ledger, props, source, async_data)
    }

    fn with_ledger(
        flow: String,
        mode: PassMode,
        ledger: HookLedger,
        props: FlowProps,
        source: SourceInfo,
        async_data: Option<AsyncData>,
    ) -> Self {
        Self {
            flow,
            mode,
            cursor: 0,
            declared: Vec::new(),
            ledger: ledger.into_shared(),
            handlers: HashMap::new(),
            effects: Vec::new(),
            props,
            source,
            async_data,
        }
    }

    pub fn flow_name(&self) -> &str {
        &self.flow
    }

    pub fn mode(&self) -> PassMode {
        self.mode
    }

    pub fn props(&self) -> &FlowProps {
        &self.props
    }

    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    /// Present on every resumption pass, absent on fresh renders.
    pub fn async_data(&self) -> Option<&AsyncData> {
        self.async_data.as_ref()
    }

    /// Declare a state hook.
    ///
    /// On a fresh pass `init` supplies the value; on a resumption the stored
    /// value is returned and `init` is never called.
    pub fn add_state<F>(&mut self, init: F) -> Result<(usize, Value, StateSetter)>
    where
        F: FnOnce() -> Result<Value>,
    {
        let (index, prior) = self.fetch_hook(HookKind::State)?;
        let value = match prior {
            Some(hook) => hook.value(),
            None => {
                let value = init()?;
                self.ledger.lock().update_state(index, value.clone())?;
                value
            }
        };
        let setter = StateSetter {
            ledger: Arc::clone(&self.ledger),
            index,
        };
        Ok((index, value, setter))
    }

    /// Declare a callback hook and bind its handler for this pass.
    pub fn add_callback(&mut self, handler: CallbackFn) -> Result<String> {
        let (index, prior) = self.fetch_hook(HookKind::Callback)?;
        let id = match prior.and_then(|hook| hook.callback_id) {
            Some(id) => id,
            None => {
                let id = callback_id(&self.flow, index);
                self.ledger.lock().set_callback_id(index, id.clone());
                id
            }
        };
        self.handlers.insert(index, handler);
        Ok(id)
    }

    /// Declare a start effect. Only a fresh pass keeps it.
    pub fn add_effect(&mut self, effect: EffectFn) -> Result<()> {
        self.fetch_hook(HookKind::EffectStart)?;
        if self.mode == PassMode::Fresh {
            self.effects.push(effect);
        }
        Ok(())
    }

    fn fetch_hook(&mut self, kind: HookKind) -> Result<(usize, Option<Hook>)> {
        let index = self.cursor;
        self.cursor += 1;
        self.declared.push(kind);

        let mut ledger = self.ledger.lock();
        match self.mode {
            PassMode::Fresh => {
                ledger.push(Hook::new(kind));
                Ok((index, None))
            }
            PassMode::Resume => match ledger.get(index) {
                None => Err(Error::HookSequenceMismatch(SequenceMismatch::OutOfRange {
                    index,
                    stored: ledger.len(),
                    declared: kind,
                })),
                Some(hook) if hook.kind != kind => {
                    Err(Error::HookSequenceMismatch(SequenceMismatch::KindDiffers {
                        index,
                        stored: hook.kind,
                        declared: kind,
                    }))
                }
                Some(hook) => Ok((index, Some(hook.clone()))),
            },
        }
    }

    /// Reset the cursor and handler table before a pass.
    pub(crate) fn begin_pass(&mut self) {
        self.cursor = 0;
        self.declared.clear();
        self.handlers.clear();
    }

    /// Close a pass. A resumption must have declared exactly as many hooks as
    /// the ledger holds; afterwards every further pass is a resumption.
    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.mode == PassMode::Resume {
            let ledger = self.ledger.lock();
            if self.cursor != ledger.len() {
                return Err(Error::HookSequenceMismatch(
                    SequenceMismatch::LengthDiffers {
                        stored: ledger.kinds(),
                        declared: self.declared.clone(),
                    },
                ));
            }
        }
        self.mode = PassMode::Resume;
        Ok(())
    }

    /// Invoke the handler bound to `id` during the last pass.
    pub async fn trigger_callback(&mut self, id: &str, action: BlockAction) -> Result<()> {
        let index = self
            .ledger
            .lock()
            .callback_index(id)
            .ok_or_else(|| Error::UnknownCallback(id.to_string()))?;
        let handler = self
            .handlers
            .get(&index)
            .cloned()
            .ok_or_else(|| Error::UnknownCallback(id.to_string()))?;
        handler(action).await
    }

    /// Write a state value directly, bypassing any setter.
    pub fn update_state(&mut self, index: usize, value: Value) -> Result<()> {
        self.ledger.lock().update_state(index, value)
    }

    pub fn take_effects(&mut self) -> Vec<EffectFn> {
        std::mem::take(&mut self.effects)
    }

    /// Snapshot of the current ledger.
    pub fn ledger(&self) -> HookLedger {
        self.ledger.lock().clone()
    }

    pub fn shared_ledger(&self) -> SharedLedger {
        Arc::clone(&self.ledger)
    }
}
