//! # Hook Ledger
//!
//! The ledger is the ordered record of every hook a render pass declared.
//! Hooks are identified by position only: the ledger decoded from a message's
//! metadata is walked with a cursor on the next render, and the kinds must
//! line up one for one.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The kind of a declared hook. Serialized with the short wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookKind {
    #[serde(rename = "state")]
    State,
    #[serde(rename = "callback")]
    Callback,
    #[serde(rename = "effect-start")]
    EffectStart,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::State => "state",
            HookKind::Callback => "callback",
            HookKind::EffectStart => "effect-start",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted hook.
///
/// Callback handlers are never part of a `Hook`; only the identifier is
/// stored. The render context keeps handlers in a separate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    #[serde(rename = "k")]
    pub kind: HookKind,
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(rename = "cb", default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
}

impl Hook {
    pub fn new(kind: HookKind) -> Self {
        Self {
            kind,
            data: None,
            callback_id: None,
        }
    }

    pub fn state(value: Value) -> Self {
        Self {
            kind: HookKind::State,
            data: Some(value),
            callback_id: None,
        }
    }

    pub fn callback(id: impl Into<String>) -> Self {
        Self {
            kind: HookKind::Callback,
            data: None,
            callback_id: Some(id.into()),
        }
    }

    /// The stored state value. A missing `d` field reads as JSON `null`, which
    /// is how `Option::None` state round-trips through the wire format.
    pub fn value(&self) -> Value {
        self.data.clone().unwrap_or(Value::Null)
    }
}

/// Ordered sequence of hooks, unique by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookLedger {
    hooks: Vec<Hook>,
}

/// A ledger shared between the passes of one logical operation and the
/// setters/handlers those passes created.
pub type SharedLedger = Arc<Mutex<HookLedger>>;

impl HookLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_hooks(hooks: Vec<Hook>) -> Self {
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Hook> {
        self.hooks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hook> {
        self.hooks.iter()
    }

    /// Append a hook and return its sequence index.
    pub fn push(&mut self, hook: Hook) -> usize {
        self.hooks.push(hook);
        self.hooks.len() - 1
    }

    /// The ordered kind sequence, used to report mismatches.
    pub fn kinds(&self) -> Vec<HookKind> {
        self.hooks.iter().map(|h| h.kind).collect()
    }

    /// Overwrite the value of the state hook at `index`.
    pub fn update_state(&mut self, index: usize, value: Value) -> Result<()> {
        match self.hooks.get_mut(index) {
            Some(hook) if hook.kind == HookKind::State => {
                hook.data = Some(value);
                Ok(())
            }
            _ => Err(Error::UnknownStateIndex(index)),
        }
    }

    pub(crate) fn set_callback_id(&mut self, index: usize, id: String) {
        if let Some(hook) = self.hooks.get_mut(index) {
            hook.callback_id = Some(id);
        }
    }

    /// Position of the callback hook carrying `id`.
    pub fn callback_index(&self, id: &str) -> Option<usize> {
        self.hooks
            .iter()
            .position(|h| h.kind == HookKind::Callback && h.callback_id.as_deref() == Some(id))
    }

    /// Index/value pairs of every state hook.
    pub fn states(&self) -> impl Iterator<Item = (usize, Value)> + '_ {
        self.hooks
            .iter()
            .enumerate()
            .filter(|(_, h)| h.kind == HookKind::State)
            .map(|(i, h)| (i, h.value()))
    }

    pub fn into_hooks(self) -> Vec<Hook> {
        self.hooks
    }

    pub fn into_shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }
}

impl FromIterator<Hook> for HookLedger {
    fn from_iter<I: IntoIterator<Item = Hook>>(iter: I) -> Self {
        Self {
            hooks: iter.into_iter().collect(),
        }
    }
}
