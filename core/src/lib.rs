//! # hookwire-core
//!
//! Render/hook reconciliation engine for interactive chat messages.
//!
//! A [`Flow`] is a render function that declares hooks (state, callbacks,
//! start effects) through a [`RenderContext`]. The resulting hook ledger is
//! serialized into the outgoing message's metadata, so a later, unrelated
//! webhook delivery can rebuild the exact hook sequence and continue where
//! the last render stopped. Nothing is kept server-side.
//!
//! This crate does no I/O; see `hookwire-runtime` for the orchestrator.

pub mod context;
pub mod document;
pub mod error;
pub mod flow;
pub mod hook;
pub mod hooks;
pub mod metadata;
pub mod props;
pub mod source;

pub use context::{
    BoxFuture, CallbackFn, EffectContext, EffectFn, PassMode, RenderContext, StateSetter,
    callback_id,
};
pub use document::{
    Block, BlockAction, ButtonStyle, Element, Message, ModalConfig, ResponseType, SelectOption,
    Text, View,
};
pub use error::{Error, Result, SequenceMismatch};
pub use flow::{
    CallbackDispatch, Continuation, Flow, FlowOptions, FreshRender, Mutation, Stage, StateResume,
};
pub use hook::{Hook, HookKind, HookLedger, SharedLedger};
pub use hooks::{
    AsyncSetter, SetState, use_callback, use_callback_sync, use_effect, use_state, use_state_with,
};
pub use metadata::{
    DEFAULT_EVENT_TYPE, DEFAULT_MAX_METADATA_BYTES, DecodedEnvelope, Envelope, METADATA_KEY,
    MessageMetadata, MetadataCodec,
};
pub use props::FlowProps;
pub use source::{AsyncData, SourceInfo};

pub mod prelude {
    pub use crate::document::{Block, BlockAction, Element, Message, ModalConfig, Text, View};
    pub use crate::error::{Error, Result};
    pub use crate::flow::Flow;
    pub use crate::hooks::{
        SetState, use_callback, use_callback_sync, use_effect, use_state, use_state_with,
    };
    pub use crate::props::FlowProps;
    pub use crate::source::{AsyncData, SourceInfo};
    pub use crate::{EffectContext, RenderContext};
}
