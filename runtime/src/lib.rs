//! # hookwire-runtime
//!
//! Orchestrates [`hookwire_core`] flows against inbound chat-platform events.
//!
//! * [`AppBuilder`] registers flows and handlers.
//! * [`App`] routes slash commands and interactions, resumes async state and
//!   publishes home tabs.
//! * [`MessageIo`] is the seam to the platform client.
//! * [`ContinuationDispatcher`] runs start effects in the background.

pub mod app;
pub mod builder;
pub mod config;
pub mod continuation;
pub mod error;
pub mod event;
pub mod io;

pub use app::{App, EventContext, FlowHandle, ShortcutHandler, SlashHandler, ViewSubmittedHandler};
pub use builder::AppBuilder;
pub use config::{AppOptions, ErrorFormatter, RuntimeConfig};
pub use continuation::ContinuationDispatcher;
pub use error::{Error, Result};
pub use event::{
    ContainerMessage, IdRef, InteractionCallback, InteractionType, ResponseUrl, SlashCommand,
    ViewInfo, ViewType,
};
pub use io::{MessageIo, MessageTarget, StoredMessage};

pub mod prelude {
    pub use crate::app::{App, EventContext, FlowHandle};
    pub use crate::builder::AppBuilder;
    pub use crate::config::{AppOptions, RuntimeConfig};
    pub use crate::event::{InteractionCallback, SlashCommand};
    pub use crate::io::{MessageIo, MessageTarget, StoredMessage};
}
