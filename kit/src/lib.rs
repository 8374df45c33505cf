//! hookwire facade crate.
//!
//! Re-exports the engine and the orchestrator behind a single entry point.
//! A flow is a render function over hooks; the [`App`] decides where each
//! render goes.

pub use hookwire_core as core;
#[cfg(feature = "observe")]
pub use hookwire_observe as observe;
pub use hookwire_runtime as runtime;

pub use hookwire_core::{Flow, FlowProps, Message, View};
pub use hookwire_runtime::{App, AppBuilder, RuntimeConfig};

pub mod prelude {
    pub use hookwire_core::prelude::*;
    pub use hookwire_runtime::prelude::*;
}
