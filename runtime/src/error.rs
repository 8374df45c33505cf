use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the orchestrator.
///
/// Engine failures arrive wrapped in [`Error::Core`]; everything else is
/// about routing an inbound event or talking to the message collaborator.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] hookwire_core::Error),

    #[error("message I/O failed: {0}")]
    MessageIo(#[source] anyhow::Error),

    #[error("flow already registered: {0}")]
    DuplicateFlow(String),

    #[error("cannot post a flow without a channel")]
    MissingChannel,

    #[error("flow {0} declares start effects but cannot update without interaction")]
    EffectsRequireUpdate(String),

    #[error("message has no modal configuration")]
    NotAModal,

    #[error("home update requires a message")]
    HomeRequiresMessage,

    #[error("unsupported interaction type: {0}")]
    UnsupportedInteraction(String),

    #[error("no handler for slash command {0}")]
    UnknownCommand(String),

    #[error("no handler for shortcut {0}")]
    UnknownShortcut(String),

    #[error("no submission handler for flow {0}")]
    UnknownViewSubmission(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failure raised inside a user-supplied event handler.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl Error {
    /// True when the inbound event referenced something the stored ledger
    /// does not know about.
    pub fn is_stale_event(&self) -> bool {
        matches!(self, Error::Core(err) if err.is_stale_event())
    }
}
