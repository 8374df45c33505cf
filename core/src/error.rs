use crate::hook::HookKind;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Describes how a render pass disagreed with the stored hook ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceMismatch {
    /// The render declared a hook past the end of the stored ledger.
    OutOfRange {
        index: usize,
        stored: usize,
        declared: HookKind,
    },
    /// The hook at `index` has a different kind than the one declared.
    KindDiffers {
        index: usize,
        stored: HookKind,
        declared: HookKind,
    },
    /// The pass completed with fewer (or more) hooks than the ledger holds.
    LengthDiffers {
        stored: Vec<HookKind>,
        declared: Vec<HookKind>,
    },
}

impl fmt::Display for SequenceMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceMismatch::OutOfRange {
                index,
                stored,
                declared,
            } => write!(
                f,
                "hook #{} ({}) declared but only {} stored",
                index + 1,
                declared,
                stored
            ),
            SequenceMismatch::KindDiffers {
                index,
                stored,
                declared,
            } => write!(
                f,
                "hook #{} is different: stored {} vs declared {}",
                index + 1,
                stored,
                declared
            ),
            SequenceMismatch::LengthDiffers { stored, declared } => {
                write!(f, "stored {:?} vs declared {:?}", stored, declared)
            }
        }
    }
}

/// Errors raised by the reconciliation engine.
///
/// None of these are retried by the engine. Sequence mismatches mean the
/// render function is not deterministic in its hook declarations; the
/// `Unknown*` family means the inbound event is stale or forged.
#[derive(Error, Debug)]
pub enum Error {
    #[error("must use the same amount and type of hooks in all renders: {0}")]
    HookSequenceMismatch(SequenceMismatch),

    #[error("unknown callback: {0}")]
    UnknownCallback(String),

    #[error("unknown flow: {0}")]
    UnknownFlow(String),

    #[error("unknown state hook: {0}")]
    UnknownStateIndex(usize),

    #[error("missing hookwire metadata")]
    MissingMetadata,

    #[error("invalid hookwire metadata: {0}")]
    InvalidMetadata(#[source] serde_json::Error),

    #[error("failed to serialize value: {0}")]
    Marshal(#[source] serde_json::Error),

    #[error("invalid state type for hook {index}: {source}")]
    InvalidState {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid flow props: {0}")]
    InvalidProps(#[source] serde_json::Error),

    #[error("metadata is {size} bytes, the limit is {limit}")]
    MetadataTooLarge { size: usize, limit: usize },

    /// Failure raised by user code: a render function, callback or effect.
    #[error(transparent)]
    Render(#[from] anyhow::Error),
}

impl Error {
    /// True for errors caused by an inbound event that no longer matches the
    /// stored ledger (stale button, forged identifier).
    pub fn is_stale_event(&self) -> bool {
        matches!(
            self,
            Error::UnknownCallback(_) | Error::UnknownFlow(_) | Error::UnknownStateIndex(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_messages_are_one_based() {
        let err = Error::HookSequenceMismatch(SequenceMismatch::KindDiffers {
            index: 1,
            stored: HookKind::State,
            declared: HookKind::Callback,
        });
        assert_eq!(
            err.to_string(),
            "must use the same amount and type of hooks in all renders: hook #2 is different: stored state vs declared callback"
        );
    }

    #[test]
    fn test_stale_event_classification() {
        assert!(Error::UnknownCallback("x".into()).is_stale_event());
        assert!(Error::UnknownStateIndex(3).is_stale_event());
        assert!(!Error::MissingMetadata.is_stale_event());
    }
}
