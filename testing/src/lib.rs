//! # hookwire-test
//!
//! Helpers for exercising flows without a chat platform:
//!
//! * [`InMemoryMessageIo`] records every collaborator call and keeps posted
//!   messages so async resumptions can fetch them back.
//! * [`fixtures`] builds inbound events and a demo counter flow.

pub mod fixtures;
pub mod memory;

pub use memory::{InMemoryMessageIo, IoCall};

use hookwire_core::{MessageMetadata, MetadataCodec};

/// Decode and return the hook kinds stored in `metadata`, for assertions.
pub fn ledger_kinds(codec: &MetadataCodec, metadata: Option<&MessageMetadata>) -> Vec<String> {
    codec
        .decode(metadata, None)
        .map(|decoded| {
            decoded
                .envelope
                .ledger
                .kinds()
                .iter()
                .map(|k| k.to_string())
                .collect()
        })
        .unwrap_or_default()
}
