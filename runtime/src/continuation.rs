//! # Async Continuation Dispatcher
//!
//! Start effects run after the first message exists. The dispatcher spawns
//! one detached task per continuation; the task owns copies of every
//! identifier it needs and reports failure only through `tracing`.

use crate::error::{Error, Result};
use crate::io::{MessageIo, MessageTarget};
use hookwire_core::{AsyncData, Continuation, Message, MessageMetadata, MetadataCodec};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info_span};

#[derive(Clone)]
pub struct ContinuationDispatcher {
    io: Arc<dyn MessageIo>,
    codec: MetadataCodec,
}

impl ContinuationDispatcher {
    pub fn new(io: Arc<dyn MessageIo>, codec: MetadataCodec) -> Self {
        Self { io, codec }
    }

    /// Run `continuation` in the background against the message that was
    /// just created with `created`.
    pub fn dispatch(
        &self,
        continuation: Continuation,
        created: Option<MessageMetadata>,
        async_data: AsyncData,
    ) -> JoinHandle<()> {
        let io = Arc::clone(&self.io);
        let codec = self.codec.clone();
        let flow = continuation.flow().name().to_string();
        let span = info_span!("continuation", hookwire.flow = %flow);

        debug!(
            flow = %flow,
            effects = continuation.effect_count(),
            durable = async_data.has_durable_identity(),
            "dispatching continuation"
        );

        tokio::spawn(
            async move {
                if let Err(err) = run(io, codec, continuation, created, async_data).await {
                    error!(flow = %flow, error = %err, "continuation failed");
                }
            }
            .instrument(span),
        )
    }
}

async fn run(
    io: Arc<dyn MessageIo>,
    codec: MetadataCodec,
    continuation: Continuation,
    created: Option<MessageMetadata>,
    async_data: AsyncData,
) -> Result<()> {
    let decoded = codec.decode(created.as_ref(), None)?;
    let message = continuation.run(decoded, async_data.clone(), &codec).await?;
    deliver(io.as_ref(), &codec, &message, &MessageTarget::from_async_data(&async_data)).await
}

/// Send an updated render to wherever the flow lives.
pub(crate) async fn deliver(
    io: &dyn MessageIo,
    codec: &MetadataCodec,
    message: &Message,
    target: &MessageTarget,
) -> Result<()> {
    if target.is_home {
        let private = private_field(codec, message)?;
        io.publish_surface(message, &private, target)
            .await
            .map_err(Error::MessageIo)
    } else {
        io.update_message(message, target)
            .await
            .map_err(Error::MessageIo)
    }
}

pub(crate) fn private_field(codec: &MetadataCodec, message: &Message) -> Result<String> {
    match &message.metadata {
        Some(metadata) => Ok(codec.to_private_field(metadata)?),
        None => Ok(String::new()),
    }
}
