//! Recording, in-memory [`MessageIo`].

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use hookwire_core::Message;
use hookwire_runtime::{MessageIo, MessageTarget, StoredMessage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;

/// One call the engine made against the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum IoCall {
    Create {
        target: MessageTarget,
        message: Message,
        ts: Option<String>,
    },
    Update {
        target: MessageTarget,
        message: Message,
    },
    PublishSurface {
        target: MessageTarget,
        message: Message,
        private_metadata: String,
    },
    OpenView {
        trigger_id: String,
        message: Message,
        private_metadata: String,
    },
    Fetch {
        target: MessageTarget,
    },
}

#[derive(Default)]
struct State {
    calls: Vec<IoCall>,
    messages: HashMap<String, StoredMessage>,
    homes: HashMap<(String, String), StoredMessage>,
    next_ts: u64,
}

/// Stands in for the platform client.
///
/// Channel posts get a durable timestamp unless built with
/// [`InMemoryMessageIo::without_durable_identity`]. Every update or surface
/// publish bumps a counter tests can wait on, which is how background
/// continuations are observed.
pub struct InMemoryMessageIo {
    state: Mutex<State>,
    durable: bool,
    fail_fetch: bool,
    writes: watch::Sender<usize>,
}

impl Default for InMemoryMessageIo {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageIo {
    pub fn new() -> Self {
        let (writes, _) = watch::channel(0);
        Self {
            state: Mutex::new(State::default()),
            durable: true,
            fail_fetch: false,
            writes,
        }
    }

    /// `create_message` never returns a timestamp, like a response-URL reply.
    pub fn without_durable_identity() -> Self {
        Self {
            durable: false,
            ..Self::new()
        }
    }

    /// `fetch_message` always fails.
    pub fn with_failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn calls(&self) -> Vec<IoCall> {
        self.state.lock().calls.clone()
    }

    pub fn created(&self) -> Vec<Message> {
        self.filter(|call| match call {
            IoCall::Create { message, .. } => Some(message.clone()),
            _ => None,
        })
    }

    /// Messages sent through `update_message`, oldest first.
    pub fn updates(&self) -> Vec<Message> {
        self.filter(|call| match call {
            IoCall::Update { message, .. } => Some(message.clone()),
            _ => None,
        })
    }

    pub fn update_targets(&self) -> Vec<MessageTarget> {
        self.filter(|call| match call {
            IoCall::Update { target, .. } => Some(target.clone()),
            _ => None,
        })
    }

    pub fn published(&self) -> Vec<(Message, String)> {
        self.filter(|call| match call {
            IoCall::PublishSurface {
                message,
                private_metadata,
                ..
            } => Some((message.clone(), private_metadata.clone())),
            _ => None,
        })
    }

    pub fn opened_views(&self) -> Vec<(String, Message, String)> {
        self.filter(|call| match call {
            IoCall::OpenView {
                trigger_id,
                message,
                private_metadata,
            } => Some((trigger_id.clone(), message.clone(), private_metadata.clone())),
            _ => None,
        })
    }

    pub fn stored(&self, ts: &str) -> Option<StoredMessage> {
        self.state.lock().messages.get(ts).cloned()
    }

    pub fn home(&self, team_id: &str, user_id: &str) -> Option<StoredMessage> {
        self.state
            .lock()
            .homes
            .get(&(team_id.to_string(), user_id.to_string()))
            .cloned()
    }

    /// Wait until at least `count` updates or publishes happened.
    pub async fn wait_for_writes(&self, count: usize, timeout: Duration) -> bool {
        let mut rx = self.writes.subscribe();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|n| *n >= count)).await,
            Ok(Ok(_))
        )
    }

    fn filter<T>(&self, pick: impl Fn(&IoCall) -> Option<T>) -> Vec<T> {
        self.state.lock().calls.iter().filter_map(pick).collect()
    }

    fn record(&self, call: IoCall) {
        self.state.lock().calls.push(call);
    }

    fn bump_writes(&self) {
        self.writes.send_modify(|n| *n += 1);
    }
}

#[async_trait]
impl MessageIo for InMemoryMessageIo {
    async fn create_message(
        &self,
        message: &Message,
        target: &MessageTarget,
    ) -> anyhow::Result<Option<String>> {
        let mut state = self.state.lock();
        let ts = if self.durable && target.channel_id.is_some() {
            state.next_ts += 1;
            let ts = format!("1700000000.{:06}", state.next_ts);
            state.messages.insert(
                ts.clone(),
                StoredMessage {
                    ts: ts.clone(),
                    text: message.text.clone(),
                    metadata: message.metadata.clone(),
                    private_metadata: None,
                },
            );
            Some(ts)
        } else {
            None
        };
        state.calls.push(IoCall::Create {
            target: target.clone(),
            message: message.clone(),
            ts: ts.clone(),
        });
        Ok(ts)
    }

    async fn update_message(
        &self,
        message: &Message,
        target: &MessageTarget,
    ) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock();
            if let Some(stored) = target
                .message_ts
                .as_ref()
                .and_then(|ts| state.messages.get_mut(ts))
            {
                stored.text = message.text.clone();
                stored.metadata = message.metadata.clone();
            }
            state.calls.push(IoCall::Update {
                target: target.clone(),
                message: message.clone(),
            });
        }
        self.bump_writes();
        Ok(())
    }

    async fn publish_surface(
        &self,
        message: &Message,
        private_metadata: &str,
        target: &MessageTarget,
    ) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock();
            state.homes.insert(
                (target.team_id.clone(), target.user_id.clone()),
                StoredMessage {
                    ts: String::new(),
                    text: message.text.clone(),
                    metadata: None,
                    private_metadata: Some(private_metadata.to_string()),
                },
            );
            state.calls.push(IoCall::PublishSurface {
                target: target.clone(),
                message: message.clone(),
                private_metadata: private_metadata.to_string(),
            });
        }
        self.bump_writes();
        Ok(())
    }

    async fn open_view(
        &self,
        message: &Message,
        private_metadata: &str,
        trigger_id: &str,
    ) -> anyhow::Result<()> {
        self.record(IoCall::OpenView {
            trigger_id: trigger_id.to_string(),
            message: message.clone(),
            private_metadata: private_metadata.to_string(),
        });
        Ok(())
    }

    async fn fetch_message(&self, target: &MessageTarget) -> anyhow::Result<StoredMessage> {
        self.record(IoCall::Fetch {
            target: target.clone(),
        });
        if self.fail_fetch {
            bail!("fetch disabled");
        }

        let state = self.state.lock();
        if target.is_home {
            return state
                .homes
                .get(&(target.team_id.clone(), target.user_id.clone()))
                .cloned()
                .ok_or_else(|| anyhow!("no home view for {}", target.user_id));
        }
        let ts = target
            .message_ts
            .as_ref()
            .ok_or_else(|| anyhow!("fetch requires a message timestamp"))?;
        state
            .messages
            .get(ts)
            .cloned()
            .ok_or_else(|| anyhow!("message {} not found", ts))
    }
}
