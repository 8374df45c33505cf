//! A [`MessageIo`] that prints every platform call and keeps posted
//! messages in memory so they can be fetched back.

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use hookwire_core::Message;
use hookwire_runtime::{MessageIo, MessageTarget, StoredMessage};
use parking_lot::Mutex;

/// A message as the console collaborator last saw it.
#[derive(Debug, Clone)]
pub struct Posted {
    pub ts: String,
    pub message: Message,
}

#[derive(Default)]
pub struct ConsoleIo {
    messages: Mutex<Vec<Posted>>,
    home: Mutex<Option<StoredMessage>>,
    quiet: bool,
}

impl ConsoleIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep state but print nothing.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    /// The most recently created message.
    pub fn latest(&self) -> Option<Posted> {
        self.messages.lock().last().cloned()
    }

    pub fn posted(&self, ts: &str) -> Option<Posted> {
        self.messages.lock().iter().find(|p| p.ts == ts).cloned()
    }

    fn log(&self, op: &str, target: &str, message: &Message) {
        if self.quiet {
            return;
        }
        println!(
            "{} {:<8} {:<22} {}",
            Utc::now().format("%H:%M:%S%.3f"),
            op,
            target,
            message.text.as_deref().unwrap_or("<blocks>")
        );
    }
}

#[async_trait]
impl MessageIo for ConsoleIo {
    async fn create_message(
        &self,
        message: &Message,
        target: &MessageTarget,
    ) -> anyhow::Result<Option<String>> {
        let Some(channel) = target.channel_id.as_deref() else {
            bail!("console collaborator only posts to channels");
        };
        let ts = {
            let mut messages = self.messages.lock();
            let ts = format!("{}.{:06}", Utc::now().timestamp(), messages.len() + 1);
            messages.push(Posted {
                ts: ts.clone(),
                message: message.clone(),
            });
            ts
        };
        self.log("create", &format!("{}/{}", channel, ts), message);
        Ok(Some(ts))
    }

    async fn update_message(
        &self,
        message: &Message,
        target: &MessageTarget,
    ) -> anyhow::Result<()> {
        let ts = target
            .message_ts
            .as_deref()
            .ok_or_else(|| anyhow!("console collaborator updates by timestamp only"))?;
        {
            let mut messages = self.messages.lock();
            let posted = messages
                .iter_mut()
                .find(|p| p.ts == ts)
                .ok_or_else(|| anyhow!("message {} not found", ts))?;
            posted.message = message.clone();
        }
        self.log("update", ts, message);
        Ok(())
    }

    async fn publish_surface(
        &self,
        message: &Message,
        private_metadata: &str,
        target: &MessageTarget,
    ) -> anyhow::Result<()> {
        *self.home.lock() = Some(StoredMessage {
            ts: String::new(),
            text: message.text.clone(),
            metadata: None,
            private_metadata: Some(private_metadata.to_string()),
        });
        self.log("publish", &format!("home/{}", target.user_id), message);
        Ok(())
    }

    async fn open_view(
        &self,
        message: &Message,
        _private_metadata: &str,
        trigger_id: &str,
    ) -> anyhow::Result<()> {
        self.log("open", trigger_id, message);
        Ok(())
    }

    async fn fetch_message(&self, target: &MessageTarget) -> anyhow::Result<StoredMessage> {
        if target.is_home {
            return self
                .home
                .lock()
                .clone()
                .ok_or_else(|| anyhow!("no home view published"));
        }
        let ts = target
            .message_ts
            .as_deref()
            .ok_or_else(|| anyhow!("fetch requires a message timestamp"))?;
        self.posted(ts)
            .map(|p| StoredMessage {
                ts: p.ts,
                text: p.message.text,
                metadata: p.message.metadata,
                private_metadata: None,
            })
            .ok_or_else(|| anyhow!("message {} not found", ts))
    }
}
