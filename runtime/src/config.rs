//! Runtime configuration.
//!
//! Defaults, then an optional TOML file, then `HOOKWIRE_*` environment
//! variables.

use crate::error::{Error, Result};
use hookwire_core::{DEFAULT_EVENT_TYPE, DEFAULT_MAX_METADATA_BYTES, Message, MetadataCodec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub const ENV_EVENT_TYPE: &str = "HOOKWIRE_EVENT_TYPE";
pub const ENV_MAX_METADATA_BYTES: &str = "HOOKWIRE_MAX_METADATA_BYTES";
pub const ENV_LOG: &str = "HOOKWIRE_LOG";

pub const DEFAULT_LOG_FILTER: &str = "info,hookwire_core=debug";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// `event_type` written into every outgoing metadata blob.
    pub metadata_event_type: String,
    pub max_metadata_bytes: usize,
    /// Directive used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            metadata_event_type: DEFAULT_EVENT_TYPE.to_string(),
            max_metadata_bytes: DEFAULT_MAX_METADATA_BYTES,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup, e.g. a map in tests.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(event_type) = lookup(ENV_EVENT_TYPE) {
            self.metadata_event_type = event_type;
        }
        if let Some(raw) = lookup(ENV_MAX_METADATA_BYTES) {
            self.max_metadata_bytes = raw.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a byte count, got {:?}",
                    ENV_MAX_METADATA_BYTES, raw
                ))
            })?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metadata_event_type.trim().is_empty() {
            return Err(Error::Config("metadata_event_type must not be empty".into()));
        }
        if self.max_metadata_bytes == 0 {
            return Err(Error::Config("max_metadata_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn codec(&self) -> MetadataCodec {
        MetadataCodec::new(self.metadata_event_type.clone(), self.max_metadata_bytes)
    }
}

/// Turns a handler error into the message shown to the user.
pub type ErrorFormatter = Arc<dyn Fn(&Error) -> Message + Send + Sync>;

#[derive(Clone, Default)]
pub struct AppOptions {
    pub error_formatter: Option<ErrorFormatter>,
}

impl fmt::Debug for AppOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppOptions")
            .field("error_formatter", &self.error_formatter.is_some())
            .finish()
    }
}

impl AppOptions {
    pub fn with_error_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Error) -> Message + Send + Sync + 'static,
    {
        self.error_formatter = Some(Arc::new(formatter));
        self
    }

    pub(crate) fn format_error(&self, err: &Error) -> Message {
        match &self.error_formatter {
            Some(formatter) => formatter(err),
            None => Message::ephemeral_text(format!("Something went wrong: {}", err)),
        }
    }
}
