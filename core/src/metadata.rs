//! # Metadata Codec
//!
//! The envelope `{ "f": flow, "h": ledger, "p": props }` is the only persisted
//! state of a flow. It lives under [`METADATA_KEY`] in the message's event
//! payload; surfaces that do not echo metadata back (home tab, modals) carry
//! the whole [`MessageMetadata`] JSON-encoded in a private field instead.

use crate::error::{Error, Result};
use crate::hook::HookLedger;
use crate::props::FlowProps;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved key inside `event_payload`. Fragments can never overwrite it.
pub const METADATA_KEY: &str = "__hookwire";
pub const DEFAULT_EVENT_TYPE: &str = "hookwire";
pub const DEFAULT_MAX_METADATA_BYTES: usize = 16 * 1024;

/// The platform's generic metadata channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub event_type: String,
    #[serde(default)]
    pub event_payload: Map<String, Value>,
}

impl MessageMetadata {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            event_payload: Map::new(),
        }
    }

    pub fn has_envelope(&self) -> bool {
        self.event_payload.contains_key(METADATA_KEY)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "f")]
    pub flow: String,
    #[serde(rename = "h", default, skip_serializing_if = "HookLedger::is_empty")]
    pub ledger: HookLedger,
    #[serde(rename = "p", default, skip_serializing_if = "FlowProps::is_empty")]
    pub props: FlowProps,
}

impl Envelope {
    pub fn new(flow: impl Into<String>, ledger: HookLedger, props: FlowProps) -> Self {
        Self {
            flow: flow.into(),
            ledger,
            props,
        }
    }
}

/// An envelope together with the metadata it was found in, so foreign keys
/// survive the next encode.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEnvelope {
    pub envelope: Envelope,
    pub original: MessageMetadata,
}

impl DecodedEnvelope {
    pub fn flow(&self) -> &str {
        &self.envelope.flow
    }
}

#[derive(Debug, Clone)]
pub struct MetadataCodec {
    event_type: String,
    max_bytes: usize,
}

impl Default for MetadataCodec {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_TYPE, DEFAULT_MAX_METADATA_BYTES)
    }
}

impl MetadataCodec {
    pub fn new(event_type: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            event_type: event_type.into(),
            max_bytes,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Recover the envelope from the embedded metadata, falling back to the
    /// private field.
    pub fn decode(
        &self,
        metadata: Option<&MessageMetadata>,
        private_field: Option<&str>,
    ) -> Result<DecodedEnvelope> {
        if let Some(metadata) = metadata.filter(|m| m.has_envelope()) {
            return Self::extract(metadata.clone());
        }

        match private_field.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                let metadata: MessageMetadata =
                    serde_json::from_str(raw).map_err(Error::InvalidMetadata)?;
                if !metadata.has_envelope() {
                    return Err(Error::MissingMetadata);
                }
                Self::extract(metadata)
            }
            None => Err(Error::MissingMetadata),
        }
    }

    fn extract(metadata: MessageMetadata) -> Result<DecodedEnvelope> {
        let raw = metadata
            .event_payload
            .get(METADATA_KEY)
            .cloned()
            .ok_or(Error::MissingMetadata)?;
        let envelope: Envelope = serde_json::from_value(raw).map_err(Error::InvalidMetadata)?;
        Ok(DecodedEnvelope {
            envelope,
            original: metadata,
        })
    }

    /// Build outgoing metadata: previous payload, then fragments, then the
    /// envelope under the reserved key. A previous non-empty `event_type` is
    /// kept; the configured one only applies to new messages.
    pub fn encode(
        &self,
        previous: Option<&MessageMetadata>,
        envelope: &Envelope,
        fragments: &Map<String, Value>,
    ) -> Result<MessageMetadata> {
        let mut payload = previous
            .map(|m| m.event_payload.clone())
            .unwrap_or_default();

        for (key, value) in fragments {
            if key != METADATA_KEY {
                payload.insert(key.clone(), value.clone());
            }
        }
        payload.insert(
            METADATA_KEY.to_string(),
            serde_json::to_value(envelope).map_err(Error::Marshal)?,
        );

        let event_type = previous
            .map(|m| m.event_type.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.event_type)
            .to_string();
        let metadata = MessageMetadata {
            event_type,
            event_payload: payload,
        };

        let size = serde_json::to_vec(&metadata).map_err(Error::Marshal)?.len();
        if size > self.max_bytes {
            return Err(Error::MetadataTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(metadata)
    }

    pub fn to_private_field(&self, metadata: &MessageMetadata) -> Result<String> {
        serde_json::to_string(metadata).map_err(Error::Marshal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::Hook;
    use serde_json::json;

    fn counter_envelope() -> Envelope {
        Envelope::new(
            "counter",
            HookLedger::from_hooks(vec![
                Hook::state(json!(3)),
                Hook::callback("hw_counter_cb_1"),
            ]),
            FlowProps::new().with("step", 1),
        )
    }

    #[test]
    fn test_envelope_wire_format() {
        assert_eq!(
            serde_json::to_value(counter_envelope()).unwrap(),
            json!({
                "f": "counter",
                "h": [{"k": "state", "d": 3}, {"k": "callback", "cb": "hw_counter_cb_1"}],
                "p": {"step": 1}
            })
        );
        assert_eq!(
            serde_json::to_value(Envelope::new("bare", HookLedger::new(), FlowProps::new()))
                .unwrap(),
            json!({"f": "bare"})
        );
    }

    #[test]
    fn test_encode_preserves_foreign_keys_and_merges_fragments() {
        let codec = MetadataCodec::default();
        let mut previous = MessageMetadata::new("legacy");
        previous.event_payload.insert("keep".into(), json!("me"));
        previous.event_payload.insert("swap".into(), json!("old"));

        let mut fragments = Map::new();
        fragments.insert("swap".into(), json!("new"));
        fragments.insert(METADATA_KEY.into(), json!("hijack"));

        let encoded = codec
            .encode(Some(&previous), &counter_envelope(), &fragments)
            .unwrap();

        assert_eq!(encoded.event_type, "legacy");
        assert_eq!(encoded.event_payload["keep"], json!("me"));
        assert_eq!(encoded.event_payload["swap"], json!("new"));
        assert_eq!(encoded.event_payload[METADATA_KEY]["f"], json!("counter"));
    }

    #[test]
    fn test_event_type_follows_previous_metadata() {
        let codec = MetadataCodec::new("poll_app", DEFAULT_MAX_METADATA_BYTES);
        let fresh = codec
            .encode(None, &counter_envelope(), &Map::new())
            .unwrap();
        assert_eq!(fresh.event_type, "poll_app");

        let renamed = MetadataCodec::new("renamed", DEFAULT_MAX_METADATA_BYTES);
        let updated = renamed
            .encode(Some(&fresh), &counter_envelope(), &Map::new())
            .unwrap();
        assert_eq!(updated.event_type, "poll_app");

        let untyped = renamed
            .encode(Some(&MessageMetadata::new("")), &counter_envelope(), &Map::new())
            .unwrap();
        assert_eq!(untyped.event_type, "renamed");
    }

    #[test]
    fn test_decode_falls_back_to_private_field() {
        let codec = MetadataCodec::default();
        let encoded = codec
            .encode(None, &counter_envelope(), &Map::new())
            .unwrap();
        let private = codec.to_private_field(&encoded).unwrap();

        let without_envelope = MessageMetadata::new("other");
        let decoded = codec
            .decode(Some(&without_envelope), Some(&private))
            .unwrap();
        assert_eq!(decoded.envelope, counter_envelope());
        assert_eq!(decoded.original, encoded);
    }

    #[test]
    fn test_decode_failures() {
        let codec = MetadataCodec::default();
        assert!(matches!(codec.decode(None, None), Err(Error::MissingMetadata)));
        assert!(matches!(
            codec.decode(None, Some("  ")),
            Err(Error::MissingMetadata)
        ));
        assert!(matches!(
            codec.decode(None, Some("{not json")),
            Err(Error::InvalidMetadata(_))
        ));

        let mut broken = MessageMetadata::new(DEFAULT_EVENT_TYPE);
        broken
            .event_payload
            .insert(METADATA_KEY.into(), json!({"f": "x", "h": [{"k": "nope"}]}));
        assert!(matches!(
            codec.decode(Some(&broken), None),
            Err(Error::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_size_limit() {
        let codec = MetadataCodec::new("hookwire", 64);
        let big = Envelope::new(
            "counter",
            HookLedger::from_hooks(vec![Hook::state(json!("x".repeat(128)))]),
            FlowProps::new(),
        );
        assert!(matches!(
            codec.encode(None, &big, &Map::new()),
            Err(Error::MetadataTooLarge { limit: 64, .. })
        ));
    }
}
