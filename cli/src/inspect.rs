//! Envelope inspection.
//!
//! Accepts whatever a developer has at hand: a metadata object, a message
//! or event carrying one under `metadata`, a view with `private_metadata`,
//! or the private field string itself.

use anyhow::{Context, Result, bail};
use hookwire_core::{DecodedEnvelope, MessageMetadata, MetadataCodec, METADATA_KEY};
use hookwire_runtime::RuntimeConfig;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct HookReport {
    pub index: usize,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub flow: String,
    pub event_type: String,
    pub props: Map<String, Value>,
    pub hooks: Vec<HookReport>,
    /// Payload keys other than the reserved one.
    pub fragments: Map<String, Value>,
    pub size_bytes: usize,
    pub max_bytes: usize,
}

pub fn run_inspect_command(config: &RuntimeConfig, input: Option<&str>) -> Result<()> {
    let raw = read_input(input)?;
    let value: Value = match serde_json::from_str(raw.trim()) {
        Ok(value) => value,
        Err(_) => Value::String(raw),
    };
    let report = inspect_value(&config.codec(), value)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn read_input(input: Option<&str>) -> Result<String> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
        Some(arg) if Path::new(arg).is_file() => std::fs::read_to_string(arg)
            .with_context(|| format!("Failed to read input file: {}", arg)),
        Some(arg) => Ok(arg.to_string()),
    }
}

pub fn inspect_value(codec: &MetadataCodec, value: Value) -> Result<InspectReport> {
    let decoded = decode_any(codec, value)?;
    let size_bytes = serde_json::to_vec(&decoded.original)?.len();

    let hooks = decoded
        .envelope
        .ledger
        .iter()
        .enumerate()
        .map(|(index, hook)| HookReport {
            index,
            kind: hook.kind.to_string(),
            value: hook.data.clone(),
            callback_id: hook.callback_id.clone(),
        })
        .collect();

    let mut fragments = decoded.original.event_payload.clone();
    fragments.remove(METADATA_KEY);

    Ok(InspectReport {
        flow: decoded.envelope.flow.clone(),
        event_type: decoded.original.event_type.clone(),
        props: decoded.envelope.props.as_map().clone(),
        hooks,
        fragments,
        size_bytes,
        max_bytes: codec.max_bytes(),
    })
}

fn decode_any(codec: &MetadataCodec, value: Value) -> Result<DecodedEnvelope> {
    match value {
        Value::String(private) => Ok(codec.decode(None, Some(&private))?),
        Value::Object(mut map) => {
            if map.contains_key("event_payload") {
                let metadata: MessageMetadata = serde_json::from_value(Value::Object(map))
                    .context("Malformed message metadata")?;
                return Ok(codec.decode(Some(&metadata), None)?);
            }
            if let Some(inner) = map.remove("metadata") {
                return decode_any(codec, inner);
            }
            if let Some(inner) = map.remove("message") {
                return decode_any(codec, inner);
            }
            if let Some(inner) = map.remove("view") {
                return decode_any(codec, inner);
            }
            if let Some(inner) = map.remove("private_metadata") {
                return decode_any(codec, inner);
            }
            bail!("No message metadata found in input")
        }
        other => bail!("Cannot inspect a JSON {}", kind_name(&other)),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
