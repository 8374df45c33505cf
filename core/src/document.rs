//! # Output Document
//!
//! Typed subset of the platform's interactive block model. A render function
//! returns a [`View`]; the flow turns it into a [`Message`] carrying the
//! encoded metadata envelope.

use crate::metadata::MessageMetadata;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    Mrkdwn {
        text: String,
    },
    PlainText {
        text: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        emoji: bool,
    },
}

impl Text {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Text::Mrkdwn { text: text.into() }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Text::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Text::Mrkdwn { text } | Text::PlainText { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub text: Text,
    pub value: String,
}

impl SelectOption {
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: Text::plain(text),
            value: value.into(),
        }
    }
}

/// Interactive elements. `action_id` is where callback identifiers go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button {
        action_id: String,
        text: Text,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
    },
    StaticSelect {
        action_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<Text>,
        options: Vec<SelectOption>,
    },
    PlainTextInput {
        action_id: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        multiline: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_value: Option<String>,
    },
}

impl Element {
    pub fn button(action_id: impl Into<String>, text: impl Into<String>) -> Self {
        Element::Button {
            action_id: action_id.into(),
            text: Text::plain(text),
            value: None,
            style: None,
        }
    }

    pub fn primary_button(action_id: impl Into<String>, text: impl Into<String>) -> Self {
        Element::Button {
            action_id: action_id.into(),
            text: Text::plain(text),
            value: None,
            style: Some(ButtonStyle::Primary),
        }
    }

    pub fn action_id(&self) -> &str {
        match self {
            Element::Button { action_id, .. }
            | Element::StaticSelect { action_id, .. }
            | Element::PlainTextInput { action_id, .. } => action_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Text>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accessory: Option<Element>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
    Actions {
        elements: Vec<Element>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
    Divider,
    Header {
        text: Text,
    },
    Context {
        elements: Vec<Text>,
    },
    Input {
        label: Text,
        element: Element,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        optional: bool,
    },
    /// Anything the typed model does not cover, passed through untouched.
    #[serde(untagged)]
    Raw(Value),
}

impl Block {
    pub fn section(text: impl Into<String>) -> Self {
        Block::Section {
            text: Some(Text::mrkdwn(text)),
            fields: Vec::new(),
            accessory: None,
            block_id: None,
        }
    }

    pub fn section_with(text: impl Into<String>, accessory: Element) -> Self {
        Block::Section {
            text: Some(Text::mrkdwn(text)),
            fields: Vec::new(),
            accessory: Some(accessory),
            block_id: None,
        }
    }

    pub fn actions(elements: Vec<Element>) -> Self {
        Block::Actions {
            elements,
            block_id: None,
        }
    }

    pub fn header(text: impl Into<String>) -> Self {
        Block::Header {
            text: Text::plain(text),
        }
    }

    pub fn input(label: impl Into<String>, element: Element) -> Self {
        Block::Input {
            label: Text::plain(label),
            element,
            block_id: None,
            optional: false,
        }
    }
}

/// What a render function returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    pub text: Option<String>,
    pub blocks: Vec<Block>,
    /// Metadata fragments merged into the outgoing event payload.
    pub event_payload: Map<String, Value>,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn blocks(mut self, blocks: impl IntoIterator<Item = Block>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    pub fn payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event_payload.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    InChannel,
    Ephemeral,
}

/// Presentation options used when a message is opened as a modal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalConfig {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<String>,
    #[serde(default)]
    pub clear_on_close: bool,
    #[serde(default)]
    pub notify_on_close: bool,
}

impl ModalConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            submit: None,
            close: None,
            clear_on_close: false,
            notify_on_close: false,
        }
    }

    pub fn submit(mut self, label: impl Into<String>) -> Self {
        self.submit = Some(label.into());
        self
    }
}

/// The immutable output document handed to the message I/O collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    #[serde(default)]
    pub response_type: ResponseType,
    #[serde(default)]
    pub replace_original: bool,
    #[serde(skip)]
    pub modal: Option<ModalConfig>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn ephemeral_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            response_type: ResponseType::Ephemeral,
            ..Self::default()
        }
    }

    pub fn with_modal(mut self, modal: ModalConfig) -> Self {
        self.modal = Some(modal);
        self
    }

    pub fn is_modal(&self) -> bool {
        self.modal.is_some()
    }

    /// Every `action_id` reachable in the block tree, in document order.
    pub fn action_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Section {
                    accessory: Some(element),
                    ..
                } => ids.push(element.action_id()),
                Block::Actions { elements, .. } => {
                    ids.extend(elements.iter().map(Element::action_id))
                }
                Block::Input { element, .. } => ids.push(element.action_id()),
                _ => {}
            }
        }
        ids
    }
}

/// One user action reported by a block-actions interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockAction {
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<SelectOption>,
}

impl BlockAction {
    pub fn new(action_id: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            ..Self::default()
        }
    }

    /// The button value or the selected option's value.
    pub fn selected_value(&self) -> Option<&str> {
        self.selected_option
            .as_ref()
            .map(|o| o.value.as_str())
            .or(self.value.as_deref())
    }
}
