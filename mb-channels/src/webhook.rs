//! WhatsApp Cloud webhook payloads and the inbound event normalizer.
//!
//! A delivery is a deeply nested envelope
//! (`entry[].changes[].value.messages[]`). Only the first message of the
//! first change of the first entry is considered. Missing fields at any depth
//! mean "nothing to do"; fields that exist with the wrong JSON type are
//! reported as [`MalformedEvent`].

use crate::types::SenderId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed webhook event at `{path}`: {reason}")]
pub struct MalformedEvent {
    pub path: String,
    pub reason: String,
}

impl MalformedEvent {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Button,
    List,
    Unsupported,
}

/// The `(sender, text-like payload)` pair the reply router works on.
///
/// `payload` is the text body for [`MessageKind::Text`] and the selected
/// option's display title for [`MessageKind::Button`] / [`MessageKind::List`].
/// It is `None` when the message carried nothing the router can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage {
    pub sender_id: SenderId,
    pub kind: MessageKind,
    pub payload: Option<String>,
}

/// Only the fields the router reads are modeled; ids, timestamps and the rest
/// of the message are ignored whatever their type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatsAppMessage {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(rename = "type", default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub text: Option<WhatsAppText>,
    #[serde(default)]
    pub interactive: Option<WhatsAppInteractive>,
    /// Legacy quick-reply shape emitted by some clients instead of `interactive`.
    #[serde(default)]
    pub button: Option<WhatsAppButton>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatsAppText {
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatsAppInteractive {
    #[serde(rename = "type", default)]
    pub interactive_type: Option<String>,
    #[serde(default)]
    pub button_reply: Option<WhatsAppReply>,
    #[serde(default)]
    pub list_reply: Option<WhatsAppReply>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatsAppReply {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatsAppButton {
    #[serde(default)]
    pub text: Option<String>,
}

impl WhatsAppMessage {
    /// Resolve the message into its canonical form, or `None` without a sender.
    pub fn canonicalize(&self) -> Option<CanonicalMessage> {
        let sender = self.from.as_deref().unwrap_or_default();
        if sender.trim().is_empty() {
            return None;
        }
        let (kind, payload) = self.extract_payload();
        Some(CanonicalMessage {
            sender_id: SenderId::from(sender),
            kind,
            payload,
        })
    }

    fn extract_payload(&self) -> (MessageKind, Option<String>) {
        if self.message_type.as_deref() == Some("interactive") {
            let interactive = self.interactive.as_ref();
            let sub_kind = interactive.and_then(|i| i.interactive_type.as_deref());
            return match sub_kind {
                Some("button_reply") => (
                    MessageKind::Button,
                    interactive
                        .and_then(|i| i.button_reply.as_ref())
                        .and_then(|reply| reply.title.clone()),
                ),
                Some("list_reply") => (
                    MessageKind::List,
                    interactive
                        .and_then(|i| i.list_reply.as_ref())
                        .and_then(|reply| reply.title.clone()),
                ),
                _ => (MessageKind::Unsupported, None),
            };
        }

        if let Some(text) = self.button.as_ref().and_then(|b| b.text.clone()) {
            return (MessageKind::Button, Some(text));
        }

        if let Some(body) = self.text.as_ref().and_then(|t| t.body.clone()) {
            return (MessageKind::Text, Some(body));
        }

        (MessageKind::Unsupported, None)
    }
}

/// Extract the canonical message from a raw webhook delivery.
pub fn normalize_event(event: &Value) -> Result<Option<CanonicalMessage>, MalformedEvent> {
    let Some(message) = first_message(event)? else {
        return Ok(None);
    };
    tracing::debug!(message = %message, "whatsapp message received");

    let message = WhatsAppMessage::deserialize(message).map_err(|e| {
        MalformedEvent::new("entry[0].changes[0].value.messages[0]", e.to_string())
    })?;
    Ok(message.canonicalize())
}

fn first_message(event: &Value) -> Result<Option<&Value>, MalformedEvent> {
    if event.is_null() {
        return Ok(None);
    }
    match field(event, "object", "$")? {
        None => return Ok(None),
        Some(Value::String(object)) if object.is_empty() => return Ok(None),
        Some(Value::String(_)) => {}
        Some(_) => return Err(MalformedEvent::new("object", "expected a string")),
    }

    let Some(entry) = first(field(event, "entry", "$")?, "entry")? else {
        return Ok(None);
    };
    let Some(change) = first(field(entry, "changes", "entry[0]")?, "entry[0].changes")? else {
        return Ok(None);
    };
    let Some(value) = field(change, "value", "entry[0].changes[0]")? else {
        return Ok(None);
    };
    first(
        field(value, "messages", "entry[0].changes[0].value")?,
        "entry[0].changes[0].value.messages",
    )
}

/// Look up `key` on an object, treating JSON `null` as absent.
fn field<'a>(value: &'a Value, key: &str, path: &str) -> Result<Option<&'a Value>, MalformedEvent> {
    match value {
        Value::Object(map) => Ok(map.get(key).filter(|v| !v.is_null())),
        _ => Err(MalformedEvent::new(path, "expected an object")),
    }
}

fn first<'a>(value: Option<&'a Value>, path: &str) -> Result<Option<&'a Value>, MalformedEvent> {
    match value {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(items.first().filter(|v| !v.is_null())),
        Some(_) => Err(MalformedEvent::new(path, "expected an array")),
    }
}
