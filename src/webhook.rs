//! WhatsApp Cloud API webhook payloads. Only the first message of the first
//! change of the first entry is read; the rest of the envelope is not
//! validated, so unrelated shape or type drift never drops a message.

use serde_json::Value;

/// JSON pointer to the one message the bridge answers.
const FIRST_MESSAGE: &str = "/entry/0/changes/0/value/messages/0";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: Option<String>,
    /// Sender's WhatsApp id; replies go back to this number.
    pub from: String,
    /// The `type` field, e.g. `text` or `image`.
    pub kind: Option<String>,
    text_body: Option<String>,
}

impl InboundMessage {
    /// Read the fields routing needs. Fields of the wrong JSON type are
    /// treated as absent; numeric sender ids are kept as their digits.
    pub fn from_value(node: &Value) -> Self {
        let string = |key: &str| node.get(key).and_then(Value::as_str).map(str::to_owned);
        let from = match node.get("from") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Self {
            id: string("id"),
            from,
            kind: string("type"),
            text_body: node
                .pointer("/text/body")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }

    /// The text body, if the message carries a non-empty one.
    pub fn text_body(&self) -> Option<&str> {
        self.text_body.as_deref().filter(|b| !b.is_empty())
    }
}

/// First message of a parsed delivery. Later entries and messages in the
/// same delivery are not processed.
pub fn first_message(payload: &Value) -> Option<InboundMessage> {
    payload
        .pointer(FIRST_MESSAGE)
        .filter(|m| m.is_object())
        .map(InboundMessage::from_value)
}

/// Decode a raw webhook body and pull out the message to answer. Only a
/// body that is not JSON at all is an error.
pub fn parse_inbound(body: &[u8]) -> Result<Option<InboundMessage>, serde_json::Error> {
    let payload: Value = serde_json::from_slice(body)?;
    Ok(first_message(&payload))
}
