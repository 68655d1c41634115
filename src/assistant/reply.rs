//! Interpretation of assistant replies
//!
//! The model is instructed to answer ticket requests with a JSON object,
//! ideally inside a ```` ```json ```` fence. Anything else is plain Markdown.

use crate::types::TicketDraft;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json\n([\s\S]*?)\n```").expect("valid regex"));

static RAW_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"));

/// What the assistant's reply means for the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantReply {
    /// Markdown answer
    Text { text: String },
    /// Structured ticket proposal
    TicketRequest {
        ticket_data: TicketDraft,
        response_message: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TicketEnvelope {
    #[serde(default)]
    is_ticket_request: bool,
    #[serde(default)]
    ticket_data: Option<TicketDraft>,
    #[serde(default)]
    response_message: Option<String>,
}

/// Pull the first JSON value out of `text`, fenced block first
pub fn extract_json(text: &str) -> Option<Value> {
    if let Some(captures) = JSON_FENCE.captures(text) {
        return serde_json::from_str(&captures[1]).ok();
    }

    RAW_OBJECT
        .find(text)
        .and_then(|m| serde_json::from_str(m.as_str()).ok())
}

/// Coerce loosely typed model output into the draft's shape
///
/// Scalar form values become strings and nulls are dropped; a variable with
/// no `label` is labelled with its `name`.
fn normalize_ticket_data(mut value: Value) -> Value {
    let Some(data) = value.get_mut("ticketData").and_then(Value::as_object_mut) else {
        return value;
    };

    if let Some(form) = data.get_mut("formValues").and_then(Value::as_object_mut) {
        form.retain(|_, v| !v.is_null());
        for v in form.values_mut() {
            match v {
                Value::Number(n) => *v = Value::String(n.to_string()),
                Value::Bool(b) => *v = Value::String(b.to_string()),
                _ => {}
            }
        }
    }

    if let Some(variables) = data.get_mut("variables").and_then(Value::as_array_mut) {
        for variable in variables.iter_mut().filter_map(Value::as_object_mut) {
            let has_label = variable.get("label").is_some_and(Value::is_string);
            if !has_label {
                if let Some(name) = variable.get("name").cloned() {
                    variable.insert("label".to_string(), name);
                }
            }
        }
    }

    value
}

/// Classify a raw model reply
pub fn parse_reply(text: &str) -> AssistantReply {
    let envelope = extract_json(text)
        .map(normalize_ticket_data)
        .and_then(|v| serde_json::from_value::<TicketEnvelope>(v).ok());

    match envelope {
        Some(TicketEnvelope {
            is_ticket_request: true,
            ticket_data: Some(ticket_data),
            response_message,
        }) => AssistantReply::TicketRequest {
            ticket_data,
            response_message: response_message.unwrap_or_default(),
        },
        _ => AssistantReply::Text {
            text: text.to_string(),
        },
    }
}
