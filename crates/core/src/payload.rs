use serde_json::Value;
use thiserror::Error;

/// Reasons a `/chat` body is rejected before it reaches the router. The
/// `Display` text is the reply returned to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("Invalid JSON input")]
    InvalidJson,
    #[error("Send JSON like {{\"question\":\"...\"}}")]
    EmptyPayload,
    #[error("Question cannot be empty")]
    EmptyQuestion,
}

/// Extracts the question from a raw `/chat` body.
///
/// An empty body, `null`, or any falsy JSON value (`{}`, `[]`, `""`, `0`,
/// `false`) is [`InvalidInput::EmptyPayload`]. A truthy payload without a
/// non-blank string `question` is [`InvalidInput::EmptyQuestion`]. The
/// returned question is untouched so the generator sees the original text.
pub fn parse_question(body: &[u8]) -> Result<String, InvalidInput> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(InvalidInput::EmptyPayload);
    }

    let payload: Value = serde_json::from_slice(body).map_err(|_| InvalidInput::InvalidJson)?;
    if is_falsy(&payload) {
        return Err(InvalidInput::EmptyPayload);
    }

    match payload.get("question") {
        Some(Value::String(question)) if !question.trim().is_empty() => Ok(question.clone()),
        _ => Err(InvalidInput::EmptyQuestion),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().map(|n| n == 0.0).unwrap_or(false),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
