use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult, CONNECTION_ERROR};

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Operación exitosa";

/// Uniform shape every successful response is reduced to.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub data: T,
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            data: f(self.data),
            message: self.message,
        }
    }
}

impl Envelope<Value> {
    pub fn decode<T: DeserializeOwned>(self) -> ApiResult<Envelope<T>> {
        let data = serde_json::from_value::<T>(self.data)
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(Envelope {
            data,
            message: self.message,
        })
    }
}

/// Parses a 2xx body and normalizes it. An empty body is treated as `null`.
pub fn normalize_body(status: u16, raw: &str) -> ApiResult<Envelope<Value>> {
    let trimmed = raw.trim();
    let body = if trimmed.is_empty() {
        Value::Null
    } else {
        serde_json::from_str::<Value>(trimmed).map_err(|err| {
            ApiError::Decode(format!("invalid json (http {status}): {err}"))
        })?
    };
    normalize(body)
}

pub fn normalize(body: Value) -> ApiResult<Envelope<Value>> {
    match body {
        Value::Array(_) => Ok(wrap(body)),
        Value::Object(mut map) if map.contains_key("success") && map.contains_key("data") => {
            let success = map.get("success").is_some_and(is_truthy);
            let message = map
                .get("message")
                .and_then(message_text);
            if success {
                let data = map.remove("data").unwrap_or(Value::Null);
                Ok(Envelope { data, message })
            } else {
                Err(ApiError::Rejected {
                    status: 200,
                    message: message.unwrap_or_else(|| CONNECTION_ERROR.to_string()),
                })
            }
        }
        other => Ok(wrap(other)),
    }
}

/// Backend-provided message of an error body, if any.
pub fn error_message(raw: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(raw.trim()).ok()?;
    value.get("message").and_then(message_text)
}

fn wrap(data: Value) -> Envelope<Value> {
    Envelope {
        data,
        message: Some(DEFAULT_SUCCESS_MESSAGE.to_string()),
    }
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        // Validation pipes report one message per failed constraint.
        Value::Array(items) => {
            let parts = items
                .iter()
                .filter_map(|item| item.as_str())
                .filter(|item| !item.trim().is_empty())
                .collect::<Vec<_>>();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}
