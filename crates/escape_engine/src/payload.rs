use serde_json::{Map, Value};
use thiserror::Error;

/// A decoded message body. Every payload on the bus is a JSON object.
pub type Payload = Map<String, Value>;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("payload is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn decode_payload(raw: &[u8]) -> Result<Payload, DecodeError> {
    let text = std::str::from_utf8(raw)?;
    Ok(serde_json::from_str(text)?)
}
