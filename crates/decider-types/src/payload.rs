//! Pluggable wire encoding for call arguments and results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Encoded bytes ready to hand to (or just received from) the remote
/// service. Opaque to everything except a [`Codec`].
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Payload(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Right-size this payload to at most `max` bytes. Applied at the
    /// scheduling/response boundary, not by the codec itself, so a codec
    /// never has to know about transport caps.
    pub fn truncated(mut self, max: usize) -> Self {
        self.0.truncate(max);
        self
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload(bytes)
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode call arguments: {0}")]
    EncodeArgs(String),
    #[error("failed to decode call arguments: {0}")]
    DecodeArgs(String),
    #[error("failed to encode call result: {0}")]
    EncodeResult(String),
    #[error("failed to decode call result: {0}")]
    DecodeResult(String),
}

/// Positional and keyword arguments for one call, the unit a [`Codec`]
/// operates on for the scheduling half of its contract.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgsKwargs {
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    #[serde(default)]
    pub kwargs: serde_json::Map<String, serde_json::Value>,
}

impl ArgsKwargs {
    pub fn positional(args: Vec<serde_json::Value>) -> Self {
        ArgsKwargs {
            args,
            kwargs: serde_json::Map::new(),
        }
    }
}

/// Encode/decode call arguments and results. A workflow or activity proxy
/// descriptor carries one of these; the framework default is [`JsonCodec`],
/// but any deterministic, self-describing format satisfies the contract.
pub trait Codec: Send + Sync {
    fn encode_args(&self, args: &ArgsKwargs) -> Result<Payload, CodecError>;
    fn decode_args(&self, payload: &Payload) -> Result<ArgsKwargs, CodecError>;
    fn encode_result(&self, value: &serde_json::Value) -> Result<Payload, CodecError>;
    fn decode_result(&self, payload: &Payload) -> Result<serde_json::Value, CodecError>;
}

/// The framework default codec: a JSON 2-tuple of `[args, kwargs]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_args(&self, args: &ArgsKwargs) -> Result<Payload, CodecError> {
        let tuple = (&args.args, &args.kwargs);
        serde_json::to_vec(&tuple)
            .map(Payload::new)
            .map_err(|e| CodecError::EncodeArgs(e.to_string()))
    }

    fn decode_args(&self, payload: &Payload) -> Result<ArgsKwargs, CodecError> {
        let (args, kwargs): (Vec<serde_json::Value>, serde_json::Map<String, serde_json::Value>) =
            serde_json::from_slice(payload.as_bytes())
                .map_err(|e| CodecError::DecodeArgs(e.to_string()))?;
        Ok(ArgsKwargs { args, kwargs })
    }

    fn encode_result(&self, value: &serde_json::Value) -> Result<Payload, CodecError> {
        serde_json::to_vec(value)
            .map(Payload::new)
            .map_err(|e| CodecError::EncodeResult(e.to_string()))
    }

    fn decode_result(&self, payload: &Payload) -> Result<serde_json::Value, CodecError> {
        serde_json::from_slice(payload.as_bytes())
            .map_err(|e| CodecError::DecodeResult(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn args_round_trip() {
        let codec = JsonCodec;
        let mut kwargs = serde_json::Map::new();
        kwargs.insert("retries".into(), json!(3));
        let args = ArgsKwargs {
            args: vec![json!("a"), json!(1)],
            kwargs,
        };
        let encoded = codec.encode_args(&args).unwrap();
        let decoded = codec.decode_args(&encoded).unwrap();
        assert_eq!(decoded, args);
    }

    #[test]
    fn result_round_trip() {
        let codec = JsonCodec;
        let value = json!({"ok": true, "n": 42});
        let encoded = codec.encode_result(&value).unwrap();
        let decoded = codec.decode_result(&encoded).unwrap();
        similar_asserts::assert_eq!(decoded, value);
    }

    #[test]
    fn truncated_caps_at_max_bytes() {
        let payload = Payload::new(b"0123456789".to_vec());
        assert_eq!(payload.clone().truncated(4).as_bytes(), b"0123");
        assert_eq!(payload.truncated(100).as_bytes(), b"0123456789");
    }

    #[test]
    fn decode_args_rejects_garbage() {
        let codec = JsonCodec;
        let bad = Payload::new(b"not json".to_vec());
        assert!(codec.decode_args(&bad).is_err());
    }
}
