//! Envelope-Codec
//!
//! Die einzigen zwei Operationen, ueber die der Relay das Serialisierungs-
//! format nutzt: Envelope -> Bytes und Bytes -> Envelope. Das Framing auf
//! der TCP-Verbindung liegt getrennt davon in [`crate::wire`].

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Fehler beim Kodieren oder Dekodieren eines Envelopes
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON-Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[source] serde_json::Error),

    #[error("JSON-Deserialisierung fehlgeschlagen: {0}")]
    Deserialisierung(#[source] serde_json::Error),
}

/// Kodiert einen Envelope in Bytes
pub fn kodieren<T: Serialize>(envelope: &T) -> Result<Bytes, CodecError> {
    serde_json::to_vec(envelope)
        .map(Bytes::from)
        .map_err(CodecError::Serialisierung)
}

/// Dekodiert einen Envelope aus Bytes
pub fn dekodieren<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Deserialisierung)
}
