//! Fehlertypen fuer den Relay

use thiserror::Error;
use treffpunkt_protocol::CodecError;

/// Fehlertyp fuer den Relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Envelope konnte nicht kodiert oder dekodiert werden
    #[error("Codec-Fehler: {0}")]
    Codec(#[from] CodecError),

    /// Anzeigename ist bereits registriert
    #[error("Name bereits vergeben: {0}")]
    NameVergeben(String),

    /// Registry hat keinen freien Platz mehr
    #[error("Server ist voll (maximal {0} Sessions)")]
    ServerVoll(usize),

    /// Benutzer nicht gefunden
    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    /// Empfaenger einer Direktnachricht ist OFFLINE
    #[error("Empfaenger ist offline: {0}")]
    EmpfaengerOffline(String),

    /// Verbindung wurde getrennt
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    /// Protokollfehler (z.B. falsche erste Nachricht)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),
}

impl RelayError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }
}

/// Result-Typ fuer den Relay
pub type RelayResult<T> = Result<T, RelayError>;
