//! Gemeinsame Identifikations- und Statustypen fuer Treffpunkt
//!
//! Session-IDs verwenden das Newtype-Pattern, damit sie nicht mit anderen
//! Zaehlern verwechselt werden koennen.

use serde::{Deserialize, Serialize};

/// Eindeutige Session-ID
///
/// Wird bei der Registrierung vergeben, steigt monoton und wird waehrend der
/// Laufzeit des Prozesses nie wiederverwendet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Praesenz-Status eines Benutzers
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    /// Verbunden und erreichbar (Standard nach der Registrierung)
    #[default]
    Online,
    /// Verbunden, aber beschaeftigt
    Busy,
    /// Verbunden, aber inaktiv oder abwesend
    Offline,
}

impl UserStatus {
    /// Gibt `true` zurueck wenn Nachrichten zugestellt werden duerfen
    pub fn ist_erreichbar(&self) -> bool {
        !matches!(self, UserStatus::Offline)
    }

    /// Protokoll-Bezeichnung des Status
    pub fn als_str(&self) -> &'static str {
        match self {
            UserStatus::Online => "ONLINE",
            UserStatus::Busy => "BUSY",
            UserStatus::Offline => "OFFLINE",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}
