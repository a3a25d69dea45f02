//! Nachrichten-Router – Broadcast und Direktnachrichten
//!
//! Der Router nimmt immer erst einen Snapshot aus der Registry und sendet
//! danach. Waehrend des Sendens wird kein Lock gehalten.
//!
//! ## Zustellung
//! - Broadcast: an alle ausser dem Absender, OFFLINE-Sessions werden
//!   uebersprungen
//! - Direkt: genau an einen benannten Empfaenger, der nicht OFFLINE ist

use std::sync::Arc;
use treffpunkt_core::UserStatus;
use treffpunkt_observability::RelayMetrics;
use treffpunkt_protocol::{MessageType, Response};

use crate::error::{RelayError, RelayResult};
use crate::registry::SessionRegistry;

/// Label fuer `messages_routed_total`
const LABEL_BROADCAST: &str = "broadcast";
const LABEL_DIRECT: &str = "direct";

/// Verteilt Chat-Nachrichten an registrierte Sessions
pub struct MessageRouter<R: SessionRegistry> {
    registry: Arc<R>,
    metriken: RelayMetrics,
}

impl<R: SessionRegistry> Clone for MessageRouter<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            metriken: self.metriken.clone(),
        }
    }
}

impl<R: SessionRegistry> MessageRouter<R> {
    /// Erstellt einen neuen Router
    pub fn neu(registry: Arc<R>, metriken: RelayMetrics) -> Self {
        Self { registry, metriken }
    }

    /// Sendet eine Nachricht an alle erreichbaren Sessions ausser dem Absender
    ///
    /// Zustellfehler werden verschluckt. Gibt die Anzahl erfolgreich
    /// eingereihter Nachrichten zurueck.
    pub fn broadcast(&self, absender: &str, inhalt: &str) -> usize {
        let empfaenger = self.registry.schnappschuss_alle();

        let zugestellt = empfaenger
            .iter()
            .filter(|s| s.name != absender && s.status != UserStatus::Offline)
            .filter(|s| {
                s.sender
                    .senden(Response::eingehend(absender, inhalt, MessageType::Broadcast))
            })
            .count();

        self.metriken
            .nachrichten_zugestellt(LABEL_BROADCAST, zugestellt);
        tracing::debug!(absender, zugestellt, "Broadcast verteilt");
        zugestellt
    }

    /// Sendet eine Direktnachricht an genau einen Empfaenger
    ///
    /// # Fehler
    /// - `NichtGefunden` wenn kein Benutzer mit diesem Namen registriert ist
    /// - `EmpfaengerOffline` wenn der Empfaenger OFFLINE ist
    pub fn direkt(&self, absender: &str, empfaenger: &str, inhalt: &str) -> RelayResult<()> {
        let ziel = self
            .registry
            .schnappschuss_einer(empfaenger)
            .ok_or_else(|| RelayError::NichtGefunden(empfaenger.to_string()))?;

        if !ziel.status.ist_erreichbar() {
            return Err(RelayError::EmpfaengerOffline(empfaenger.to_string()));
        }

        if ziel
            .sender
            .senden(Response::eingehend(absender, inhalt, MessageType::Direct))
        {
            self.metriken.nachrichten_zugestellt(LABEL_DIRECT, 1);
            tracing::debug!(absender, empfaenger, "Direktnachricht zugestellt");
        } else {
            tracing::debug!(absender, empfaenger, "Direktnachricht verworfen");
        }
        Ok(())
    }
}
