//! Presence-Monitor – Setzt inaktive Sessions auf OFFLINE
//!
//! Laeuft als eigener Hintergrund-Task. Bei jedem Takt werden alle Sessions
//! deren letzte Aktivitaet laenger als die Schwelle zurueckliegt in einem
//! Schritt unter dem Registry-Lock herabgestuft. Die Benachrichtigungen gehen
//! erst danach raus.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use treffpunkt_observability::RelayMetrics;
use treffpunkt_protocol::Response;

use crate::registry::SessionRegistry;
use crate::state::RelayState;

/// Hinweis an eine herabgestufte Session
pub const OFFLINE_HINWEIS: &str = "your status has been changed to OFFLINE due to inactivity";

/// Periodischer Inaktivitaets-Sweep
pub struct PresenceMonitor<R: SessionRegistry> {
    registry: Arc<R>,
    schwelle: Duration,
    takt: Duration,
    metriken: RelayMetrics,
}

impl<R: SessionRegistry + 'static> PresenceMonitor<R> {
    /// Erstellt einen neuen Monitor
    pub fn neu(registry: Arc<R>, schwelle: Duration, takt: Duration, metriken: RelayMetrics) -> Self {
        Self {
            registry,
            schwelle,
            takt,
            metriken,
        }
    }

    /// Erstellt einen Monitor aus dem gemeinsamen Relay-Zustand
    pub fn aus_state(state: &RelayState<R>) -> Self {
        Self::neu(
            Arc::clone(&state.registry),
            state.config.inaktivitaets_schwelle,
            state.config.takt,
            state.metriken.clone(),
        )
    }

    /// Fuehrt einen einzelnen Sweep aus und gibt die Anzahl
    /// herabgestufter Sessions zurueck
    pub fn durchlauf(&self, jetzt: Instant) -> usize {
        let herabgestuft = self.registry.inaktive_herabstufen(jetzt, self.schwelle);

        for session in &herabgestuft {
            tracing::info!(
                session_id = %session.id,
                name = %session.name,
                "Session wegen Inaktivitaet auf OFFLINE gesetzt"
            );
            session.sender.senden(Response::ok(OFFLINE_HINWEIS));
        }

        self.metriken
            .presence_demotions_total
            .inc_by(herabgestuft.len() as u64);
        herabgestuft.len()
    }

    /// Startet den Monitor-Loop bis das Shutdown-Signal kommt
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut intervall = tokio::time::interval(self.takt);
        intervall.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            schwelle_sek = self.schwelle.as_secs_f64(),
            takt_ms = self.takt.as_millis() as u64,
            "Presence-Monitor gestartet"
        );

        loop {
            tokio::select! {
                _ = intervall.tick() => {
                    self.durchlauf(Instant::now());
                }
                ergebnis = shutdown_rx.changed() => {
                    if ergebnis.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Presence-Monitor beendet");
    }
}
