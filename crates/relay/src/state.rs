//! Gemeinsamer Relay-Zustand
//!
//! Haelt Konfiguration, Registry, Router und Metriken als Arc-Referenzen,
//! die sicher zwischen tokio-Tasks geteilt werden koennen.

use std::sync::Arc;
use std::time::Duration;
use treffpunkt_observability::RelayMetrics;
use treffpunkt_protocol::wire::DEFAULT_MAX_FRAME_SIZE;

use crate::registry::{InMemoryRegistry, SessionRegistry, STANDARD_KAPAZITAET, STANDARD_START_ID};
use crate::router::MessageRouter;

/// Konfiguration fuer den Relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximale Anzahl gleichzeitig registrierter Sessions
    pub max_sessions: usize,
    /// Erste vergebene Session-ID
    pub start_id: u64,
    /// Nach dieser Zeit ohne Anfrage wird eine Session OFFLINE
    pub inaktivitaets_schwelle: Duration,
    /// Intervall des Presence-Monitors
    pub takt: Duration,
    /// Groesse der Send-Queue pro Session
    pub send_queue_groesse: usize,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_sessions: STANDARD_KAPAZITAET,
            start_id: STANDARD_START_ID,
            inaktivitaets_schwelle: Duration::from_secs(60),
            takt: Duration::from_secs(1),
            send_queue_groesse: 64,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Relay-Zustand (thread-safe, Arc-geteilt)
pub struct RelayState<R: SessionRegistry + 'static> {
    /// Relay-Konfiguration
    pub config: Arc<RelayConfig>,
    /// Session-Registry
    pub registry: Arc<R>,
    /// Nachrichten-Router
    pub router: MessageRouter<R>,
    /// Prometheus-Metriken
    pub metriken: RelayMetrics,
}

impl<R: SessionRegistry + 'static> RelayState<R> {
    /// Erstellt einen neuen RelayState
    pub fn neu(config: RelayConfig, registry: Arc<R>, metriken: RelayMetrics) -> Arc<Self> {
        let router = MessageRouter::neu(Arc::clone(&registry), metriken.clone());
        Arc::new(Self {
            config: Arc::new(config),
            registry,
            router,
            metriken,
        })
    }

    /// Zaehlt eine erfolgreich registrierte Session
    pub fn session_registriert(&self) {
        self.metriken.sessions_registered.inc();
    }

    /// Zaehlt eine aus der Registry entfernte Session
    ///
    /// Nur aufrufen wenn `entfernen` tatsaechlich einen Eintrag geliefert hat.
    pub fn session_entfernt(&self) {
        self.metriken.sessions_registered.dec();
    }
}

impl RelayState<InMemoryRegistry> {
    /// Erstellt einen RelayState mit In-Memory-Registry gemaess Konfiguration
    pub fn im_speicher(config: RelayConfig, metriken: RelayMetrics) -> Arc<Self> {
        let registry = Arc::new(InMemoryRegistry::neu(config.max_sessions, config.start_id));
        Self::neu(config, registry, metriken)
    }
}
