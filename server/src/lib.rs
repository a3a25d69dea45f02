//! treffpunkt-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use std::future::Future;
use std::net::SocketAddr;
use tokio::sync::watch;
use treffpunkt_observability::{observability_server_starten, RelayMetrics};
use treffpunkt_relay::{PresenceMonitor, RelayServer, RelayState};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        self.laufen_bis(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht registriert werden");
            }
        })
        .await
    }

    /// Startet alle Server-Subsysteme und laeuft bis `shutdown` fertig ist
    ///
    /// Reihenfolge:
    /// 1. Metriken und Relay-Zustand anlegen
    /// 2. TCP-Listener binden
    /// 3. Presence-Monitor starten
    /// 4. Observability-Server starten (optional)
    /// 5. Auf Shutdown warten, dann Listener und Monitor stoppen
    pub async fn laufen_bis<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let metriken = RelayMetrics::neu().context("Metriken konnten nicht angelegt werden")?;
        let state = RelayState::im_speicher(self.config.relay_config(), metriken.clone());

        let tcp_addr: SocketAddr = self
            .config
            .tcp_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige TCP-Adresse '{}'", self.config.tcp_bind_adresse()))?;

        let relay = RelayServer::binden(std::sync::Arc::clone(&state), tcp_addr)
            .await
            .with_context(|| format!("TCP-Listener auf {tcp_addr} konnte nicht gebunden werden"))?;

        tracing::info!(
            tcp = %relay.lokale_adresse()?,
            max_sessions = state.config.max_sessions,
            inaktivitaet_sek = state.config.inaktivitaets_schwelle.as_secs(),
            "Server startet"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let relay_task = tokio::spawn(relay.starten(shutdown_rx.clone()));
        let monitor_task = tokio::spawn(PresenceMonitor::aus_state(&state).starten(shutdown_rx));

        if self.config.observability.aktiviert {
            let obs_addr: SocketAddr = self
                .config
                .observability_bind_adresse()
                .parse()
                .context("Ungueltige Observability-Adresse")?;
            tokio::spawn(async move {
                if let Err(e) = observability_server_starten(obs_addr, metriken).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            });
        }

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        shutdown.await;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        // Empfaenger koennen bereits beendet sein
        let _ = shutdown_tx.send(true);

        relay_task.await.context("Relay-Task abgebrochen")??;
        monitor_task.await.context("Monitor-Task abgebrochen")?;

        Ok(())
    }
}
