//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `RelayServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einer
//! `ClientConnection`. Der Registrierungs-Handshake laeuft bereits in diesem
//! Task, ein langsamer Client blockiert also keine weiteren Accepts.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::error::RelayResult;
use crate::registry::SessionRegistry;
use crate::session::ClientConnection;
use crate::state::RelayState;

/// TCP-Relay-Server
pub struct RelayServer<R: SessionRegistry + 'static> {
    state: Arc<RelayState<R>>,
    listener: TcpListener,
}

impl<R: SessionRegistry + 'static> RelayServer<R> {
    /// Bindet den TCP-Socket
    ///
    /// Port 0 waehlt einen freien Port; die tatsaechliche Adresse liefert
    /// [`RelayServer::lokale_adresse`].
    pub async fn binden(state: Arc<RelayState<R>>, bind_addr: SocketAddr) -> RelayResult<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self { state, listener })
    }

    /// Gibt die tatsaechlich gebundene Adresse zurueck
    pub fn lokale_adresse(&self) -> RelayResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Akzeptiert Verbindungen bis `shutdown_rx` ein `true`-Signal empfaengt
    ///
    /// Laufende Sessions werden dabei nicht abgebrochen.
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> RelayResult<()> {
        let lokale_addr = self.listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "TCP Relay-Server gestartet");

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");

                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }

                            let verbindung = ClientConnection::neu(Arc::clone(&self.state), peer_addr);
                            tokio::spawn(verbindung.verarbeiten(stream));
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                ergebnis = shutdown_rx.changed() => {
                    if ergebnis.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("Relay-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP Relay-Server gestoppt");
        Ok(())
    }
}
