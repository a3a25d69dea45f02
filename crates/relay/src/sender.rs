//! Send-Handle einer Session
//!
//! Der Socket gehoert exklusiv dem Verbindungs-Task. Alle anderen
//! Komponenten (Router, Presence-Monitor) schreiben ueber eine begrenzte
//! Queue, die der Verbindungs-Task leert.

use std::net::SocketAddr;
use tokio::sync::mpsc;
use treffpunkt_protocol::Response;

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    peer_addr: SocketAddr,
    tx: mpsc::Sender<Response>,
}

impl ClientSender {
    /// Erstellt eine neue Queue und gibt Handle und Empfangsseite zurueck
    pub fn kanal(peer_addr: SocketAddr, groesse: usize) -> (Self, mpsc::Receiver<Response>) {
        let (tx, rx) = mpsc::channel(groesse.max(1));
        (Self { peer_addr, tx }, rx)
    }

    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: Response) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(peer = %self.peer_addr, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(peer = %self.peer_addr, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}
