//! Request-Dispatcher – Routet Anfragen an die richtigen Handler
//!
//! Der Dispatcher empfaengt dekodierte Anfragen einer registrierten Session,
//! bestimmt den richtigen Handler und gibt die Antwort zurueck. Die
//! Registrierung selbst laeuft vorher im Handshake der Verbindung.

use std::net::SocketAddr;
use std::sync::Arc;
use treffpunkt_core::SessionId;
use treffpunkt_protocol::{Request, Response};

use crate::handlers::{message_handler, user_handler};
use crate::registry::SessionRegistry;
use crate::state::RelayState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Session
#[derive(Debug, Clone)]
pub struct DispatcherContext {
    pub session_id: SessionId,
    /// Registrierter Anzeigename (Absender fuer Chat-Nachrichten)
    pub name: String,
    pub peer_addr: SocketAddr,
}

/// Zentraler Request-Dispatcher
pub struct MessageDispatcher<R: SessionRegistry + 'static> {
    state: Arc<RelayState<R>>,
}

impl<R: SessionRegistry + 'static> MessageDispatcher<R> {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<RelayState<R>>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine Anfrage und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine Antwort gesendet werden soll
    /// (erfolgreich zugestellte Chat-Nachrichten).
    pub fn dispatch(&self, anfrage: Request, ctx: &DispatcherContext) -> Option<Response> {
        tracing::trace!(
            session_id = %ctx.session_id,
            operation = anfrage.operation(),
            "Anfrage empfangen"
        );

        match anfrage {
            Request::Register(req) => {
                tracing::debug!(
                    session_id = %ctx.session_id,
                    versuchter_name = %req.username,
                    "Erneute Registrierung abgelehnt"
                );
                Some(Response::bad_request("already registered"))
            }
            Request::GetUsers(req) => Some(user_handler::handle_get_users(req, &self.state)),
            Request::UpdateStatus(req) => {
                Some(user_handler::handle_update_status(req, &self.state))
            }
            Request::SendMessage(req) => {
                message_handler::handle_send_message(req, &ctx.name, &self.state)
            }
        }
    }

    /// Bereinigt alle Ressourcen einer getrennten Session
    ///
    /// Mehrfacher Aufruf ist unkritisch.
    pub fn client_cleanup(&self, session_id: SessionId) {
        if let Some(session) = self.state.registry.entfernen(session_id) {
            tracing::info!(
                session_id = %session_id,
                name = %session.name,
                peer = %session.peer_addr,
                "Session entfernt"
            );
            self.state.session_entfernt();
        }
    }
}
