//! Nachrichten-Handler – Broadcast und Direktnachrichten

use std::sync::Arc;
use treffpunkt_protocol::{Response, SendMessageRequest};

use crate::error::RelayError;
use crate::registry::SessionRegistry;
use crate::state::RelayState;

/// Hinweis an den Absender wenn der Empfaenger unbekannt ist
pub const HINWEIS_NICHT_GEFUNDEN: &str = "User not found.";

/// Hinweis an den Absender wenn der Empfaenger OFFLINE ist
pub const HINWEIS_OFFLINE: &str = "User is offline.";

/// Verarbeitet SEND_MESSAGE
///
/// Erfolgreiche Zustellungen werden nicht bestaetigt; nur fehlgeschlagene
/// Direktnachrichten erzeugen einen Server-Hinweis an den Absender.
pub fn handle_send_message<R: SessionRegistry + 'static>(
    req: SendMessageRequest,
    absender: &str,
    state: &Arc<RelayState<R>>,
) -> Option<Response> {
    if req.ist_broadcast() {
        state.router.broadcast(absender, &req.content);
        return None;
    }

    match state.router.direkt(absender, &req.recipient, &req.content) {
        Ok(()) => None,
        Err(RelayError::NichtGefunden(_)) => Some(Response::server_hinweis(HINWEIS_NICHT_GEFUNDEN)),
        Err(RelayError::EmpfaengerOffline(_)) => Some(Response::server_hinweis(HINWEIS_OFFLINE)),
        Err(e) => {
            tracing::warn!(absender, "Direktnachricht fehlgeschlagen: {e}");
            Some(Response::server_hinweis(HINWEIS_NICHT_GEFUNDEN))
        }
    }
}
