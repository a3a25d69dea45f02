//! Benutzer-Handler – Liste abfragen und Status aendern

use std::sync::Arc;
use treffpunkt_protocol::{Response, UpdateStatusRequest, UserInfo, UserListRequest, UserListType};

use crate::error::RelayError;
use crate::registry::SessionRegistry;
use crate::state::RelayState;

/// Verarbeitet GET_USERS
///
/// Mit Zielname gibt es eine SINGLE-Liste mit 0 oder 1 Eintrag,
/// sonst alle registrierten Sessions (ALL).
pub fn handle_get_users<R: SessionRegistry + 'static>(
    req: UserListRequest,
    state: &Arc<RelayState<R>>,
) -> Response {
    match req.ziel() {
        Some(name) => {
            let users: Vec<UserInfo> = state
                .registry
                .schnappschuss_einer(name)
                .map(|s| s.benutzer_info())
                .into_iter()
                .collect();
            Response::benutzerliste(UserListType::Single, users)
        }
        None => {
            let users = state
                .registry
                .schnappschuss_alle()
                .iter()
                .map(|s| s.benutzer_info())
                .collect();
            Response::benutzerliste(UserListType::All, users)
        }
    }
}

/// Verarbeitet UPDATE_STATUS
///
/// Ziel ist der Benutzername aus der Anfrage, nicht zwingend der Absender.
pub fn handle_update_status<R: SessionRegistry + 'static>(
    req: UpdateStatusRequest,
    state: &Arc<RelayState<R>>,
) -> Response {
    match state.registry.status_setzen(&req.username, req.new_status) {
        Ok(()) => {
            tracing::info!(name = %req.username, status = %req.new_status, "Status geaendert");
            Response::ok("status updated")
        }
        Err(RelayError::NichtGefunden(name)) => {
            tracing::debug!(name = %name, "Status-Aenderung fuer unbekannten Benutzer");
            Response::bad_request("user not found")
        }
        Err(e) => {
            tracing::warn!("Status-Aenderung fehlgeschlagen: {e}");
            Response::bad_request("user not found")
        }
    }
}
