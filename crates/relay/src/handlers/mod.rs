//! Handler fuer alle Anfragen einer registrierten Session
//!
//! Jeder Handler ist fuer einen bestimmten Anfragetyp zustaendig
//! und hat Zugriff auf den gemeinsamen RelayState.

pub mod message_handler;
pub mod user_handler;
