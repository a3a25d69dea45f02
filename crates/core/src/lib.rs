//! treffpunkt-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die Bausteine bereit, die sowohl vom Protokoll als
//! auch vom Relay-Server verwendet werden.

pub mod types;

pub use types::{SessionId, UserStatus};
