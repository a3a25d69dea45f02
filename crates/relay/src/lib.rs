//! treffpunkt-relay – Praesenzbewusster Nachrichten-Relay
//!
//! Dieser Crate implementiert den eigentlichen Relay: Registrierung von
//! Anzeigenamen, Weiterleitung von Broadcast- und Direktnachrichten und die
//! automatische Herabstufung inaktiver Sessions auf OFFLINE.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (RelayServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Handshake: erste Nachricht muss REGISTER sein
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- UserHandler     (GET_USERS, UPDATE_STATUS)
//!     +-- MessageHandler  (SEND_MESSAGE)
//!             |
//!             v
//!         MessageRouter (Broadcast, Direkt)
//!
//! SessionRegistry  – Einzige geteilte Tabelle, ein Lock
//! PresenceMonitor  – Setzt inaktive Sessions periodisch auf OFFLINE
//! ```

pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod listener;
pub mod monitor;
pub mod registry;
pub mod router;
pub mod sender;
pub mod session;
pub mod state;

// Bequeme Re-Exporte
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use error::{RelayError, RelayResult};
pub use listener::RelayServer;
pub use monitor::PresenceMonitor;
pub use registry::{InMemoryRegistry, SessionKandidat, SessionRegistry, SessionSnapshot};
pub use router::MessageRouter;
pub use sender::ClientSender;
pub use session::ClientConnection;
pub use state::{RelayConfig, RelayState};
