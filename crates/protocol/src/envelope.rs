//! Request- und Response-Envelopes
//!
//! Definiert alle Nachrichten die ueber die TCP-Verbindung zwischen Client
//! und Relay ausgetauscht werden.
//!
//! ## Design
//! - Eine Anfrage besteht aus `operation` + genau einem passenden `payload`.
//!   Das wird ueber ein adjacently-tagged Enum erzwungen.
//! - Eine Antwort besteht aus `status_code` + `message` + optional genau
//!   einem Ergebnis (`user_list` oder `incoming_message`).
//! - JSON-Serialisierung via serde

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use treffpunkt_core::UserStatus;

/// Absendername fuer vom Server erzeugte Hinweise
pub const SERVER_ABSENDER: &str = "Server";

// ---------------------------------------------------------------------------
// Status-Codes
// ---------------------------------------------------------------------------

/// Status-Code einer Antwort
///
/// Es gibt bewusst nur zwei Codes; Clients unterscheiden Fehlerursachen
/// anhand des Nachrichtentexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Ok,
    BadRequest,
}

// ---------------------------------------------------------------------------
// Anfragen
// ---------------------------------------------------------------------------

/// Registrierung eines Anzeigenamens (muss die erste Nachricht sein)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}

/// Benutzerliste abfragen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListRequest {
    /// Gezielter Benutzer; fehlt er oder ist er leer, werden alle geliefert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl UserListRequest {
    /// Gibt den angefragten Benutzernamen zurueck (leere Namen zaehlen nicht)
    pub fn ziel(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }
}

/// Status eines Benutzers aendern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    /// Ziel der Aenderung (nicht zwingend der Absender)
    pub username: String,
    pub new_status: UserStatus,
}

/// Chat-Nachricht senden
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Empfaenger; leer bedeutet Broadcast
    #[serde(default)]
    pub recipient: String,
    pub content: String,
}

impl SendMessageRequest {
    /// Gibt `true` zurueck wenn die Nachricht an alle gehen soll
    pub fn ist_broadcast(&self) -> bool {
        self.recipient.is_empty()
    }
}

/// Eine Anfrage vom Client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "operation",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum Request {
    Register(RegisterRequest),
    GetUsers(UserListRequest),
    UpdateStatus(UpdateStatusRequest),
    SendMessage(SendMessageRequest),
}

impl Request {
    /// Protokoll-Bezeichnung der Operation (fuer Logging)
    pub fn operation(&self) -> &'static str {
        match self {
            Request::Register(_) => "REGISTER",
            Request::GetUsers(_) => "GET_USERS",
            Request::UpdateStatus(_) => "UPDATE_STATUS",
            Request::SendMessage(_) => "SEND_MESSAGE",
        }
    }

    /// Erstellt eine Registrierungs-Anfrage
    pub fn register(username: impl Into<String>) -> Self {
        Request::Register(RegisterRequest {
            username: username.into(),
        })
    }

    /// Erstellt eine Anfrage fuer die vollstaendige Benutzerliste
    pub fn alle_benutzer() -> Self {
        Request::GetUsers(UserListRequest::default())
    }

    /// Erstellt eine Anfrage fuer einen einzelnen Benutzer
    pub fn benutzer(username: impl Into<String>) -> Self {
        Request::GetUsers(UserListRequest {
            username: Some(username.into()),
        })
    }

    /// Erstellt eine Status-Aenderung
    pub fn status(username: impl Into<String>, new_status: UserStatus) -> Self {
        Request::UpdateStatus(UpdateStatusRequest {
            username: username.into(),
            new_status,
        })
    }

    /// Erstellt eine Broadcast-Nachricht
    pub fn broadcast(content: impl Into<String>) -> Self {
        Request::SendMessage(SendMessageRequest {
            recipient: String::new(),
            content: content.into(),
        })
    }

    /// Erstellt eine Direktnachricht
    pub fn direkt(recipient: impl Into<String>, content: impl Into<String>) -> Self {
        Request::SendMessage(SendMessageRequest {
            recipient: recipient.into(),
            content: content.into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Ergebnisse
// ---------------------------------------------------------------------------

/// Ein Eintrag der Benutzerliste
///
/// Name und Adresse werden getrennt uebertragen, damit der Empfaenger nichts
/// parsen muss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub address: SocketAddr,
    pub status: UserStatus,
}

/// Art der Benutzerliste
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserListType {
    /// Alle registrierten Benutzer
    All,
    /// Antwort auf eine gezielte Abfrage (0 oder 1 Eintrag)
    Single,
}

/// Benutzerliste
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListResponse {
    #[serde(rename = "type")]
    pub list_type: UserListType,
    pub users: Vec<UserInfo>,
}

/// Art einer eingehenden Chat-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Broadcast,
    Direct,
}

/// Eingehende Chat-Nachricht (unaufgefordert an den Empfaenger gepusht)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub sender: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
}

/// Ergebnis-Payload einer Antwort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    UserList(UserListResponse),
    IncomingMessage(IncomingMessage),
}

// ---------------------------------------------------------------------------
// Antworten
// ---------------------------------------------------------------------------

/// Eine Antwort oder Benachrichtigung vom Server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status_code: StatusCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResponseResult>,
}

impl Response {
    /// Erstellt eine erfolgreiche Antwort ohne Ergebnis
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::Ok,
            message: message.into(),
            result: None,
        }
    }

    /// Erstellt eine Fehler-Antwort ohne Ergebnis
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::BadRequest,
            message: message.into(),
            result: None,
        }
    }

    /// Erstellt eine Antwort mit Benutzerliste
    pub fn benutzerliste(list_type: UserListType, users: Vec<UserInfo>) -> Self {
        Self {
            status_code: StatusCode::Ok,
            message: format!("{} user(s)", users.len()),
            result: Some(ResponseResult::UserList(UserListResponse { list_type, users })),
        }
    }

    /// Erstellt eine eingehende Chat-Nachricht fuer den Empfaenger
    pub fn eingehend(
        sender: impl Into<String>,
        content: impl Into<String>,
        message_type: MessageType,
    ) -> Self {
        Self {
            status_code: StatusCode::Ok,
            message: "incoming message".to_string(),
            result: Some(ResponseResult::IncomingMessage(IncomingMessage {
                sender: sender.into(),
                content: content.into(),
                message_type,
            })),
        }
    }

    /// Erstellt einen Server-Hinweis in Form einer Direktnachricht
    /// (`BAD_REQUEST`, Absender "Server")
    pub fn server_hinweis(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            status_code: StatusCode::BadRequest,
            message: content.clone(),
            result: Some(ResponseResult::IncomingMessage(IncomingMessage {
                sender: SERVER_ABSENDER.to_string(),
                content,
                message_type: MessageType::Direct,
            })),
        }
    }

    /// Gibt `true` zurueck bei `StatusCode::Ok`
    pub fn ist_ok(&self) -> bool {
        self.status_code == StatusCode::Ok
    }

    /// Gibt die Benutzerliste zurueck falls vorhanden
    pub fn benutzer(&self) -> Option<&UserListResponse> {
        match &self.result {
            Some(ResponseResult::UserList(liste)) => Some(liste),
            _ => None,
        }
    }

    /// Gibt die eingehende Nachricht zurueck falls vorhanden
    pub fn nachricht(&self) -> Option<&IncomingMessage> {
        match &self.result {
            Some(ResponseResult::IncomingMessage(nachricht)) => Some(nachricht),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
