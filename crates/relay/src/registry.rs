//! Session-Registry – Die einzige geteilte, veraenderliche Tabelle
//!
//! Haelt alle registrierten Sessions. Genau ein Mutex schuetzt die gesamte
//! Tabelle; jede Mutation und jedes Scan-then-Act passiert unter diesem
//! Lock. Wer danach I/O machen will (Nachrichten senden), arbeitet mit
//! einem [`SessionSnapshot`] und haelt den Lock dabei nicht mehr.
//!
//! ## Aufbau
//! ```text
//! sessions: SessionId -> Eintrag      (Primaerindex)
//! namen:    Anzeigename -> SessionId  (Eindeutigkeit, O(1)-Lookup)
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;
use treffpunkt_core::{SessionId, UserStatus};
use treffpunkt_protocol::UserInfo;

use crate::error::{RelayError, RelayResult};
use crate::sender::ClientSender;

/// Standard-Kapazitaet der Registry
pub const STANDARD_KAPAZITAET: usize = 100;

/// Erste vergebene Session-ID
pub const STANDARD_START_ID: u64 = 10;

// ---------------------------------------------------------------------------
// Datentypen
// ---------------------------------------------------------------------------

/// Daten fuer eine neue Registrierung
#[derive(Debug, Clone)]
pub struct SessionKandidat {
    pub name: String,
    pub peer_addr: SocketAddr,
    pub sender: ClientSender,
}

/// Punkt-in-Zeit-Kopie einer Session
///
/// Enthaelt das Send-Handle, damit nach dem Freigeben des Locks gesendet
/// werden kann.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub name: String,
    pub peer_addr: SocketAddr,
    pub status: UserStatus,
    pub letzte_aktivitaet: Instant,
    pub sender: ClientSender,
}

impl SessionSnapshot {
    /// Konvertiert in einen Eintrag der Benutzerliste
    pub fn benutzer_info(&self) -> UserInfo {
        UserInfo {
            username: self.name.clone(),
            address: self.peer_addr,
            status: self.status,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Schnittstelle der Session-Registry
///
/// Alle Operationen sind atomar zueinander.
pub trait SessionRegistry: Send + Sync {
    /// Registriert eine neue Session
    ///
    /// Schlaegt fehl wenn der Name bereits vergeben ist (`NameVergeben`) oder
    /// kein Platz mehr frei ist (`ServerVoll`).
    fn registrieren(&self, kandidat: SessionKandidat) -> RelayResult<SessionSnapshot>;

    /// Sucht eine Session nach Anzeigename (exakter Vergleich)
    fn nach_name(&self, name: &str) -> Option<SessionSnapshot>;

    /// Entfernt eine Session; unbekannte IDs sind ein No-op
    fn entfernen(&self, id: SessionId) -> Option<SessionSnapshot>;

    /// Setzt den Status der Session mit diesem Namen
    fn status_setzen(&self, name: &str, status: UserStatus) -> RelayResult<()>;

    /// Setzt den Aktivitaets-Zeitstempel einer Session auf "jetzt"
    fn aktivitaet_melden(&self, id: SessionId);

    /// Konsistente Kopie aller Sessions
    fn schnappschuss_alle(&self) -> Vec<SessionSnapshot>;

    /// Konsistente Kopie einer einzelnen Session
    fn schnappschuss_einer(&self, name: &str) -> Option<SessionSnapshot> {
        self.nach_name(name)
    }

    /// Setzt alle Sessions, die laenger als `schwelle` inaktiv waren und noch
    /// nicht OFFLINE sind, auf OFFLINE und gibt sie zurueck
    fn inaktive_herabstufen(&self, jetzt: Instant, schwelle: Duration) -> Vec<SessionSnapshot>;

    /// Anzahl der registrierten Sessions
    fn anzahl(&self) -> usize;
}

// ---------------------------------------------------------------------------
// In-Memory-Implementierung
// ---------------------------------------------------------------------------

struct Eintrag {
    name: String,
    peer_addr: SocketAddr,
    status: UserStatus,
    letzte_aktivitaet: Instant,
    sender: ClientSender,
}

impl Eintrag {
    fn snapshot(&self, id: SessionId) -> SessionSnapshot {
        SessionSnapshot {
            id,
            name: self.name.clone(),
            peer_addr: self.peer_addr,
            status: self.status,
            letzte_aktivitaet: self.letzte_aktivitaet,
            sender: self.sender.clone(),
        }
    }
}

struct Tabelle {
    sessions: HashMap<SessionId, Eintrag>,
    namen: HashMap<String, SessionId>,
    naechste_id: u64,
}

/// Registry im Prozess-Speicher
pub struct InMemoryRegistry {
    kapazitaet: usize,
    tabelle: Mutex<Tabelle>,
}

impl InMemoryRegistry {
    /// Erstellt eine leere Registry
    pub fn neu(kapazitaet: usize, start_id: u64) -> Self {
        Self {
            kapazitaet,
            tabelle: Mutex::new(Tabelle {
                sessions: HashMap::with_capacity(kapazitaet),
                namen: HashMap::with_capacity(kapazitaet),
                naechste_id: start_id,
            }),
        }
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::neu(STANDARD_KAPAZITAET, STANDARD_START_ID)
    }
}

impl SessionRegistry for InMemoryRegistry {
    fn registrieren(&self, kandidat: SessionKandidat) -> RelayResult<SessionSnapshot> {
        let mut tabelle = self.tabelle.lock();

        if tabelle.namen.contains_key(&kandidat.name) {
            return Err(RelayError::NameVergeben(kandidat.name));
        }
        if tabelle.sessions.len() >= self.kapazitaet {
            return Err(RelayError::ServerVoll(self.kapazitaet));
        }

        // ID erst bei Erfolg vergeben
        let id = SessionId(tabelle.naechste_id);
        tabelle.naechste_id += 1;

        let eintrag = Eintrag {
            name: kandidat.name,
            peer_addr: kandidat.peer_addr,
            status: UserStatus::Online,
            letzte_aktivitaet: Instant::now(),
            sender: kandidat.sender,
        };
        let snapshot = eintrag.snapshot(id);

        tabelle.namen.insert(eintrag.name.clone(), id);
        tabelle.sessions.insert(id, eintrag);

        Ok(snapshot)
    }

    fn nach_name(&self, name: &str) -> Option<SessionSnapshot> {
        let tabelle = self.tabelle.lock();
        let id = *tabelle.namen.get(name)?;
        tabelle.sessions.get(&id).map(|e| e.snapshot(id))
    }

    fn entfernen(&self, id: SessionId) -> Option<SessionSnapshot> {
        let mut tabelle = self.tabelle.lock();
        let eintrag = tabelle.sessions.remove(&id)?;
        tabelle.namen.remove(&eintrag.name);
        Some(eintrag.snapshot(id))
    }

    fn status_setzen(&self, name: &str, status: UserStatus) -> RelayResult<()> {
        let mut tabelle = self.tabelle.lock();
        let id = *tabelle
            .namen
            .get(name)
            .ok_or_else(|| RelayError::NichtGefunden(name.to_string()))?;
        match tabelle.sessions.get_mut(&id) {
            Some(eintrag) => {
                eintrag.status = status;
                Ok(())
            }
            None => Err(RelayError::NichtGefunden(name.to_string())),
        }
    }

    fn aktivitaet_melden(&self, id: SessionId) {
        if let Some(eintrag) = self.tabelle.lock().sessions.get_mut(&id) {
            eintrag.letzte_aktivitaet = Instant::now();
        }
    }

    fn schnappschuss_alle(&self) -> Vec<SessionSnapshot> {
        let tabelle = self.tabelle.lock();
        let mut alle: Vec<SessionSnapshot> = tabelle
            .sessions
            .iter()
            .map(|(id, e)| e.snapshot(*id))
            .collect();
        alle.sort_by_key(|s| s.id);
        alle
    }

    fn inaktive_herabstufen(&self, jetzt: Instant, schwelle: Duration) -> Vec<SessionSnapshot> {
        let mut tabelle = self.tabelle.lock();
        tabelle
            .sessions
            .iter_mut()
            .filter(|(_, e)| {
                e.status != UserStatus::Offline
                    && jetzt.saturating_duration_since(e.letzte_aktivitaet) > schwelle
            })
            .map(|(id, e)| {
                e.status = UserStatus::Offline;
                e.snapshot(*id)
            })
            .collect()
    }

    fn anzahl(&self) -> usize {
        self.tabelle.lock().sessions.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
