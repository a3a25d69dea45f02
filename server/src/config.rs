//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use treffpunkt_observability::logging::{log_format_gueltig, log_level_gueltig};
use treffpunkt_relay::RelayConfig;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Praesenz-Einstellungen (Inaktivitaet, Monitor-Takt)
    pub praesenz: PraesenzEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Maximale Anzahl gleichzeitig registrierter Sessions
    pub max_sessions: usize,
    /// Erste vergebene Session-ID
    pub start_id: u64,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            start_id: 10,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den TCP-Listener
    pub bind_adresse: String,
    /// Port fuer den TCP-Listener
    pub tcp_port: u16,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 8080,
            max_frame_groesse: 1024 * 1024,
        }
    }
}

/// Praesenz-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PraesenzEinstellungen {
    /// Sekunden ohne Anfrage bis eine Session OFFLINE wird
    pub inaktivitaet_sek: u64,
    /// Takt des Presence-Monitors in Millisekunden
    pub takt_ms: u64,
    /// Groesse der Send-Queue pro Session
    pub send_queue_groesse: usize,
}

impl Default for PraesenzEinstellungen {
    fn default() -> Self {
        Self {
            inaktivitaet_sek: 60,
            takt_ms: 1000,
            send_queue_groesse: 64,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.validieren()?;
        Ok(config)
    }

    /// Prueft Werte die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.server.max_sessions == 0 {
            anyhow::bail!("server.max_sessions muss groesser als 0 sein");
        }
        if self.praesenz.takt_ms == 0 {
            anyhow::bail!("praesenz.takt_ms muss groesser als 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level: '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format: '{}'", self.logging.format);
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }

    /// Leitet die Relay-Konfiguration ab
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            max_sessions: self.server.max_sessions,
            start_id: self.server.start_id,
            inaktivitaets_schwelle: Duration::from_secs(self.praesenz.inaktivitaet_sek),
            takt: Duration::from_millis(self.praesenz.takt_ms),
            send_queue_groesse: self.praesenz.send_queue_groesse,
            max_frame_groesse: self.netzwerk.max_frame_groesse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.max_sessions, 100);
        assert_eq!(cfg.server.start_id, 10);
        assert_eq!(cfg.netzwerk.tcp_port, 8080);
        assert_eq!(cfg.praesenz.inaktivitaet_sek, 60);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.validieren().is_ok());
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.tcp_bind_adresse(), "0.0.0.0:8080");
        assert_eq!(cfg.observability_bind_adresse(), "0.0.0.0:9300");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            max_sessions = 5

            [praesenz]
            inaktivitaet_sek = 10
            takt_ms = 250

            [netzwerk]
            tcp_port = 10000
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.max_sessions, 5);
        assert_eq!(cfg.netzwerk.tcp_port, 10000);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.server.start_id, 10);
        assert_eq!(cfg.praesenz.send_queue_groesse, 64);
        assert!(cfg.observability.aktiviert);

        let relay = cfg.relay_config();
        assert_eq!(relay.max_sessions, 5);
        assert_eq!(relay.inaktivitaets_schwelle, Duration::from_secs(10));
        assert_eq!(relay.takt, Duration::from_millis(250));
        assert_eq!(relay.max_frame_groesse, 1024 * 1024);
    }

    #[test]
    fn ungueltige_werte_werden_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.logging.format = "xml".into();
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.server.max_sessions = 0;
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.praesenz.takt_ms = 0;
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = ServerConfig::laden("/nicht/vorhanden/treffpunkt.toml").unwrap();
        assert_eq!(cfg.netzwerk.tcp_port, 8080);
    }
}
