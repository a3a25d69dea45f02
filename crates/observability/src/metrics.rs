//! Prometheus-kompatible Metriken fuer Treffpunkt
//!
//! Registrierte Metriken:
//! - `treffpunkt_sessions_registered` – Gauge: Aktuell registrierte Sessions
//! - `treffpunkt_registrations_rejected_total` – Counter (reason): Abgelehnte Registrierungen
//! - `treffpunkt_messages_routed_total` – Counter (type): Zugestellte Chat-Nachrichten
//! - `treffpunkt_presence_demotions_total` – Counter: Durch Inaktivitaet auf OFFLINE gesetzt
//! - `treffpunkt_decode_failures_total` – Counter: Nicht dekodierbare Envelopes

use anyhow::Result;
use axum::{extract::State, http, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Relay-Metriken
///
/// Jede Instanz hat ihre eigene Registry; Clone teilt dieselben Zaehler.
#[derive(Clone)]
pub struct RelayMetrics {
    pub registry: Arc<Registry>,

    pub sessions_registered: IntGauge,
    pub registrations_rejected_total: IntCounterVec,
    pub messages_routed_total: IntCounterVec,
    pub presence_demotions_total: IntCounter,
    pub decode_failures_total: IntCounter,
}

impl RelayMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let sessions_registered = IntGauge::with_opts(Opts::new(
            "treffpunkt_sessions_registered",
            "Anzahl aktuell registrierter Sessions",
        ))?;
        registry.register(Box::new(sessions_registered.clone()))?;

        let registrations_rejected_total = IntCounterVec::new(
            Opts::new(
                "treffpunkt_registrations_rejected_total",
                "Abgelehnte Registrierungen nach Grund",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(registrations_rejected_total.clone()))?;

        let messages_routed_total = IntCounterVec::new(
            Opts::new(
                "treffpunkt_messages_routed_total",
                "Zugestellte Chat-Nachrichten nach Typ",
            ),
            &["type"],
        )?;
        registry.register(Box::new(messages_routed_total.clone()))?;

        let presence_demotions_total = IntCounter::with_opts(Opts::new(
            "treffpunkt_presence_demotions_total",
            "Sessions die wegen Inaktivitaet auf OFFLINE gesetzt wurden",
        ))?;
        registry.register(Box::new(presence_demotions_total.clone()))?;

        let decode_failures_total = IntCounter::with_opts(Opts::new(
            "treffpunkt_decode_failures_total",
            "Empfangene Frames die nicht dekodiert werden konnten",
        ))?;
        registry.register(Box::new(decode_failures_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            sessions_registered,
            registrations_rejected_total,
            messages_routed_total,
            presence_demotions_total,
            decode_failures_total,
        })
    }

    /// Zaehlt eine abgelehnte Registrierung
    pub fn registrierung_abgelehnt(&self, grund: &str) {
        self.registrations_rejected_total
            .with_label_values(&[grund])
            .inc();
    }

    /// Zaehlt zugestellte Nachrichten eines Typs
    pub fn nachrichten_zugestellt(&self, typ: &str, anzahl: usize) {
        self.messages_routed_total
            .with_label_values(&[typ])
            .inc_by(anzahl as u64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RelayMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<RelayMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            http::StatusCode::OK,
            [(http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
