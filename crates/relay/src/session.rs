//! Client-Verbindung – Handshake und Session-Schleife einer TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Der Task gehoert dem Socket exklusiv: eingehende Frames und
//! die Send-Queue der Session werden in einer Schleife bedient.
//!
//! ## Ablauf
//! ```text
//! Verbunden --REGISTER ok--> Aktiv --EOF/Fehler--> Beendet
//!     |                                              ^
//!     +--- andere Nachricht / Ablehnung -------------+
//! ```
//!
//! Beim Uebergang nach `Beendet` wird die Session genau einmal aus der
//! Registry entfernt.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use treffpunkt_protocol::{dekodieren, kodieren, FrameCodec, Request, Response};

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::error::{RelayError, RelayResult};
use crate::registry::{SessionKandidat, SessionRegistry, SessionSnapshot};
use crate::sender::ClientSender;
use crate::state::RelayState;

/// Antworttexte des Registrierungs-Handshakes
pub const REGISTRIERUNG_ERFOLGREICH: &str = "registration successful";
pub const NAME_VERGEBEN: &str = "user is already connected";
pub const SERVER_VOLL: &str = "server full";
pub const NAME_LEER: &str = "username must not be empty";

type RelayFramed = Framed<TcpStream, FrameCodec>;

/// Verarbeitet eine einzelne TCP-Verbindung
pub struct ClientConnection<R: SessionRegistry + 'static> {
    state: Arc<RelayState<R>>,
    peer_addr: SocketAddr,
}

impl<R: SessionRegistry + 'static> ClientConnection<R> {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<RelayState<R>>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Fuehrt Handshake und Session-Schleife aus
    ///
    /// Laeuft bis der Client die Verbindung trennt oder ein Lese- bzw.
    /// Schreibfehler auftritt.
    pub async fn verarbeiten(self, stream: TcpStream) {
        let peer_addr = self.peer_addr;
        let config = Arc::clone(&self.state.config);

        let mut framed = Framed::new(stream, FrameCodec::with_max_size(config.max_frame_groesse));
        let (sender, sende_rx) = ClientSender::kanal(peer_addr, config.send_queue_groesse);

        let session = match self.handshake(&mut framed, sender).await {
            Ok(session) => session,
            Err(RelayError::NameVergeben(name)) => {
                tracing::info!(peer = %peer_addr, name = %name, "Registrierung abgelehnt: Name vergeben");
                return;
            }
            Err(RelayError::ServerVoll(max)) => {
                tracing::warn!(peer = %peer_addr, max, "Registrierung abgelehnt: Server voll");
                return;
            }
            Err(e) => {
                tracing::debug!(peer = %peer_addr, fehler = %e, "Verbindung ohne Registrierung geschlossen");
                return;
            }
        };

        tracing::info!(
            session_id = %session.id,
            name = %session.name,
            peer = %peer_addr,
            "Session registriert"
        );

        let ctx = DispatcherContext {
            session_id: session.id,
            name: session.name,
            peer_addr,
        };
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        self.session_schleife(&mut framed, sende_rx, &dispatcher, &ctx)
            .await;

        dispatcher.client_cleanup(ctx.session_id);
    }

    /// Erwartet genau eine REGISTER-Anfrage und traegt die Session ein
    ///
    /// Abgelehnte Registrierungen bekommen vor dem Schliessen eine
    /// `BAD_REQUEST`-Antwort. Alle anderen ersten Nachrichten fuehren ohne
    /// Antwort zum Schliessen.
    async fn handshake(
        &self,
        framed: &mut RelayFramed,
        sender: ClientSender,
    ) -> RelayResult<SessionSnapshot> {
        let frame = match framed.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(RelayError::VerbindungGetrennt),
        };

        let anfrage: Request = dekodieren(&frame).map_err(|e| {
            self.state.metriken.decode_failures_total.inc();
            RelayError::from(e)
        })?;

        let req = match anfrage {
            Request::Register(req) => req,
            andere => {
                return Err(RelayError::protokoll(format!(
                    "erste Nachricht war {} statt REGISTER",
                    andere.operation()
                )))
            }
        };

        if req.username.is_empty() {
            self.state.metriken.registrierung_abgelehnt("empty_name");
            antwort_senden(framed, &Response::bad_request(NAME_LEER)).await?;
            return Err(RelayError::protokoll("leerer Anzeigename"));
        }

        let kandidat = SessionKandidat {
            name: req.username,
            peer_addr: self.peer_addr,
            sender,
        };

        match self.state.registry.registrieren(kandidat) {
            Ok(session) => {
                self.state.session_registriert();
                if let Err(e) =
                    antwort_senden(framed, &Response::ok(REGISTRIERUNG_ERFOLGREICH)).await
                {
                    if self.state.registry.entfernen(session.id).is_some() {
                        self.state.session_entfernt();
                    }
                    return Err(e);
                }
                Ok(session)
            }
            Err(e) => {
                let (grund, text) = match e {
                    RelayError::NameVergeben(_) => ("name_taken", NAME_VERGEBEN),
                    RelayError::ServerVoll(_) => ("capacity", SERVER_VOLL),
                    _ => return Err(e),
                };
                self.state.metriken.registrierung_abgelehnt(grund);
                antwort_senden(framed, &Response::bad_request(text)).await?;
                Err(e)
            }
        }
    }

    /// Bedient eingehende Frames und die Send-Queue bis zum Verbindungsende
    async fn session_schleife(
        &self,
        framed: &mut RelayFramed,
        mut sende_rx: tokio::sync::mpsc::Receiver<Response>,
        dispatcher: &MessageDispatcher<R>,
        ctx: &DispatcherContext,
    ) {
        loop {
            tokio::select! {
                // Eingehende Anfrage vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(bytes)) => {
                            self.state.registry.aktivitaet_melden(ctx.session_id);

                            let anfrage: Request = match dekodieren(&bytes) {
                                Ok(anfrage) => anfrage,
                                Err(e) => {
                                    self.state.metriken.decode_failures_total.inc();
                                    tracing::warn!(
                                        session_id = %ctx.session_id,
                                        fehler = %e,
                                        "Anfrage nicht dekodierbar – uebersprungen"
                                    );
                                    continue;
                                }
                            };

                            if let Some(antwort) = dispatcher.dispatch(anfrage, ctx) {
                                if let Err(e) = antwort_senden(framed, &antwort).await {
                                    tracing::warn!(
                                        session_id = %ctx.session_id,
                                        fehler = %e,
                                        "Senden fehlgeschlagen"
                                    );
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                session_id = %ctx.session_id,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                        None => {
                            tracing::info!(
                                session_id = %ctx.session_id,
                                name = %ctx.name,
                                "Verbindung vom Client getrennt"
                            );
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus Router oder Presence-Monitor
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = antwort_senden(framed, &ausgehend).await {
                        tracing::warn!(
                            session_id = %ctx.session_id,
                            fehler = %e,
                            "Zustellung fehlgeschlagen"
                        );
                        break;
                    }
                }
            }
        }
    }
}

/// Kodiert eine Antwort und schreibt sie als Frame auf den Socket
async fn antwort_senden(framed: &mut RelayFramed, antwort: &Response) -> RelayResult<()> {
    let bytes = kodieren(antwort)?;
    framed.send(bytes).await?;
    Ok(())
}
