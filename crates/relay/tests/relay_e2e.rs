//! End-to-End-Tests fuer den Relay ueber echte Loopback-TCP-Verbindungen

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;
use treffpunkt_core::UserStatus;
use treffpunkt_observability::RelayMetrics;
use treffpunkt_protocol::{
    dekodieren, kodieren, FrameCodec, MessageType, Request, Response, StatusCode, UserListType,
    SERVER_ABSENDER,
};
use treffpunkt_relay::{
    InMemoryRegistry, PresenceMonitor, RelayConfig, RelayServer, RelayState, SessionRegistry,
};

const WARTEZEIT: Duration = Duration::from_secs(2);
const OFFLINE_HINWEIS: &str = "your status has been changed to OFFLINE due to inactivity";

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

struct TestRelay {
    addr: SocketAddr,
    state: Arc<RelayState<InMemoryRegistry>>,
    _shutdown_tx: watch::Sender<bool>,
}

async fn relay_starten(config: RelayConfig) -> TestRelay {
    let state = RelayState::im_speicher(config, RelayMetrics::neu().unwrap());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = RelayServer::binden(Arc::clone(&state), "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.lokale_adresse().unwrap();
    tokio::spawn(server.starten(shutdown_rx.clone()));
    tokio::spawn(PresenceMonitor::aus_state(&state).starten(shutdown_rx));

    TestRelay {
        addr,
        state,
        _shutdown_tx: shutdown_tx,
    }
}

struct TestClient {
    framed: Framed<TcpStream, FrameCodec>,
}

impl TestClient {
    async fn verbinden(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            framed: Framed::new(stream, FrameCodec::new()),
        }
    }

    /// Verbindet und registriert; erwartet Erfolg
    async fn registriert(addr: SocketAddr, name: &str) -> Self {
        let mut client = Self::verbinden(addr).await;
        let antwort = client.anfrage(Request::register(name)).await;
        assert_eq!(antwort.status_code, StatusCode::Ok, "Registrierung von {name}");
        assert_eq!(antwort.message, "registration successful");
        client
    }

    async fn senden(&mut self, anfrage: Request) {
        self.framed.send(kodieren(&anfrage).unwrap()).await.unwrap();
    }

    async fn roh_senden(&mut self, bytes: &'static [u8]) {
        self.framed.send(Bytes::from_static(bytes)).await.unwrap();
    }

    async fn empfangen(&mut self) -> Response {
        let frame = tokio::time::timeout(WARTEZEIT, self.framed.next())
            .await
            .expect("Timeout beim Warten auf Antwort")
            .expect("Verbindung unerwartet geschlossen")
            .unwrap();
        dekodieren(&frame).unwrap()
    }

    async fn anfrage(&mut self, anfrage: Request) -> Response {
        self.senden(anfrage).await;
        self.empfangen().await
    }

    /// Erwartet dass der Server die Verbindung schliesst
    async fn erwarte_geschlossen(&mut self) {
        let naechstes = tokio::time::timeout(WARTEZEIT, self.framed.next())
            .await
            .expect("Server hat die Verbindung nicht geschlossen");
        assert!(
            !matches!(naechstes, Some(Ok(_))),
            "Keine weiteren Frames erwartet"
        );
    }
}

async fn warte_auf_anzahl(state: &RelayState<InMemoryRegistry>, erwartet: usize) {
    let frist = tokio::time::Instant::now() + WARTEZEIT;
    while state.registry.anzahl() != erwartet {
        assert!(
            tokio::time::Instant::now() < frist,
            "Registry hat nicht {erwartet} Sessions erreicht"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ---------------------------------------------------------------------------
// Registrierung
// ---------------------------------------------------------------------------

#[tokio::test]
async fn doppelter_name_wird_abgelehnt() {
    let relay = relay_starten(RelayConfig::default()).await;
    let _alice = TestClient::registriert(relay.addr, "alice").await;

    let mut zweite = TestClient::verbinden(relay.addr).await;
    let antwort = zweite.anfrage(Request::register("alice")).await;
    assert_eq!(antwort.status_code, StatusCode::BadRequest);
    assert_eq!(antwort.message, "user is already connected");
    zweite.erwarte_geschlossen().await;

    assert_eq!(relay.state.registry.anzahl(), 1);
    assert_eq!(
        relay
            .state
            .metriken
            .registrations_rejected_total
            .with_label_values(&["name_taken"])
            .get(),
        1
    );
}

#[tokio::test]
async fn kapazitaet_wird_durchgesetzt() {
    let config = RelayConfig {
        max_sessions: 2,
        ..RelayConfig::default()
    };
    let relay = relay_starten(config).await;
    let _a = TestClient::registriert(relay.addr, "a").await;
    let _b = TestClient::registriert(relay.addr, "b").await;

    let mut dritter = TestClient::verbinden(relay.addr).await;
    let antwort = dritter.anfrage(Request::register("c")).await;
    assert_eq!(antwort.status_code, StatusCode::BadRequest);
    assert_eq!(antwort.message, "server full");
    dritter.erwarte_geschlossen().await;
}

#[tokio::test]
async fn leerer_name_wird_abgelehnt() {
    let relay = relay_starten(RelayConfig::default()).await;
    let mut client = TestClient::verbinden(relay.addr).await;

    let antwort = client.anfrage(Request::register("")).await;
    assert_eq!(antwort.status_code, StatusCode::BadRequest);
    assert_eq!(antwort.message, "username must not be empty");
    client.erwarte_geschlossen().await;
    assert_eq!(relay.state.registry.anzahl(), 0);
}

#[tokio::test]
async fn erste_nachricht_muss_register_sein() {
    let relay = relay_starten(RelayConfig::default()).await;
    let mut client = TestClient::verbinden(relay.addr).await;

    client.senden(Request::alle_benutzer()).await;
    client.erwarte_geschlossen().await;
    assert_eq!(relay.state.registry.anzahl(), 0);
}

#[tokio::test]
async fn unlesbare_erste_nachricht_schliesst_verbindung() {
    let relay = relay_starten(RelayConfig::default()).await;
    let mut client = TestClient::verbinden(relay.addr).await;

    client.roh_senden(b"kein json").await;
    client.erwarte_geschlossen().await;
    assert_eq!(relay.state.registry.anzahl(), 0);
}

#[tokio::test]
async fn gleichzeitige_registrierungen_gleicher_name() {
    let relay = relay_starten(RelayConfig::default()).await;

    let versuche: Vec<_> = (0..8)
        .map(|_| {
            let addr = relay.addr;
            tokio::spawn(async move {
                let mut client = TestClient::verbinden(addr).await;
                let antwort = client.anfrage(Request::register("gleich")).await;
                (antwort.status_code, client)
            })
        })
        .collect();

    let mut erfolge = 0;
    let mut clients = Vec::new();
    for versuch in versuche {
        let (code, client) = versuch.await.unwrap();
        if code == StatusCode::Ok {
            erfolge += 1;
        }
        clients.push(client);
    }

    assert_eq!(erfolge, 1);
    assert_eq!(relay.state.registry.anzahl(), 1);
}

// ---------------------------------------------------------------------------
// Session-Anfragen
// ---------------------------------------------------------------------------

#[tokio::test]
async fn benutzerliste_alle_und_einzeln() {
    let relay = relay_starten(RelayConfig::default()).await;
    let mut alice = TestClient::registriert(relay.addr, "alice").await;
    let _bob = TestClient::registriert(relay.addr, "bob").await;

    let antwort = alice.anfrage(Request::alle_benutzer()).await;
    let liste = antwort.benutzer().expect("Benutzerliste erwartet");
    assert_eq!(liste.list_type, UserListType::All);
    let mut namen: Vec<&str> = liste.users.iter().map(|u| u.username.as_str()).collect();
    namen.sort();
    assert_eq!(namen, vec!["alice", "bob"]);
    assert!(liste.users.iter().all(|u| u.address.ip().is_loopback()));

    let antwort = alice.anfrage(Request::benutzer("bob")).await;
    let liste = antwort.benutzer().unwrap();
    assert_eq!(liste.list_type, UserListType::Single);
    assert_eq!(liste.users.len(), 1);
    assert_eq!(liste.users[0].username, "bob");
    assert_eq!(liste.users[0].status, UserStatus::Online);
}

#[tokio::test]
async fn status_fuer_unbekannten_benutzer() {
    let relay = relay_starten(RelayConfig::default()).await;
    let mut alice = TestClient::registriert(relay.addr, "alice").await;

    let antwort = alice.anfrage(Request::status("niemand", UserStatus::Busy)).await;
    assert_eq!(antwort.status_code, StatusCode::BadRequest);
    assert_eq!(antwort.message, "user not found");

    let antwort = alice.anfrage(Request::status("alice", UserStatus::Busy)).await;
    assert!(antwort.ist_ok());
    assert_eq!(
        relay.state.registry.nach_name("alice").unwrap().status,
        UserStatus::Busy
    );
}

#[tokio::test]
async fn broadcast_erreicht_alle_anderen() {
    let relay = relay_starten(RelayConfig::default()).await;
    let mut sender = TestClient::registriert(relay.addr, "s").await;
    let mut x = TestClient::registriert(relay.addr, "x").await;
    let mut y = TestClient::registriert(relay.addr, "y").await;
    let mut z = TestClient::registriert(relay.addr, "z").await;

    // z ist OFFLINE und bekommt nichts
    let antwort = sender.anfrage(Request::status("z", UserStatus::Offline)).await;
    assert!(antwort.ist_ok());

    sender.senden(Request::broadcast("hallo zusammen")).await;

    for client in [&mut x, &mut y] {
        let eingang = client.empfangen().await;
        let nachricht = eingang.nachricht().expect("Broadcast erwartet");
        assert_eq!(nachricht.sender, "s");
        assert_eq!(nachricht.content, "hallo zusammen");
        assert_eq!(nachricht.message_type, MessageType::Broadcast);
    }

    // Naechster Frame an s und z ist jeweils die Benutzerliste, kein Broadcast
    let antwort = sender.anfrage(Request::alle_benutzer()).await;
    assert!(antwort.benutzer().is_some());
    let antwort = z.anfrage(Request::alle_benutzer()).await;
    assert!(antwort.benutzer().is_some());
}

#[tokio::test]
async fn direktnachricht_an_unbekannt_offline_und_erreichbar() {
    let relay = relay_starten(RelayConfig::default()).await;
    let mut alice = TestClient::registriert(relay.addr, "alice").await;
    let mut bob = TestClient::registriert(relay.addr, "bob").await;
    let mut carol = TestClient::registriert(relay.addr, "carol").await;

    let antwort = alice.anfrage(Request::direkt("niemand", "hi")).await;
    assert_eq!(antwort.status_code, StatusCode::BadRequest);
    let hinweis = antwort.nachricht().unwrap();
    assert_eq!(hinweis.sender, SERVER_ABSENDER);
    assert_eq!(hinweis.content, "User not found.");
    assert_eq!(hinweis.message_type, MessageType::Direct);

    let antwort = alice.anfrage(Request::status("carol", UserStatus::Offline)).await;
    assert!(antwort.ist_ok());
    let antwort = alice.anfrage(Request::direkt("carol", "hi")).await;
    assert_eq!(antwort.status_code, StatusCode::BadRequest);
    assert_eq!(antwort.nachricht().unwrap().content, "User is offline.");

    // Erfolgreiche Zustellung wird nicht bestaetigt
    alice.senden(Request::direkt("bob", "psst")).await;
    let eingang = bob.empfangen().await;
    let nachricht = eingang.nachricht().unwrap();
    assert_eq!(nachricht.sender, "alice");
    assert_eq!(nachricht.content, "psst");
    assert_eq!(nachricht.message_type, MessageType::Direct);

    let antwort = alice.anfrage(Request::alle_benutzer()).await;
    assert!(antwort.benutzer().is_some(), "Keine Bestaetigung erwartet");
    let antwort = carol.anfrage(Request::alle_benutzer()).await;
    assert!(antwort.benutzer().is_some(), "carol darf nichts empfangen");
}

#[tokio::test]
async fn unlesbarer_frame_beendet_session_nicht() {
    let relay = relay_starten(RelayConfig::default()).await;
    let mut alice = TestClient::registriert(relay.addr, "alice").await;

    alice.roh_senden(b"{\"operation\":\"TANZEN\"}").await;
    let antwort = alice.anfrage(Request::alle_benutzer()).await;
    assert!(antwort.benutzer().is_some());
    assert_eq!(relay.state.metriken.decode_failures_total.get(), 1);
}

#[tokio::test]
async fn erneute_registrierung_in_session() {
    let relay = relay_starten(RelayConfig::default()).await;
    let mut alice = TestClient::registriert(relay.addr, "alice").await;

    let antwort = alice.anfrage(Request::register("alias")).await;
    assert_eq!(antwort.status_code, StatusCode::BadRequest);
    assert_eq!(antwort.message, "already registered");

    // Session laeuft weiter
    let antwort = alice.anfrage(Request::benutzer("alice")).await;
    assert_eq!(antwort.benutzer().unwrap().users.len(), 1);
}

#[tokio::test]
async fn anfrage_erhoeht_aktivitaet() {
    let relay = relay_starten(RelayConfig::default()).await;
    let mut alice = TestClient::registriert(relay.addr, "alice").await;
    let vorher = relay
        .state
        .registry
        .nach_name("alice")
        .unwrap()
        .letzte_aktivitaet;

    tokio::time::sleep(Duration::from_millis(20)).await;
    alice.anfrage(Request::alle_benutzer()).await;

    let nachher = relay
        .state
        .registry
        .nach_name("alice")
        .unwrap()
        .letzte_aktivitaet;
    assert!(nachher > vorher);
}

#[tokio::test]
async fn trennen_entfernt_session() {
    let relay = relay_starten(RelayConfig::default()).await;
    let alice = TestClient::registriert(relay.addr, "alice").await;
    let _bob = TestClient::registriert(relay.addr, "bob").await;
    assert_eq!(relay.state.metriken.sessions_registered.get(), 2);

    drop(alice);
    warte_auf_anzahl(&relay.state, 1).await;
    assert!(relay.state.registry.nach_name("alice").is_none());
    assert_eq!(relay.state.metriken.sessions_registered.get(), 1);

    // Name ist wieder frei
    let _alice = TestClient::registriert(relay.addr, "alice").await;
}

// ---------------------------------------------------------------------------
// Gesamtszenario mit Praesenz
// ---------------------------------------------------------------------------

#[tokio::test]
async fn szenario_alice_und_bob() {
    let config = RelayConfig {
        inaktivitaets_schwelle: Duration::from_secs(1),
        takt: Duration::from_millis(100),
        ..RelayConfig::default()
    };
    let relay = relay_starten(config).await;

    let mut alice = TestClient::registriert(relay.addr, "alice").await;
    let mut bob = TestClient::registriert(relay.addr, "bob").await;

    // Broadcast von alice erreicht bob
    alice.senden(Request::broadcast("hi")).await;
    let eingang = bob.empfangen().await;
    assert_eq!(eingang.nachricht().unwrap().sender, "alice");
    assert_eq!(eingang.nachricht().unwrap().message_type, MessageType::Broadcast);

    // bob setzt sich auf BUSY
    let antwort = bob.anfrage(Request::status("bob", UserStatus::Busy)).await;
    assert!(antwort.ist_ok());

    // alice sieht bob als BUSY
    let antwort = alice.anfrage(Request::benutzer("bob")).await;
    assert_eq!(antwort.benutzer().unwrap().users[0].status, UserStatus::Busy);

    // Ohne weitere Anfragen wird bob OFFLINE und benachrichtigt
    let hinweis = bob.empfangen().await;
    assert!(hinweis.ist_ok());
    assert_eq!(hinweis.message, OFFLINE_HINWEIS);

    // Direktnachricht an den OFFLINE-bob scheitert. alice kann inzwischen
    // selbst herabgestuft worden sein; ihr Hinweis wird uebersprungen.
    alice.senden(Request::direkt("bob", "noch da?")).await;
    let antwort = loop {
        let frame = alice.empfangen().await;
        if frame.message != OFFLINE_HINWEIS {
            break frame;
        }
    };
    assert_eq!(antwort.status_code, StatusCode::BadRequest);
    assert_eq!(antwort.nachricht().unwrap().content, "User is offline.");

    assert!(relay.state.metriken.presence_demotions_total.get() >= 1);
}

#[tokio::test]
async fn herabgestufte_session_bleibt_offline_trotz_anfrage() {
    let config = RelayConfig {
        inaktivitaets_schwelle: Duration::from_secs(1),
        takt: Duration::from_millis(100),
        ..RelayConfig::default()
    };
    let relay = relay_starten(config).await;
    let mut bob = TestClient::registriert(relay.addr, "bob").await;

    let hinweis = bob.empfangen().await;
    assert_eq!(hinweis.message, OFFLINE_HINWEIS);
    let vorher = relay.state.registry.nach_name("bob").unwrap();
    assert_eq!(vorher.status, UserStatus::Offline);

    tokio::time::sleep(Duration::from_millis(20)).await;
    bob.senden(Request::benutzer("bob")).await;
    let antwort = loop {
        let frame = bob.empfangen().await;
        if frame.message != OFFLINE_HINWEIS {
            break frame;
        }
    };

    let liste = antwort.benutzer().expect("Benutzerliste erwartet");
    assert_eq!(liste.users[0].username, "bob");
    assert_eq!(liste.users[0].status, UserStatus::Offline);

    let nachher = relay.state.registry.nach_name("bob").unwrap();
    assert_eq!(nachher.status, UserStatus::Offline);
    assert!(nachher.letzte_aktivitaet > vorher.letzte_aktivitaet);
}
