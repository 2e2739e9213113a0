//! Peer channel between the two instances of an online game
//!
//! The host binds a dedicated listener and accepts one guest on
//! `/peer/{roomId}`. The guest dials that URL. Either way the open socket
//! is pumped in both directions: outgoing wire messages come from the
//! table's `Outbox`, incoming frames are decoded and queued on the table.

use crate::runtime::{Command, TableHandle};
use axum::{
    extract::{
        ws::{self, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use ludo_core::{Broadcast, SessionEvent, WireMessage};
use rand::Rng;
use serde::Serialize;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to open peer listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("could not reach host at {url}: {source}")]
    Dial {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("invalid host url: {0}")]
    InvalidUrl(String),
    #[error("table runtime has stopped")]
    RuntimeGone,
}

const ROOM_ID_LEN: usize = 6;
const ROOM_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Short human-typable room code
pub fn generate_room_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_ID_LEN)
        .map(|_| ROOM_ALPHABET[rng.gen_range(0..ROOM_ALPHABET.len())] as char)
        .collect()
}

// ============================================================================
// OUTBOX
// ============================================================================

/// `Broadcast` end handed to the table; forwards to whichever link is open
#[derive(Clone, Default)]
pub struct Outbox {
    link: Arc<Mutex<Option<mpsc::UnboundedSender<WireMessage>>>>,
}

impl Outbox {
    fn attach(&self) -> mpsc::UnboundedReceiver<WireMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut link) = self.link.lock() {
            *link = Some(tx);
        }
        rx
    }

    fn detach(&self) {
        if let Ok(mut link) = self.link.lock() {
            *link = None;
        }
    }
}

impl Broadcast for Outbox {
    fn broadcast(&self, message: WireMessage) {
        let Ok(mut link) = self.link.lock() else {
            return;
        };
        if let Some(tx) = link.as_ref() {
            if tx.send(message).is_err() {
                *link = None;
            }
        }
    }
}

// ============================================================================
// SESSIONS
// ============================================================================

/// Where a guest should dial
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    pub room_id: String,
    pub host_url: String,
    pub join_url: String,
}

struct Session {
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    fn close(self) {
        let _ = self.stop.send(true);
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Owns the (at most one) live peer session of this instance
pub struct PeerHub {
    table: TableHandle,
    outbox: Outbox,
    public_host: String,
    peer_port: u16,
    session: tokio::sync::Mutex<Option<Session>>,
}

impl PeerHub {
    pub fn new(table: TableHandle, outbox: Outbox, public_host: String, peer_port: u16) -> Self {
        Self {
            table,
            outbox,
            public_host,
            peer_port,
            session: tokio::sync::Mutex::new(None),
        }
    }

    /// Open a room and wait for a guest
    pub async fn host(&self) -> Result<HostInfo, SessionError> {
        let mut slot = self.session.lock().await;
        if let Some(old) = slot.take() {
            old.close();
            self.outbox.detach();
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], self.peer_port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(err) => {
                tracing::warn!(%err, "peer listener bind failed");
                self.table.send(Command::Session(SessionEvent::HostFailed))?;
                return Err(SessionError::Bind(err));
            }
        };
        let port = listener.local_addr().map_err(SessionError::Bind)?.port();

        let room_id = generate_room_id();
        self.table.send(Command::Session(SessionEvent::HostOpened {
            room_id: room_id.clone(),
        }))?;

        let (stop, stopped) = watch::channel(false);
        let room = Arc::new(Room {
            room_id: room_id.clone(),
            seat_taken: AtomicBool::new(false),
            table: self.table.clone(),
            outbox: self.outbox.clone(),
            stop: stopped.clone(),
        });
        let router = Router::new()
            .route("/peer/:room_id", get(accept_guest))
            .with_state(room);

        let mut shutdown = stopped;
        let server = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            });
            if let Err(err) = serve.await {
                tracing::warn!(%err, "peer listener failed");
            }
        });

        let host_url = format!("ws://{}:{}", self.public_host, port);
        let info = HostInfo {
            join_url: format!("{}/peer/{}", host_url, room_id),
            host_url,
            room_id,
        };
        tracing::info!(room = %info.room_id, url = %info.join_url, "hosting");

        *slot = Some(Session {
            stop,
            tasks: vec![server],
        });
        Ok(info)
    }

    /// Dial a host's room and play as guest
    pub async fn join(&self, host_url: &str, room_id: &str) -> Result<(), SessionError> {
        let mut slot = self.session.lock().await;
        if let Some(old) = slot.take() {
            old.close();
            self.outbox.detach();
        }

        let url = peer_url(host_url, room_id)?;
        self.table.send(Command::Session(SessionEvent::Dialing {
            room_id: room_id.to_string(),
        }))?;

        let socket = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((socket, _)) => socket,
            Err(source) => {
                tracing::warn!(%url, err = %source, "join failed");
                self.table.send(Command::Session(SessionEvent::JoinFailed))?;
                return Err(SessionError::Dial { url, source });
            }
        };

        let outgoing = self.outbox.attach();
        self.table.send(Command::Session(SessionEvent::Connected))?;
        tracing::info!(room = %room_id, "joined");

        let (stop, stopped) = watch::channel(false);
        let table = self.table.clone();
        let outbox = self.outbox.clone();
        let link = tokio::spawn(async move {
            pump(socket, outgoing, &table, stopped.clone()).await;
            outbox.detach();
            if !*stopped.borrow() {
                let _ = table.send(Command::Session(SessionEvent::PeerLost));
            }
        });

        *slot = Some(Session {
            stop,
            tasks: vec![link],
        });
        Ok(())
    }

    /// Drop the current session, if any
    pub async fn leave(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.close();
            self.outbox.detach();
            tracing::info!("session closed");
        }
    }
}

/// Accepts `ws://host:port` (room appended) or a full `/peer/{room}` URL
fn peer_url(host_url: &str, room_id: &str) -> Result<String, SessionError> {
    let base = host_url.trim().trim_end_matches('/');
    if !(base.starts_with("ws://") || base.starts_with("wss://")) || room_id.trim().is_empty() {
        return Err(SessionError::InvalidUrl(host_url.to_string()));
    }
    if base.contains("/peer/") {
        return Ok(base.to_string());
    }
    Ok(format!("{}/peer/{}", base, room_id.trim()))
}

// ============================================================================
// HOST LISTENER
// ============================================================================

struct Room {
    room_id: String,
    seat_taken: AtomicBool,
    table: TableHandle,
    outbox: Outbox,
    stop: watch::Receiver<bool>,
}

async fn accept_guest(
    State(room): State<Arc<Room>>,
    Path(room_id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Response {
    if room_id != room.room_id {
        return (StatusCode::NOT_FOUND, "Unknown room").into_response();
    }
    if room.seat_taken.swap(true, Ordering::SeqCst) {
        return (StatusCode::CONFLICT, "Room is full").into_response();
    }
    upgrade
        .on_upgrade(move |socket| serve_guest(socket, room))
        .into_response()
}

async fn serve_guest(socket: WebSocket, room: Arc<Room>) {
    let outgoing = room.outbox.attach();
    if room
        .table
        .send(Command::Session(SessionEvent::GuestJoined))
        .is_err()
    {
        return;
    }
    tracing::info!(room = %room.room_id, "guest joined");

    pump(socket, outgoing, &room.table, room.stop.clone()).await;

    room.outbox.detach();
    room.seat_taken.store(false, Ordering::SeqCst);
    if !*room.stop.borrow() {
        tracing::info!(room = %room.room_id, "guest left");
        let _ = room.table.send(Command::Session(SessionEvent::PeerLost));
    }
}

// ============================================================================
// LINK PUMP
// ============================================================================

/// The text-frame view shared by both websocket libraries
trait TextFrame: Sized {
    fn text(text: String) -> Self;
    fn into_text(self) -> Option<String>;
    fn is_close(&self) -> bool;
}

impl TextFrame for ws::Message {
    fn text(text: String) -> Self {
        ws::Message::Text(text)
    }

    fn into_text(self) -> Option<String> {
        match self {
            ws::Message::Text(text) => Some(text),
            _ => None,
        }
    }

    fn is_close(&self) -> bool {
        matches!(self, ws::Message::Close(_))
    }
}

impl TextFrame for tungstenite::Message {
    fn text(text: String) -> Self {
        tungstenite::Message::Text(text)
    }

    fn into_text(self) -> Option<String> {
        match self {
            tungstenite::Message::Text(text) => Some(text),
            _ => None,
        }
    }

    fn is_close(&self) -> bool {
        matches!(self, tungstenite::Message::Close(_))
    }
}

/// Shuttle frames until either side closes or the session is stopped
async fn pump<S, M, E>(
    socket: S,
    mut outgoing: mpsc::UnboundedReceiver<WireMessage>,
    table: &TableHandle,
    mut stop: watch::Receiver<bool>,
) where
    S: Stream<Item = Result<M, E>> + Sink<M>,
    M: TextFrame + Unpin,
    E: Display,
{
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            _ = stop.changed() => {
                let _ = sink.close().await;
                break;
            }
            Some(message) = outgoing.recv() => {
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(%err, "failed to encode wire message");
                        continue;
                    }
                };
                if sink.send(M::text(text)).await.is_err() {
                    break;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(frame)) if frame.is_close() => break,
                Some(Ok(frame)) => {
                    let Some(text) = frame.into_text() else {
                        continue;
                    };
                    match WireMessage::from_json(&text) {
                        Ok(message) => {
                            if table.send(Command::Remote(message)).is_err() {
                                break;
                            }
                        }
                        Err(err) => tracing::warn!(%err, "dropping undecodable peer frame"),
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(%err, "peer link error");
                    break;
                }
                None => break,
            }
        }
    }
}
