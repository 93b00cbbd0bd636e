//! SketchRoom Room Authority
//!
//! Reference server for the SketchRoom protocol. It admits participants to
//! rooms, keeps each room's canonical stroke log, resolves undo/redo per author
//! and relays live strokes, cursors and presence.
//!
//! ## Protocol
//!
//! Messages are JSON tagged by `type`:
//! ```json
//! { "type": "join-room", "roomId": "ABCDEF123456", "userName": "Ann", ... }
//! { "type": "draw-segment", "fromX": 10, "fromY": 10, "toX": 20, "toY": 20, ... }
//! { "type": "canonical-history-replace", "history": [ ... ] }
//! ```

mod config;
mod room;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use config::ServerConfig;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use room::{Member, Outbound, Room};
use sketchroom_core::protocol::{AuthorityEvent, ClientIntent};
use sketchroom_core::room::is_well_formed;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// A room and the channel its members listen on.
struct RoomHandle {
    room: Room,
    tx: broadcast::Sender<Outbound>,
}

impl RoomHandle {
    fn new(room: Room) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { room, tx }
    }

    fn dispatch(&self, outbound: Vec<Outbound>) {
        for out in outbound {
            let _ = self.tx.send(out);
        }
    }
}

/// Shared application state
struct AppState {
    config: ServerConfig,
    rooms: DashMap<String, RoomHandle>,
}

impl AppState {
    fn new(config: ServerConfig) -> Self {
        Self {
            config,
            rooms: DashMap::new(),
        }
    }

    /// Admit `member`, creating the room on first join.
    ///
    /// The receiver is subscribed before the join events are dispatched so the
    /// joiner sees its own roster and backlog.
    fn join_room(
        &self,
        room_id: &str,
        room_name: &str,
        capacity: u32,
        member: Member,
    ) -> Result<broadcast::Receiver<Outbound>, String> {
        let mut handle = self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            let capacity = self.config.capacity_for(capacity);
            info!(room = room_id, name = room_name, capacity, "room created");
            RoomHandle::new(Room::new(room_id, room_name, capacity))
        });
        let rx = handle.tx.subscribe();
        let outbound = handle.room.admit(member)?;
        info!(
            room = handle.room.id(),
            members = handle.room.member_count(),
            capacity = handle.room.capacity(),
            "joined"
        );
        handle.dispatch(outbound);
        Ok(rx)
    }

    fn leave_room(&self, room_id: &str, peer_id: &str) {
        if let Some(mut handle) = self.rooms.get_mut(room_id) {
            let outbound = handle.room.remove(peer_id);
            handle.dispatch(outbound);
            // Clean up empty rooms
            if handle.room.is_empty() {
                info!(room = room_id, name = handle.room.name(), "room closed");
                drop(handle);
                self.rooms.remove(room_id);
            }
        }
    }

    /// Full log for a member that missed broadcasts.
    fn resync(&self, room_id: &str, peer_id: &str) -> Option<Outbound> {
        self.rooms.get(room_id).map(|handle| handle.room.resync(peer_id))
    }

    fn handle_intent(&self, room_id: &str, peer_id: &str, intent: ClientIntent) {
        if let Some(mut handle) = self.rooms.get_mut(room_id) {
            let outbound = handle.room.handle(peer_id, intent);
            handle.dispatch(outbound);
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchroom_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let state = Arc::new(AppState::new(config));

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("SketchRoom authority listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);

    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Index page
async fn index() -> &'static str {
    "SketchRoom Room Authority - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(event: &AuthorityEvent) -> Option<Message> {
    match event.to_json() {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to encode {:?}: {}", event, e);
            None
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current_room: Option<String> = None;
    let mut room_rx: Option<broadcast::Receiver<Outbound>> = None;

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue, // Ignore binary/ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                };

                let intent = match serde_json::from_str::<ClientIntent>(&text) {
                    Ok(intent) => intent,
                    Err(e) => {
                        warn!("Invalid message from {}: {}", peer_id, e);
                        continue;
                    }
                };

                if let Some(room) = &current_room {
                    state.handle_intent(room, &peer_id, intent);
                    continue;
                }

                let ClientIntent::JoinRoom { room_id, room_name, user_name, user_color, capacity, .. } = intent else {
                    warn!("Ignoring message from {} before join", peer_id);
                    continue;
                };
                let result = if is_well_formed(&room_id) {
                    let member = Member { id: peer_id.clone(), name: user_name, color: user_color };
                    state.join_room(&room_id, &room_name, capacity, member)
                } else {
                    Err("Invalid Room ID".to_string())
                };
                match result {
                    Ok(rx) => {
                        info!("Peer {} joined room {}", peer_id, room_id);
                        room_rx = Some(rx);
                        current_room = Some(room_id);
                    }
                    Err(message) => {
                        warn!("Peer {} rejected from room {}: {}", peer_id, room_id, message);
                        if let Some(msg) = encode(&AuthorityEvent::RoomRejected { message }) {
                            let _ = sender.send(msg).await;
                        }
                        break;
                    }
                }
            }

            // Handle broadcast messages from room
            msg = async {
                match &mut room_rx {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending::<Result<Outbound, RecvError>>().await,
                }
            } => {
                let out = match msg {
                    Ok(out) if out.target.includes(&peer_id) => out,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Peer {} lagged by {} messages, resending history", peer_id, skipped);
                        let Some(out) = current_room.as_deref().and_then(|room| state.resync(room, &peer_id)) else {
                            continue;
                        };
                        out
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Some(msg) = encode(&out.event) {
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    if let Some(ref room) = current_room {
        state.leave_room(room, &peer_id);
    }
    info!("Connection closed: {}", peer_id);
}
