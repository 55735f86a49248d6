use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use tokio::sync::{RwLock, mpsc};
use tracing::warn;
use trivia_types::{PlayerId, ServerMessage};
use uuid::Uuid;

/// Outbound messages queued per connection before hitting the socket. A
/// client that stops reading loses messages rather than growing the queue.
const OUTBOUND_BUFFER: usize = 64;

/// One id per websocket. The same uuid doubles as the player id inside a
/// room, so lookups in either direction are trivial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn player_id(&self) -> PlayerId {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<PlayerId> for ConnectionId {
    fn from(id: PlayerId) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub room_code: Option<String>,
    pub connected_at: Instant,
    sender: mpsc::Sender<ServerMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (sender, receiver) = mpsc::channel(OUTBOUND_BUFFER);
        let connection = Self {
            id,
            room_code: None,
            connected_at: Instant::now(),
            sender,
        };
        (connection, receiver)
    }

    /// Fire-and-forget push onto the connection's outbound queue. A full
    /// queue drops the message instead of blocking room logic.
    pub fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => "Outbound queue full".to_string(),
            mpsc::error::TrySendError::Closed(_) => "Connection closed".to_string(),
        })
    }
}

/// Tracks every live websocket and which room it belongs to.
pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_connection(&self, id: ConnectionId) -> mpsc::Receiver<ServerMessage> {
        let (conn, receiver) = Connection::new(id);
        let mut connections = self.connections.write().await;
        connections.insert(id, conn);
        receiver
    }

    pub async fn remove_connection(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        connections.remove(&id);
    }

    pub async fn get_connection(&self, id: ConnectionId) -> Option<Connection> {
        let connections = self.connections.read().await;
        connections.get(&id).cloned()
    }

    pub async fn set_connection_room(&self, id: ConnectionId, room_code: Option<String>) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.room_code = room_code;
        }
    }

    pub async fn send_to_connection(
        &self,
        id: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), String> {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&id) {
            connection.send_message(message)
        } else {
            Err("Connection not found".to_string())
        }
    }

    /// Deliver to every member of a room, optionally skipping one.
    pub async fn send_to_room(
        &self,
        room_code: &str,
        message: ServerMessage,
        exclude: Option<ConnectionId>,
    ) {
        let connections = self.connections.read().await;
        for connection in connections.values() {
            if Some(connection.id) == exclude {
                continue;
            }
            if connection.room_code.as_deref() == Some(room_code) {
                if let Err(e) = connection.send_message(message.clone()) {
                    warn!("Dropping message for {}: {}", connection.id, e);
                }
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
