use std::sync::Arc;

use tracing::info;

use crate::registry::RoomRegistry;
use crate::websocket::connection::{ConnectionId, ConnectionManager};
use trivia_types::{ClientMessage, ServerMessage};

/// Maps one connection's inbound intents onto the room registry.
#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    registry: Arc<RoomRegistry>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        registry: Arc<RoomRegistry>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            registry,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        match message {
            ClientMessage::CreateRoom { username } => self.handle_create_room(username).await,
            ClientMessage::JoinRoom {
                room_code,
                username,
            } => self.handle_join_room(room_code, username).await,
            ClientMessage::SubmitGuess { guess } => {
                self.registry
                    .submit_guess(self.connection_id.player_id(), &guess)
                    .await;
                Ok(())
            }
            ClientMessage::ResetGame => {
                self.registry
                    .reset_game(self.connection_id.player_id())
                    .await;
                Ok(())
            }
            ClientMessage::LeaveRoom => {
                self.registry.leave(self.connection_id.player_id()).await;
                Ok(())
            }
        }
    }

    /// Abrupt disconnects count as leaving the room.
    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);
        self.registry.leave(self.connection_id.player_id()).await;
    }

    async fn handle_create_room(&self, username: String) -> Result<(), String> {
        match self
            .registry
            .create_room(self.connection_id.player_id(), &username)
            .await
        {
            Ok(room_code) => {
                info!(
                    "Connection {} created room {} as {}",
                    self.connection_id, room_code, username
                );
                self.send_message(ServerMessage::RoomCreated {
                    room_code,
                    username,
                })
                .await
            }
            Err(e) => self.send_error(&e.to_string()).await,
        }
    }

    async fn handle_join_room(&self, room_code: String, username: String) -> Result<(), String> {
        let room_code = room_code.trim().to_uppercase();
        match self
            .registry
            .join_or_create(&room_code, self.connection_id.player_id(), &username)
            .await
        {
            Ok(()) => {
                info!(
                    "Connection {} joined room {} as {}",
                    self.connection_id, room_code, username
                );
                Ok(())
            }
            Err(e) => self.send_error(&e.to_string()).await,
        }
    }

    pub async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.connection_id, message)
            .await
    }

    pub async fn send_error(&self, error_message: &str) -> Result<(), String> {
        self.send_message(ServerMessage::Error {
            message: error_message.to_string(),
        })
        .await
    }
}
