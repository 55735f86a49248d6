use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::registry::RoomRegistry;
use trivia_types::{ClientMessage, GameError, ServerMessage};

pub mod connection;
pub mod flood;
pub mod handlers;

pub use connection::{ConnectionId, ConnectionManager};
use flood::FloodGuard;
use handlers::MessageHandler;

const PING_INTERVAL: Duration = Duration::from_secs(30);

pub async fn handle_connection(
    websocket: WebSocket,
    connection_manager: Arc<ConnectionManager>,
    registry: Arc<RoomRegistry>,
) {
    let connection_id = ConnectionId::new();
    info!("New WebSocket connection: {}", connection_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let mut flood_guard = FloodGuard::new();

    let mut message_receiver = connection_manager.create_connection(connection_id).await;

    let message_handler = MessageHandler::new(
        connection_id,
        connection_manager.clone(),
        registry.clone(),
    );

    // Tell the client who it is before anything else happens
    let _ = connection_manager
        .send_to_connection(
            connection_id,
            ServerMessage::Connection {
                client_id: connection_id.player_id(),
            },
        )
        .await;

    let incoming_handler = {
        let message_handler = message_handler.clone();
        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if let Err(e) =
                            handle_message(msg, &mut flood_guard, &message_handler).await
                        {
                            error!("Closing connection {}: {}", connection_id, e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    let outgoing_handler = {
        async move {
            let mut ping_interval = tokio::time::interval(PING_INTERVAL);
            ping_interval.tick().await; // first tick completes immediately

            loop {
                tokio::select! {
                    message = message_receiver.recv() => {
                        let Some(message) = message else { break };
                        let json = match serde_json::to_string(&message) {
                            Ok(json) => json,
                            Err(e) => {
                                error!("Failed to serialize message: {:?}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sender.send(Message::text(json)).await {
                            warn!("Failed to send message to {}: {:?}", connection_id, e);
                            break;
                        }
                    }
                    _ = ping_interval.tick() => {
                        if ws_sender.send(Message::ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Connection {} disconnected", connection_id);
    message_handler.handle_disconnect().await;
    connection_manager.remove_connection(connection_id).await;
}

async fn handle_message(
    msg: Message,
    flood_guard: &mut FloodGuard,
    message_handler: &MessageHandler,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Transport-level flood protection; guess pacing is the room's job
    if !flood_guard.allow() {
        return Err("Message flood limit exceeded".into());
    }

    if !msg.is_text() {
        return Ok(());
    }
    let text = msg.to_str().map_err(|_| "Invalid text message")?;

    // Bad payloads get a private error and the connection stays open
    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(parsed) => parsed,
        Err(e) => {
            let reason = if e.to_string().contains("unknown variant") {
                GameError::UnknownMessageType
            } else {
                GameError::MalformedMessage
            };
            let _ = message_handler.send_error(&reason.to_string()).await;
            return Ok(());
        }
    };

    message_handler
        .handle_message(client_message)
        .await
        .map_err(|e| format!("Message handling error: {}", e))?;

    Ok(())
}
