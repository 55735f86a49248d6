use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use trivia_core::{Outbound, Room, RoomConfig, RoomUpdate, RoundCatalog, TimerDirective};
use trivia_types::{GameError, PlayerId};

use crate::websocket::{ConnectionId, ConnectionManager};

const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_CODE_ATTEMPTS: usize = 8;

/// One room plus its single scheduled task. The timer slot is the structural
/// guard against zombie timers: replacing it always aborts the previous task
/// first, so at most one tick or cooldown task is ever live per room.
pub struct RoomHandle {
    pub room: Mutex<Room>,
    timer: std::sync::Mutex<Option<JoinHandle<()>>>,
    last_activity: std::sync::Mutex<Instant>,
}

impl RoomHandle {
    fn new(room: Room) -> Self {
        Self {
            room: Mutex::new(room),
            timer: std::sync::Mutex::new(None),
            last_activity: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Swap in a new scheduled task, aborting whatever ran before. Safe to
    /// call from the running task itself as long as it returns without
    /// awaiting afterwards.
    fn replace_timer(&self, next: Option<JoinHandle<()>>) {
        let old = {
            let mut slot = self.timer.lock().expect("timer lock poisoned");
            std::mem::replace(&mut *slot, next)
        };
        if let Some(task) = old {
            task.abort();
        }
    }

    pub fn has_timer(&self) -> bool {
        self.timer.lock().expect("timer lock poisoned").is_some()
    }

    fn touch(&self) {
        *self.last_activity.lock().expect("activity lock poisoned") = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .expect("activity lock poisoned")
            .elapsed()
    }
}

/// Owns every active room: code to room, player to room, creation and
/// garbage collection. The gateway holds one instance for the process.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<RoomHandle>>>,
    player_rooms: RwLock<HashMap<PlayerId, String>>,
    connections: Arc<ConnectionManager>,
    catalog: RoundCatalog,
    room_config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(
        connections: Arc<ConnectionManager>,
        catalog: RoundCatalog,
        room_config: RoomConfig,
    ) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            player_rooms: RwLock::new(HashMap::new()),
            connections,
            catalog,
            room_config,
        }
    }

    /// Generate a fresh code and put the creator in the new room.
    pub async fn create_room(
        &self,
        player: PlayerId,
        username: &str,
    ) -> Result<String, GameError> {
        let mut last_code = String::new();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_room_code();
            match self.insert_room(&code).await {
                Ok(handle) => {
                    self.join_handle(&code, &handle, true, player, username)
                        .await?;
                    return Ok(code);
                }
                Err(_) => last_code = code,
            }
        }
        Err(GameError::RoomCodeCollision { code: last_code })
    }

    /// Join the room with this code, creating it first if nobody has yet.
    pub async fn join_or_create(
        &self,
        code: &str,
        player: PlayerId,
        username: &str,
    ) -> Result<(), GameError> {
        let existing = {
            let rooms = self.rooms.read().await;
            rooms.get(code).cloned()
        };
        let (handle, created) = match existing {
            Some(handle) => (handle, false),
            None => match self.insert_room(code).await {
                Ok(handle) => (handle, true),
                // lost the creation race, somebody else's room is fine too
                Err(_) => {
                    let rooms = self.rooms.read().await;
                    let handle = rooms.get(code).cloned().ok_or(GameError::RoomNotFound)?;
                    (handle, false)
                }
            },
        };
        self.join_handle(code, &handle, created, player, username)
            .await
    }

    /// Join an existing room only; unknown codes are an error.
    pub async fn join_room(
        &self,
        code: &str,
        player: PlayerId,
        username: &str,
    ) -> Result<(), GameError> {
        let handle = {
            let rooms = self.rooms.read().await;
            rooms.get(code).cloned().ok_or(GameError::RoomNotFound)?
        };
        self.join_handle(code, &handle, false, player, username)
            .await
    }

    /// Remove the player from whatever room they are in. Disconnects and
    /// explicit leaves both land here.
    pub async fn leave(&self, player: PlayerId) {
        let code = {
            let mut player_rooms = self.player_rooms.write().await;
            player_rooms.remove(&player)
        };
        let Some(code) = code else {
            return;
        };
        let handle = {
            let rooms = self.rooms.read().await;
            rooms.get(&code).cloned()
        };
        let Some(handle) = handle else {
            return;
        };

        let (update, now_empty) = {
            let mut room = handle.room.lock().await;
            let update = room.remove_player(player);
            (update, room.is_empty())
        };
        self.connections
            .set_connection_room(player.into(), None)
            .await;
        handle.touch();
        self.apply_update(&code, &handle, update).await;

        if now_empty {
            self.drop_room(&code).await;
        }
    }

    pub async fn submit_guess(&self, player: PlayerId, raw: &str) {
        let Some((code, handle)) = self.room_of(player).await else {
            return;
        };
        let update = {
            let mut room = handle.room.lock().await;
            room.submit_guess(player, raw, Instant::now())
        };
        handle.touch();
        self.apply_update(&code, &handle, update).await;
    }

    pub async fn reset_game(&self, player: PlayerId) {
        let Some((code, handle)) = self.room_of(player).await else {
            return;
        };
        let update = {
            let mut room = handle.room.lock().await;
            room.reset_game()
        };
        handle.touch();
        self.apply_update(&code, &handle, update).await;
    }

    /// Drop rooms with no players that nobody has touched for longer than
    /// `max_idle`. Occupied rooms are never swept, however quiet.
    pub async fn sweep_idle(&self, max_idle: Duration) {
        let stale: Vec<String> = {
            let rooms = self.rooms.read().await;
            let mut stale = Vec::new();
            for (code, handle) in rooms.iter() {
                if handle.idle_for() > max_idle && handle.room.lock().await.is_empty() {
                    stale.push(code.clone());
                }
            }
            stale
        };
        for code in stale {
            info!(room = %code, "sweeping idle room");
            self.drop_room(&code).await;
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn room_of(&self, player: PlayerId) -> Option<(String, Arc<RoomHandle>)> {
        let code = {
            let player_rooms = self.player_rooms.read().await;
            player_rooms.get(&player).cloned()
        }?;
        let handle = {
            let rooms = self.rooms.read().await;
            rooms.get(&code).cloned()
        }?;
        Some((code, handle))
    }

    async fn insert_room(&self, code: &str) -> Result<Arc<RoomHandle>, GameError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(code) {
            return Err(GameError::RoomCodeCollision {
                code: code.to_string(),
            });
        }
        let room = Room::new(code.to_string(), self.catalog.fork(), self.room_config);
        let handle = Arc::new(RoomHandle::new(room));
        rooms.insert(code.to_string(), handle.clone());
        info!(room = %code, "room created");
        Ok(handle)
    }

    async fn join_handle(
        &self,
        code: &str,
        handle: &Arc<RoomHandle>,
        created: bool,
        player: PlayerId,
        username: &str,
    ) -> Result<(), GameError> {
        let result = {
            let mut room = handle.room.lock().await;
            room.add_player(player, username.to_string())
        };
        match result {
            Ok(update) => {
                {
                    let mut player_rooms = self.player_rooms.write().await;
                    player_rooms.insert(player, code.to_string());
                }
                self.connections
                    .set_connection_room(player.into(), Some(code.to_string()))
                    .await;
                handle.touch();
                self.apply_update(code, handle, update).await;
                Ok(())
            }
            Err(e) => {
                if created {
                    self.drop_room_if_empty(code).await;
                }
                Err(e)
            }
        }
    }

    async fn apply_update(&self, code: &str, handle: &Arc<RoomHandle>, update: RoomUpdate) {
        deliver(&self.connections, code, update.messages).await;
        match update.timer {
            TimerDirective::Keep => {}
            TimerDirective::Cancel => handle.replace_timer(None),
            TimerDirective::StartRound => {
                let task = spawn_round_timer(
                    self.connections.clone(),
                    handle.clone(),
                    code.to_string(),
                    self.cooldown(),
                );
                handle.replace_timer(Some(task));
            }
            TimerDirective::StartCooldown => {
                let task = spawn_cooldown_timer(
                    self.connections.clone(),
                    handle.clone(),
                    code.to_string(),
                    self.cooldown(),
                );
                handle.replace_timer(Some(task));
            }
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::from_secs(u64::from(self.room_config.cooldown_seconds))
    }

    async fn drop_room(&self, code: &str) {
        let handle = {
            let mut rooms = self.rooms.write().await;
            rooms.remove(code)
        };
        if let Some(handle) = handle {
            handle.replace_timer(None);
        }
        let mut player_rooms = self.player_rooms.write().await;
        player_rooms.retain(|_, room_code| room_code != code);
    }

    async fn drop_room_if_empty(&self, code: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(handle) = rooms.get(code) {
            if handle.room.lock().await.is_empty() {
                if let Some(handle) = rooms.remove(code) {
                    handle.replace_timer(None);
                }
            }
        }
    }
}

fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ROOM_CODE_CHARSET.len());
            ROOM_CODE_CHARSET[idx] as char
        })
        .collect()
}

async fn deliver(connections: &ConnectionManager, code: &str, messages: Vec<Outbound>) {
    for outbound in messages {
        match outbound {
            Outbound::Broadcast { message, exclude } => {
                connections
                    .send_to_room(code, message, exclude.map(ConnectionId::from))
                    .await;
            }
            Outbound::Notify { player, message } => {
                if let Err(e) = connections
                    .send_to_connection(player.into(), message)
                    .await
                {
                    debug!(room = %code, "private send failed: {}", e);
                }
            }
        }
    }
}

/// Ticks the round clock once per second until the round ends. Hands off to
/// a cooldown task (or cancels itself) through the room's single timer slot.
fn spawn_round_timer(
    connections: Arc<ConnectionManager>,
    handle: Arc<RoomHandle>,
    code: String,
    cooldown: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let update = {
                let mut room = handle.room.lock().await;
                room.tick()
            };
            handle.touch();
            deliver(&connections, &code, update.messages).await;
            match update.timer {
                TimerDirective::Keep => {}
                TimerDirective::Cancel => {
                    handle.replace_timer(None);
                    return;
                }
                TimerDirective::StartCooldown => {
                    let next = spawn_cooldown_timer(
                        connections.clone(),
                        handle.clone(),
                        code.clone(),
                        cooldown,
                    );
                    // aborts this task; nothing awaits after the swap
                    handle.replace_timer(Some(next));
                    return;
                }
                TimerDirective::StartRound => {}
            }
        }
    })
}

/// Waits out the between-rounds pause, then starts the next round.
fn spawn_cooldown_timer(
    connections: Arc<ConnectionManager>,
    handle: Arc<RoomHandle>,
    code: String,
    cooldown: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(cooldown).await;
        let update = {
            let mut room = handle.room.lock().await;
            room.finish_cooldown()
        };
        handle.touch();
        deliver(&connections, &code, update.messages).await;
        if update.timer == TimerDirective::StartRound {
            let next = spawn_round_timer(connections.clone(), handle.clone(), code.clone(), cooldown);
            handle.replace_timer(Some(next));
        }
    })
}
