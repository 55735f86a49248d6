use trivia_core::{Outbound, Room, RoomConfig, RoundCatalog};
use trivia_types::{ImageSet, PlayerId, ServerMessage};
use uuid::Uuid;

/// Builds an image set with a known answer so tests can guess correctly.
pub fn image_set(id: u32, answer: &str) -> ImageSet {
    ImageSet {
        id,
        images: vec![
            format!("https://example.com/{}-1.jpg", id),
            format!("https://example.com/{}-2.jpg", id),
            format!("https://example.com/{}-3.jpg", id),
        ],
        correct_answer: answer.to_string(),
        hint: Some(format!("hint {}", id)),
        category: None,
    }
}

/// A room whose every round has the answer "nature".
pub fn create_test_room() -> Room {
    create_test_room_with_config(RoomConfig::default())
}

pub fn create_test_room_with_config(config: RoomConfig) -> Room {
    let catalog =
        RoundCatalog::with_seed(vec![image_set(1, "nature")], 7).expect("non-empty catalog");
    Room::new("ABC123".to_string(), catalog, config)
}

/// Fills the room to capacity with "alice" and "bob", which starts round 1.
pub fn join_two_players(room: &mut Room) -> (PlayerId, PlayerId) {
    let p1 = Uuid::new_v4();
    let p2 = Uuid::new_v4();
    room.add_player(p1, "alice".to_string()).expect("alice joins");
    room.add_player(p2, "bob".to_string()).expect("bob joins");
    (p1, p2)
}

/// Extracts every broadcast message from a batch of outbound messages.
pub fn broadcasts(messages: &[Outbound]) -> Vec<&ServerMessage> {
    messages
        .iter()
        .filter_map(|m| match m {
            Outbound::Broadcast { message, .. } => Some(message),
            Outbound::Notify { .. } => None,
        })
        .collect()
}

/// Extracts private messages addressed to one player.
pub fn notices_for(messages: &[Outbound], target: PlayerId) -> Vec<&ServerMessage> {
    messages
        .iter()
        .filter_map(|m| match m {
            Outbound::Notify { player, message } if *player == target => Some(message),
            _ => None,
        })
        .collect()
}

/// Runs the round clock down to zero.
pub fn run_out_clock(room: &mut Room) {
    for _ in 0..RoomConfig::default().round_timer_seconds {
        room.tick();
    }
}
