//! Room identifiers and the create/join entry flows.

use crate::error::SessionError;
use crate::preferences::Preferences;
use rand::Rng;

/// Length of a room identifier.
pub const ROOM_ID_LEN: usize = 12;

/// Characters a generated room id is drawn from.
const ROOM_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default number of participants a new room admits.
pub const DEFAULT_CAPACITY: u32 = 5;

/// Generate a random 12-character room id over `[A-Z0-9]`.
pub fn generate_room_id() -> String {
    let mut rng = rand::rng();
    (0..ROOM_ID_LEN)
        .map(|_| ROOM_ID_CHARSET[rng.random_range(0..ROOM_ID_CHARSET.len())] as char)
        .collect()
}

/// Client-side check before asking the authority to join.
///
/// Only the length is checked; the authority owns the rest.
pub fn validate_join_id(room_id: &str) -> Result<&str, SessionError> {
    let room_id = room_id.trim();
    if room_id.is_empty() {
        return Err(SessionError::MissingField("room id"));
    }
    if room_id.chars().count() != ROOM_ID_LEN {
        return Err(SessionError::InvalidRoomId(room_id.to_string()));
    }
    Ok(room_id)
}

/// Whether `room_id` has the generated form (12 chars of `[A-Z0-9]`).
pub fn is_well_formed(room_id: &str) -> bool {
    room_id.len() == ROOM_ID_LEN
        && room_id
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Entry-screen flows producing the preferences a session starts from.
pub struct RoomEntry;

impl RoomEntry {
    /// Create a new room hosted by `user_name`.
    pub fn create(user_name: &str, room_name: &str, capacity: u32) -> Result<Preferences, SessionError> {
        let user_name = required(user_name, "name")?;
        let room_name = required(room_name, "room name")?;
        let room_id = generate_room_id();
        log::info!("Room created: {room_name} (ID: {room_id}, capacity: {capacity}) by {user_name}");
        Ok(Preferences {
            user_name: user_name.to_string(),
            room_id: Some(room_id),
            room_name: room_name.to_string(),
            capacity: capacity.max(1),
            is_host: true,
        })
    }

    /// Join an existing room.
    ///
    /// Room name and capacity keep whatever `previous` remembered.
    pub fn join(user_name: &str, room_id: &str, previous: &Preferences) -> Result<Preferences, SessionError> {
        let user_name = required(user_name, "name")?;
        let room_id = validate_join_id(room_id)?;
        log::info!("Joining room {room_id} as {user_name}");
        Ok(Preferences {
            user_name: user_name.to_string(),
            room_id: Some(room_id.to_string()),
            is_host: false,
            ..previous.clone()
        })
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, SessionError> {
    let value = value.trim();
    if value.is_empty() {
        Err(SessionError::MissingField(field))
    } else {
        Ok(value)
    }
}
