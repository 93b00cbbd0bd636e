//! Wire protocol between clients and the room authority.
//!
//! Messages are JSON objects tagged by `type`:
//! ```json
//! { "type": "join-room", "roomId": "ABCDEF123456", "roomName": "Room", ... }
//! { "type": "draw-segment", "fromX": 10, "fromY": 10, "toX": 20, "toY": 20, ... }
//! { "type": "canonical-history-replace", "history": [ ... ] }
//! ```

use crate::error::SessionError;
use crate::stroke::StrokeEvent;
use serde::{Deserialize, Deserializer, Serialize};

/// Intents sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientIntent {
    /// Request admission to a room (sent once per connection).
    JoinRoom {
        room_id: String,
        room_name: String,
        user_name: String,
        user_color: String,
        capacity: u32,
        is_host: bool,
    },
    /// Incremental freehand/eraser segment.
    DrawSegment(StrokeEvent),
    /// Final committed shape.
    DrawShape(StrokeEvent),
    /// Ephemeral pointer position.
    CursorMove { x: f64, y: f64 },
    ClearCanvas,
    Undo,
    Redo,
}

impl ClientIntent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Roster entry in a [`AuthorityEvent::RosterSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// Events sent by the room authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AuthorityEvent {
    /// Everyone currently in the room.
    RosterSnapshot {
        users: Vec<RosterEntry>,
        /// Connection identity of the receiving client.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        self_id: Option<String>,
    },
    ParticipantJoined {
        user_id: String,
        user_name: String,
        user_color: String,
    },
    ParticipantLeft { user_id: String },
    RemoteSegment(StrokeEvent),
    RemoteShape(StrokeEvent),
    /// Full canonical stroke log; replaces all local drawing state.
    CanonicalHistoryReplace {
        #[serde(default, deserialize_with = "lenient_strokes")]
        history: Vec<StrokeEvent>,
    },
    /// Stroke log at join time, replayed onto the remote layer only.
    JoinBacklog {
        #[serde(default, deserialize_with = "lenient_strokes")]
        history: Vec<StrokeEvent>,
    },
    CanvasCleared,
    RemoteCursor { user_id: String, x: f64, y: f64 },
    RoomRejected { message: String },
}

impl AuthorityEvent {
    /// Parse one inbound message.
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Deserialize a stroke log, dropping entries that are malformed or undrawable.
///
/// One bad entry must not take the rest of the log down with it.
fn lenient_strokes<'de, D>(deserializer: D) -> Result<Vec<StrokeEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = raw.len();
    let strokes: Vec<StrokeEvent> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<StrokeEvent>(value) {
            Ok(stroke) if stroke.is_drawable() => Some(stroke),
            Ok(stroke) => {
                log::warn!("Skipping undrawable history entry {index} ({})", stroke.stroke_id);
                None
            }
            Err(e) => {
                log::warn!("Skipping malformed history entry {index}: {e}");
                None
            }
        })
        .collect();
    if strokes.len() != total {
        log::warn!("Kept {} of {} history entries", strokes.len(), total);
    }
    Ok(strokes)
}
