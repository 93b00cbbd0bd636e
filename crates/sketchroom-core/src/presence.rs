//! Roster of remote participants and their cursors.

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Palette new participants pick their color from.
pub const USER_COLORS: [&str; 6] = [
    "#667eea", "#764ba2", "#f5576c", "#f093fb", "#4ecdc4", "#44a08d",
];

/// Marker color for participants we have no roster entry for.
pub const FALLBACK_CURSOR_COLOR: &str = "#667eea";

/// Marker label for participants we have no roster entry for.
pub const FALLBACK_CURSOR_LABEL: &str = "User";

/// Offset from the pointer position to the marker's top-left corner.
const CURSOR_MARKER_OFFSET: f64 = 10.0;

/// Pick a random participant color.
pub fn random_user_color() -> &'static str {
    USER_COLORS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(FALLBACK_CURSOR_COLOR)
}

/// Another participant in the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    pub color: String,
    pub cursor_x: f64,
    pub cursor_y: f64,
}

/// Visual cursor artifact for a remote participant.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorMarker {
    pub left: f64,
    pub top: f64,
    pub label: String,
    pub color: String,
}

/// Tracks other participants, keyed by connection identity.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    participants: BTreeMap<String, Participant>,
    cursors: BTreeMap<String, CursorMarker>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a participant.
    pub fn add_participant(&mut self, id: &str, name: &str, color: &str) {
        self.participants.insert(
            id.to_string(),
            Participant {
                id: id.to_string(),
                display_name: name.to_string(),
                color: color.to_string(),
                cursor_x: 0.0,
                cursor_y: 0.0,
            },
        );
    }

    /// Remove a participant and its cursor marker.
    pub fn remove_participant(&mut self, id: &str) -> Option<Participant> {
        self.cursors.remove(id);
        self.participants.remove(id)
    }

    /// Move a participant's cursor, creating its marker on first sighting.
    pub fn update_cursor(&mut self, id: &str, x: f64, y: f64) {
        let participant = self.participants.get_mut(id);
        let marker = self.cursors.entry(id.to_string()).or_insert_with(|| {
            let (label, color) = match &participant {
                Some(p) => (p.display_name.clone(), p.color.clone()),
                None => (
                    FALLBACK_CURSOR_LABEL.to_string(),
                    FALLBACK_CURSOR_COLOR.to_string(),
                ),
            };
            CursorMarker {
                left: 0.0,
                top: 0.0,
                label,
                color,
            }
        });
        marker.left = x - CURSOR_MARKER_OFFSET;
        marker.top = y - CURSOR_MARKER_OFFSET;

        if let Some(p) = participant {
            p.cursor_x = x;
            p.cursor_y = y;
        }
    }

    /// Number of people in the room, including ourselves.
    pub fn roster_count(&self) -> usize {
        self.participants.len() + 1
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn cursor(&self, id: &str) -> Option<&CursorMarker> {
        self.cursors.get(id)
    }

    pub fn cursors(&self) -> impl Iterator<Item = (&str, &CursorMarker)> {
        self.cursors.iter().map(|(id, marker)| (id.as_str(), marker))
    }

    /// Forget everyone (leaving a room).
    pub fn clear(&mut self) {
        self.participants.clear();
        self.cursors.clear();
    }
}
