//! Room state: membership, the canonical stroke log and per-author redo stacks.
//!
//! Pure logic, no sockets. Every operation returns the events to deliver and
//! who should receive them.

use sketchroom_core::protocol::{AuthorityEvent, ClientIntent, RosterEntry};
use sketchroom_core::stroke::StrokeEvent;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Who receives an outbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Only(String),
    AllExcept(String),
    All,
}

impl Target {
    pub fn includes(&self, peer_id: &str) -> bool {
        match self {
            Target::Only(id) => id == peer_id,
            Target::AllExcept(id) => id != peer_id,
            Target::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub target: Target,
    pub event: AuthorityEvent,
}

impl Outbound {
    fn new(target: Target, event: AuthorityEvent) -> Self {
        Self { target, event }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// A log entry tagged with its author.
#[derive(Debug, Clone)]
struct Entry {
    author: String,
    stroke: StrokeEvent,
}

pub struct Room {
    id: String,
    name: String,
    capacity: u32,
    members: Vec<Member>,
    log: Vec<Entry>,
    /// Undone stroke groups per author, most recent last.
    redo: HashMap<String, Vec<Vec<Entry>>>,
}

impl Room {
    pub fn new(id: impl Into<String>, name: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capacity: capacity.max(1),
            members: Vec::new(),
            log: Vec::new(),
            redo: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity as usize
    }

    /// The canonical stroke log.
    pub fn history(&self) -> Vec<StrokeEvent> {
        self.log.iter().map(|e| e.stroke.clone()).collect()
    }

    /// Admit a member. Returns the rejection message when the room is full.
    pub fn admit(&mut self, member: Member) -> Result<Vec<Outbound>, String> {
        if self.is_full() {
            return Err("Room is full".to_string());
        }
        info!(room = %self.id, user = %member.name, "participant admitted");

        let mut out = Vec::with_capacity(3);
        out.push(Outbound::new(
            Target::AllExcept(member.id.clone()),
            AuthorityEvent::ParticipantJoined {
                user_id: member.id.clone(),
                user_name: member.name.clone(),
                user_color: member.color.clone(),
            },
        ));
        let joiner = member.id.clone();
        self.members.push(member);
        out.push(Outbound::new(
            Target::Only(joiner.clone()),
            AuthorityEvent::RosterSnapshot {
                users: self
                    .members
                    .iter()
                    .map(|m| RosterEntry {
                        id: m.id.clone(),
                        name: m.name.clone(),
                        color: m.color.clone(),
                    })
                    .collect(),
                self_id: Some(joiner.clone()),
            },
        ));
        out.push(Outbound::new(
            Target::Only(joiner),
            AuthorityEvent::JoinBacklog {
                history: self.history(),
            },
        ));
        Ok(out)
    }

    /// Remove a member. Their redo stack goes with them; their strokes stay.
    pub fn remove(&mut self, member_id: &str) -> Vec<Outbound> {
        let before = self.members.len();
        self.members.retain(|m| m.id != member_id);
        if self.members.len() == before {
            return Vec::new();
        }
        self.redo.remove(member_id);
        vec![Outbound::new(
            Target::AllExcept(member_id.to_string()),
            AuthorityEvent::ParticipantLeft {
                user_id: member_id.to_string(),
            },
        )]
    }

    /// Apply an intent from an admitted member.
    pub fn handle(&mut self, author: &str, intent: ClientIntent) -> Vec<Outbound> {
        match intent {
            ClientIntent::JoinRoom { .. } => {
                debug!(room = %self.id, author, "ignoring repeated join");
                Vec::new()
            }
            ClientIntent::DrawSegment(stroke) => self
                .append(author, stroke.clone())
                .then(|| Outbound::new(Target::AllExcept(author.to_string()), AuthorityEvent::RemoteSegment(stroke)))
                .into_iter()
                .collect(),
            ClientIntent::DrawShape(stroke) => self
                .append(author, stroke.clone())
                .then(|| Outbound::new(Target::AllExcept(author.to_string()), AuthorityEvent::RemoteShape(stroke)))
                .into_iter()
                .collect(),
            ClientIntent::CursorMove { x, y } => vec![Outbound::new(
                Target::AllExcept(author.to_string()),
                AuthorityEvent::RemoteCursor {
                    user_id: author.to_string(),
                    x,
                    y,
                },
            )],
            ClientIntent::ClearCanvas => {
                info!(room = %self.id, author, "canvas cleared");
                self.log.clear();
                self.redo.clear();
                vec![Outbound::new(
                    Target::AllExcept(author.to_string()),
                    AuthorityEvent::CanvasCleared,
                )]
            }
            ClientIntent::Undo => {
                if self.undo(author) {
                    vec![self.history_replace()]
                } else {
                    Vec::new()
                }
            }
            ClientIntent::Redo => {
                if self.redo(author) {
                    vec![self.history_replace()]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn append(&mut self, author: &str, stroke: StrokeEvent) -> bool {
        if !stroke.is_drawable() {
            warn!(room = %self.id, author, "dropping undrawable stroke");
            return false;
        }
        if let Some(stack) = self.redo.get_mut(author) {
            stack.clear();
        }
        self.log.push(Entry {
            author: author.to_string(),
            stroke,
        });
        true
    }

    /// Move the author's most recent stroke group onto their redo stack.
    fn undo(&mut self, author: &str) -> bool {
        let Some(stroke_id) = self
            .log
            .iter()
            .rev()
            .find(|e| e.author == author)
            .map(|e| e.stroke.stroke_id.clone())
        else {
            debug!(room = %self.id, author, "nothing to undo");
            return false;
        };

        let (group, kept): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut self.log)
            .into_iter()
            .partition(|e| e.author == author && e.stroke.stroke_id == stroke_id);
        self.log = kept;
        info!(room = %self.id, author, stroke = %stroke_id, entries = group.len(), "undo");
        self.redo.entry(author.to_string()).or_default().push(group);
        true
    }

    /// Re-append the author's most recently undone group.
    fn redo(&mut self, author: &str) -> bool {
        let Some(group) = self.redo.get_mut(author).and_then(Vec::pop) else {
            debug!(room = %self.id, author, "nothing to redo");
            return false;
        };
        info!(room = %self.id, author, entries = group.len(), "redo");
        self.log.extend(group);
        true
    }

    /// The full log for one member whose view may have drifted.
    pub fn resync(&self, peer_id: &str) -> Outbound {
        Outbound::new(
            Target::Only(peer_id.to_string()),
            AuthorityEvent::CanonicalHistoryReplace {
                history: self.history(),
            },
        )
    }

    fn history_replace(&self) -> Outbound {
        Outbound::new(
            Target::All,
            AuthorityEvent::CanonicalHistoryReplace {
                history: self.history(),
            },
        )
    }
}
