//! SketchRoom Core Library
//!
//! Platform-agnostic stroke capture, history and reconciliation for the
//! SketchRoom collaborative canvas.

pub mod capture;
pub mod channel;
pub mod error;
pub mod history;
pub mod layer;
pub mod preferences;
pub mod presence;
pub mod protocol;
pub mod room;
pub mod session;
pub mod stroke;
pub mod surface;
pub mod throttle;
pub mod tools;

pub use capture::{CaptureState, Emission, StrokeCapture};
pub use channel::{ChannelEvent, ConnectionState, MemoryChannel, NativeWebSocket, SyncChannel};
pub use error::{ChannelError, PreferencesError, SessionError, SessionResult};
pub use history::{HistoryCache, MAX_HISTORY, RedoBuffer};
pub use layer::{LocalLayer, RemoteReplica};
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, Preferences};
pub use presence::{CursorMarker, Participant, PresenceTracker};
pub use protocol::{AuthorityEvent, ClientIntent, RosterEntry};
pub use room::{RoomEntry, generate_room_id, validate_join_id};
pub use session::{Session, SessionNotice};
pub use stroke::{StrokeEvent, StrokeId, ToolKind};
pub use surface::{DrawOp, RecordingSurface, StrokeStyle, Surface, render_stroke, replay};
pub use throttle::RequestThrottle;
pub use tools::ToolSettings;
