//! Drawing session: the client half of the room protocol.
//!
//! A [`Session`] owns every piece of client state (tool settings, capture
//! state, local and remote layers, presence, throttles) and is the only thing
//! that mutates it. Input handlers and inbound events run one at a time.
//!
//! Intents are queued and flushed to the channel; their effects come back as
//! authority events. Undo and redo are never applied locally: the authority
//! answers with the canonical log and every client rebuilds from it.

use crate::capture::{Emission, StrokeCapture};
use crate::channel::{ChannelEvent, ConnectionState, SyncChannel};
use crate::error::{SessionError, SessionResult};
use crate::layer::{LocalLayer, RemoteReplica};
use crate::preferences::{PreferenceStore, Preferences};
use crate::presence::{PresenceTracker, random_user_color};
use crate::protocol::{AuthorityEvent, ClientIntent};
use crate::stroke::StrokeEvent;
use crate::surface::Surface;
use crate::throttle::RequestThrottle;
use crate::tools::ToolSettings;
use kurbo::Point;
use std::time::Instant;

/// Something the embedding UI should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    Connected,
    /// The channel could not be established; shown as a persistent status.
    ConnectionFailed(String),
    Disconnected,
    RosterChanged,
    /// Both layers were rebuilt from the canonical log.
    Reconciled { strokes: usize },
    CanvasCleared,
    /// The authority refused us; return to the entry screen.
    Rejected(String),
}

/// Client session state for one room.
pub struct Session<S: Surface> {
    settings: ToolSettings,
    capture: StrokeCapture,
    local: LocalLayer<S>,
    remote: RemoteReplica<S>,
    presence: PresenceTracker,
    preferences: Preferences,
    user_color: String,
    self_id: Option<String>,
    connection: ConnectionState,
    status: String,
    rejected: Option<String>,
    pointer: Point,
    undo_throttle: RequestThrottle,
    redo_throttle: RequestThrottle,
    outgoing: Vec<ClientIntent>,
}

impl<S: Surface> Session<S> {
    /// Create a session drawing onto `local` with `remote` as the overlay.
    pub fn new(preferences: Preferences, local: S, remote: S) -> Self {
        Self {
            settings: ToolSettings::default(),
            capture: StrokeCapture::new(),
            local: LocalLayer::new(local),
            remote: RemoteReplica::new(remote),
            presence: PresenceTracker::new(),
            preferences,
            user_color: random_user_color().to_string(),
            self_id: None,
            connection: ConnectionState::Disconnected,
            status: "Disconnected".to_string(),
            rejected: None,
            pointer: Point::ZERO,
            undo_throttle: RequestThrottle::default(),
            redo_throttle: RequestThrottle::default(),
            outgoing: Vec::new(),
        }
    }

    /// Start a session from stored preferences.
    pub fn from_store(store: &dyn PreferenceStore, local: S, remote: S) -> SessionResult<Self> {
        Ok(Self::new(store.load()?, local, remote))
    }

    // --- Accessors ---

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ToolSettings {
        &mut self.settings
    }

    pub fn local(&self) -> &LocalLayer<S> {
        &self.local
    }

    pub fn remote(&self) -> &RemoteReplica<S> {
        &self.remote
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn user_color(&self) -> &str {
        &self.user_color
    }

    pub fn set_user_color(&mut self, color: impl Into<String>) {
        self.user_color = color.into();
    }

    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Set our own connection identity (used to filter roster snapshots).
    pub fn set_self_id(&mut self, id: impl Into<String>) {
        self.self_id = Some(id.into());
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Human-readable connection status.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Rejection reason, if the authority turned us away.
    pub fn rejection(&self) -> Option<&str> {
        self.rejected.as_deref()
    }

    /// `Err` once the authority has rejected this session.
    pub fn ensure_admitted(&self) -> SessionResult<()> {
        match &self.rejected {
            Some(message) => Err(SessionError::RoomRejected(message.clone())),
            None => Ok(()),
        }
    }

    /// Last known pointer position in surface coordinates.
    pub fn pointer(&self) -> Point {
        self.pointer
    }

    pub fn is_drawing(&self) -> bool {
        self.capture.is_dragging()
    }

    // --- Outgoing intents ---

    fn emit(&mut self, intent: ClientIntent) {
        if self.is_connected() {
            self.outgoing.push(intent);
        } else {
            log::debug!("Not connected, dropping {:?}", intent);
        }
    }

    /// Take pending outgoing intents (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<ClientIntent> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Send every queued intent. Failed sends are logged and dropped.
    pub fn flush<C: SyncChannel + ?Sized>(&mut self, channel: &mut C) {
        for intent in self.take_outgoing() {
            if let Err(e) = channel.send(&intent) {
                log::warn!("Failed to send {:?}: {}", intent, e);
            }
        }
    }

    // --- Pointer input ---

    /// Pointer or touch down.
    pub fn pointer_down(&mut self, point: Point) {
        self.pointer = point;
        self.capture.begin(point);
    }

    /// Pointer or touch move. Broadcasts the cursor and continues any gesture.
    pub fn pointer_move(&mut self, point: Point) {
        self.pointer = point;
        self.emit(ClientIntent::CursorMove {
            x: point.x,
            y: point.y,
        });
        if let Some(emission) = self.capture.drag(point, &self.settings, &mut self.local) {
            self.emit_stroke(emission);
        }
    }

    /// Pointer or touch up. `None` when the release carried no coordinates.
    pub fn pointer_up(&mut self, point: Option<Point>) {
        if let Some(point) = point {
            self.pointer = point;
        }
        if let Some(emission) = self.capture.end(point, &self.settings, &mut self.local) {
            self.emit_stroke(emission);
        }
    }

    /// Pointer left the surface: ends the gesture like a release without coordinates.
    pub fn pointer_leave(&mut self) {
        self.pointer_up(None);
    }

    fn emit_stroke(&mut self, emission: Emission) {
        let intent = match emission {
            Emission::Segment(event) => ClientIntent::DrawSegment(event),
            Emission::Shape(event) => ClientIntent::DrawShape(event),
        };
        self.emit(intent);
    }

    // --- Commands ---

    /// Ask the authority to undo. Returns whether a request was queued.
    pub fn undo(&mut self) -> bool {
        self.undo_at(Instant::now())
    }

    pub fn undo_at(&mut self, now: Instant) -> bool {
        if !self.is_connected() {
            log::warn!("Not connected, cannot send undo");
            return false;
        }
        if !self.undo_throttle.try_acquire(now) {
            log::debug!("Undo ignored (throttled)");
            return false;
        }
        log::info!("Undo requested, waiting for canonical history");
        self.emit(ClientIntent::Undo);
        true
    }

    /// Ask the authority to redo. Returns whether a request was queued.
    pub fn redo(&mut self) -> bool {
        self.redo_at(Instant::now())
    }

    pub fn redo_at(&mut self, now: Instant) -> bool {
        if !self.is_connected() {
            log::warn!("Not connected, cannot send redo");
            return false;
        }
        if !self.redo_throttle.try_acquire(now) {
            log::debug!("Redo ignored (throttled)");
            return false;
        }
        log::info!("Redo requested, waiting for canonical history");
        self.emit(ClientIntent::Redo);
        true
    }

    /// Clear both layers locally and ask the authority to truncate its log.
    pub fn clear_canvas(&mut self) {
        self.capture.cancel();
        self.local.clear();
        self.remote.clear();
        self.emit(ClientIntent::ClearCanvas);
    }

    /// Resize both layers, keeping their content.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.local.resize(width, height);
        self.remote.resize(width, height);
    }

    // --- Reconciliation ---

    /// Replace all drawing state with the canonical log.
    ///
    /// Both layers are cleared and replayed; history ends with exactly one
    /// snapshot of the replayed local raster. A gesture in progress keeps
    /// going and draws on top of the rebuilt layer.
    pub fn reconcile(&mut self, history: &[StrokeEvent]) -> usize {
        self.remote.rebuild(history);
        let drawn = self.local.rebuild(history);
        log::info!("Reconciled from canonical history ({} of {} strokes)", drawn, history.len());
        drawn
    }

    // --- Inbound events ---

    /// Apply one authority event.
    pub fn apply_event(&mut self, event: AuthorityEvent) -> Option<SessionNotice> {
        match event {
            AuthorityEvent::RosterSnapshot { users, self_id } => {
                if self_id.is_some() {
                    self.self_id = self_id;
                }
                for user in users {
                    if self.self_id.as_deref() != Some(user.id.as_str()) {
                        self.presence.add_participant(&user.id, &user.name, &user.color);
                    }
                }
                Some(SessionNotice::RosterChanged)
            }
            AuthorityEvent::ParticipantJoined {
                user_id,
                user_name,
                user_color,
            } => {
                log::info!("{} joined the room", user_name);
                self.presence.add_participant(&user_id, &user_name, &user_color);
                Some(SessionNotice::RosterChanged)
            }
            AuthorityEvent::ParticipantLeft { user_id } => {
                log::info!("User {} left the room", user_id);
                self.presence.remove_participant(&user_id);
                Some(SessionNotice::RosterChanged)
            }
            AuthorityEvent::RemoteSegment(stroke) | AuthorityEvent::RemoteShape(stroke) => {
                self.remote.apply(&stroke);
                None
            }
            AuthorityEvent::CanonicalHistoryReplace { history } => {
                let strokes = self.reconcile(&history);
                Some(SessionNotice::Reconciled { strokes })
            }
            AuthorityEvent::JoinBacklog { history } => {
                let drawn = self.remote.replay(&history);
                log::info!("Loaded {} strokes of room history", drawn);
                None
            }
            AuthorityEvent::CanvasCleared => {
                log::info!("Canvas cleared remotely");
                self.local.clear();
                self.remote.clear();
                Some(SessionNotice::CanvasCleared)
            }
            AuthorityEvent::RemoteCursor { user_id, x, y } => {
                self.presence.update_cursor(&user_id, x, y);
                None
            }
            AuthorityEvent::RoomRejected { message } => {
                log::warn!("Room rejected: {}", message);
                self.status = message.clone();
                self.rejected = Some(message.clone());
                self.presence.clear();
                Some(SessionNotice::Rejected(message))
            }
        }
    }

    /// Parse and apply one inbound message.
    pub fn handle_message(&mut self, text: &str) -> SessionResult<Option<SessionNotice>> {
        let event = AuthorityEvent::parse(text)?;
        Ok(self.apply_event(event))
    }

    /// Apply one channel event. Malformed messages are logged and skipped.
    pub fn handle_channel_event(&mut self, event: ChannelEvent) -> Option<SessionNotice> {
        match event {
            ChannelEvent::Connected => {
                self.connection = ConnectionState::Connected;
                self.status = "Connected".to_string();
                self.queue_join();
                Some(SessionNotice::Connected)
            }
            ChannelEvent::Disconnected => {
                self.connection = ConnectionState::Disconnected;
                self.status = "Disconnected".to_string();
                Some(SessionNotice::Disconnected)
            }
            ChannelEvent::Error { message } => {
                log::error!("Sync channel error: {}", message);
                self.connection = ConnectionState::Error;
                self.status = "Connection Failed".to_string();
                Some(SessionNotice::ConnectionFailed(message))
            }
            ChannelEvent::Message(text) => match self.handle_message(&text) {
                Ok(notice) => notice,
                Err(e) => {
                    log::warn!("Skipping inbound message: {}", e);
                    None
                }
            },
        }
    }

    fn queue_join(&mut self) {
        let Some(room_id) = self.preferences.room_id.clone() else {
            log::warn!("No room selected, not joining");
            self.status = "No room selected".to_string();
            return;
        };
        self.emit(ClientIntent::JoinRoom {
            room_id,
            room_name: self.preferences.room_name.clone(),
            user_name: self.preferences.user_name.clone(),
            user_color: self.user_color.clone(),
            capacity: self.preferences.capacity,
            is_host: self.preferences.is_host,
        });
    }

    // --- Channel driving ---

    /// Open the channel. A failure to start is a [`SessionError::Connection`]
    /// and leaves a "Connection Failed" status; there is no automatic retry.
    pub fn connect<C: SyncChannel + ?Sized>(&mut self, channel: &mut C, url: &str) -> SessionResult<()> {
        self.rejected = None;
        match channel.connect(url) {
            Ok(()) => {
                self.connection = ConnectionState::Connecting;
                self.status = "Connecting...".to_string();
                Ok(())
            }
            Err(e) => {
                log::error!("WebSocket connection failed: {}", e);
                self.connection = ConnectionState::Error;
                self.status = "Connection Failed".to_string();
                Err(SessionError::Connection(e))
            }
        }
    }

    /// Poll the channel, apply everything it delivered, then flush intents.
    ///
    /// A rejection disconnects the channel.
    pub fn pump<C: SyncChannel + ?Sized>(&mut self, channel: &mut C) -> Vec<SessionNotice> {
        let mut notices = Vec::new();
        for event in channel.poll_events() {
            if let Some(notice) = self.handle_channel_event(event) {
                notices.push(notice);
            }
        }
        if self.rejected.is_some() {
            self.outgoing.clear();
            channel.disconnect();
            self.connection = ConnectionState::Disconnected;
        } else {
            self.flush(channel);
        }
        notices
    }

    /// Leave the room: disconnect and forget the stored room details.
    pub fn leave<C: SyncChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        store: &dyn PreferenceStore,
    ) -> SessionResult<()> {
        self.outgoing.clear();
        channel.disconnect();
        self.connection = ConnectionState::Disconnected;
        self.status = "Disconnected".to_string();
        self.presence.clear();
        store.clear()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::history::MAX_HISTORY;
    use crate::preferences::MemoryPreferenceStore;
    use crate::stroke::{StrokeId, ToolKind};
    use crate::surface::{DrawOp, RecordingSurface};
    use std::time::Duration;

    fn prefs() -> Preferences {
        Preferences {
            user_name: "Ann".to_string(),
            room_id: Some("ABCDEF123456".to_string()),
            ..Preferences::default()
        }
    }

    fn session() -> Session<RecordingSurface> {
        Session::new(
            prefs(),
            RecordingSurface::new(400, 300),
            RecordingSurface::new(400, 300),
        )
    }

    fn connected() -> (Session<RecordingSurface>, MemoryChannel) {
        let mut s = session();
        let mut ch = MemoryChannel::new();
        s.connect(&mut ch, "ws://localhost:3030/ws").unwrap();
        s.pump(&mut ch);
        ch.take_sent();
        (s, ch)
    }

    fn stroke(tool: ToolKind, from: (f64, f64), to: (f64, f64), id: &str) -> StrokeEvent {
        StrokeEvent::new(
            tool,
            Point::new(from.0, from.1),
            Point::new(to.0, to.1),
            "#123456",
            4.0,
            StrokeId::from(id),
        )
    }

    #[test]
    fn test_connect_sends_join() {
        let mut s = session();
        let mut ch = MemoryChannel::new();
        s.connect(&mut ch, "ws://x").unwrap();
        assert_eq!(s.status(), "Connecting...");
        let notices = s.pump(&mut ch);
        assert_eq!(notices, vec![SessionNotice::Connected]);
        assert_eq!(s.status(), "Connected");
        match &ch.sent()[0] {
            ClientIntent::JoinRoom { room_id, user_name, is_host, capacity, .. } => {
                assert_eq!(room_id, "ABCDEF123456");
                assert_eq!(user_name, "Ann");
                assert!(!is_host);
                assert_eq!(*capacity, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_connection_failure_sets_status() {
        let mut s = session();
        let mut ch = MemoryChannel::failing("refused");
        s.connect(&mut ch, "ws://x").unwrap();
        let notices = s.pump(&mut ch);
        assert_eq!(notices, vec![SessionNotice::ConnectionFailed("refused".to_string())]);
        assert_eq!(s.status(), "Connection Failed");
        assert_eq!(s.connection_state(), ConnectionState::Error);
    }

    #[test]
    fn test_freehand_emits_three_segments() {
        let (mut s, mut ch) = connected();
        s.pointer_down(Point::new(10.0, 10.0));
        s.pointer_move(Point::new(20.0, 20.0));
        s.pointer_move(Point::new(35.0, 35.0));
        s.pointer_move(Point::new(50.0, 50.0));
        s.pointer_up(Some(Point::new(50.0, 50.0)));
        s.flush(&mut ch);

        let segments: Vec<&StrokeEvent> = ch
            .sent()
            .iter()
            .filter_map(|i| match i {
                ClientIntent::DrawSegment(e) => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|e| e.stroke_id == segments[0].stroke_id));
        assert_eq!(s.local().surface().ops().len(), 3);
        // One cursor broadcast per move.
        let cursors = ch
            .sent()
            .iter()
            .filter(|i| matches!(i, ClientIntent::CursorMove { .. }))
            .count();
        assert_eq!(cursors, 3);
    }

    #[test]
    fn test_rectangle_emits_only_on_release() {
        let (mut s, mut ch) = connected();
        s.settings_mut().set_tool(ToolKind::Rectangle);
        s.pointer_down(Point::new(0.0, 0.0));
        s.pointer_move(Point::new(30.0, 20.0));
        s.pointer_move(Point::new(100.0, 50.0));
        s.flush(&mut ch);
        assert!(ch.sent().iter().all(|i| matches!(i, ClientIntent::CursorMove { .. })));

        s.pointer_up(Some(Point::new(100.0, 50.0)));
        s.flush(&mut ch);
        let shapes: Vec<&StrokeEvent> = ch
            .sent()
            .iter()
            .filter_map(|i| match i {
                ClientIntent::DrawShape(e) => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(shapes.len(), 1);
        let shape = shapes[0];
        assert_eq!(shape.tool, ToolKind::Rectangle);
        assert_eq!((shape.from_x, shape.from_y, shape.to_x, shape.to_y), (0.0, 0.0, 100.0, 50.0));
    }

    #[test]
    fn test_disconnected_drawing_stays_local() {
        let mut s = session();
        s.pointer_down(Point::new(1.0, 1.0));
        s.pointer_move(Point::new(2.0, 2.0));
        s.pointer_up(None);
        assert!(!s.has_outgoing());
        assert_eq!(s.local().surface().ops().len(), 1);
        assert!(!s.undo());
    }

    #[test]
    fn test_rapid_undo_sends_once() {
        let (mut s, mut ch) = connected();
        let t0 = Instant::now();
        assert!(s.undo_at(t0));
        assert!(!s.undo_at(t0 + Duration::from_millis(200)));
        s.flush(&mut ch);
        let undos = ch.sent().iter().filter(|i| **i == ClientIntent::Undo).count();
        assert_eq!(undos, 1);
    }

    #[test]
    fn test_undo_and_redo_throttled_separately() {
        let (mut s, _ch) = connected();
        let t0 = Instant::now();
        assert!(s.undo_at(t0));
        assert!(s.redo_at(t0 + Duration::from_millis(10)));
        assert!(!s.redo_at(t0 + Duration::from_millis(20)));
        assert!(s.undo_at(t0 + Duration::from_millis(600)));
    }

    #[test]
    fn test_canonical_history_replaces_everything() {
        let (mut s, mut ch) = connected();
        for i in 0..5 {
            s.pointer_down(Point::new(0.0, 0.0));
            s.pointer_move(Point::new(i as f64 + 1.0, 1.0));
            s.pointer_up(None);
        }
        s.apply_event(AuthorityEvent::RemoteSegment(stroke(ToolKind::Brush, (5.0, 5.0), (9.0, 9.0), "r")));
        assert_eq!(s.local().history().len(), 6);

        let log = vec![
            stroke(ToolKind::Brush, (0.0, 0.0), (10.0, 10.0), "a"),
            stroke(ToolKind::Circle, (50.0, 50.0), (60.0, 50.0), "b"),
        ];
        let json = AuthorityEvent::CanonicalHistoryReplace { history: log.clone() }
            .to_json()
            .unwrap();
        ch.push_message(json);
        let notices = s.pump(&mut ch);
        assert_eq!(notices, vec![SessionNotice::Reconciled { strokes: 2 }]);

        assert_eq!(s.local().surface().ops().len(), 2);
        assert_eq!(s.remote().surface().ops().len(), 2);
        assert_eq!(s.local().surface().ops(), s.remote().surface().ops());
        assert_eq!(s.local().history().len(), 1);
        assert_eq!(s.local().history().latest(), Some(&s.local().surface().snapshot()));
        assert!(s.local().redo().is_empty());
    }

    #[test]
    fn test_join_backlog_is_remote_only() {
        let mut s = session();
        s.apply_event(AuthorityEvent::JoinBacklog {
            history: vec![stroke(ToolKind::Line, (0.0, 0.0), (5.0, 5.0), "a")],
        });
        assert_eq!(s.remote().surface().ops().len(), 1);
        assert!(s.local().surface().is_blank());
    }

    #[test]
    fn test_remote_strokes_do_not_touch_local() {
        let mut s = session();
        s.apply_event(AuthorityEvent::RemoteShape(stroke(ToolKind::Rectangle, (0.0, 0.0), (5.0, 5.0), "a")));
        assert!(matches!(s.remote().surface().ops()[0], DrawOp::Rect { .. }));
        assert!(s.local().surface().is_blank());
    }

    #[test]
    fn test_clear_canvas() {
        let (mut s, mut ch) = connected();
        s.pointer_down(Point::ZERO);
        s.pointer_move(Point::new(3.0, 3.0));
        s.pointer_up(None);
        s.apply_event(AuthorityEvent::RemoteSegment(stroke(ToolKind::Brush, (1.0, 1.0), (2.0, 2.0), "r")));
        s.clear_canvas();
        s.flush(&mut ch);
        assert!(s.local().surface().is_blank());
        assert!(s.remote().surface().is_blank());
        assert_eq!(s.local().history().len(), 1);
        assert!(ch.sent().contains(&ClientIntent::ClearCanvas));
    }

    #[test]
    fn test_remote_clear_event() {
        let mut s = session();
        s.pointer_down(Point::ZERO);
        s.pointer_move(Point::new(3.0, 3.0));
        s.pointer_up(None);
        assert_eq!(
            s.apply_event(AuthorityEvent::CanvasCleared),
            Some(SessionNotice::CanvasCleared)
        );
        assert!(s.local().surface().is_blank());
        assert_eq!(s.local().history().len(), 1);
    }

    fn sent_segments(ch: &MemoryChannel) -> Vec<&StrokeEvent> {
        ch.sent()
            .iter()
            .filter_map(|i| match i {
                ClientIntent::DrawSegment(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_freehand_survives_history_replace() {
        let (mut s, mut ch) = connected();
        s.pointer_down(Point::new(0.0, 0.0));
        s.pointer_move(Point::new(10.0, 10.0));
        ch.push_message(AuthorityEvent::CanonicalHistoryReplace { history: vec![] }.to_json().unwrap());
        assert_eq!(s.pump(&mut ch), vec![SessionNotice::Reconciled { strokes: 0 }]);
        assert!(s.local().surface().is_blank());

        s.pointer_move(Point::new(20.0, 20.0));
        s.pointer_move(Point::new(30.0, 30.0));
        s.pointer_up(None);
        s.flush(&mut ch);

        let segments = sent_segments(&ch);
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|e| e.stroke_id == segments[0].stroke_id));
        assert_eq!(s.local().surface().ops().len(), 2);
        assert_eq!(s.local().history().len(), 2);
    }

    #[test]
    fn test_shape_commits_after_history_replace() {
        let (mut s, mut ch) = connected();
        s.settings_mut().set_tool(ToolKind::Rectangle);
        s.pointer_down(Point::new(0.0, 0.0));
        s.pointer_move(Point::new(30.0, 20.0));
        s.apply_event(AuthorityEvent::CanonicalHistoryReplace {
            history: vec![stroke(ToolKind::Line, (5.0, 5.0), (9.0, 9.0), "a")],
        });
        s.pointer_move(Point::new(60.0, 40.0));
        s.pointer_up(Some(Point::new(60.0, 40.0)));
        s.flush(&mut ch);

        let shapes = ch
            .sent()
            .iter()
            .filter(|i| matches!(i, ClientIntent::DrawShape(_)))
            .count();
        assert_eq!(shapes, 1);
        // Replayed line plus the committed rectangle; the first preview is gone.
        let ops = s.local().surface().ops();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], DrawOp::Line { .. }));
        assert!(matches!(ops[1], DrawOp::Rect { .. }));
    }

    #[test]
    fn test_freehand_survives_remote_clear() {
        let (mut s, mut ch) = connected();
        s.pointer_down(Point::new(0.0, 0.0));
        s.pointer_move(Point::new(10.0, 10.0));
        s.apply_event(AuthorityEvent::CanvasCleared);
        s.pointer_move(Point::new(20.0, 20.0));
        s.pointer_up(None);
        s.flush(&mut ch);

        assert_eq!(sent_segments(&ch).len(), 2);
        assert_eq!(s.local().surface().ops().len(), 1);
    }

    #[test]
    fn test_history_bounded_over_long_session() {
        let mut s = session();
        for i in 0..(MAX_HISTORY * 3) {
            s.pointer_down(Point::new(0.0, 0.0));
            s.pointer_move(Point::new(i as f64, 1.0));
            s.pointer_up(None);
            assert!(s.local().history().len() <= MAX_HISTORY);
        }
        assert_eq!(s.local().history().len(), MAX_HISTORY);
    }

    #[test]
    fn test_roster_snapshot_skips_self() {
        let mut s = session();
        let notice = s
            .handle_message(
                r##"{"type":"roster-snapshot","selfId":"me","users":[
                    {"id":"me","name":"Ann","color":"#111"},
                    {"id":"p2","name":"Bob","color":"#222"}]}"##,
            )
            .unwrap();
        assert_eq!(notice, Some(SessionNotice::RosterChanged));
        assert_eq!(s.self_id(), Some("me"));
        assert_eq!(s.presence().roster_count(), 2);
        assert!(s.presence().participant("me").is_none());
    }

    #[test]
    fn test_join_leave_and_cursor() {
        let mut s = session();
        s.apply_event(AuthorityEvent::ParticipantJoined {
            user_id: "p2".to_string(),
            user_name: "Bob".to_string(),
            user_color: "#222".to_string(),
        });
        s.apply_event(AuthorityEvent::RemoteCursor {
            user_id: "p2".to_string(),
            x: 30.0,
            y: 40.0,
        });
        assert_eq!(s.presence().cursor("p2").unwrap().left, 20.0);
        s.apply_event(AuthorityEvent::ParticipantLeft {
            user_id: "p2".to_string(),
        });
        assert!(s.presence().cursor("p2").is_none());
        assert_eq!(s.presence().roster_count(), 1);
    }

    #[test]
    fn test_malformed_message_is_skipped() {
        let (mut s, mut ch) = connected();
        ch.push_message("{not json");
        ch.push_message(r#"{"type":"remote-segment","fromX":1}"#);
        ch.push_message(r#"{"type":"canvas-cleared"}"#);
        let notices = s.pump(&mut ch);
        assert_eq!(notices, vec![SessionNotice::CanvasCleared]);
        assert!(s.is_connected());
    }

    #[test]
    fn test_rejection_disconnects() {
        let (mut s, mut ch) = connected();
        ch.push_message(r#"{"type":"room-rejected","message":"Room is full"}"#);
        let notices = s.pump(&mut ch);
        assert_eq!(notices, vec![SessionNotice::Rejected("Room is full".to_string())]);
        assert_eq!(s.rejection(), Some("Room is full"));
        assert!(matches!(s.ensure_admitted(), Err(SessionError::RoomRejected(_))));
        assert!(!s.is_connected());
        assert!(!ch.is_connected());
    }

    #[test]
    fn test_leave_clears_preferences() {
        let store = MemoryPreferenceStore::new();
        store.save(&prefs()).unwrap();
        let (mut s, mut ch) = connected();
        s.leave(&mut ch, &store).unwrap();
        assert!(!ch.is_connected());
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn test_from_store() {
        let store = MemoryPreferenceStore::new();
        store.save(&prefs()).unwrap();
        let s = Session::from_store(&store, RecordingSurface::new(1, 1), RecordingSurface::new(1, 1)).unwrap();
        assert_eq!(s.preferences().user_name, "Ann");
    }

    #[test]
    fn test_no_room_selected_skips_join() {
        let mut s = Session::new(
            Preferences::default(),
            RecordingSurface::new(1, 1),
            RecordingSurface::new(1, 1),
        );
        let mut ch = MemoryChannel::new();
        s.connect(&mut ch, "ws://x").unwrap();
        s.pump(&mut ch);
        assert!(ch.sent().is_empty());
        assert_eq!(s.status(), "No room selected");
    }
}
