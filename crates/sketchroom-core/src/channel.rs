//! Sync channel: the duplex transport between a client and the room authority.
//!
//! The session only sees the [`SyncChannel`] trait. Inbound messages are handed
//! over as raw text so the session decides how to treat malformed ones.

use crate::error::ChannelError;
use crate::protocol::ClientIntent;
use std::collections::VecDeque;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    /// Raw inbound message text.
    Message(String),
    Error { message: String },
}

/// Duplex event channel to the room authority.
pub trait SyncChannel {
    /// Start connecting. Completion is reported as [`ChannelEvent::Connected`].
    fn connect(&mut self, url: &str) -> Result<(), ChannelError>;

    fn disconnect(&mut self);

    /// Send one intent. Fire-and-forget: effects arrive later as events.
    fn send(&mut self, intent: &ClientIntent) -> Result<(), ChannelError>;

    /// Drain pending events (non-blocking).
    fn poll_events(&mut self) -> Vec<ChannelEvent>;

    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

fn apply_state(state: &mut ConnectionState, event: &ChannelEvent) {
    match event {
        ChannelEvent::Connected => *state = ConnectionState::Connected,
        ChannelEvent::Disconnected => *state = ConnectionState::Disconnected,
        ChannelEvent::Error { .. } => *state = ConnectionState::Error,
        ChannelEvent::Message(_) => {}
    }
}

// ============================================================================
// In-memory channel
// ============================================================================

/// In-memory channel for tests and headless drivers.
///
/// Records every sent intent; inbound events are queued with [`MemoryChannel::push_event`].
#[derive(Debug, Default)]
pub struct MemoryChannel {
    state: ConnectionState,
    sent: Vec<ClientIntent>,
    inbound: VecDeque<ChannelEvent>,
    /// When set, `connect` fails with this error message.
    fail_connect: Option<String>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose connection attempts always fail.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_connect: Some(message.into()),
            ..Self::default()
        }
    }

    /// Queue an inbound event.
    pub fn push_event(&mut self, event: ChannelEvent) {
        self.inbound.push_back(event);
    }

    /// Queue an inbound message.
    pub fn push_message(&mut self, text: impl Into<String>) {
        self.inbound.push_back(ChannelEvent::Message(text.into()));
    }

    pub fn sent(&self) -> &[ClientIntent] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<ClientIntent> {
        std::mem::take(&mut self.sent)
    }
}

impl SyncChannel for MemoryChannel {
    fn connect(&mut self, url: &str) -> Result<(), ChannelError> {
        if self.state == ConnectionState::Connected {
            return Err(ChannelError::AlreadyConnected);
        }
        match &self.fail_connect {
            Some(message) => {
                self.inbound.push_back(ChannelEvent::Error {
                    message: message.clone(),
                });
            }
            None => {
                log::debug!("Memory channel connecting to {url}");
                self.state = ConnectionState::Connecting;
                self.inbound.push_back(ChannelEvent::Connected);
            }
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    fn send(&mut self, intent: &ClientIntent) -> Result<(), ChannelError> {
        if self.state != ConnectionState::Connected {
            return Err(ChannelError::NotConnected);
        }
        self.sent.push(intent.clone());
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<ChannelEvent> {
        let events: Vec<ChannelEvent> = self.inbound.drain(..).collect();
        for event in &events {
            apply_state(&mut self.state, event);
        }
        events
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

// ============================================================================
// Native WebSocket channel
// ============================================================================

mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::io::ErrorKind;
    use std::net::TcpStream;
    use std::time::Duration;
    use tungstenite::stream::MaybeTlsStream;
    use tungstenite::{Message, WebSocket, connect};
    use url::Url;

    type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

    /// Read timeout; bounds how long queued intents wait for the socket.
    const POLL_INTERVAL: Duration = Duration::from_millis(50);
    const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// WebSocket channel for native platforms.
    ///
    /// The socket lives on a background thread; the session polls events.
    pub struct NativeWebSocket {
        state: ConnectionState,
        cmd_tx: Option<Sender<WsCommand>>,
        event_rx: Option<Receiver<ChannelEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        fn run(url: String, cmd_rx: Receiver<WsCommand>, event_tx: Sender<ChannelEvent>) {
            log::info!("Dialing {}", url);
            let mut socket = match connect(&url) {
                Ok((socket, response)) => {
                    log::info!("Handshake done ({})", response.status());
                    socket
                }
                Err(e) => {
                    log::error!("Could not reach {}: {}", url, e);
                    let _ = event_tx.send(ChannelEvent::Error {
                        message: format!("Connection failed: {}", e),
                    });
                    return;
                }
            };
            let _ = event_tx.send(ChannelEvent::Connected);

            if let MaybeTlsStream::Plain(tcp) = socket.get_mut() {
                let _ = tcp.set_read_timeout(Some(POLL_INTERVAL));
                let _ = tcp.set_write_timeout(Some(WRITE_TIMEOUT));
            }

            while Self::drain_commands(&mut socket, &cmd_rx) && Self::read_one(&mut socket, &event_tx) {}

            log::info!("Socket loop for {} finished", url);
            let _ = event_tx.send(ChannelEvent::Disconnected);
        }

        /// Forward queued intents. Returns false once the socket should close.
        fn drain_commands(socket: &mut Socket, cmd_rx: &Receiver<WsCommand>) -> bool {
            loop {
                match cmd_rx.try_recv() {
                    Ok(WsCommand::Send(json)) => {
                        if let Err(e) = socket.send(Message::Text(json)) {
                            log::error!("Write failed: {}", e);
                            return false;
                        }
                    }
                    Ok(WsCommand::Close) | Err(TryRecvError::Disconnected) => {
                        let _ = socket.close(None);
                        return false;
                    }
                    Err(TryRecvError::Empty) => return true,
                }
            }
        }

        /// Wait up to one poll interval for a frame. Returns false once the socket is gone.
        fn read_one(socket: &mut Socket, event_tx: &Sender<ChannelEvent>) -> bool {
            match socket.read() {
                Ok(Message::Text(text)) => event_tx.send(ChannelEvent::Message(text)).is_ok(),
                Ok(Message::Close(frame)) => {
                    log::info!("Authority closed the socket: {:?}", frame);
                    false
                }
                Ok(_) => true,
                Err(tungstenite::Error::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    true
                }
                Err(e) => {
                    log::error!("Read failed: {}", e);
                    false
                }
            }
        }

        /// Drop the handles of a socket thread that has already stopped.
        fn release(&mut self) {
            self.cmd_tx = None;
            self.event_rx = None;
            self._thread = None;
        }
    }

    impl SyncChannel for NativeWebSocket {
        fn connect(&mut self, url: &str) -> Result<(), ChannelError> {
            if self.cmd_tx.is_some() {
                return Err(ChannelError::AlreadyConnected);
            }

            let parsed = Url::parse(url).map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
            if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                return Err(ChannelError::InvalidUrl(format!(
                    "Invalid WebSocket URL scheme: {}",
                    parsed.scheme()
                )));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<ChannelEvent>();
            let url = url.to_string();
            let handle = thread::spawn(move || Self::run(url, cmd_rx, event_tx));

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.release();
            self.state = ConnectionState::Disconnected;
        }

        fn send(&mut self, intent: &ClientIntent) -> Result<(), ChannelError> {
            let tx = self.cmd_tx.as_ref().ok_or(ChannelError::NotConnected)?;
            let json = intent
                .to_json()
                .map_err(|e| ChannelError::Serialization(e.to_string()))?;
            tx.send(WsCommand::Send(json))
                .map_err(|e| ChannelError::Send(e.to_string()))
        }

        fn poll_events(&mut self) -> Vec<ChannelEvent> {
            let events: Vec<ChannelEvent> = match &self.event_rx {
                Some(rx) => rx.try_iter().collect(),
                None => return Vec::new(),
            };
            for event in &events {
                apply_state(&mut self.state, event);
            }
            let finished = events
                .iter()
                .any(|e| matches!(e, ChannelEvent::Error { .. } | ChannelEvent::Disconnected));
            if finished {
                self.release();
            }
            events
        }

        fn state(&self) -> ConnectionState {
            self.state
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }

}

pub use native_client::NativeWebSocket;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_connect_flow() {
        let mut ch = MemoryChannel::new();
        assert_eq!(ch.state(), ConnectionState::Disconnected);
        ch.connect("ws://localhost:3030/ws").unwrap();
        assert_eq!(ch.state(), ConnectionState::Connecting);
        assert_eq!(ch.poll_events(), vec![ChannelEvent::Connected]);
        assert!(ch.is_connected());
    }

    #[test]
    fn test_memory_send_requires_connection() {
        let mut ch = MemoryChannel::new();
        assert!(matches!(ch.send(&ClientIntent::Undo), Err(ChannelError::NotConnected)));
        ch.connect("ws://x").unwrap();
        ch.poll_events();
        ch.send(&ClientIntent::Undo).unwrap();
        assert_eq!(ch.sent(), &[ClientIntent::Undo]);
    }

    #[test]
    fn test_memory_failing_connect() {
        let mut ch = MemoryChannel::failing("refused");
        ch.connect("ws://x").unwrap();
        let events = ch.poll_events();
        assert!(matches!(&events[0], ChannelEvent::Error { message } if message == "refused"));
        assert_eq!(ch.state(), ConnectionState::Error);
    }

    #[test]
    fn test_native_rejects_bad_scheme() {
        let mut ws = NativeWebSocket::new();
        assert!(matches!(
            ws.connect("http://localhost:3030"),
            Err(ChannelError::InvalidUrl(_))
        ));
        assert!(matches!(ws.connect("not a url"), Err(ChannelError::InvalidUrl(_))));
        assert_eq!(ws.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_native_send_when_disconnected() {
        let mut ws = NativeWebSocket::new();
        assert!(matches!(ws.send(&ClientIntent::Redo), Err(ChannelError::NotConnected)));
    }
}
