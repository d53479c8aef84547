//! WebSocket client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tandem_protocol::{Role, ServerFrame};
use tokio::sync::mpsc;

/// Session membership of a connection.
///
/// A connection holds at most one binding for its lifetime; a second
/// `join` replaces it (old role unbound first).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    /// Session the connection belongs to.
    pub session_id: String,
    /// Role it is bound as.
    pub role: Role,
}

/// Represents a connected WebSocket client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    /// Current session binding (set by a `join` frame).
    binding: Mutex<Option<Binding>>,
    /// Send channel to the client's WebSocket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has responded to the last ping.
    pub is_alive: AtomicBool,
    /// When the last Pong (or any activity) was received.
    last_pong: Mutex<Instant>,
    /// Count of messages dropped due to full channel.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            binding: Mutex::new(None),
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Bind this connection to a session under a role.
    pub fn bind(&self, session_id: String, role: Role) {
        *self.binding.lock() = Some(Binding { session_id, role });
    }

    /// Clear the current binding.
    pub fn clear_binding(&self) {
        *self.binding.lock() = None;
    }

    /// Get the current binding.
    pub fn binding(&self) -> Option<Binding> {
        self.binding.lock().clone()
    }

    /// Send a pre-serialized frame to the client.
    ///
    /// Returns `false` if the channel is full or closed, and increments
    /// the dropped message counter.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize a frame and send it to the client.
    pub fn send_frame(&self, frame: &ServerFrame) -> bool {
        match serde_json::to_string(frame) {
            Ok(json) => self.send(Arc::new(json)),
            Err(_) => false,
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for the ping loop.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection() -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = ClientConnection::new("conn_1".into(), tx);
        (conn, rx)
    }

    #[test]
    fn create_connection() {
        let (conn, _rx) = make_connection();
        assert_eq!(conn.id, "conn_1");
        assert!(conn.binding().is_none());
        assert!(conn.is_alive.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn send_message_success() {
        let (conn, mut rx) = make_connection();
        assert!(conn.send(Arc::new("hello".into())));
        let msg = rx.recv().await.unwrap();
        assert_eq!(&*msg, "hello");
    }

    #[tokio::test]
    async fn send_to_closed_channel_returns_false() {
        let (tx, rx) = mpsc::channel(32);
        let conn = ClientConnection::new("conn_2".into(), tx);
        drop(rx);
        assert!(!conn.send(Arc::new("hello".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_to_full_channel_returns_false() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ClientConnection::new("conn_3".into(), tx);
        assert!(conn.send(Arc::new("msg1".into())));
        // Channel is now full
        assert!(!conn.send(Arc::new("msg2".into())));
    }

    #[test]
    fn bind_and_rebind() {
        let (conn, _rx) = make_connection();
        conn.bind("sess_1".into(), Role::Student);
        assert_eq!(
            conn.binding(),
            Some(Binding {
                session_id: "sess_1".into(),
                role: Role::Student,
            })
        );
        conn.bind("sess_2".into(), Role::Teacher);
        let binding = conn.binding().unwrap();
        assert_eq!(binding.session_id, "sess_2");
        assert_eq!(binding.role, Role::Teacher);
    }

    #[test]
    fn clear_binding() {
        let (conn, _rx) = make_connection();
        conn.bind("sess_1".into(), Role::Teacher);
        conn.clear_binding();
        assert!(conn.binding().is_none());
    }

    #[tokio::test]
    async fn send_frame_serializes() {
        let (conn, mut rx) = make_connection();
        assert!(conn.send_frame(&ServerFrame::timer_update(7)));
        let msg = rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["type"], "timer_update");
        assert_eq!(parsed["seconds"], 7);
    }

    #[test]
    fn mark_alive_and_check() {
        let (conn, _rx) = make_connection();
        // Initially alive
        assert!(conn.check_alive());
        // After check, no longer alive
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[test]
    fn last_pong_elapsed_grows() {
        let (conn, _rx) = make_connection();
        let e1 = conn.last_pong_elapsed();
        std::thread::sleep(Duration::from_millis(10));
        assert!(conn.last_pong_elapsed() > e1);
    }
}
