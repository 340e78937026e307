//! Live connection registry
//!
//! Tracks every active session transport, runs a per-session heartbeat, and
//! delivers targeted, room-scoped, and broadcast envelopes. A failed delivery
//! disconnects the session; callers never see transport errors.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;

use callflow_core::Envelope;

use crate::ServerError;

/// Room for dashboards watching queue membership
pub const QUEUE_MONITOR_ROOM: &str = "queue_monitor";
/// Room for dashboards watching call lifecycle
pub const CALL_MONITOR_ROOM: &str = "call_monitor";

/// Outbound half of a session transport
///
/// Returns whether delivery succeeded. Implementations must not panic on a
/// closed peer; a `false` return is how the registry learns a session died.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn send(&self, payload: &str) -> bool;
}

/// Activity counters shared with in-flight sends
struct SessionStats {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    last_activity: parking_lot::Mutex<DateTime<Utc>>,
}

impl SessionStats {
    fn new() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            last_activity: parking_lot::Mutex::new(Utc::now()),
        }
    }

    fn touch(&self) {
        *self.last_activity.lock() = Utc::now();
    }
}

struct Connection {
    sink: Arc<dyn SessionSink>,
    connected_at: DateTime<Utc>,
    stats: Arc<SessionStats>,
    heartbeat: JoinHandle<()>,
}

/// Listing entry for the sessions endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub call_id: String,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub rooms: Vec<String>,
}

/// Registry of live sessions and monitor rooms
pub struct ConnectionManager {
    connections: RwLock<HashMap<String, Connection>>,
    rooms: RwLock<HashMap<String, HashSet<String>>>,
    heartbeat_interval: Duration,
    max_connections: usize,
}

impl ConnectionManager {
    pub fn new(max_connections: usize, heartbeat_interval: Duration) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
            heartbeat_interval,
            max_connections,
        }
    }

    /// Register a session transport and start its heartbeat
    ///
    /// Reconnecting an existing call replaces the old transport. The old
    /// heartbeat is stopped before the new one starts.
    pub fn connect(
        self: &Arc<Self>,
        call_id: &str,
        sink: Arc<dyn SessionSink>,
    ) -> Result<(), ServerError> {
        self.disconnect(call_id);

        // The record carries its heartbeat handle from the moment it is
        // inserted, so no window exists where the task can be orphaned.
        let heartbeat = self.spawn_heartbeat(call_id);
        let replaced = {
            let mut connections = self.connections.write();
            if connections.len() >= self.max_connections {
                heartbeat.abort();
                return Err(ServerError::CapacityExceeded(connections.len()));
            }
            connections.insert(
                call_id.to_string(),
                Connection {
                    sink,
                    connected_at: Utc::now(),
                    stats: Arc::new(SessionStats::new()),
                    heartbeat,
                },
            )
        };
        // A concurrent connect for the same call may have slipped in between
        // the disconnect above and the insert.
        if let Some(old) = replaced {
            old.heartbeat.abort();
        }

        tracing::info!(call_id, total = self.count(), "Session connected");
        Ok(())
    }

    fn spawn_heartbeat(self: &Arc<Self>, call_id: &str) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let call_id = call_id.to_string();
        let interval = self.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; the peer just connected.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else { break };
                if !manager
                    .send_to_session(&call_id, &Envelope::heartbeat(&call_id))
                    .await
                {
                    tracing::debug!(call_id, "Heartbeat stopped, session gone");
                    break;
                }
            }
        })
    }

    /// Remove a session, stop its heartbeat, and leave all rooms. Idempotent.
    pub fn disconnect(&self, call_id: &str) -> bool {
        let removed = self.connections.write().remove(call_id);
        let Some(connection) = removed else {
            return false;
        };
        connection.heartbeat.abort();

        let mut rooms = self.rooms.write();
        for members in rooms.values_mut() {
            members.remove(call_id);
        }
        rooms.retain(|_, members| !members.is_empty());

        tracing::info!(call_id, total = self.connections.read().len(), "Session disconnected");
        true
    }

    /// Deliver an envelope to one session
    ///
    /// A failed send disconnects the session and returns `false`.
    pub async fn send_to_session(&self, call_id: &str, envelope: &Envelope) -> bool {
        let (sink, stats) = match self.connections.read().get(call_id) {
            Some(conn) => (Arc::clone(&conn.sink), Arc::clone(&conn.stats)),
            None => return false,
        };

        let payload = match serde_json::to_string(envelope) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(call_id, error = %e, "Envelope serialization failed");
                return false;
            }
        };

        if sink.send(&payload).await {
            stats.messages_sent.fetch_add(1, Ordering::Relaxed);
            stats.touch();
            true
        } else {
            tracing::warn!(call_id, "Send failed, dropping session");
            self.disconnect(call_id);
            false
        }
    }

    /// Deliver an envelope to every session, optionally excluding one
    pub async fn broadcast(&self, envelope: &Envelope, exclude: Option<&str>) -> usize {
        let targets: Vec<String> = self
            .connections
            .read()
            .keys()
            .filter(|id| Some(id.as_str()) != exclude)
            .cloned()
            .collect();

        let mut delivered = 0;
        for call_id in targets {
            if self.send_to_session(&call_id, envelope).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Add a session to a room. Unknown sessions are rejected.
    pub fn join_room(&self, call_id: &str, room: &str) -> bool {
        if !self.connections.read().contains_key(call_id) {
            return false;
        }
        self.rooms
            .write()
            .entry(room.to_string())
            .or_default()
            .insert(call_id.to_string());
        tracing::debug!(call_id, room, "Joined room");
        true
    }

    /// Remove a session from a room. Idempotent.
    pub fn leave_room(&self, call_id: &str, room: &str) {
        let mut rooms = self.rooms.write();
        if let Some(members) = rooms.get_mut(room) {
            members.remove(call_id);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Deliver an envelope to every member of a room
    pub async fn send_to_room(&self, room: &str, envelope: &Envelope) -> usize {
        let members: Vec<String> = self
            .rooms
            .read()
            .get(room)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();

        let mut delivered = 0;
        for call_id in members {
            if self.send_to_session(&call_id, envelope).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Push a queue state change to queue dashboards
    pub async fn broadcast_queue_update(&self, data: serde_json::Value) -> usize {
        let envelope = Envelope::new("queue_update", "").with_data(data);
        self.send_to_room(QUEUE_MONITOR_ROOM, &envelope).await
    }

    /// Push a call lifecycle change to call dashboards
    pub async fn broadcast_call_update(
        &self,
        call_id: &str,
        status: &str,
        data: serde_json::Value,
    ) -> usize {
        let envelope = Envelope::new("call_update", call_id)
            .with_data(json!({ "status": status, "details": data }));
        self.send_to_room(CALL_MONITOR_ROOM, &envelope).await
    }

    /// Count an inbound client message against the session's activity stats
    pub fn record_inbound(&self, call_id: &str) {
        if let Some(conn) = self.connections.read().get(call_id) {
            conn.stats.messages_received.fetch_add(1, Ordering::Relaxed);
            conn.stats.touch();
        }
    }

    pub fn is_connected(&self, call_id: &str) -> bool {
        self.connections.read().contains_key(call_id)
    }

    pub fn count(&self) -> usize {
        self.connections.read().len()
    }

    /// Snapshot of live sessions with their room memberships
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let rooms = self.rooms.read();
        self.connections
            .read()
            .iter()
            .map(|(call_id, conn)| SessionInfo {
                call_id: call_id.clone(),
                connected_at: conn.connected_at,
                last_activity: *conn.stats.last_activity.lock(),
                messages_sent: conn.stats.messages_sent.load(Ordering::Relaxed),
                messages_received: conn.stats.messages_received.load(Ordering::Relaxed),
                rooms: rooms
                    .iter()
                    .filter(|(_, members)| members.contains(call_id))
                    .map(|(room, _)| room.clone())
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
        fail: AtomicBool,
    }

    impl RecordingSink {
        fn messages(&self) -> Vec<serde_json::Value> {
            self.sent
                .lock()
                .iter()
                .map(|s| serde_json::from_str(s).unwrap())
                .collect()
        }

        fn heartbeats(&self) -> usize {
            self.messages()
                .iter()
                .filter(|m| m["type"] == "heartbeat")
                .count()
        }
    }

    #[async_trait]
    impl SessionSink for RecordingSink {
        async fn send(&self, payload: &str) -> bool {
            if self.fail.load(Ordering::SeqCst) {
                return false;
            }
            self.sent.lock().push(payload.to_string());
            true
        }
    }

    fn manager() -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::new(100, Duration::from_secs(30)))
    }

    #[tokio::test]
    async fn connect_and_disconnect_track_count() {
        let manager = manager();
        manager.connect("call-1", Arc::new(RecordingSink::default())).unwrap();
        manager.connect("call-2", Arc::new(RecordingSink::default())).unwrap();
        assert_eq!(manager.count(), 2);
        assert!(manager.is_connected("call-1"));

        assert!(manager.disconnect("call-1"));
        assert_eq!(manager.count(), 1);
        // Disconnecting twice is a no-op.
        assert!(!manager.disconnect("call-1"));
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let manager = Arc::new(ConnectionManager::new(1, Duration::from_secs(30)));
        manager.connect("call-1", Arc::new(RecordingSink::default())).unwrap();
        let err = manager
            .connect("call-2", Arc::new(RecordingSink::default()))
            .unwrap_err();
        assert!(matches!(err, ServerError::CapacityExceeded(1)));
    }

    #[tokio::test]
    async fn reconnect_replaces_transport() {
        let manager = manager();
        let first = Arc::new(RecordingSink::default());
        let second = Arc::new(RecordingSink::default());
        manager.connect("call-1", first.clone()).unwrap();
        manager.connect("call-1", second.clone()).unwrap();
        assert_eq!(manager.count(), 1);

        manager
            .send_to_session("call-1", &Envelope::new("status", "call-1"))
            .await;
        assert!(first.sent.lock().is_empty());
        assert_eq!(second.sent.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_flow_until_disconnect() {
        let manager = manager();
        let sink = Arc::new(RecordingSink::default());
        manager.connect("call-1", sink.clone()).unwrap();

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(sink.heartbeats(), 3);

        manager.disconnect("call-1");
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sink.heartbeats(), 3, "no heartbeats after disconnect");
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_does_not_leave_duplicate_heartbeats() {
        let manager = manager();
        let first = Arc::new(RecordingSink::default());
        let second = Arc::new(RecordingSink::default());
        manager.connect("call-1", first).unwrap();
        manager.connect("call-1", second.clone()).unwrap();

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(second.heartbeats(), 3, "only the replacement heartbeat may fire");
    }

    #[tokio::test(start_paused = true)]
    async fn failing_sink_is_auto_disconnected_by_heartbeat() {
        let manager = manager();
        let sink = Arc::new(RecordingSink::default());
        sink.fail.store(true, Ordering::SeqCst);
        manager.connect("call-1", sink).unwrap();

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert!(!manager.is_connected("call-1"));
    }

    #[tokio::test]
    async fn failed_send_disconnects() {
        let manager = manager();
        let sink = Arc::new(RecordingSink::default());
        manager.connect("call-1", sink.clone()).unwrap();
        sink.fail.store(true, Ordering::SeqCst);

        let ok = manager
            .send_to_session("call-1", &Envelope::new("status", "call-1"))
            .await;
        assert!(!ok);
        assert!(!manager.is_connected("call-1"));
    }

    #[tokio::test]
    async fn rooms_scope_delivery() {
        let manager = manager();
        let monitor = Arc::new(RecordingSink::default());
        let other = Arc::new(RecordingSink::default());
        manager.connect("monitor", monitor.clone()).unwrap();
        manager.connect("other", other.clone()).unwrap();
        assert!(manager.join_room("monitor", QUEUE_MONITOR_ROOM));

        let delivered = manager
            .broadcast_queue_update(serde_json::json!({"queue": "sales", "depth": 4}))
            .await;
        assert_eq!(delivered, 1);
        assert_eq!(monitor.sent.lock().len(), 1);
        assert!(other.sent.lock().is_empty());

        let msg = &monitor.messages()[0];
        assert_eq!(msg["type"], "queue_update");
        assert_eq!(msg["data"]["queue"], "sales");
    }

    #[tokio::test]
    async fn join_room_requires_live_session() {
        let manager = manager();
        assert!(!manager.join_room("ghost", CALL_MONITOR_ROOM));
    }

    #[tokio::test]
    async fn disconnect_leaves_rooms() {
        let manager = manager();
        manager.connect("call-1", Arc::new(RecordingSink::default())).unwrap();
        manager.join_room("call-1", CALL_MONITOR_ROOM);
        manager.disconnect("call-1");

        let delivered = manager
            .broadcast_call_update("call-2", "ringing", serde_json::json!({}))
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn broadcast_excludes_sender() {
        let manager = manager();
        let a = Arc::new(RecordingSink::default());
        let b = Arc::new(RecordingSink::default());
        manager.connect("a", a.clone()).unwrap();
        manager.connect("b", b.clone()).unwrap();

        let delivered = manager
            .broadcast(&Envelope::new("announcement", ""), Some("a"))
            .await;
        assert_eq!(delivered, 1);
        assert!(a.sent.lock().is_empty());
        assert_eq!(b.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn sessions_snapshot_includes_rooms() {
        let manager = manager();
        manager.connect("call-1", Arc::new(RecordingSink::default())).unwrap();
        manager.join_room("call-1", CALL_MONITOR_ROOM);

        let sessions = manager.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].call_id, "call-1");
        assert_eq!(sessions[0].rooms, vec![CALL_MONITOR_ROOM.to_string()]);
    }

    #[tokio::test]
    async fn activity_counters_track_traffic() {
        let manager = manager();
        manager.connect("call-1", Arc::new(RecordingSink::default())).unwrap();

        manager
            .send_to_session("call-1", &Envelope::new("status", "call-1"))
            .await;
        manager.record_inbound("call-1");
        manager.record_inbound("call-1");

        let sessions = manager.sessions();
        assert_eq!(sessions[0].messages_sent, 1);
        assert_eq!(sessions[0].messages_received, 2);
    }
}
