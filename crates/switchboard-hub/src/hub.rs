use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use switchboard_config::HubConfig;
use switchboard_telemetry::{Counter, KeyValue, UpDownCounter, metrics};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{HubError, TaskUpdate, TypedMessage};

/// Capacity of the register and unregister queues
const CONTROL_BUFFER: usize = 64;

/// user id -> session id -> outbound queue
type SessionMap = HashMap<String, HashMap<Uuid, mpsc::Sender<String>>>;

/// The hub's view of one live session
///
/// Owns the only strong sender of the session's outbound queue. Once the
/// hub drops it the session's writer sees the queue close and shuts the
/// connection down.
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    user_id: String,
    outbound: mpsc::Sender<String>,
}

impl SessionHandle {
    /// New session for `user_id` and the receiving end of its queue
    pub fn new(user_id: impl Into<String>, buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(buffer.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            outbound,
        };

        (handle, rx)
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Sender that does not keep the queue open
    pub fn downgrade(&self) -> mpsc::WeakSender<String> {
        self.outbound.downgrade()
    }
}

/// Connection counts taken under one read lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub online_users: Vec<String>,
    pub total_connections: usize,
}

struct Registration {
    session: SessionHandle,
    ack: oneshot::Sender<()>,
}

struct Unregistration {
    user_id: String,
    session_id: Uuid,
    ack: oneshot::Sender<()>,
}

struct Broadcast {
    user_id: String,
    payload: String,
}

/// Handle to the hub coordinator
///
/// Cheap to clone. Mutations are queued to the coordinator; the query
/// helpers read the shared map directly.
#[derive(Clone)]
pub struct Hub {
    register: mpsc::Sender<Registration>,
    unregister: mpsc::Sender<Unregistration>,
    broadcast: mpsc::Sender<Broadcast>,
    sessions: Arc<RwLock<SessionMap>>,
    config: Arc<HubConfig>,
}

impl Hub {
    /// Start the coordinator task
    ///
    /// The coordinator runs until `shutdown` fires or every handle is
    /// dropped. On exit all sessions are released, which closes them.
    pub fn spawn(config: HubConfig, shutdown: CancellationToken) -> Self {
        let (register, register_rx) = mpsc::channel(CONTROL_BUFFER);
        let (unregister, unregister_rx) = mpsc::channel(CONTROL_BUFFER);
        let (broadcast, broadcast_rx) = mpsc::channel(config.broadcast_buffer.max(1));
        let sessions = Arc::new(RwLock::new(SessionMap::new()));

        let coordinator = Coordinator::new(sessions.clone());
        tokio::spawn(coordinator.run(register_rx, unregister_rx, broadcast_rx, shutdown));

        Self {
            register,
            unregister,
            broadcast,
            sessions,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Add a session, returning once the coordinator has stored it
    pub async fn register(&self, session: SessionHandle) -> Result<(), HubError> {
        let (ack, done) = oneshot::channel();
        self.register
            .send(Registration { session, ack })
            .await
            .map_err(|_| HubError::Stopped)?;

        done.await.map_err(|_| HubError::Stopped)
    }

    /// Remove a session, returning once the coordinator has dropped it
    ///
    /// Unknown sessions are ignored, so this is safe to call for a
    /// session the hub already tore down.
    pub async fn unregister(&self, user_id: &str, session_id: Uuid) -> Result<(), HubError> {
        let (ack, done) = oneshot::channel();
        self.unregister
            .send(Unregistration {
                user_id: user_id.to_owned(),
                session_id,
                ack,
            })
            .await
            .map_err(|_| HubError::Stopped)?;

        done.await.map_err(|_| HubError::Stopped)
    }

    /// Queue `payload` for every session of `user_id`
    ///
    /// Messages from one caller are delivered in submission order. Waits
    /// when the broadcast queue is full.
    pub async fn broadcast_to_user(&self, user_id: &str, payload: &impl Serialize) -> Result<(), HubError> {
        let payload = serde_json::to_string(payload)?;

        self.broadcast
            .send(Broadcast {
                user_id: user_id.to_owned(),
                payload,
            })
            .await
            .map_err(|_| HubError::Stopped)
    }

    /// Broadcast `{type, data}`
    pub async fn broadcast_to_user_with_type(
        &self,
        user_id: &str,
        message_type: &str,
        data: &impl Serialize,
    ) -> Result<(), HubError> {
        self.broadcast_to_user(user_id, &TypedMessage::new(message_type, data))
            .await
    }

    /// Broadcast a task state change stamped with the current time
    pub async fn broadcast_task_update(
        &self,
        user_id: &str,
        task_id: &str,
        event_type: &str,
        data: &impl Serialize,
    ) -> Result<(), HubError> {
        let update = TaskUpdate::new(event_type, task_id, user_id, data);
        self.broadcast_to_user(user_id, &update).await
    }

    pub fn is_user_online(&self, user_id: &str) -> bool {
        self.get_user_client_count(user_id) > 0
    }

    pub fn get_user_client_count(&self, user_id: &str) -> usize {
        self.read().get(user_id).map_or(0, HashMap::len)
    }

    /// Ids of users with at least one session, sorted
    pub fn get_online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.read().keys().cloned().collect();
        users.sort_unstable();
        users
    }

    pub fn get_total_connections(&self) -> usize {
        self.read().values().map(HashMap::len).sum()
    }

    pub fn stats(&self) -> HubStats {
        let sessions = self.read();
        let mut online_users: Vec<String> = sessions.keys().cloned().collect();
        online_users.sort_unstable();

        HubStats {
            online_users,
            total_connections: sessions.values().map(HashMap::len).sum(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionMap> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("total_connections", &self.get_total_connections())
            .finish_non_exhaustive()
    }
}

struct Coordinator {
    sessions: Arc<RwLock<SessionMap>>,
    connections: UpDownCounter<i64>,
    dropped: Counter<u64>,
}

impl Coordinator {
    fn new(sessions: Arc<RwLock<SessionMap>>) -> Self {
        let meter = metrics::meter();

        Self {
            sessions,
            connections: meter
                .i64_up_down_counter(metrics::HUB_CONNECTIONS)
                .with_description("Live WebSocket sessions")
                .build(),
            dropped: meter
                .u64_counter(metrics::HUB_DROPPED_SESSIONS)
                .with_description("Sessions dropped because their outbound queue was full")
                .build(),
        }
    }

    async fn run(
        self,
        mut register: mpsc::Receiver<Registration>,
        mut unregister: mpsc::Receiver<Unregistration>,
        mut broadcast: mpsc::Receiver<Broadcast>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,
                Some(registration) = register.recv() => {
                    self.add(registration.session);
                    let _ = registration.ack.send(());
                }
                Some(request) = unregister.recv() => {
                    self.remove(&request.user_id, request.session_id);
                    let _ = request.ack.send(());
                }
                Some(message) = broadcast.recv() => self.deliver(&message),
                else => break,
            }
        }

        // Close the queues first so submissions fail once sessions are gone
        drop(register);
        drop(unregister);
        drop(broadcast);

        let released: usize = {
            let mut sessions = self.write();
            let count = sessions.values().map(HashMap::len).sum();
            sessions.clear();
            count
        };
        self.connections.add(-to_i64(released), &[]);

        tracing::debug!(released, "hub coordinator stopped");
    }

    fn add(&self, session: SessionHandle) {
        let total = {
            let mut sessions = self.write();
            let user_sessions = sessions.entry(session.user_id.clone()).or_default();
            user_sessions.insert(session.id, session.outbound);
            user_sessions.len()
        };
        self.connections.add(1, &[]);

        tracing::info!(user_id = %session.user_id, session_id = %session.id, total_clients = total, "websocket client registered");
    }

    fn remove(&self, user_id: &str, session_id: Uuid) {
        let remaining = {
            let mut sessions = self.write();
            let Some(user_sessions) = sessions.get_mut(user_id) else {
                return;
            };
            if user_sessions.remove(&session_id).is_none() {
                return;
            }

            let remaining = user_sessions.len();
            if remaining == 0 {
                sessions.remove(user_id);
            }
            remaining
        };
        self.connections.add(-1, &[]);

        tracing::info!(user_id, %session_id, remaining_clients = remaining, "websocket client unregistered");
    }

    /// Deliver to every session of the user, dropping any that cannot keep up
    fn deliver(&self, message: &Broadcast) {
        let dropped = {
            let mut sessions = self.write();
            let Some(user_sessions) = sessions.get_mut(&message.user_id) else {
                tracing::debug!(user_id = %message.user_id, "broadcast to offline user discarded");
                return;
            };

            let before = user_sessions.len();
            user_sessions.retain(|session_id, outbound| match outbound.try_send(message.payload.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(user_id = %message.user_id, %session_id, "outbound queue full, dropping session");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
            let dropped = before - user_sessions.len();

            if user_sessions.is_empty() {
                sessions.remove(&message.user_id);
            }
            dropped
        };

        if dropped > 0 {
            self.connections.add(-to_i64(dropped), &[]);
            self.dropped.add(
                u64::try_from(dropped).unwrap_or(u64::MAX),
                &[KeyValue::new("reason", "queue_full")],
            );
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionMap> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn to_i64(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}
