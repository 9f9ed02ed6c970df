//! SSE session tracking
//!
//! Each open `/sse` stream owns one session. Messages posted for a session
//! are forwarded to its stream through an unbounded channel.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Outbound half of a session's event stream; carries serialized JSON-RPC messages
pub type SessionSender = mpsc::UnboundedSender<String>;

/// How often the reaper scans for idle sessions
const REAP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Session {
    sender: SessionSender,
    created_at: Instant,
    last_activity: Instant,
}

/// Summary of one session, for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub age_seconds: u64,
    pub idle_seconds: u64,
}

/// Registry of open SSE sessions
#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            timeout,
        }
    }

    /// Register a new session and return its id
    pub async fn register(&self, sender: SessionSender) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            id.clone(),
            Session {
                sender,
                created_at: now,
                last_activity: now,
            },
        );
        debug!("Registered session {} ({} open)", id, sessions.len());
        id
    }

    /// Sender for a session, if it is still open
    pub async fn get(&self, id: &str) -> Option<SessionSender> {
        let sessions = self.sessions.read().await;
        sessions.get(id).map(|session| session.sender.clone())
    }

    /// Record activity on a session; false when it does not exist
    pub async fn touch(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) => {
                session.last_activity = Instant::now();
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            debug!("Removed session {}", id);
        }
        removed
    }

    /// Sessions active within the timeout
    pub async fn active_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|session| session.last_activity.elapsed() <= self.timeout)
            .count()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<_> = sessions
            .iter()
            .map(|(id, session)| SessionSummary {
                id: id.clone(),
                age_seconds: session.created_at.elapsed().as_secs(),
                idle_seconds: session.last_activity.elapsed().as_secs(),
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Drop sessions idle longer than the timeout or whose stream is gone
    pub async fn remove_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            session.last_activity.elapsed() <= self.timeout && !session.sender.is_closed()
        });
        before - sessions.len()
    }

    /// Spawn the background reaper; it exits when `shutdown` fires
    pub fn spawn_reaper(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let period = REAP_INTERVAL
                .min(manager.timeout)
                .max(Duration::from_millis(100));
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = manager.remove_expired().await;
                        if removed > 0 {
                            info!("Reaped {} expired sessions", removed);
                        }
                    }
                    _ = shutdown.recv() => {
                        debug!("Session reaper received shutdown signal");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_get_remove() {
        let manager = SessionManager::new(Duration::from_secs(60));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = manager.register(tx).await;

        let sender = manager.get(&id).await.unwrap();
        sender.send("hello".to_string()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "hello");

        assert!(manager.touch(&id).await);
        assert_eq!(manager.active_count().await, 1);
        assert!(manager.remove(&id).await);
        assert!(manager.get(&id).await.is_none());
        assert!(!manager.touch(&id).await);
    }

    #[tokio::test]
    async fn test_closed_streams_are_reaped() {
        let manager = SessionManager::new(Duration::from_secs(60));
        let (tx, rx) = mpsc::unbounded_channel();
        manager.register(tx).await;
        let (live_tx, _live_rx) = mpsc::unbounded_channel();
        manager.register(live_tx).await;

        drop(rx);
        assert_eq!(manager.remove_expired().await, 1);
        assert_eq!(manager.summaries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_not_active() {
        let manager = SessionManager::new(Duration::from_millis(10));
        let (tx, _rx) = mpsc::unbounded_channel();
        manager.register(tx).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(manager.active_count().await, 0);
        assert_eq!(manager.remove_expired().await, 1);
    }

    #[tokio::test]
    async fn test_reaper_stops_on_shutdown() {
        let manager = SessionManager::new(Duration::from_secs(60));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = manager.spawn_reaper(shutdown_rx);

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
