use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use suppression::workflows::suppression::{SessionError, SessionId, SessionStore};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

struct SessionEntry {
    values: HashMap<String, Value>,
    touched: Instant,
}

/// Process-local session storage for single-instance deployments.
///
/// A session idle for longer than `ttl` is discarded; reads and writes both count as activity.
#[derive(Clone)]
pub(crate) struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionEntry>>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, SessionEntry>>, SessionError> {
        self.sessions
            .lock()
            .map_err(|_| SessionError::Unavailable("session lock poisoned".to_string()))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.lock().map(|guard| guard.len()).unwrap_or_default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, session: &SessionId, key: &str) -> Result<Option<Value>, SessionError> {
        let mut guard = self.lock()?;
        let now = Instant::now();

        match guard.get_mut(session) {
            Some(entry) if now.duration_since(entry.touched) <= self.ttl => {
                entry.touched = now;
                return Ok(entry.values.get(key).cloned());
            }
            Some(_) => {}
            None => return Ok(None),
        }

        guard.remove(session);
        debug!("idle session expired on read");
        Ok(None)
    }

    fn set(&self, session: &SessionId, key: &str, value: Value) -> Result<(), SessionError> {
        let mut guard = self.lock()?;
        let now = Instant::now();

        let before = guard.len();
        guard.retain(|_, entry| now.duration_since(entry.touched) <= self.ttl);
        let dropped = before - guard.len();
        if dropped > 0 {
            debug!(dropped, "idle sessions discarded");
        }

        let entry = guard.entry(session.clone()).or_insert_with(|| SessionEntry {
            values: HashMap::new(),
            touched: now,
        });
        entry.touched = now;
        entry.values.insert(key.to_string(), value);
        Ok(())
    }
}
