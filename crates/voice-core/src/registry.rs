//! Process-wide map of session IDs to Sessions, with lifecycle
//! (create / lookup / destroy).

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::events::SessionId;
use crate::session::Session;

/// Shared-read, exclusive-write by session id; `dashmap` gives lock-free
/// concurrent lookup without a single global mutex guarding every
/// session.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Arc<Session>) {
        self.sessions.insert(session.id.clone(), session);
    }

    /// Allocates a server-generated id if `id` is absent.
    pub fn next_id(id: Option<String>) -> SessionId {
        id.unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Removes and closes the session. Idempotent: destroying an id that
    /// isn't present is a no-op.
    pub async fn destroy(&self, id: &str) {
        if let Some((_, session)) = self.sessions.remove(id) {
            session.close().await;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_id_when_none_given() {
        let id = SessionRegistry::next_id(None);
        assert!(!id.is_empty());
    }

    #[test]
    fn keeps_client_proposed_id() {
        let id = SessionRegistry::next_id(Some("client-123".to_string()));
        assert_eq!(id, "client-123");
    }
}
