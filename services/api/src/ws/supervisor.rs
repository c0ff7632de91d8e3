//! The process-wide table of live sessions.

use super::{
    frame::BoxTransport,
    lifecycle::{Session, SessionSummary},
    relay::{RelaySettings, SessionRelay},
    upstream::{Handshake, UpstreamConnector},
};
use dashmap::DashMap;
use live_relay_core::ToolDispatcher;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionSupervisor {
    sessions: Arc<DashMap<Uuid, Arc<Session>>>,
}

/// Keeps a session registered for as long as it is alive.
pub struct SessionGuard {
    session: Arc<Session>,
    sessions: Arc<DashMap<Uuid, Arc<Session>>>,
}

impl SessionGuard {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.session.id());
        debug!(session_id = %self.session.id(), "Session removed.");
    }
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, protocol: Option<String>) -> SessionGuard {
        let session = Arc::new(Session::new(protocol));
        self.sessions.insert(session.id(), session.clone());
        SessionGuard {
            session,
            sessions: self.sessions.clone(),
        }
    }

    /// Runs one session to completion and unregisters it, however it ends.
    pub async fn serve(
        &self,
        guard: SessionGuard,
        downstream: BoxTransport,
        handshake: Handshake,
        connector: Arc<dyn UpstreamConnector>,
        dispatcher: ToolDispatcher,
        settings: RelaySettings,
    ) {
        let relay = SessionRelay::new(guard.session().clone(), handshake, connector, dispatcher, settings);
        relay.run(downstream).await;
        drop(guard);
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        self.sessions.iter().map(|entry| entry.value().summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
