//! Live session table
//!
//! Tracks every active call so the server can bound concurrency, look
//! calls up by id and finalize them all on shutdown.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use receptionist_config::Settings;
use receptionist_core::{CallRecord, MediaTransport, TransportEvent};
use receptionist_tools::ToolRegistry;

use crate::session::{CallServices, SessionManager, SessionOptions};
use crate::AgentError;

/// Active calls keyed by call id
pub struct SessionTable {
    sessions: RwLock<HashMap<String, Arc<SessionManager>>>,
    max_sessions: usize,
    services: CallServices,
    tools: Arc<ToolRegistry>,
    options: SessionOptions,
}

impl SessionTable {
    pub fn new(
        services: CallServices,
        tools: Arc<ToolRegistry>,
        options: SessionOptions,
        max_sessions: usize,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            services,
            tools,
            options,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        services: CallServices,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self::new(
            services,
            tools,
            SessionOptions::from_settings(settings),
            settings.server.max_sessions,
        )
    }

    /// Accept a new call and start it
    pub async fn connect(
        &self,
        transport: Arc<dyn MediaTransport>,
        caller_id: Option<String>,
    ) -> Result<Arc<SessionManager>, AgentError> {
        let call_id = Uuid::new_v4().to_string();
        let session = SessionManager::new(
            call_id.clone(),
            caller_id,
            transport,
            self.services.clone(),
            Arc::clone(&self.tools),
            self.options.clone(),
        );

        {
            let mut sessions = self.sessions.write();
            if sessions.len() >= self.max_sessions {
                tracing::warn!(max_sessions = self.max_sessions, "Rejecting call, session capacity reached");
                return Err(AgentError::CapacityReached(self.max_sessions));
            }
            sessions.insert(call_id.clone(), Arc::clone(&session));
        }
        tracing::info!(call_id = %call_id, active = self.count(), "Created session");

        if let Err(e) = session.start().await {
            tracing::error!(call_id = %call_id, error = %e, "Failed to start session");
            self.sessions.write().remove(&call_id);
            session.on_media_stream_ended("start failed").await;
            return Err(e);
        }
        Ok(session)
    }

    /// Drive `session` from `events` in the background
    ///
    /// The session leaves the table once its call ends.
    pub fn spawn_session(
        self: &Arc<Self>,
        session: Arc<SessionManager>,
        events: mpsc::Receiver<TransportEvent>,
    ) -> JoinHandle<Option<CallRecord>> {
        let table = Arc::clone(self);
        tokio::spawn(async move {
            let call_id = session.call_id();
            let record = session.run(events).await;
            table.remove(&call_id);
            record
        })
    }

    pub fn get(&self, call_id: &str) -> Option<Arc<SessionManager>> {
        self.sessions.read().get(call_id).cloned()
    }

    pub fn remove(&self, call_id: &str) -> Option<Arc<SessionManager>> {
        let removed = self.sessions.write().remove(call_id);
        if removed.is_some() {
            tracing::debug!(call_id, "Removed session");
        }
        removed
    }

    /// End a call by id
    pub async fn disconnect(&self, call_id: &str, reason: &str) -> Option<CallRecord> {
        let session = self.remove(call_id)?;
        session.on_media_stream_ended(reason).await
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Finalize every live call; returns how many were finalized
    pub async fn shutdown_all(&self) -> usize {
        let sessions: Vec<_> = self.sessions.write().drain().map(|(_, s)| s).collect();
        tracing::info!(count = sessions.len(), "Finalizing all sessions");
        let records = futures::future::join_all(
            sessions
                .iter()
                .map(|session| session.on_media_stream_ended("server shutdown")),
        )
        .await;
        records.into_iter().flatten().count()
    }
}
