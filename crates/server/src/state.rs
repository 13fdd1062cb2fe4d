//! Application state

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use receptionist_agent::SessionTable;
use receptionist_config::Settings;
use receptionist_core::CallRecordStore;
use receptionist_tools::ToolRegistry;

/// Shared state behind every HTTP handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    /// Open calls
    pub sessions: Arc<SessionTable>,
    /// Tools offered to the model on every turn
    pub tools: Arc<ToolRegistry>,
    /// Call log gateway, if one is configured
    pub call_log: Option<Arc<dyn CallRecordStore>>,
    /// Prometheus renderer; `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: Settings,
        sessions: Arc<SessionTable>,
        tools: Arc<ToolRegistry>,
        call_log: Option<Arc<dyn CallRecordStore>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            tools,
            call_log,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn has_call_log(&self) -> bool {
        self.call_log.is_some()
    }
}
