//! Shared application state

use crate::config::ServerSettings;
use logcascade_classifiers::Cascade;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    /// Classification cascade, shared across requests
    pub cascade: Arc<Cascade>,

    /// Server settings
    pub settings: Arc<ServerSettings>,

    /// Prometheus handle for /metrics; absent when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create application state
    pub fn new(
        cascade: Cascade,
        settings: ServerSettings,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            cascade: Arc::new(cascade),
            settings: Arc::new(settings),
            metrics,
        }
    }
}
