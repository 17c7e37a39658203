//! Application state for API handlers

use buyline_storage::BuylineStorage;
use buyline_workflow::{ApprovalExecutor, MediaBuyIntake};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Storage backend
    pub storage: Arc<dyn BuylineStorage>,

    /// Intake orchestration
    pub intake: Arc<MediaBuyIntake>,

    /// Decision execution
    pub executor: Arc<ApprovalExecutor>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn BuylineStorage>,
        intake: Arc<MediaBuyIntake>,
        executor: Arc<ApprovalExecutor>,
    ) -> Self {
        Self {
            storage,
            intake,
            executor,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
