use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of a committed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    /// Reference requested for the committed image
    pub target: String,

    /// Reference the engine reported after commit
    pub reference: String,

    pub image_id: String,
    pub engine: String,
    pub base_image: String,

    /// Directives in the script, raw lines included
    pub directives: usize,

    pub commands_executed: usize,
    pub breakpoints_hit: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}
