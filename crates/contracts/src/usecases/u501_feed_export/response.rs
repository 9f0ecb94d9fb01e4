use serde::{Deserialize, Serialize};

/// One remotely known feed submission, as listed by the vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedInfo {
    pub submission_id: String,
    pub feed_type: String,
    pub status: String,
    pub date_submitted: Option<chrono::DateTime<chrono::Utc>>,
    pub date_processing_started: Option<chrono::DateTime<chrono::Utc>>,
    pub date_processing_ended: Option<chrono::DateTime<chrono::Utc>>,
}

/// Result of a product feed submission. A dry run never reaches the
/// vendor and returns the rendered documents instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SubmitFeedOutcome {
    Submitted(Vec<String>),
    DryRun(Vec<String>),
}
