use crate::domain::a001_merchant_account::aggregate::MerchantAccountId;
use crate::domain::a006_catalog_product::aggregate::CatalogProductId;
use crate::domain::common::{AggregateId, BaseAggregate};
use crate::enums::{FeedType, ProcessingStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedSubmissionId(pub Uuid);

impl FeedSubmissionId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for FeedSubmissionId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(FeedSubmissionId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

/// One outbound feed transmission. Reconciliation matches on the
/// `(submission_id, date_submitted, feed_type)` triple, not the
/// submission ID alone: a resubmission flow can in principle return
/// overlapping IDs across time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSubmission {
    #[serde(flatten)]
    pub base: BaseAggregate<FeedSubmissionId>,

    /// Submission ID assigned by Amazon
    pub submission_id: String,
    pub feed_type: FeedType,
    pub date_submitted: chrono::DateTime<chrono::Utc>,
    pub processing_status: ProcessingStatus,
    pub merchant: MerchantAccountId,
    /// Raw feed document as submitted, kept for troubleshooting
    pub feed_xml: Option<String>,
}

impl FeedSubmission {
    pub fn new_for_insert(
        submission_id: String,
        feed_type: FeedType,
        date_submitted: chrono::DateTime<chrono::Utc>,
        processing_status: ProcessingStatus,
        merchant: MerchantAccountId,
    ) -> Self {
        let description = format!("Feed #{}", submission_id);
        Self {
            base: BaseAggregate::new(FeedSubmissionId::new_v4(), String::new(), description),
            submission_id,
            feed_type,
            date_submitted,
            processing_status,
            merchant,
            feed_xml: None,
        }
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

/// Link row recording which product went out in which envelope message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSubmissionMessage {
    pub id: Uuid,
    pub submission: FeedSubmissionId,
    pub product: CatalogProductId,
    pub message_id: i64,
}

/// Processing outcome summary, one per submission, created lazily the
/// first time results are fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedReport {
    pub id: Uuid,
    pub submission: FeedSubmissionId,
    pub status_code: String,
    pub processed: i32,
    pub successful: i32,
    pub errors: i32,
    pub warnings: i32,
}

/// One warning/error line item from a processing report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResult {
    pub id: Uuid,
    pub report: Uuid,
    pub message_code: String,
    pub result_type: String,
    pub description: String,
    /// Best-effort link resolved by SKU; absent when the SKU is unknown
    pub product: Option<CatalogProductId>,
}
