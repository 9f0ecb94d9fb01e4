use async_trait::async_trait;

use super::error::MwsError;
use super::fields::FieldMap;
use super::tree::XmlNode;

/// Remote marketplace API surface, one method per wire operation the
/// use cases need. Implemented by the signed HTTP client and by the
/// scripted mock used in tests.
///
/// Every method resolves to the parsed response tree. Callers navigate
/// it with the forgiving [`XmlNode`] accessors instead of binding to a
/// response schema.
#[async_trait]
pub trait MwsApi: Send + Sync {
    /// SubmitFeed: upload a feed document for processing
    async fn submit_feed(
        &self,
        feed_content: &str,
        feed_type: &str,
        marketplace_ids: &[String],
    ) -> Result<XmlNode, MwsError>;

    /// GetFeedSubmissionList: current processing status of submissions
    async fn get_feed_submission_list(
        &self,
        submission_ids: &[String],
    ) -> Result<XmlNode, MwsError>;

    /// GetFeedSubmissionResult: processing report for one submission
    async fn get_feed_submission_result(&self, submission_id: &str)
        -> Result<XmlNode, MwsError>;

    /// CancelFeedSubmissions: request cancellation of submissions
    async fn cancel_feed_submissions(
        &self,
        submission_ids: &[String],
    ) -> Result<XmlNode, MwsError>;

    /// CreateFulfillmentOrder: hand an order to the fulfillment network
    async fn create_fulfillment_order(&self, fields: &FieldMap) -> Result<XmlNode, MwsError>;

    /// GetFulfillmentOrder: remote state of one fulfillment order
    async fn get_fulfillment_order(&self, fulfillment_id: &str) -> Result<XmlNode, MwsError>;

    /// ListInventorySupply: fulfillable quantity per SKU
    async fn list_inventory_supply(&self, skus: &[String]) -> Result<XmlNode, MwsError>;

    /// ListMarketplaceParticipations: marketplaces the seller trades in
    async fn list_marketplace_participations(&self) -> Result<XmlNode, MwsError>;

    /// GetMatchingProductForId: catalog lookup by external identifier
    async fn get_matching_product_for_id(
        &self,
        marketplace_id: Option<&str>,
        id_type: &str,
        ids: &[String],
    ) -> Result<XmlNode, MwsError>;
}
