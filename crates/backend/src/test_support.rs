//! Shared plumbing for tests that exercise the database or the API
//! boundary. Tests run on one shared runtime against one sqlite file
//! per process; fixtures use fresh UUIDs and unique natural keys so
//! they never collide across tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use uuid::Uuid;

use contracts::domain::a001_merchant_account::aggregate::MerchantAccount;
use contracts::domain::a002_amazon_marketplace::aggregate::AmazonMarketplace;
use contracts::domain::a003_amazon_profile::aggregate::AmazonProfile;
use contracts::domain::a006_catalog_product::aggregate::CatalogProduct;
use contracts::domain::a007_store_order::aggregate::{OrderLine, ShippingAddress, StoreOrder};
use contracts::enums::Region;

use crate::domain::a001_merchant_account::repository as merchants;
use crate::domain::a002_amazon_marketplace::repository as marketplaces;
use crate::domain::a003_amazon_profile::repository as profiles;
use crate::domain::a006_catalog_product::repository as catalog;
use crate::domain::a007_store_order::repository as store_orders;
use crate::shared::data::db;
use crate::shared::mws::{ConnectionRegistry, FieldMap, MwsApi, MwsError, XmlNode};

static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("test runtime")
});

static DB_INIT: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

/// Run an async test body on the shared runtime
pub fn run<F: Future>(future: F) -> F::Output {
    RUNTIME.block_on(future)
}

/// Initialize the process-wide test database once
pub async fn init_test_db() {
    let _guard = DB_INIT.lock().await;
    if db::is_initialized() {
        return;
    }
    let path = std::env::temp_dir().join(format!("mws-test-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    db::initialize_database(Some(&path.to_string_lossy()))
        .await
        .expect("test database");
}

/// Scripted API double. Responses are consumed in queue order across
/// all operations; the operation names are recorded for assertions.
#[derive(Default)]
pub struct MockMwsApi {
    responses: Mutex<VecDeque<Result<XmlNode, MwsError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockMwsApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue(&self, response: XmlNode) {
        self.responses
            .lock()
            .expect("mock queue")
            .push_back(Ok(response));
    }

    pub fn queue_err(&self, error: MwsError) {
        self.responses
            .lock()
            .expect("mock queue")
            .push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock calls").clone()
    }

    fn next(&self, operation: &str) -> Result<XmlNode, MwsError> {
        self.calls
            .lock()
            .expect("mock calls")
            .push(operation.to_string());
        self.responses
            .lock()
            .expect("mock queue")
            .pop_front()
            .unwrap_or_else(|| {
                Err(MwsError::Transport(format!(
                    "no scripted response for {}",
                    operation
                )))
            })
    }
}

#[async_trait]
impl MwsApi for MockMwsApi {
    async fn submit_feed(
        &self,
        _feed_content: &str,
        _feed_type: &str,
        _marketplace_ids: &[String],
    ) -> Result<XmlNode, MwsError> {
        self.next("SubmitFeed")
    }

    async fn get_feed_submission_list(
        &self,
        _submission_ids: &[String],
    ) -> Result<XmlNode, MwsError> {
        self.next("GetFeedSubmissionList")
    }

    async fn get_feed_submission_result(
        &self,
        _submission_id: &str,
    ) -> Result<XmlNode, MwsError> {
        self.next("GetFeedSubmissionResult")
    }

    async fn cancel_feed_submissions(
        &self,
        _submission_ids: &[String],
    ) -> Result<XmlNode, MwsError> {
        self.next("CancelFeedSubmissions")
    }

    async fn create_fulfillment_order(&self, _fields: &FieldMap) -> Result<XmlNode, MwsError> {
        self.next("CreateFulfillmentOrder")
    }

    async fn get_fulfillment_order(&self, _fulfillment_id: &str) -> Result<XmlNode, MwsError> {
        self.next("GetFulfillmentOrder")
    }

    async fn list_inventory_supply(&self, _skus: &[String]) -> Result<XmlNode, MwsError> {
        self.next("ListInventorySupply")
    }

    async fn list_marketplace_participations(&self) -> Result<XmlNode, MwsError> {
        self.next("ListMarketplaceParticipations")
    }

    async fn get_matching_product_for_id(
        &self,
        _marketplace_id: Option<&str>,
        _id_type: &str,
        _ids: &[String],
    ) -> Result<XmlNode, MwsError> {
        self.next("GetMatchingProductForId")
    }
}

/// Registry whose factory always hands out the given mock
pub fn registry_with(mock: Arc<MockMwsApi>) -> Arc<ConnectionRegistry> {
    Arc::new(ConnectionRegistry::new(Box::new(move |_| {
        mock.clone() as Arc<dyn MwsApi>
    })))
}

pub fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub async fn seeded_merchant() -> MerchantAccount {
    let merchant = MerchantAccount::new_for_insert(
        String::new(),
        format!("Merchant {}", short_id()),
        format!("SELLER-{}", short_id()),
        "AKIATEST".into(),
        "secret".into(),
        Region::Us,
    );
    merchants::insert(&merchant).await.expect("insert merchant");
    merchant
}

pub async fn seeded_marketplace(merchant: &MerchantAccount) -> AmazonMarketplace {
    let marketplace = AmazonMarketplace::new_for_insert(
        format!("MKT{}", short_id()),
        merchant.base.id,
        "Test marketplace".into(),
    );
    marketplaces::insert(&marketplace)
        .await
        .expect("insert marketplace");
    marketplace
}

pub async fn seeded_product_with_profile(
    marketplace: Option<&AmazonMarketplace>,
) -> (CatalogProduct, AmazonProfile) {
    let product = CatalogProduct::new_for_insert(
        format!("Product {}", short_id()),
        Some("883028551234".into()),
    );
    catalog::insert(&product).await.expect("insert product");
    let mut profile =
        AmazonProfile::new_for_insert(product.base.id, format!("SKU-{}", short_id()));
    if let Some(marketplace) = marketplace {
        profile.marketplaces = vec![marketplace.base.id];
    }
    profiles::insert(&profile).await.expect("insert profile");
    (product, profile)
}

pub async fn seeded_address() -> ShippingAddress {
    let address = ShippingAddress::new(
        "Jo Doe".into(),
        "1 Main St".into(),
        "Exeter".into(),
        "EX4 4PZ".into(),
        "GB".into(),
    );
    store_orders::insert_address(&address).await.expect("insert address");
    address
}

/// Order with one address and `quantities.len()` lines against fresh
/// products
pub async fn seeded_order(quantities: &[i32]) -> (StoreOrder, Vec<OrderLine>) {
    let address = seeded_address().await;
    let mut order = StoreOrder::new_for_insert(format!("1{}", short_id()), None);
    order.shipping_address = Some(address.id);
    store_orders::insert(&order).await.expect("insert order");

    let mut lines = Vec::new();
    for quantity in quantities {
        let product = CatalogProduct::new_for_insert(
            format!("Product {}", short_id()),
            None,
        );
        catalog::insert(&product).await.expect("insert product");
        let line = OrderLine::new(
            order.base.id,
            product.base.id,
            format!("SKU-{}", short_id()),
            *quantity,
        );
        store_orders::insert_line(&line).await.expect("insert line");
        lines.push(line);
    }
    (order, lines)
}

pub fn submission_info_node(
    submission_id: &str,
    feed_type: &str,
    submitted: DateTime<Utc>,
    status: &str,
) -> XmlNode {
    XmlNode::new("FeedSubmissionInfo")
        .with_child(XmlNode::elem("FeedSubmissionId", submission_id))
        .with_child(XmlNode::elem("FeedType", feed_type))
        .with_child(XmlNode::elem("SubmittedDate", submitted.to_rfc3339()))
        .with_child(XmlNode::elem("FeedProcessingStatus", status))
}

pub fn submit_feed_response(
    submission_id: &str,
    feed_type: &str,
    submitted: DateTime<Utc>,
) -> XmlNode {
    XmlNode::new("SubmitFeedResponse").with_child(
        XmlNode::new("SubmitFeedResult").with_child(submission_info_node(
            submission_id,
            feed_type,
            submitted,
            "_SUBMITTED_",
        )),
    )
}

pub fn submission_list_response(infos: Vec<XmlNode>, has_next: bool) -> XmlNode {
    let mut result = XmlNode::new("GetFeedSubmissionListResult").with_child(XmlNode::elem(
        "HasNext",
        if has_next { "true" } else { "false" },
    ));
    for info in infos {
        result.push(info);
    }
    XmlNode::new("GetFeedSubmissionListResponse").with_child(result)
}
