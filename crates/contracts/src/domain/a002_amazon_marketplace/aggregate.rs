use crate::domain::a001_merchant_account::aggregate::MerchantAccountId;
use crate::domain::common::{AggregateId, BaseAggregate};
use crate::enums::Region;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AmazonMarketplaceId(pub Uuid);

impl AmazonMarketplaceId {
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

impl AggregateId for AmazonMarketplaceId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(AmazonMarketplaceId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

/// One Amazon storefront a merchant participates in. Natural key for
/// reconciliation is `(marketplace_id, merchant)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmazonMarketplace {
    #[serde(flatten)]
    pub base: BaseAggregate<AmazonMarketplaceId>,

    /// Marketplace ID assigned by Amazon (e.g. "ATVPDKIKX0DER")
    pub marketplace_id: String,
    pub merchant: MerchantAccountId,
    pub region: Region,
    pub domain_name: String,
    pub currency_code: String,
}

impl AmazonMarketplace {
    pub fn new_for_insert(
        marketplace_id: String,
        merchant: MerchantAccountId,
        name: String,
    ) -> Self {
        Self {
            base: BaseAggregate::new(AmazonMarketplaceId::new_v4(), String::new(), name),
            marketplace_id,
            merchant,
            region: Region::default(),
            domain_name: String::new(),
            currency_code: String::new(),
        }
    }

    /// Fulfillment-network tag for this marketplace's region
    pub fn fulfillment_center_id(&self) -> &'static str {
        self.region.fulfillment_center()
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}
