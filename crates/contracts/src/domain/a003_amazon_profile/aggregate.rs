use crate::domain::a002_amazon_marketplace::aggregate::AmazonMarketplaceId;
use crate::domain::a006_catalog_product::aggregate::CatalogProductId;
use crate::domain::common::{AggregateId, BaseAggregate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AmazonProfileId(pub Uuid);

impl AmazonProfileId {
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

impl AggregateId for AmazonProfileId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(AmazonProfileId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

/// Who packs and ships the product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentBy {
    #[serde(rename = "AFN")]
    Amazon,
    #[serde(rename = "MFN")]
    Merchant,
}

impl FulfillmentBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amazon => "AFN",
            Self::Merchant => "MFN",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "AFN" => Some(Self::Amazon),
            "MFN" => Some(Self::Merchant),
            _ => None,
        }
    }
}

impl Default for FulfillmentBy {
    fn default() -> Self {
        Self::Merchant
    }
}

/// Amazon-specific augmentation of a catalog product. One profile per
/// product; the SKU is the stable cross-system key, the ASIN arrives
/// asynchronously after a catalog lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmazonProfile {
    #[serde(flatten)]
    pub base: BaseAggregate<AmazonProfileId>,

    pub product: CatalogProductId,
    /// Seller SKU, unique per seller
    pub sku: String,
    /// Populated once the product has round-tripped through Amazon
    pub asin: Option<String>,
    pub product_tax_code: Option<String>,
    /// When the product becomes searchable
    pub launch_date: Option<chrono::DateTime<chrono::Utc>>,
    /// When the product becomes buyable
    pub release_date: Option<chrono::DateTime<chrono::Utc>>,
    pub item_package_quantity: Option<i32>,
    pub number_of_items: Option<i32>,
    pub fulfillment_by: FulfillmentBy,
    /// Marketplaces this product is listed on
    pub marketplaces: Vec<AmazonMarketplaceId>,
}

impl AmazonProfile {
    pub fn new_for_insert(product: CatalogProductId, sku: String) -> Self {
        Self {
            base: BaseAggregate::new(AmazonProfileId::new_v4(), String::new(), sku.clone()),
            product,
            sku,
            asin: None,
            product_tax_code: None,
            launch_date: None,
            release_date: None,
            item_package_quantity: None,
            number_of_items: None,
            fulfillment_by: FulfillmentBy::default(),
            marketplaces: Vec::new(),
        }
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}
