use crate::domain::a001_merchant_account::aggregate::MerchantAccountId;
use crate::domain::common::{AggregateId, BaseAggregate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogProductId(pub Uuid);

impl CatalogProductId {
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

impl AggregateId for CatalogProductId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(CatalogProductId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

/// Store catalog product. Only the fields the feed export and the
/// reconcilers actually read are modelled here; `description` on the
/// base carries the product title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    #[serde(flatten)]
    pub base: BaseAggregate<CatalogProductId>,

    pub upc: Option<String>,
    pub brand: Option<String>,
}

impl CatalogProduct {
    pub fn new_for_insert(title: String, upc: Option<String>) -> Self {
        Self {
            base: BaseAggregate::new(CatalogProductId::new_v4(), String::new(), title),
            upc,
            brand: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.base.description
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

/// Authoritative available-quantity record for a product/partner pair.
/// The inventory reconciler updates these and creates missing ones
/// when a merchant/product pairing is discovered without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: Uuid,
    pub product: CatalogProductId,
    pub merchant: Option<MerchantAccountId>,
    pub partner_sku: String,
    pub num_in_stock: i32,
    pub num_allocated: i32,
}

impl StockRecord {
    pub fn new(
        product: CatalogProductId,
        merchant: Option<MerchantAccountId>,
        partner_sku: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product,
            merchant,
            partner_sku,
            num_in_stock: 0,
            num_allocated: 0,
        }
    }
}
