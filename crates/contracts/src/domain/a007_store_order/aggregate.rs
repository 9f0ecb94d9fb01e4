use crate::domain::a006_catalog_product::aggregate::CatalogProductId;
use crate::domain::common::{AggregateId, BaseAggregate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreOrderId(pub Uuid);

impl StoreOrderId {
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

impl AggregateId for StoreOrderId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(StoreOrderId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLineId(pub Uuid);

impl OrderLineId {
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

impl AggregateId for OrderLineId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(OrderLineId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShippingAddressId(pub Uuid);

impl ShippingAddressId {
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

impl AggregateId for ShippingAddressId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(ShippingAddressId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

/// Store order, the collaborator the fulfillment reconciler fans out
/// from. `code` on the base carries the order number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreOrder {
    #[serde(flatten)]
    pub base: BaseAggregate<StoreOrderId>,

    pub number: String,
    pub email: Option<String>,
    pub date_placed: chrono::DateTime<chrono::Utc>,
    /// Default destination for lines without an explicit address
    pub shipping_address: Option<ShippingAddressId>,
}

impl StoreOrder {
    pub fn new_for_insert(number: String, email: Option<String>) -> Self {
        let description = format!("Order #{}", number);
        Self {
            base: BaseAggregate::new(StoreOrderId::new_v4(), number.clone(), description),
            number,
            email,
            date_placed: chrono::Utc::now(),
            shipping_address: None,
        }
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

/// One order line. The partner SKU doubles as the externally visible
/// item identifier unless a line reference overrides it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order: StoreOrderId,
    pub product: CatalogProductId,
    pub partner_sku: String,
    pub partner_line_reference: Option<String>,
    pub quantity: i32,
    pub unit_price_incl_tax: Option<Decimal>,
    pub line_price_incl_tax: Option<Decimal>,
    /// Per-line destination override; falls back to the order's address
    pub shipping_address: Option<ShippingAddressId>,
}

impl OrderLine {
    pub fn new(
        order: StoreOrderId,
        product: CatalogProductId,
        partner_sku: String,
        quantity: i32,
    ) -> Self {
        Self {
            id: OrderLineId::new_v4(),
            order,
            product,
            partner_sku,
            partner_line_reference: None,
            quantity,
            unit_price_incl_tax: None,
            line_price_incl_tax: None,
            shipping_address: None,
        }
    }
}

/// Destination address snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub id: ShippingAddressId,
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub line3: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postcode: String,
    pub country_code: String,
}

impl ShippingAddress {
    pub fn new(name: String, line1: String, city: String, postcode: String, country_code: String) -> Self {
        Self {
            id: ShippingAddressId::new_v4(),
            name,
            line1,
            line2: None,
            line3: None,
            city,
            state: None,
            postcode,
            country_code,
        }
    }
}
