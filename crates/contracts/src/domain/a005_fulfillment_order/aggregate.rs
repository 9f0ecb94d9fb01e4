use crate::domain::a001_merchant_account::aggregate::MerchantAccountId;
use crate::domain::a007_store_order::aggregate::{OrderLineId, ShippingAddressId, StoreOrderId};
use crate::domain::common::{AggregateId, BaseAggregate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FulfillmentOrderId(pub Uuid);

impl FulfillmentOrderId {
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

impl AggregateId for FulfillmentOrderId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(FulfillmentOrderId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

/// Local lifecycle status of a fulfillment order. Before a successful
/// submission the order moves through the local states; afterwards it
/// mirrors Amazon's own status vocabulary, carried raw so unknown
/// statuses survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    Unsubmitted,
    SubmissionFailed,
    Submitted,
    Received,
    Invalid,
    Planning,
    Processing,
    Cancelled,
    Complete,
    CompletePartialled,
    Unfulfillable,
    Other(String),
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unsubmitted => "UNSUBMITTED",
            Self::SubmissionFailed => "SUBMISSION_FAILED",
            Self::Submitted => "SUBMITTED",
            Self::Received => "RECEIVED",
            Self::Invalid => "INVALID",
            Self::Planning => "PLANNING",
            Self::Processing => "PROCESSING",
            Self::Cancelled => "CANCELLED",
            Self::Complete => "COMPLETE",
            Self::CompletePartialled => "COMPLETEPARTIALLED",
            Self::Unfulfillable => "UNFULFILLABLE",
            Self::Other(raw) => raw,
        }
    }

    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "UNSUBMITTED" => Self::Unsubmitted,
            "SUBMISSION_FAILED" => Self::SubmissionFailed,
            "SUBMITTED" => Self::Submitted,
            "RECEIVED" => Self::Received,
            "INVALID" => Self::Invalid,
            "PLANNING" => Self::Planning,
            "PROCESSING" => Self::Processing,
            "CANCELLED" => Self::Cancelled,
            "COMPLETE" => Self::Complete,
            "COMPLETEPARTIALLED" => Self::CompletePartialled,
            "UNFULFILLABLE" => Self::Unfulfillable,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Default for FulfillmentStatus {
    fn default() -> Self {
        Self::Unsubmitted
    }
}

/// One outbound-shipment request to Amazon, scoped to a single
/// destination address. A store order fans out into one fulfillment
/// order per distinct shipping address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentOrder {
    #[serde(flatten)]
    pub base: BaseAggregate<FulfillmentOrderId>,

    /// Deterministic external ID: the order number, suffixed with a
    /// 3-digit 1-based sequence when the order ships to several
    /// addresses
    pub fulfillment_id: String,
    pub order: StoreOrderId,
    pub merchant: MerchantAccountId,
    pub shipping_address: ShippingAddressId,
    pub status: FulfillmentStatus,
    pub shipping_speed: String,
    pub date_updated: chrono::DateTime<chrono::Utc>,
}

impl FulfillmentOrder {
    pub fn new_for_insert(
        fulfillment_id: String,
        order: StoreOrderId,
        merchant: MerchantAccountId,
        shipping_address: ShippingAddressId,
        shipping_speed: String,
        comment: Option<String>,
    ) -> Self {
        let description = format!("Outbound shipment {}", fulfillment_id);
        let mut base =
            BaseAggregate::new(FulfillmentOrderId::new_v4(), String::new(), description);
        base.comment = comment;
        Self {
            base,
            fulfillment_id,
            order,
            merchant,
            shipping_address,
            status: FulfillmentStatus::Unsubmitted,
            shipping_speed,
            date_updated: chrono::Utc::now(),
        }
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

/// One-to-one companion of a store order line; picks up shipment and
/// package assignments as Amazon reports them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentOrderLine {
    pub id: Uuid,
    pub fulfillment_order: FulfillmentOrderId,
    pub order_line: OrderLineId,
    /// Externally visible item identifier (line reference or SKU)
    pub order_item_id: String,
    pub quantity: i32,
    pub comment: Option<String>,
    pub price_incl_tax: Option<Decimal>,
    pub price_currency: Option<String>,
    pub shipment: Option<Uuid>,
    pub package: Option<Uuid>,
}

/// One physical shipment Amazon reports against a fulfillment order.
/// `shipment_id` is the natural key for upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentShipment {
    pub id: Uuid,
    pub shipment_id: String,
    pub order: StoreOrderId,
    pub status: String,
    pub fulfillment_center_id: String,
    pub date_estimated_arrival: Option<chrono::DateTime<chrono::Utc>>,
    pub date_shipped: Option<chrono::DateTime<chrono::Utc>>,
}

/// Package within a shipment, keyed by `(shipment, package_number)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentPackage {
    pub id: Uuid,
    pub shipment: Uuid,
    pub package_number: i32,
    pub tracking_number: String,
    pub carrier_code: String,
}
