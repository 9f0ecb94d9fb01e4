use crate::domain::a007_store_order::aggregate::{OrderLineId, StoreOrderId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order-level shipping event raised when a shipment's status moves.
/// Exactly one event is created per reported shipment transition; the
/// per-line quantities hang off it as separate rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingEvent {
    pub id: Uuid,
    pub order: StoreOrderId,
    /// Event type name, taken from the reported shipment status
    pub event_type: String,
    pub notes: Option<String>,
    pub date_created: chrono::DateTime<chrono::Utc>,
}

impl ShippingEvent {
    pub fn new(order: StoreOrderId, event_type: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            order,
            event_type,
            notes: None,
            date_created: chrono::Utc::now(),
        }
    }
}

/// Quantity of one order line covered by a shipping event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingEventQuantity {
    pub id: Uuid,
    pub event: Uuid,
    pub order_line: OrderLineId,
    pub quantity: i32,
}
