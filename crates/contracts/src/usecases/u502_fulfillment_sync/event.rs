use crate::domain::a005_fulfillment_order::aggregate::FulfillmentOrder;
use serde::{Deserialize, Serialize};

/// Broadcast to subscribers after a fulfillment order was accepted by
/// the vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentCreated {
    pub fulfillment_order: FulfillmentOrder,
}
