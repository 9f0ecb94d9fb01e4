use crate::domain::a005_fulfillment_order::aggregate::FulfillmentOrder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of fanning one store order out into fulfillment orders.
/// Errors are keyed by fulfillment ID so a partial failure on one
/// address never hides the orders created for the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFulfillmentResult {
    pub orders: Vec<FulfillmentOrder>,
    pub errors: HashMap<String, String>,
}
