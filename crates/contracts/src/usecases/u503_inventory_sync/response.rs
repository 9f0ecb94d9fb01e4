use serde::{Deserialize, Serialize};

/// Counters describing one inventory reconciliation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryUpdateSummary {
    pub total_products: usize,
    pub skipped_no_seller: usize,
    pub skipped_bad_quantity: usize,
    pub created_stock_records: usize,
    pub updated: usize,
}
