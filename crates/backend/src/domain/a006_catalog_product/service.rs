use contracts::domain::a006_catalog_product::aggregate::StockRecord;

use super::repository;

/// Apply an Amazon-reported supply quantity to a stock record. The
/// reported figure is already net of the network's own reservations,
/// so the local allocation counter is reset rather than kept.
pub async fn set_amazon_supply_quantity(
    record: &mut StockRecord,
    quantity: i32,
    commit: bool,
) -> anyhow::Result<()> {
    record.num_in_stock = quantity;
    record.num_allocated = 0;
    if commit {
        repository::update_stock_record(record).await?;
    }
    Ok(())
}
