use std::collections::HashMap;
use std::sync::Arc;

use contracts::domain::a006_catalog_product::aggregate::{CatalogProduct, StockRecord};
use contracts::usecases::u503_inventory_sync::response::InventoryUpdateSummary;
use uuid::Uuid;

use crate::domain::a001_merchant_account::repository as merchants;
use crate::domain::a002_amazon_marketplace::repository as marketplaces;
use crate::domain::a003_amazon_profile::repository as profiles;
use crate::domain::a006_catalog_product::repository as catalog;
use crate::domain::a006_catalog_product::service as stock;
use crate::shared::mws::ConnectionRegistry;

/// Pulls fulfillable quantities from the vendor and applies them to
/// local stock records
pub struct InventoryGateway {
    registry: Arc<ConnectionRegistry>,
}

impl InventoryGateway {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Reconcile supply quantities for the given products. Products
    /// whose profile cannot be routed to a merchant are skipped with a
    /// warning; so are unparseable reported quantities.
    pub async fn update_inventory(
        &self,
        products: &[CatalogProduct],
    ) -> anyhow::Result<InventoryUpdateSummary> {
        let mut summary = InventoryUpdateSummary {
            total_products: products.len(),
            ..Default::default()
        };

        // SKUs grouped by the merchant that lists them
        let mut by_merchant: HashMap<Uuid, Vec<String>> = HashMap::new();
        for product in products {
            let Some(profile) = profiles::get_by_product(product.base.id).await? else {
                tracing::warn!(
                    "Product {} has no profile, skipped from inventory update",
                    product.title()
                );
                summary.skipped_no_seller += 1;
                continue;
            };
            let Some(merchant_id) = self.merchant_for_profile_marketplaces(&profile.marketplaces).await?
            else {
                tracing::warn!(
                    "No merchant is known for SKU {}, skipped from inventory update",
                    profile.sku
                );
                summary.skipped_no_seller += 1;
                continue;
            };
            by_merchant.entry(merchant_id).or_default().push(profile.sku);
        }

        for (merchant_id, skus) in by_merchant {
            let Some(merchant) = merchants::get_by_id(merchant_id).await? else {
                summary.skipped_no_seller += skus.len();
                continue;
            };
            let api = self.registry.get(&merchant);
            let response = api.list_inventory_supply(&skus).await?;
            let Some(supply_list) = response.find_first("InventorySupplyList") else {
                continue;
            };
            for member in supply_list.members() {
                let Some(sku) = member.child_text("SellerSKU") else { continue };
                let Some(quantity) = member
                    .child_text("InStockSupplyQuantity")
                    .and_then(|v| v.parse::<i32>().ok())
                else {
                    tracing::warn!("Reported quantity for SKU {} is not a number, skipped", sku);
                    summary.skipped_bad_quantity += 1;
                    continue;
                };
                let Some(profile) = profiles::get_by_sku(sku).await? else { continue };

                let mut record = match catalog::get_stock_record(
                    profile.product,
                    merchant.base.id,
                )
                .await?
                {
                    Some(existing) => existing,
                    None => {
                        let fresh = StockRecord::new(
                            profile.product,
                            Some(merchant.base.id),
                            profile.sku.clone(),
                        );
                        catalog::insert_stock_record(&fresh).await?;
                        summary.created_stock_records += 1;
                        fresh
                    }
                };
                stock::set_amazon_supply_quantity(&mut record, quantity, true).await?;
                summary.updated += 1;
            }
        }
        tracing::info!(
            "Inventory update finished: {} updated, {} created, {} skipped",
            summary.updated,
            summary.created_stock_records,
            summary.skipped_no_seller + summary.skipped_bad_quantity
        );
        Ok(summary)
    }

    /// Merchant behind the first resolvable marketplace of a profile
    async fn merchant_for_profile_marketplaces(
        &self,
        marketplace_ids: &[contracts::domain::a002_amazon_marketplace::aggregate::AmazonMarketplaceId],
    ) -> anyhow::Result<Option<Uuid>> {
        for id in marketplace_ids {
            if let Some(marketplace) = marketplaces::get_by_id(id.value()).await? {
                return Ok(Some(marketplace.merchant.value()));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::mws::XmlNode;
    use crate::test_support::{
        init_test_db, registry_with, run, seeded_marketplace, seeded_merchant,
        seeded_product_with_profile, MockMwsApi,
    };

    fn supply_response(rows: &[(&str, &str)]) -> XmlNode {
        let mut list = XmlNode::new("InventorySupplyList");
        for (sku, quantity) in rows {
            list.push(
                XmlNode::new("member")
                    .with_child(XmlNode::elem("SellerSKU", *sku))
                    .with_child(XmlNode::elem("InStockSupplyQuantity", *quantity)),
            );
        }
        XmlNode::new("ListInventorySupplyResponse")
            .with_child(XmlNode::new("ListInventorySupplyResult").with_child(list))
    }

    #[test]
    fn reported_supply_lands_on_a_fresh_stock_record() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let marketplace = seeded_marketplace(&merchant).await;
            let (product, profile) = seeded_product_with_profile(Some(&marketplace)).await;

            let mock = MockMwsApi::new();
            mock.queue(supply_response(&[(&profile.sku, "42")]));
            let gateway = InventoryGateway::new(registry_with(mock));
            let summary = gateway.update_inventory(&[product.clone()]).await.unwrap();
            assert_eq!(summary.updated, 1);
            assert_eq!(summary.created_stock_records, 1);
            assert_eq!(summary.skipped_no_seller, 0);

            let record = catalog::get_stock_record(product.base.id, merchant.base.id)
                .await
                .unwrap()
                .expect("stock record");
            assert_eq!(record.num_in_stock, 42);
            assert_eq!(record.num_allocated, 0);
        });
    }

    #[test]
    fn unparseable_quantity_is_skipped() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let marketplace = seeded_marketplace(&merchant).await;
            let (product, profile) = seeded_product_with_profile(Some(&marketplace)).await;

            let mock = MockMwsApi::new();
            mock.queue(supply_response(&[(&profile.sku, "not-a-number")]));
            let gateway = InventoryGateway::new(registry_with(mock));
            let summary = gateway.update_inventory(&[product.clone()]).await.unwrap();
            assert_eq!(summary.updated, 0);
            assert_eq!(summary.skipped_bad_quantity, 1);
            assert!(catalog::get_stock_record(product.base.id, merchant.base.id)
                .await
                .unwrap()
                .is_none());
        });
    }

    #[test]
    fn product_without_a_profile_never_reaches_the_api() {
        run(async {
            init_test_db().await;
            let product = CatalogProduct::new_for_insert("Unlisted product".into(), None);
            catalog::insert(&product).await.unwrap();

            let mock = MockMwsApi::new();
            let gateway = InventoryGateway::new(registry_with(mock.clone()));
            let summary = gateway.update_inventory(&[product]).await.unwrap();
            assert_eq!(summary.total_products, 1);
            assert_eq!(summary.skipped_no_seller, 1);
            assert_eq!(summary.updated, 0);
            assert!(mock.calls().is_empty());
        });
    }
}
