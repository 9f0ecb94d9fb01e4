use std::sync::Arc;

use contracts::domain::a005_fulfillment_order::aggregate::{
    FulfillmentOrder, FulfillmentOrderLine,
};
use contracts::domain::a007_store_order::aggregate::{
    OrderLine, ShippingAddressId, StoreOrder,
};
use contracts::usecases::u502_fulfillment_sync::response::CreateFulfillmentResult;
use uuid::Uuid;

use crate::domain::a005_fulfillment_order::repository as fulfillment_orders;
use crate::domain::a007_store_order::repository as store_orders;
use crate::shared::config::Config;

use super::adapters::{fulfillment_ids, order_item_id, per_unit_declared_value};
use super::finders::MerchantFinder;

/// Fans a store order out into unsubmitted fulfillment orders, one per
/// distinct destination address. A failure on one address is recorded
/// and never blocks the others.
pub struct FulfillmentOrderCreator {
    finder: Arc<dyn MerchantFinder>,
    shipping_speed: String,
    currency_code: String,
}

impl FulfillmentOrderCreator {
    pub fn new(finder: Arc<dyn MerchantFinder>, config: &Config) -> Self {
        Self {
            finder,
            shipping_speed: config.mws.default_shipping_speed.clone(),
            currency_code: config.mws.default_currency.clone(),
        }
    }

    pub async fn create_fulfillment_orders(
        &self,
        order: &StoreOrder,
    ) -> anyhow::Result<CreateFulfillmentResult> {
        let lines = store_orders::list_lines(order.base.id).await?;
        let groups = group_lines_by_address(order, &lines);
        let ids = fulfillment_ids(&order.number, groups.len());

        let mut result = CreateFulfillmentResult::default();
        for ((address, group), fulfillment_id) in groups.into_iter().zip(ids) {
            let Some(address_id) = address else {
                result.errors.insert(
                    fulfillment_id,
                    "no shipping address is known for these lines".into(),
                );
                continue;
            };
            let Some(address) = store_orders::get_address(address_id).await? else {
                result.errors.insert(
                    fulfillment_id,
                    "shipping address could not be loaded".into(),
                );
                continue;
            };

            let merchant = match self.finder.find(order, &address, &group).await {
                Ok(merchant) => merchant,
                Err(e) => {
                    result.errors.insert(fulfillment_id, format!("{:#}", e));
                    continue;
                }
            };

            if fulfillment_orders::exists(&fulfillment_id, order.base.id, merchant.base.id).await? {
                if let Some(existing) =
                    fulfillment_orders::get_by_fulfillment_id(&fulfillment_id).await?
                {
                    result.orders.push(existing);
                }
                result
                    .errors
                    .insert(fulfillment_id, "Order already created.".into());
                continue;
            }

            let fulfillment_order = FulfillmentOrder::new_for_insert(
                fulfillment_id,
                order.base.id,
                merchant.base.id,
                address_id,
                self.shipping_speed.clone(),
                None,
            );
            fulfillment_orders::insert(&fulfillment_order).await?;
            for line in &group {
                let item = FulfillmentOrderLine {
                    id: Uuid::new_v4(),
                    fulfillment_order: fulfillment_order.base.id,
                    order_line: line.id,
                    order_item_id: order_item_id(line),
                    quantity: line.quantity,
                    comment: None,
                    price_incl_tax: per_unit_declared_value(line),
                    price_currency: Some(self.currency_code.clone()),
                    shipment: None,
                    package: None,
                };
                fulfillment_orders::insert_line(&item).await?;
            }
            result.orders.push(fulfillment_order);
        }
        Ok(result)
    }
}

/// Group lines by their effective destination, preserving first-seen
/// order so the derived fulfillment IDs stay deterministic
fn group_lines_by_address(
    order: &StoreOrder,
    lines: &[OrderLine],
) -> Vec<(Option<ShippingAddressId>, Vec<OrderLine>)> {
    let mut groups: Vec<(Option<ShippingAddressId>, Vec<OrderLine>)> = Vec::new();
    for line in lines {
        let address = line.shipping_address.or(order.shipping_address);
        match groups.iter_mut().find(|(a, _)| *a == address) {
            Some((_, group)) => group.push(line.clone()),
            None => groups.push((address, vec![line.clone()])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use contracts::domain::a001_merchant_account::aggregate::MerchantAccount;
    use contracts::domain::a006_catalog_product::aggregate::CatalogProductId;
    use contracts::domain::a005_fulfillment_order::aggregate::FulfillmentStatus;
    use contracts::domain::a007_store_order::aggregate::ShippingAddress;

    use crate::shared::config::{Config, DatabaseConfig, MwsConfig};
    use crate::test_support::{
        init_test_db, run, seeded_address, seeded_merchant, seeded_order, short_id,
    };

    struct FixedMerchantFinder(MerchantAccount);

    #[async_trait]
    impl MerchantFinder for FixedMerchantFinder {
        async fn find(
            &self,
            _order: &StoreOrder,
            _address: &ShippingAddress,
            _lines: &[OrderLine],
        ) -> anyhow::Result<MerchantAccount> {
            Ok(self.0.clone())
        }
    }

    struct FailingFinder;

    #[async_trait]
    impl MerchantFinder for FailingFinder {
        async fn find(
            &self,
            _order: &StoreOrder,
            _address: &ShippingAddress,
            _lines: &[OrderLine],
        ) -> anyhow::Result<MerchantAccount> {
            Err(anyhow::anyhow!("no merchant handles this destination"))
        }
    }

    /// Resolves every destination except the named country
    struct CountryBoundFinder {
        merchant: MerchantAccount,
        excluded_country: String,
    }

    #[async_trait]
    impl MerchantFinder for CountryBoundFinder {
        async fn find(
            &self,
            _order: &StoreOrder,
            address: &ShippingAddress,
            _lines: &[OrderLine],
        ) -> anyhow::Result<MerchantAccount> {
            if address.country_code == self.excluded_country {
                return Err(anyhow::anyhow!(
                    "no merchant handles destinations in {}",
                    self.excluded_country
                ));
            }
            Ok(self.merchant.clone())
        }
    }

    fn test_config() -> Config {
        Config {
            database: DatabaseConfig {
                path: "unused".into(),
            },
            mws: MwsConfig::default(),
        }
    }

    fn creator(finder: Arc<dyn MerchantFinder>) -> FulfillmentOrderCreator {
        FulfillmentOrderCreator::new(finder, &test_config())
    }

    #[test]
    fn single_destination_gets_the_plain_order_number() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let (order, lines) = seeded_order(&[2, 1]).await;

            let creator = creator(Arc::new(FixedMerchantFinder(merchant)));
            let result = creator.create_fulfillment_orders(&order).await.unwrap();
            assert!(result.errors.is_empty());
            assert_eq!(result.orders.len(), 1);
            assert_eq!(result.orders[0].fulfillment_id, order.number);
            assert_eq!(result.orders[0].status, FulfillmentStatus::Unsubmitted);

            let stored = fulfillment_orders::list_lines(result.orders[0].base.id)
                .await
                .unwrap();
            assert_eq!(stored.len(), lines.len());
        });
    }

    #[test]
    fn multiple_destinations_get_numbered_suffixes() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let first_address = seeded_address().await;
            let second_address = seeded_address().await;
            let mut order = StoreOrder::new_for_insert(format!("2{}", short_id()), None);
            order.shipping_address = Some(first_address.id);
            store_orders::insert(&order).await.unwrap();
            let plain = OrderLine::new(order.base.id, CatalogProductId::new_v4(), "SKU-A".into(), 1);
            let mut routed =
                OrderLine::new(order.base.id, CatalogProductId::new_v4(), "SKU-B".into(), 1);
            routed.shipping_address = Some(second_address.id);
            store_orders::insert_line(&plain).await.unwrap();
            store_orders::insert_line(&routed).await.unwrap();

            let creator = creator(Arc::new(FixedMerchantFinder(merchant)));
            let result = creator.create_fulfillment_orders(&order).await.unwrap();
            assert!(result.errors.is_empty());
            let mut ids: Vec<String> = result
                .orders
                .iter()
                .map(|o| o.fulfillment_id.clone())
                .collect();
            ids.sort();
            assert_eq!(
                ids,
                vec![
                    format!("{}-001", order.number),
                    format!("{}-002", order.number),
                ]
            );
        });
    }

    #[test]
    fn duplicate_creation_reports_but_returns_the_existing_order() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let (order, _) = seeded_order(&[1]).await;

            let creator = creator(Arc::new(FixedMerchantFinder(merchant)));
            let first = creator.create_fulfillment_orders(&order).await.unwrap();
            assert!(first.errors.is_empty());

            let second = creator.create_fulfillment_orders(&order).await.unwrap();
            assert_eq!(second.orders.len(), 1);
            assert_eq!(second.orders[0].base.id, first.orders[0].base.id);
            assert_eq!(
                second.errors.get(&order.number).map(String::as_str),
                Some("Order already created.")
            );
        });
    }

    #[test]
    fn one_unroutable_address_never_blocks_the_other() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let routable = seeded_address().await;
            let unroutable = ShippingAddress::new(
                "Sam Doe".into(),
                "5 Pine Rd".into(),
                "Portland".into(),
                "97201".into(),
                "US".into(),
            );
            store_orders::insert_address(&unroutable).await.unwrap();

            let mut order = StoreOrder::new_for_insert(format!("4{}", short_id()), None);
            order.shipping_address = Some(routable.id);
            store_orders::insert(&order).await.unwrap();
            let plain = OrderLine::new(order.base.id, CatalogProductId::new_v4(), "SKU-A".into(), 1);
            let mut exported =
                OrderLine::new(order.base.id, CatalogProductId::new_v4(), "SKU-B".into(), 1);
            exported.shipping_address = Some(unroutable.id);
            store_orders::insert_line(&plain).await.unwrap();
            store_orders::insert_line(&exported).await.unwrap();

            let creator = creator(Arc::new(CountryBoundFinder {
                merchant,
                excluded_country: "US".into(),
            }));
            let result = creator.create_fulfillment_orders(&order).await.unwrap();
            assert_eq!(result.orders.len(), 1);
            assert_eq!(result.errors.len(), 1);
            let failed_id = result.errors.keys().next().unwrap();
            assert!(failed_id.starts_with(&order.number));
            assert_ne!(failed_id, &result.orders[0].fulfillment_id);
        });
    }

    #[test]
    fn finder_failure_is_recorded_without_creating_anything() {
        run(async {
            init_test_db().await;
            let (order, _) = seeded_order(&[1]).await;

            let creator = creator(Arc::new(FailingFinder));
            let result = creator.create_fulfillment_orders(&order).await.unwrap();
            assert!(result.orders.is_empty());
            let message = result.errors.get(&order.number).expect("error recorded");
            assert!(message.contains("no merchant handles this destination"));
        });
    }

    #[test]
    fn grouping_preserves_first_seen_address_order() {
        let mut order = StoreOrder::new_for_insert("10042".into(), None);
        let default_address = ShippingAddressId::new_v4();
        order.shipping_address = Some(default_address);
        let other_address = ShippingAddressId::new_v4();

        let mut first = OrderLine::new(
            order.base.id,
            CatalogProductId::new_v4(),
            "SKU-A".into(),
            1,
        );
        first.shipping_address = Some(other_address);
        let second = OrderLine::new(
            order.base.id,
            CatalogProductId::new_v4(),
            "SKU-B".into(),
            2,
        );
        let mut third = OrderLine::new(
            order.base.id,
            CatalogProductId::new_v4(),
            "SKU-C".into(),
            3,
        );
        third.shipping_address = Some(other_address);

        let groups = group_lines_by_address(&order, &[first, second, third]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, Some(other_address));
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, Some(default_address));
        assert_eq!(groups[1].1.len(), 1);
    }
}
