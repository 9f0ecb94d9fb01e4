use std::sync::Arc;

use contracts::domain::a001_merchant_account::aggregate::MerchantAccount;
use contracts::domain::a002_amazon_marketplace::aggregate::AmazonMarketplace;
use contracts::enums::Region;

use crate::domain::a002_amazon_marketplace::repository as marketplaces;
use crate::shared::mws::ConnectionRegistry;

/// Mirrors the marketplaces a merchant participates in into local
/// records
pub struct SellersGateway {
    registry: Arc<ConnectionRegistry>,
}

impl SellersGateway {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Upsert marketplace participations by the `(marketplace_id,
    /// merchant)` natural key and return the current set
    pub async fn update_marketplaces(
        &self,
        merchant: &MerchantAccount,
    ) -> anyhow::Result<Vec<AmazonMarketplace>> {
        let api = self.registry.get(merchant);
        let response = api.list_marketplace_participations().await?;

        let mut current = Vec::new();
        let Some(listed) = response.find_first("ListMarketplaces") else {
            tracing::warn!(
                "Participation listing for seller {} has no marketplaces",
                merchant.seller_id
            );
            return Ok(current);
        };
        for node in listed.children_named("Marketplace") {
            let Some(marketplace_id) = node.child_text("MarketplaceId") else { continue };
            let name = node.child_text("Name").unwrap_or_default().to_string();
            let domain_name = node.child_text("DomainName").unwrap_or_default().to_string();
            let currency_code = node
                .child_text("DefaultCurrencyCode")
                .unwrap_or_default()
                .to_string();
            let region = node
                .child_text("DefaultCountryCode")
                .and_then(Region::from_code)
                .unwrap_or(merchant.region);

            let marketplace = match marketplaces::get_by_natural_key(
                marketplace_id,
                merchant.base.id,
            )
            .await?
            {
                Some(mut existing) => {
                    existing.base.description = name;
                    existing.region = region;
                    existing.domain_name = domain_name;
                    existing.currency_code = currency_code;
                    existing.before_write();
                    marketplaces::update(&existing).await?;
                    existing
                }
                None => {
                    let mut fresh = AmazonMarketplace::new_for_insert(
                        marketplace_id.to_string(),
                        merchant.base.id,
                        name,
                    );
                    fresh.region = region;
                    fresh.domain_name = domain_name;
                    fresh.currency_code = currency_code;
                    marketplaces::insert(&fresh).await?;
                    fresh
                }
            };
            current.push(marketplace);
        }
        tracing::info!(
            "Marketplace sync for seller {} finished with {} participations",
            merchant.seller_id,
            current.len()
        );
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::mws::XmlNode;
    use crate::test_support::{init_test_db, registry_with, run, seeded_merchant, MockMwsApi};

    fn participation_response(marketplace_id: &str, name: &str) -> XmlNode {
        XmlNode::new("ListMarketplaceParticipationsResponse").with_child(
            XmlNode::new("ListMarketplaceParticipationsResult").with_child(
                XmlNode::new("ListMarketplaces").with_child(
                    XmlNode::new("Marketplace")
                        .with_child(XmlNode::elem("MarketplaceId", marketplace_id))
                        .with_child(XmlNode::elem("Name", name))
                        .with_child(XmlNode::elem("DomainName", "www.amazon.de"))
                        .with_child(XmlNode::elem("DefaultCurrencyCode", "EUR"))
                        .with_child(XmlNode::elem("DefaultCountryCode", "DE")),
                ),
            ),
        )
    }

    #[test]
    fn participations_upsert_by_marketplace_and_merchant() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let marketplace_id = format!("A1PA6795UKMFR9-{}", merchant.seller_id);

            let mock = MockMwsApi::new();
            mock.queue(participation_response(&marketplace_id, "Amazon.de"));
            mock.queue(participation_response(&marketplace_id, "Amazon Germany"));

            let gateway = SellersGateway::new(registry_with(mock));
            let first = gateway.update_marketplaces(&merchant).await.unwrap();
            assert_eq!(first.len(), 1);
            assert_eq!(first[0].base.description, "Amazon.de");
            assert_eq!(first[0].region, Region::De);
            assert_eq!(first[0].currency_code, "EUR");

            // Renamed participation updates the existing row in place
            let second = gateway.update_marketplaces(&merchant).await.unwrap();
            assert_eq!(second.len(), 1);
            assert_eq!(second[0].base.id, first[0].base.id);
            assert_eq!(second[0].base.description, "Amazon Germany");

            let stored = marketplaces::list_by_merchant(merchant.base.id).await.unwrap();
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].domain_name, "www.amazon.de");
        });
    }

    #[test]
    fn empty_participation_listing_yields_nothing() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let mock = MockMwsApi::new();
            mock.queue(XmlNode::new("ListMarketplaceParticipationsResponse"));
            let gateway = SellersGateway::new(registry_with(mock));
            let current = gateway.update_marketplaces(&merchant).await.unwrap();
            assert!(current.is_empty());
        });
    }
}
