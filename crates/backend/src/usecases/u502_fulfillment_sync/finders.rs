use async_trait::async_trait;
use contracts::domain::a001_merchant_account::aggregate::MerchantAccount;
use contracts::domain::a007_store_order::aggregate::{OrderLine, ShippingAddress, StoreOrder};

use crate::domain::a001_merchant_account::repository as merchants;

/// Picks the merchant account that should fulfill one destination of
/// an order. Injected into the creator so routing policy stays
/// swappable.
#[async_trait]
pub trait MerchantFinder: Send + Sync {
    async fn find(
        &self,
        order: &StoreOrder,
        address: &ShippingAddress,
        lines: &[OrderLine],
    ) -> anyhow::Result<MerchantAccount>;
}

/// Default policy: the first configured merchant account handles
/// everything
pub struct FirstMerchantFinder;

#[async_trait]
impl MerchantFinder for FirstMerchantFinder {
    async fn find(
        &self,
        _order: &StoreOrder,
        _address: &ShippingAddress,
        _lines: &[OrderLine],
    ) -> anyhow::Result<MerchantAccount> {
        merchants::list_all()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no merchant account is configured"))
    }
}
