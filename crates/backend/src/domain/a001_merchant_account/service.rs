use contracts::domain::a001_merchant_account::aggregate::MerchantAccount;

use crate::shared::mws::ConnectionRegistry;

use super::repository;

/// Persist changed credentials and drop any cached API client built
/// from the old ones. Callers holding an old client keep using it
/// until their next registry lookup.
pub async fn update_credentials(
    registry: &ConnectionRegistry,
    merchant: &mut MerchantAccount,
) -> anyhow::Result<()> {
    merchant
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid merchant account: {}", e))?;
    merchant.before_write();
    repository::update(merchant).await?;
    registry.invalidate(&merchant.seller_id);
    tracing::info!(
        "Updated credentials for seller {}, API client invalidated",
        merchant.seller_id
    );
    Ok(())
}
