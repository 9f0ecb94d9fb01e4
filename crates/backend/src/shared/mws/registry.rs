use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use contracts::domain::a001_merchant_account::aggregate::MerchantAccount;

use super::api::MwsApi;
use super::client::HttpMwsApi;

type ClientFactory = Box<dyn Fn(&MerchantAccount) -> Arc<dyn MwsApi> + Send + Sync>;

/// Per-merchant API client cache. Clients are built lazily through the
/// injected factory and reused until the merchant's credentials change,
/// at which point the stale entry is invalidated by seller ID.
pub struct ConnectionRegistry {
    factory: ClientFactory,
    clients: RwLock<HashMap<String, Arc<dyn MwsApi>>>,
}

impl ConnectionRegistry {
    pub fn new(factory: ClientFactory) -> Self {
        Self {
            factory,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Registry backed by the signed HTTP client
    pub fn http() -> Self {
        Self::new(Box::new(|merchant| Arc::new(HttpMwsApi::new(merchant))))
    }

    pub fn get(&self, merchant: &MerchantAccount) -> Arc<dyn MwsApi> {
        if let Ok(clients) = self.clients.read() {
            if let Some(client) = clients.get(&merchant.seller_id) {
                return Arc::clone(client);
            }
        }
        let client = (self.factory)(merchant);
        if let Ok(mut clients) = self.clients.write() {
            clients.insert(merchant.seller_id.clone(), Arc::clone(&client));
        }
        client
    }

    /// Drop the cached client for a seller so the next call rebuilds it
    /// from current credentials
    pub fn invalidate(&self, seller_id: &str) {
        if let Ok(mut clients) = self.clients.write() {
            clients.remove(seller_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::enums::Region;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn merchant(seller_id: &str) -> MerchantAccount {
        MerchantAccount::new_for_insert(
            String::new(),
            "Test merchant".into(),
            seller_id.into(),
            "key".into(),
            "secret".into(),
            Region::Us,
        )
    }

    fn counting_registry() -> (ConnectionRegistry, Arc<AtomicUsize>) {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let registry = ConnectionRegistry::new(Box::new(move |merchant| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(HttpMwsApi::new(merchant))
        }));
        (registry, built)
    }

    #[test]
    fn clients_are_cached_per_seller() {
        let (registry, built) = counting_registry();
        let m = merchant("SELLER-A");
        registry.get(&m);
        registry.get(&m);
        assert_eq!(built.load(Ordering::SeqCst), 1);
        registry.get(&merchant("SELLER-B"));
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidation_forces_a_rebuild() {
        let (registry, built) = counting_registry();
        let m = merchant("SELLER-A");
        registry.get(&m);
        registry.invalidate("SELLER-A");
        registry.get(&m);
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }
}
