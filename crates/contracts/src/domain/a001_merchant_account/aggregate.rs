use crate::domain::common::{AggregateId, BaseAggregate};
use crate::enums::Region;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a merchant account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MerchantAccountId(pub Uuid);

impl MerchantAccountId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for MerchantAccountId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(MerchantAccountId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

/// One external seller identity: the MWS seller ID plus the API
/// credentials used to talk to Amazon on its behalf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantAccount {
    #[serde(flatten)]
    pub base: BaseAggregate<MerchantAccountId>,

    /// Seller ID assigned by Amazon, unique across the system
    pub seller_id: String,
    pub aws_api_key: String,
    pub aws_api_secret: String,
    pub region: Region,
}

impl MerchantAccount {
    pub fn new_for_insert(
        code: String,
        description: String,
        seller_id: String,
        aws_api_key: String,
        aws_api_secret: String,
        region: Region,
    ) -> Self {
        Self {
            base: BaseAggregate::new(MerchantAccountId::new_v4(), code, description),
            seller_id,
            aws_api_key,
            aws_api_secret,
            region,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.description.trim().is_empty() {
            return Err("Name must not be empty".into());
        }
        if self.seller_id.trim().is_empty() {
            return Err("Seller ID must not be empty".into());
        }
        if self.aws_api_key.trim().is_empty() {
            return Err("API key must not be empty".into());
        }
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}
