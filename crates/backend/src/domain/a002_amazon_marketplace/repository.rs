use chrono::Utc;
use contracts::domain::a001_merchant_account::aggregate::MerchantAccountId;
use contracts::domain::a002_amazon_marketplace::aggregate::{
    AmazonMarketplace, AmazonMarketplaceId,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use contracts::enums::Region;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a002_amazon_marketplace")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub marketplace_id: String,
    pub merchant: String,
    pub region: String,
    pub domain_name: String,
    pub currency_code: String,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for AmazonMarketplace {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let merchant = Uuid::parse_str(&m.merchant).unwrap_or_else(|_| Uuid::new_v4());

        AmazonMarketplace {
            base: BaseAggregate::with_metadata(
                AmazonMarketplaceId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            marketplace_id: m.marketplace_id,
            merchant: MerchantAccountId(merchant),
            region: Region::from_code(&m.region).unwrap_or_default(),
            domain_name: m.domain_name,
            currency_code: m.currency_code,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

fn to_active(aggregate: &AmazonMarketplace) -> ActiveModel {
    ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        marketplace_id: Set(aggregate.marketplace_id.clone()),
        merchant: Set(aggregate.merchant.value().to_string()),
        region: Set(aggregate.region.code().to_string()),
        domain_name: Set(aggregate.domain_name.clone()),
        currency_code: Set(aggregate.currency_code.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    }
}

pub async fn list_by_merchant(merchant: MerchantAccountId) -> anyhow::Result<Vec<AmazonMarketplace>> {
    let items = Entity::find()
        .filter(Column::Merchant.eq(merchant.value().to_string()))
        .filter(Column::IsDeleted.eq(false))
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<AmazonMarketplace>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

/// Lookup by the `(marketplace_id, merchant)` natural key
pub async fn get_by_natural_key(
    marketplace_id: &str,
    merchant: MerchantAccountId,
) -> anyhow::Result<Option<AmazonMarketplace>> {
    let result = Entity::find()
        .filter(Column::MarketplaceId.eq(marketplace_id))
        .filter(Column::Merchant.eq(merchant.value().to_string()))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &AmazonMarketplace) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    to_active(aggregate).insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &AmazonMarketplace) -> anyhow::Result<()> {
    to_active(aggregate).update(conn()).await?;
    Ok(())
}
