use chrono::Utc;
use contracts::domain::a001_merchant_account::aggregate::{MerchantAccount, MerchantAccountId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use contracts::enums::Region;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a001_merchant_account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub seller_id: String,
    pub aws_api_key: String,
    pub aws_api_secret: String,
    pub region: String,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MerchantAccount {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        MerchantAccount {
            base: BaseAggregate::with_metadata(
                MerchantAccountId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            seller_id: m.seller_id,
            aws_api_key: m.aws_api_key,
            aws_api_secret: m.aws_api_secret,
            region: Region::from_code(&m.region).unwrap_or_default(),
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

fn to_active(aggregate: &MerchantAccount) -> ActiveModel {
    ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        seller_id: Set(aggregate.seller_id.clone()),
        aws_api_key: Set(aggregate.aws_api_key.clone()),
        aws_api_secret: Set(aggregate.aws_api_secret.clone()),
        region: Set(aggregate.region.code().to_string()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    }
}

pub async fn list_all() -> anyhow::Result<Vec<MerchantAccount>> {
    let mut items: Vec<MerchantAccount> = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    items.sort_by(|a, b| {
        a.base
            .description
            .to_lowercase()
            .cmp(&b.base.description.to_lowercase())
    });
    Ok(items)
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<MerchantAccount>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

pub async fn get_by_seller_id(seller_id: &str) -> anyhow::Result<Option<MerchantAccount>> {
    let result = Entity::find()
        .filter(Column::SellerId.eq(seller_id))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &MerchantAccount) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    to_active(aggregate).insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &MerchantAccount) -> anyhow::Result<()> {
    to_active(aggregate).update(conn()).await?;
    Ok(())
}
