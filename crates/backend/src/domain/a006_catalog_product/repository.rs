use chrono::Utc;
use contracts::domain::a001_merchant_account::aggregate::MerchantAccountId;
use contracts::domain::a006_catalog_product::aggregate::{
    CatalogProduct, CatalogProductId, StockRecord,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a006_catalog_product")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub upc: Option<String>,
    pub brand: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub mod stock_record {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "a006_stock_record")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub product: String,
        pub merchant: Option<String>,
        pub partner_sku: String,
        pub num_in_stock: i32,
        pub num_allocated: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<Model> for CatalogProduct {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        CatalogProduct {
            base: BaseAggregate::with_metadata(
                CatalogProductId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            upc: m.upc,
            brand: m.brand,
        }
    }
}

fn stock_record_from_model(m: stock_record::Model) -> Option<StockRecord> {
    let id = Uuid::parse_str(&m.id).ok()?;
    let product = Uuid::parse_str(&m.product).ok()?;
    Some(StockRecord {
        id,
        product: CatalogProductId(product),
        merchant: m
            .merchant
            .as_deref()
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(MerchantAccountId),
        partner_sku: m.partner_sku,
        num_in_stock: m.num_in_stock,
        num_allocated: m.num_allocated,
    })
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<CatalogProduct>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &CatalogProduct) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        upc: Set(aggregate.upc.clone()),
        brand: Set(aggregate.brand.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

/// Stock record for a product under a specific merchant; merchant-less
/// records never match a merchant-scoped lookup
pub async fn get_stock_record(
    product: CatalogProductId,
    merchant: MerchantAccountId,
) -> anyhow::Result<Option<StockRecord>> {
    let row = stock_record::Entity::find()
        .filter(stock_record::Column::Product.eq(product.value().to_string()))
        .filter(stock_record::Column::Merchant.eq(merchant.value().to_string()))
        .one(conn())
        .await?;
    Ok(row.and_then(stock_record_from_model))
}

fn stock_record_to_active(record: &StockRecord) -> stock_record::ActiveModel {
    stock_record::ActiveModel {
        id: Set(record.id.to_string()),
        product: Set(record.product.value().to_string()),
        merchant: Set(record.merchant.map(|m| m.value().to_string())),
        partner_sku: Set(record.partner_sku.clone()),
        num_in_stock: Set(record.num_in_stock),
        num_allocated: Set(record.num_allocated),
    }
}

pub async fn insert_stock_record(record: &StockRecord) -> anyhow::Result<()> {
    stock_record_to_active(record).insert(conn()).await?;
    Ok(())
}

pub async fn update_stock_record(record: &StockRecord) -> anyhow::Result<()> {
    stock_record_to_active(record).update(conn()).await?;
    Ok(())
}
