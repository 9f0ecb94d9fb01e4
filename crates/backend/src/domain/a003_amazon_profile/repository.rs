use chrono::Utc;
use contracts::domain::a002_amazon_marketplace::aggregate::AmazonMarketplaceId;
use contracts::domain::a003_amazon_profile::aggregate::{
    AmazonProfile, AmazonProfileId, FulfillmentBy,
};
use contracts::domain::a006_catalog_product::aggregate::CatalogProductId;
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a003_amazon_profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub product: String,
    pub sku: String,
    pub asin: Option<String>,
    pub product_tax_code: Option<String>,
    pub launch_date: Option<chrono::DateTime<chrono::Utc>>,
    pub release_date: Option<chrono::DateTime<chrono::Utc>>,
    pub item_package_quantity: Option<i32>,
    pub number_of_items: Option<i32>,
    pub fulfillment_by: String,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Link table tying a profile to the marketplaces it is listed on
pub mod marketplace_link {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "a003_amazon_profile_marketplace")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub profile: String,
        pub marketplace: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<Model> for AmazonProfile {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let product = Uuid::parse_str(&m.product).unwrap_or_else(|_| Uuid::new_v4());

        AmazonProfile {
            base: BaseAggregate::with_metadata(
                AmazonProfileId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            product: CatalogProductId(product),
            sku: m.sku,
            asin: m.asin,
            product_tax_code: m.product_tax_code,
            launch_date: m.launch_date,
            release_date: m.release_date,
            item_package_quantity: m.item_package_quantity,
            number_of_items: m.number_of_items,
            fulfillment_by: FulfillmentBy::from_str_opt(&m.fulfillment_by).unwrap_or_default(),
            // Filled in by the load functions below
            marketplaces: Vec::new(),
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

fn to_active(aggregate: &AmazonProfile) -> ActiveModel {
    ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        product: Set(aggregate.product.value().to_string()),
        sku: Set(aggregate.sku.clone()),
        asin: Set(aggregate.asin.clone()),
        product_tax_code: Set(aggregate.product_tax_code.clone()),
        launch_date: Set(aggregate.launch_date),
        release_date: Set(aggregate.release_date),
        item_package_quantity: Set(aggregate.item_package_quantity),
        number_of_items: Set(aggregate.number_of_items),
        fulfillment_by: Set(aggregate.fulfillment_by.as_str().to_string()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    }
}

async fn load_marketplaces(profile: AmazonProfileId) -> anyhow::Result<Vec<AmazonMarketplaceId>> {
    let links = marketplace_link::Entity::find()
        .filter(marketplace_link::Column::Profile.eq(profile.value().to_string()))
        .all(conn())
        .await?;
    let ids = links
        .into_iter()
        .filter_map(|link| Uuid::parse_str(&link.marketplace).ok())
        .map(AmazonMarketplaceId)
        .collect();
    Ok(ids)
}

async fn hydrate(model: Model) -> anyhow::Result<AmazonProfile> {
    let mut profile: AmazonProfile = model.into();
    profile.marketplaces = load_marketplaces(profile.base.id).await?;
    Ok(profile)
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<AmazonProfile>> {
    match Entity::find_by_id(id.to_string()).one(conn()).await? {
        Some(model) => Ok(Some(hydrate(model).await?)),
        None => Ok(None),
    }
}

pub async fn get_by_product(product: CatalogProductId) -> anyhow::Result<Option<AmazonProfile>> {
    let found = Entity::find()
        .filter(Column::Product.eq(product.value().to_string()))
        .one(conn())
        .await?;
    match found {
        Some(model) => Ok(Some(hydrate(model).await?)),
        None => Ok(None),
    }
}

pub async fn get_by_sku(sku: &str) -> anyhow::Result<Option<AmazonProfile>> {
    let found = Entity::find().filter(Column::Sku.eq(sku)).one(conn()).await?;
    match found {
        Some(model) => Ok(Some(hydrate(model).await?)),
        None => Ok(None),
    }
}

pub async fn insert(aggregate: &AmazonProfile) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    to_active(aggregate).insert(conn()).await?;
    replace_marketplace_links(aggregate).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &AmazonProfile) -> anyhow::Result<()> {
    to_active(aggregate).update(conn()).await?;
    replace_marketplace_links(aggregate).await?;
    Ok(())
}

async fn replace_marketplace_links(aggregate: &AmazonProfile) -> anyhow::Result<()> {
    let profile_id = aggregate.base.id.value().to_string();
    marketplace_link::Entity::delete_many()
        .filter(marketplace_link::Column::Profile.eq(profile_id.clone()))
        .exec(conn())
        .await?;
    for marketplace in &aggregate.marketplaces {
        let link = marketplace_link::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            profile: Set(profile_id.clone()),
            marketplace: Set(marketplace.value().to_string()),
        };
        link.insert(conn()).await?;
    }
    Ok(())
}
