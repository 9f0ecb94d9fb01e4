use std::str::FromStr;

use chrono::Utc;
use contracts::domain::a006_catalog_product::aggregate::CatalogProductId;
use contracts::domain::a007_store_order::aggregate::{
    OrderLine, OrderLineId, ShippingAddress, ShippingAddressId, StoreOrder, StoreOrderId,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a007_store_order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub order_number: String,
    pub email: Option<String>,
    pub date_placed: chrono::DateTime<chrono::Utc>,
    pub shipping_address: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub mod line {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "a007_order_line")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub order_ref: String,
        pub product: String,
        pub partner_sku: String,
        pub partner_line_reference: Option<String>,
        pub quantity: i32,
        pub unit_price_incl_tax: Option<String>,
        pub line_price_incl_tax: Option<String>,
        pub shipping_address: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod address {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "a007_shipping_address")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub name: String,
        pub line1: String,
        pub line2: Option<String>,
        pub line3: Option<String>,
        pub city: String,
        pub state: Option<String>,
        pub postcode: String,
        pub country_code: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<Model> for StoreOrder {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        StoreOrder {
            base: BaseAggregate::with_metadata(
                StoreOrderId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            number: m.order_number,
            email: m.email,
            date_placed: m.date_placed,
            shipping_address: m
                .shipping_address
                .as_deref()
                .and_then(|v| Uuid::parse_str(v).ok())
                .map(ShippingAddressId),
        }
    }
}

fn line_from_model(m: line::Model) -> Option<OrderLine> {
    let id = Uuid::parse_str(&m.id).ok()?;
    let order = Uuid::parse_str(&m.order_ref).ok()?;
    let product = Uuid::parse_str(&m.product).ok()?;
    Some(OrderLine {
        id: OrderLineId(id),
        order: StoreOrderId(order),
        product: CatalogProductId(product),
        partner_sku: m.partner_sku,
        partner_line_reference: m.partner_line_reference,
        quantity: m.quantity,
        unit_price_incl_tax: m
            .unit_price_incl_tax
            .as_deref()
            .and_then(|p| Decimal::from_str(p).ok()),
        line_price_incl_tax: m
            .line_price_incl_tax
            .as_deref()
            .and_then(|p| Decimal::from_str(p).ok()),
        shipping_address: m
            .shipping_address
            .as_deref()
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(ShippingAddressId),
    })
}

fn address_from_model(m: address::Model) -> Option<ShippingAddress> {
    let id = Uuid::parse_str(&m.id).ok()?;
    Some(ShippingAddress {
        id: ShippingAddressId(id),
        name: m.name,
        line1: m.line1,
        line2: m.line2,
        line3: m.line3,
        city: m.city,
        state: m.state,
        postcode: m.postcode,
        country_code: m.country_code,
    })
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<StoreOrder>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

pub async fn get_by_number(number: &str) -> anyhow::Result<Option<StoreOrder>> {
    let result = Entity::find()
        .filter(Column::OrderNumber.eq(number))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &StoreOrder) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        order_number: Set(aggregate.number.clone()),
        email: Set(aggregate.email.clone()),
        date_placed: Set(aggregate.date_placed),
        shipping_address: Set(aggregate.shipping_address.map(|a| a.value().to_string())),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn list_lines(order: StoreOrderId) -> anyhow::Result<Vec<OrderLine>> {
    let rows = line::Entity::find()
        .filter(line::Column::OrderRef.eq(order.value().to_string()))
        .all(conn())
        .await?;
    Ok(rows.into_iter().filter_map(line_from_model).collect())
}

pub async fn insert_line(item: &OrderLine) -> anyhow::Result<()> {
    let active = line::ActiveModel {
        id: Set(item.id.value().to_string()),
        order_ref: Set(item.order.value().to_string()),
        product: Set(item.product.value().to_string()),
        partner_sku: Set(item.partner_sku.clone()),
        partner_line_reference: Set(item.partner_line_reference.clone()),
        quantity: Set(item.quantity),
        unit_price_incl_tax: Set(item.unit_price_incl_tax.map(|p| p.to_string())),
        line_price_incl_tax: Set(item.line_price_incl_tax.map(|p| p.to_string())),
        shipping_address: Set(item.shipping_address.map(|a| a.value().to_string())),
    };
    active.insert(conn()).await?;
    Ok(())
}

pub async fn get_address(id: ShippingAddressId) -> anyhow::Result<Option<ShippingAddress>> {
    let row = address::Entity::find_by_id(id.value().to_string())
        .one(conn())
        .await?;
    Ok(row.and_then(address_from_model))
}

pub async fn insert_address(item: &ShippingAddress) -> anyhow::Result<()> {
    let active = address::ActiveModel {
        id: Set(item.id.value().to_string()),
        name: Set(item.name.clone()),
        line1: Set(item.line1.clone()),
        line2: Set(item.line2.clone()),
        line3: Set(item.line3.clone()),
        city: Set(item.city.clone()),
        state: Set(item.state.clone()),
        postcode: Set(item.postcode.clone()),
        country_code: Set(item.country_code.clone()),
    };
    active.insert(conn()).await?;
    Ok(())
}
