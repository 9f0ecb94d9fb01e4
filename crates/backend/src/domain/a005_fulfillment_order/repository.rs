use std::str::FromStr;

use chrono::Utc;
use contracts::domain::a001_merchant_account::aggregate::MerchantAccountId;
use contracts::domain::a005_fulfillment_order::aggregate::{
    FulfillmentOrder, FulfillmentOrderId, FulfillmentOrderLine, FulfillmentShipment,
    FulfillmentStatus, ShipmentPackage,
};
use contracts::domain::a007_store_order::aggregate::{OrderLineId, ShippingAddressId, StoreOrderId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a005_fulfillment_order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub fulfillment_id: String,
    pub order_ref: String,
    pub merchant: String,
    pub shipping_address: String,
    pub status: String,
    pub shipping_speed: String,
    pub date_updated: chrono::DateTime<chrono::Utc>,
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
    #[sea_orm(table_name = "a005_fulfillment_order_line")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub fulfillment_order: String,
        pub order_line: String,
        pub order_item_id: String,
        pub quantity: i32,
        pub comment: Option<String>,
        pub price_incl_tax: Option<String>,
        pub price_currency: Option<String>,
        pub shipment: Option<String>,
        pub package: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod shipment {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "a005_fulfillment_shipment")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub shipment_id: String,
        pub order_ref: String,
        pub status: String,
        pub fulfillment_center_id: String,
        pub date_estimated_arrival: Option<chrono::DateTime<chrono::Utc>>,
        pub date_shipped: Option<chrono::DateTime<chrono::Utc>>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod package {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "a005_shipment_package")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub shipment: String,
        pub package_number: i32,
        pub tracking_number: String,
        pub carrier_code: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<Model> for FulfillmentOrder {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let order = Uuid::parse_str(&m.order_ref).unwrap_or_else(|_| Uuid::new_v4());
        let merchant = Uuid::parse_str(&m.merchant).unwrap_or_else(|_| Uuid::new_v4());
        let address = Uuid::parse_str(&m.shipping_address).unwrap_or_else(|_| Uuid::new_v4());

        FulfillmentOrder {
            base: BaseAggregate::with_metadata(
                FulfillmentOrderId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            fulfillment_id: m.fulfillment_id,
            order: StoreOrderId(order),
            merchant: MerchantAccountId(merchant),
            shipping_address: ShippingAddressId(address),
            status: FulfillmentStatus::from_raw(&m.status),
            shipping_speed: m.shipping_speed,
            date_updated: m.date_updated,
        }
    }
}

fn line_from_model(m: line::Model) -> Option<FulfillmentOrderLine> {
    let id = Uuid::parse_str(&m.id).ok()?;
    let fulfillment_order = Uuid::parse_str(&m.fulfillment_order).ok()?;
    let order_line = Uuid::parse_str(&m.order_line).ok()?;
    Some(FulfillmentOrderLine {
        id,
        fulfillment_order: FulfillmentOrderId(fulfillment_order),
        order_line: OrderLineId(order_line),
        order_item_id: m.order_item_id,
        quantity: m.quantity,
        comment: m.comment,
        price_incl_tax: m.price_incl_tax.as_deref().and_then(|p| Decimal::from_str(p).ok()),
        price_currency: m.price_currency,
        shipment: m.shipment.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
        package: m.package.as_deref().and_then(|p| Uuid::parse_str(p).ok()),
    })
}

fn shipment_from_model(m: shipment::Model) -> Option<FulfillmentShipment> {
    let id = Uuid::parse_str(&m.id).ok()?;
    let order = Uuid::parse_str(&m.order_ref).ok()?;
    Some(FulfillmentShipment {
        id,
        shipment_id: m.shipment_id,
        order: StoreOrderId(order),
        status: m.status,
        fulfillment_center_id: m.fulfillment_center_id,
        date_estimated_arrival: m.date_estimated_arrival,
        date_shipped: m.date_shipped,
    })
}

fn package_from_model(m: package::Model) -> Option<ShipmentPackage> {
    let id = Uuid::parse_str(&m.id).ok()?;
    let shipment = Uuid::parse_str(&m.shipment).ok()?;
    Some(ShipmentPackage {
        id,
        shipment,
        package_number: m.package_number,
        tracking_number: m.tracking_number,
        carrier_code: m.carrier_code,
    })
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

fn to_active(aggregate: &FulfillmentOrder) -> ActiveModel {
    ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        fulfillment_id: Set(aggregate.fulfillment_id.clone()),
        order_ref: Set(aggregate.order.value().to_string()),
        merchant: Set(aggregate.merchant.value().to_string()),
        shipping_address: Set(aggregate.shipping_address.value().to_string()),
        status: Set(aggregate.status.as_str().to_string()),
        shipping_speed: Set(aggregate.shipping_speed.clone()),
        date_updated: Set(aggregate.date_updated),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    }
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<FulfillmentOrder>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

pub async fn get_by_fulfillment_id(
    fulfillment_id: &str,
) -> anyhow::Result<Option<FulfillmentOrder>> {
    let result = Entity::find()
        .filter(Column::FulfillmentId.eq(fulfillment_id))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

/// Existence check on the `(fulfillment_id, order, merchant)` triple
pub async fn exists(
    fulfillment_id: &str,
    order: StoreOrderId,
    merchant: MerchantAccountId,
) -> anyhow::Result<bool> {
    let found = Entity::find()
        .filter(Column::FulfillmentId.eq(fulfillment_id))
        .filter(Column::OrderRef.eq(order.value().to_string()))
        .filter(Column::Merchant.eq(merchant.value().to_string()))
        .one(conn())
        .await?;
    Ok(found.is_some())
}

pub async fn list_by_order(order: StoreOrderId) -> anyhow::Result<Vec<FulfillmentOrder>> {
    let items = Entity::find()
        .filter(Column::OrderRef.eq(order.value().to_string()))
        .filter(Column::IsDeleted.eq(false))
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn list_unresolved() -> anyhow::Result<Vec<FulfillmentOrder>> {
    let items: Vec<FulfillmentOrder> = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .all(conn())
        .await?
        .into_iter()
        .map(FulfillmentOrder::from)
        .filter(|order| {
            !matches!(
                order.status,
                FulfillmentStatus::Complete
                    | FulfillmentStatus::CompletePartialled
                    | FulfillmentStatus::Cancelled
                    | FulfillmentStatus::Invalid
                    | FulfillmentStatus::Unfulfillable
            )
        })
        .collect();
    Ok(items)
}

pub async fn insert(aggregate: &FulfillmentOrder) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    to_active(aggregate).insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &FulfillmentOrder) -> anyhow::Result<()> {
    to_active(aggregate).update(conn()).await?;
    Ok(())
}

fn line_to_active(line: &FulfillmentOrderLine) -> line::ActiveModel {
    line::ActiveModel {
        id: Set(line.id.to_string()),
        fulfillment_order: Set(line.fulfillment_order.value().to_string()),
        order_line: Set(line.order_line.value().to_string()),
        order_item_id: Set(line.order_item_id.clone()),
        quantity: Set(line.quantity),
        comment: Set(line.comment.clone()),
        price_incl_tax: Set(line.price_incl_tax.map(|p| p.to_string())),
        price_currency: Set(line.price_currency.clone()),
        shipment: Set(line.shipment.map(|s| s.to_string())),
        package: Set(line.package.map(|p| p.to_string())),
    }
}

pub async fn insert_line(line: &FulfillmentOrderLine) -> anyhow::Result<()> {
    line_to_active(line).insert(conn()).await?;
    Ok(())
}

pub async fn update_line(line: &FulfillmentOrderLine) -> anyhow::Result<()> {
    line_to_active(line).update(conn()).await?;
    Ok(())
}

pub async fn list_lines(order: FulfillmentOrderId) -> anyhow::Result<Vec<FulfillmentOrderLine>> {
    let rows = line::Entity::find()
        .filter(line::Column::FulfillmentOrder.eq(order.value().to_string()))
        .all(conn())
        .await?;
    Ok(rows.into_iter().filter_map(line_from_model).collect())
}

pub async fn get_shipment_by_shipment_id(
    shipment_id: &str,
) -> anyhow::Result<Option<FulfillmentShipment>> {
    let row = shipment::Entity::find()
        .filter(shipment::Column::ShipmentId.eq(shipment_id))
        .one(conn())
        .await?;
    Ok(row.and_then(shipment_from_model))
}

fn shipment_to_active(item: &FulfillmentShipment) -> shipment::ActiveModel {
    shipment::ActiveModel {
        id: Set(item.id.to_string()),
        shipment_id: Set(item.shipment_id.clone()),
        order_ref: Set(item.order.value().to_string()),
        status: Set(item.status.clone()),
        fulfillment_center_id: Set(item.fulfillment_center_id.clone()),
        date_estimated_arrival: Set(item.date_estimated_arrival),
        date_shipped: Set(item.date_shipped),
    }
}

pub async fn insert_shipment(item: &FulfillmentShipment) -> anyhow::Result<()> {
    shipment_to_active(item).insert(conn()).await?;
    Ok(())
}

pub async fn update_shipment(item: &FulfillmentShipment) -> anyhow::Result<()> {
    shipment_to_active(item).update(conn()).await?;
    Ok(())
}

pub async fn list_shipments_by_order(
    order: StoreOrderId,
) -> anyhow::Result<Vec<FulfillmentShipment>> {
    let rows = shipment::Entity::find()
        .filter(shipment::Column::OrderRef.eq(order.value().to_string()))
        .all(conn())
        .await?;
    Ok(rows.into_iter().filter_map(shipment_from_model).collect())
}

/// Lookup by the `(shipment, package_number)` natural key
pub async fn get_package(
    shipment: Uuid,
    package_number: i32,
) -> anyhow::Result<Option<ShipmentPackage>> {
    let row = package::Entity::find()
        .filter(package::Column::Shipment.eq(shipment.to_string()))
        .filter(package::Column::PackageNumber.eq(package_number))
        .one(conn())
        .await?;
    Ok(row.and_then(package_from_model))
}

fn package_to_active(item: &ShipmentPackage) -> package::ActiveModel {
    package::ActiveModel {
        id: Set(item.id.to_string()),
        shipment: Set(item.shipment.to_string()),
        package_number: Set(item.package_number),
        tracking_number: Set(item.tracking_number.clone()),
        carrier_code: Set(item.carrier_code.clone()),
    }
}

pub async fn insert_package(item: &ShipmentPackage) -> anyhow::Result<()> {
    package_to_active(item).insert(conn()).await?;
    Ok(())
}

pub async fn update_package(item: &ShipmentPackage) -> anyhow::Result<()> {
    package_to_active(item).update(conn()).await?;
    Ok(())
}
