use contracts::domain::a007_store_order::aggregate::{OrderLineId, StoreOrderId};
use contracts::domain::a008_shipping_event::aggregate::{ShippingEvent, ShippingEventQuantity};
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a008_shipping_event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_ref: String,
    pub event_type: String,
    pub notes: Option<String>,
    pub date_created: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub mod quantity {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "a008_shipping_event_quantity")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub event: String,
        pub order_line: String,
        pub quantity: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

fn event_from_model(m: Model) -> Option<ShippingEvent> {
    let id = Uuid::parse_str(&m.id).ok()?;
    let order = Uuid::parse_str(&m.order_ref).ok()?;
    Some(ShippingEvent {
        id,
        order: StoreOrderId(order),
        event_type: m.event_type,
        notes: m.notes,
        date_created: m.date_created,
    })
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn insert(event: &ShippingEvent) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(event.id.to_string()),
        order_ref: Set(event.order.value().to_string()),
        event_type: Set(event.event_type.clone()),
        notes: Set(event.notes.clone()),
        date_created: Set(event.date_created),
    };
    active.insert(conn()).await?;
    Ok(())
}

pub async fn insert_quantity(item: &ShippingEventQuantity) -> anyhow::Result<()> {
    let active = quantity::ActiveModel {
        id: Set(item.id.to_string()),
        event: Set(item.event.to_string()),
        order_line: Set(item.order_line.value().to_string()),
        quantity: Set(item.quantity),
    };
    active.insert(conn()).await?;
    Ok(())
}

pub async fn list_by_order(order: StoreOrderId) -> anyhow::Result<Vec<ShippingEvent>> {
    let rows = Entity::find()
        .filter(Column::OrderRef.eq(order.value().to_string()))
        .all(conn())
        .await?;
    Ok(rows.into_iter().filter_map(event_from_model).collect())
}

pub async fn list_quantities_by_event(event: Uuid) -> anyhow::Result<Vec<ShippingEventQuantity>> {
    let rows = quantity::Entity::find()
        .filter(quantity::Column::Event.eq(event.to_string()))
        .all(conn())
        .await?;
    let items = rows
        .into_iter()
        .filter_map(|row| {
            let id = Uuid::parse_str(&row.id).ok()?;
            let order_line = Uuid::parse_str(&row.order_line).ok()?;
            Some(ShippingEventQuantity {
                id,
                event,
                order_line: OrderLineId(order_line),
                quantity: row.quantity,
            })
        })
        .collect();
    Ok(items)
}
