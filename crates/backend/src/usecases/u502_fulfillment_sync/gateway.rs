use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use contracts::domain::a005_fulfillment_order::aggregate::{
    FulfillmentOrder, FulfillmentShipment, FulfillmentStatus, ShipmentPackage,
};
use contracts::domain::a008_shipping_event::aggregate::{ShippingEvent, ShippingEventQuantity};
use contracts::usecases::u502_fulfillment_sync::event::FulfillmentCreated;

use crate::domain::a001_merchant_account::repository as merchants;
use crate::domain::a005_fulfillment_order::repository as fulfillment_orders;
use crate::domain::a007_store_order::repository as store_orders;
use crate::domain::a008_shipping_event::repository as shipping_events;
use crate::shared::config::Config;
use crate::shared::mws::{ConnectionRegistry, MwsError, XmlNode};

use super::adapters::{LineAdapter, OrderAdapter};

/// Submits fulfillment orders to the vendor and reconciles their
/// remote lifecycle back into local state. Accepted submissions are
/// announced on a broadcast channel.
pub struct FulfillmentGateway {
    registry: Arc<ConnectionRegistry>,
    order_adapter: OrderAdapter,
    line_adapter: LineAdapter,
    events: broadcast::Sender<FulfillmentCreated>,
}

impl FulfillmentGateway {
    pub fn new(registry: Arc<ConnectionRegistry>, config: &Config) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            registry,
            order_adapter: OrderAdapter::new(
                config.mws.default_order_comment.clone(),
                config.mws.default_shipping_speed.clone(),
            ),
            line_adapter: LineAdapter::new(config.mws.default_currency.clone()),
            events,
        }
    }

    /// Subscribe to accepted-submission announcements
    pub fn subscribe(&self) -> broadcast::Receiver<FulfillmentCreated> {
        self.events.subscribe()
    }

    /// Submit one unsubmitted fulfillment order. An API-level
    /// rejection is absorbed into the SUBMISSION_FAILED status; only
    /// infrastructure failures propagate.
    pub async fn submit_fulfillment_order(
        &self,
        fulfillment_order: &mut FulfillmentOrder,
    ) -> anyhow::Result<()> {
        let merchant = merchants::get_by_id(fulfillment_order.merchant.value())
            .await?
            .ok_or_else(|| anyhow::anyhow!("merchant not found for fulfillment order"))?;
        let order = store_orders::get_by_id(fulfillment_order.order.value())
            .await?
            .ok_or_else(|| anyhow::anyhow!("store order not found for fulfillment order"))?;
        let address = store_orders::get_address(fulfillment_order.shipping_address)
            .await?
            .ok_or_else(|| anyhow::anyhow!("shipping address not found"))?;
        let order_lines = store_orders::list_lines(order.base.id).await?;
        let fo_lines = fulfillment_orders::list_lines(fulfillment_order.base.id).await?;
        let lines: Vec<_> = order_lines
            .into_iter()
            .filter(|line| fo_lines.iter().any(|fl| fl.order_line == line.id))
            .collect();

        let mut fields = self.order_adapter.adapt(
            &order,
            &address,
            &fulfillment_order.fulfillment_id,
        )?;
        fields.insert("Items", self.line_adapter.adapt_all(&lines)?);

        let api = self.registry.get(&merchant);
        match api.create_fulfillment_order(&fields).await {
            Ok(_) => {
                fulfillment_order.status = FulfillmentStatus::Submitted;
                fulfillment_order.date_updated = Utc::now();
                fulfillment_order.before_write();
                fulfillment_orders::update(fulfillment_order).await?;
                let _ = self.events.send(FulfillmentCreated {
                    fulfillment_order: fulfillment_order.clone(),
                });
                tracing::info!(
                    "Submitted fulfillment order {}",
                    fulfillment_order.fulfillment_id
                );
                Ok(())
            }
            Err(e @ MwsError::Api { .. }) => {
                e.log(&format!(
                    "Submitting fulfillment order {} failed",
                    fulfillment_order.fulfillment_id
                ));
                fulfillment_order.status = FulfillmentStatus::SubmissionFailed;
                fulfillment_order.date_updated = Utc::now();
                fulfillment_order.before_write();
                fulfillment_orders::update(fulfillment_order).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pull the remote state of one fulfillment order and reconcile
    /// status, shipments, packages and shipping events
    pub async fn update_fulfillment_order(
        &self,
        fulfillment_order: &mut FulfillmentOrder,
    ) -> anyhow::Result<()> {
        let merchant = merchants::get_by_id(fulfillment_order.merchant.value())
            .await?
            .ok_or_else(|| anyhow::anyhow!("merchant not found for fulfillment order"))?;
        let api = self.registry.get(&merchant);
        let response = api
            .get_fulfillment_order(&fulfillment_order.fulfillment_id)
            .await?;

        if let Some(status) = response
            .find_first("FulfillmentOrder")
            .and_then(|o| o.child_text("FulfillmentOrderStatus"))
        {
            fulfillment_order.status = FulfillmentStatus::from_raw(status);
        }
        fulfillment_order.date_updated = Utc::now();
        fulfillment_order.before_write();
        fulfillment_orders::update(fulfillment_order).await?;

        if let Some(shipments) = response.find_first("FulfillmentShipment") {
            for member in shipments.members() {
                self.reconcile_shipment(fulfillment_order, member).await?;
            }
        }
        Ok(())
    }

    /// Refresh every fulfillment order still in flight, one at a time,
    /// logging and skipping the ones that fail
    pub async fn update_fulfillment_orders(&self) -> anyhow::Result<usize> {
        let mut updated = 0;
        for mut order in fulfillment_orders::list_unresolved().await? {
            match self.update_fulfillment_order(&mut order).await {
                Ok(()) => updated += 1,
                Err(e) => {
                    tracing::error!(
                        "Failed to update fulfillment order {}: {:#}",
                        order.fulfillment_id,
                        e
                    )
                }
            }
        }
        tracing::info!("Refreshed {} fulfillment orders", updated);
        Ok(updated)
    }

    /// Upsert one reported shipment. When the reported status equals
    /// the stored one the whole downstream cascade (packages, line
    /// assignment, shipping event) is skipped, which is what makes the
    /// reconciliation idempotent.
    async fn reconcile_shipment(
        &self,
        fulfillment_order: &FulfillmentOrder,
        member: &XmlNode,
    ) -> anyhow::Result<()> {
        let Some(shipment_id) = member.child_text("AmazonShipmentId") else {
            tracing::warn!("Reported shipment has no AmazonShipmentId, skipped");
            return Ok(());
        };
        let status = member
            .child_text("FulfillmentShipmentStatus")
            .unwrap_or_default()
            .to_string();
        let fulfillment_center_id = member
            .child_text("FulfillmentCenterId")
            .unwrap_or_default()
            .to_string();
        let date_estimated_arrival = parse_date(member, "EstimatedArrivalDateTime");
        let date_shipped = parse_date(member, "ShippingDateTime");

        let shipment = match fulfillment_orders::get_shipment_by_shipment_id(shipment_id).await? {
            Some(mut existing) => {
                if existing.status == status {
                    return Ok(());
                }
                existing.status = status.clone();
                existing.fulfillment_center_id = fulfillment_center_id;
                existing.date_estimated_arrival = date_estimated_arrival;
                existing.date_shipped = date_shipped;
                fulfillment_orders::update_shipment(&existing).await?;
                existing
            }
            None => {
                let fresh = FulfillmentShipment {
                    id: Uuid::new_v4(),
                    shipment_id: shipment_id.to_string(),
                    order: fulfillment_order.order,
                    status: status.clone(),
                    fulfillment_center_id,
                    date_estimated_arrival,
                    date_shipped,
                };
                fulfillment_orders::insert_shipment(&fresh).await?;
                fresh
            }
        };

        let mut notes: Vec<String> = Vec::new();
        let mut packages_by_number: Vec<(i32, Uuid)> = Vec::new();
        if let Some(packages) = member.child("FulfillmentShipmentPackage") {
            for package in packages.members() {
                let Some(number) = package
                    .child_text("PackageNumber")
                    .and_then(|v| v.parse::<i32>().ok())
                else {
                    continue;
                };
                let tracking_number = package
                    .child_text("TrackingNumber")
                    .unwrap_or_default()
                    .to_string();
                let carrier_code = package
                    .child_text("CarrierCode")
                    .unwrap_or_default()
                    .to_string();
                notes.push(format!(
                    "* Shipped package via {} with tracking number {}",
                    carrier_code, tracking_number
                ));
                let row = match fulfillment_orders::get_package(shipment.id, number).await? {
                    Some(mut existing) => {
                        existing.tracking_number = tracking_number;
                        existing.carrier_code = carrier_code;
                        fulfillment_orders::update_package(&existing).await?;
                        existing
                    }
                    None => {
                        let fresh = ShipmentPackage {
                            id: Uuid::new_v4(),
                            shipment: shipment.id,
                            package_number: number,
                            tracking_number,
                            carrier_code,
                        };
                        fulfillment_orders::insert_package(&fresh).await?;
                        fresh
                    }
                };
                packages_by_number.push((number, row.id));
            }
        }

        let mut event = ShippingEvent::new(fulfillment_order.order, status.clone());
        if !notes.is_empty() {
            event.notes = Some(notes.join("\n"));
        }
        shipping_events::insert(&event).await?;

        if let Some(items) = member.child("FulfillmentShipmentItem") {
            self.assign_lines(fulfillment_order, &shipment, &packages_by_number, &event, items)
                .await?;
        }
        Ok(())
    }

    /// Distribute reported item quantities over the order lines that
    /// share the SKU, oldest line first, and record the per-line event
    /// quantities
    async fn assign_lines(
        &self,
        fulfillment_order: &FulfillmentOrder,
        shipment: &FulfillmentShipment,
        packages_by_number: &[(i32, Uuid)],
        event: &ShippingEvent,
        items: &XmlNode,
    ) -> anyhow::Result<()> {
        let fo_lines = fulfillment_orders::list_lines(fulfillment_order.base.id).await?;
        let order_lines = store_orders::list_lines(fulfillment_order.order).await?;

        for item in items.members() {
            let Some(sku) = item.child_text("SellerSKU") else { continue };
            let quantity = item
                .child_text("Quantity")
                .and_then(|v| v.parse::<i32>().ok())
                .unwrap_or(0);
            let package = item
                .child_text("PackageNumber")
                .and_then(|v| v.parse::<i32>().ok())
                .and_then(|n| {
                    packages_by_number
                        .iter()
                        .find(|(number, _)| *number == n)
                        .map(|(_, id)| *id)
                });

            let mut matching: Vec<_> = fo_lines
                .iter()
                .filter(|fl| {
                    order_lines
                        .iter()
                        .any(|ol| ol.id == fl.order_line && ol.partner_sku == sku)
                })
                .collect();
            // Lines sharing a SKU fill up in item-identifier order
            matching.sort_by(|a, b| a.order_item_id.cmp(&b.order_item_id));
            if matching.is_empty() {
                tracing::warn!("Reported SKU {} has no matching order line", sku);
                continue;
            }
            let caps: Vec<i32> = matching.iter().map(|fl| fl.quantity).collect();
            let allocation = allocate_quantity(quantity, &caps);

            for (fl, allocated) in matching.iter().zip(allocation) {
                if allocated == 0 {
                    continue;
                }
                let mut line = (*fl).clone();
                line.shipment = Some(shipment.id);
                line.package = package;
                fulfillment_orders::update_line(&line).await?;
                shipping_events::insert_quantity(&ShippingEventQuantity {
                    id: Uuid::new_v4(),
                    event: event.id,
                    order_line: line.order_line,
                    quantity: allocated,
                })
                .await?;
            }
        }
        Ok(())
    }
}

/// Split a reported total over line capacities, first line first, each
/// share clamped to its line's capacity
pub fn allocate_quantity(total: i32, caps: &[i32]) -> Vec<i32> {
    let mut remaining = total.max(0);
    caps.iter()
        .map(|cap| {
            let take = remaining.min((*cap).max(0));
            remaining -= take;
            take
        })
        .collect()
}

fn parse_date(node: &XmlNode, name: &str) -> Option<DateTime<Utc>> {
    node.child_text(name)
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|d| d.with_timezone(&Utc))
}
