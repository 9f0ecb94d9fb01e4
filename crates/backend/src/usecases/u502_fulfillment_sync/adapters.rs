use contracts::domain::a007_store_order::aggregate::{OrderLine, ShippingAddress, StoreOrder};
use rust_decimal::Decimal;

use crate::shared::mws::{FieldMap, FieldValue};

/// Order-level fields the outbound request cannot do without
pub const ORDER_REQUIRED: &[&str] = &[
    "DisplayableOrderId",
    "DisplayableOrderDateTime",
    "DisplayableOrderComment",
    "DestinationAddress",
    "SellerFulfillmentOrderId",
    "ShippingSpeedCategory",
];

/// Order-level fields included only when truthy
pub const ORDER_OPTIONAL: &[&str] = &["NotificationEmailList"];

/// Line-level fields the outbound request cannot do without
pub const LINE_REQUIRED: &[&str] = &["SellerSKU", "SellerFulfillmentOrderItemId", "Quantity"];

/// Line-level fields included only when truthy
pub const LINE_OPTIONAL: &[&str] = &[
    "DisplayableComment",
    "FulfillmentNetworkSKU",
    "OrderItemDisposition",
    "PerUnitDeclaredValue",
];

/// Deterministic fulfillment IDs for an order: the bare order number
/// when everything ships to one address, otherwise the number suffixed
/// with a 3-digit 1-based sequence per address.
pub fn fulfillment_ids(order_number: &str, address_count: usize) -> Vec<String> {
    if address_count <= 1 {
        return vec![order_number.to_string()];
    }
    (1..=address_count)
        .map(|n| format!("{}-{:03}", order_number, n))
        .collect()
}

/// Externally visible item identifier of a line: the partner line
/// reference when present, the SKU otherwise
pub fn order_item_id(line: &OrderLine) -> String {
    line.partner_line_reference
        .clone()
        .unwrap_or_else(|| line.partner_sku.clone())
}

/// Declared per-unit value of a line. Falls back from the unit price
/// to the line total divided by quantity; absent when the quantity is
/// zero or no price is known.
pub fn per_unit_declared_value(line: &OrderLine) -> Option<Decimal> {
    if let Some(unit) = line.unit_price_incl_tax {
        return Some(unit);
    }
    if line.quantity <= 0 {
        return None;
    }
    line.line_price_incl_tax
        .map(|total| (total / Decimal::from(line.quantity)).round_dp(2))
}

/// Projects an order and its destination onto the order-level request
/// fields
pub struct OrderAdapter {
    pub displayable_comment: String,
    pub shipping_speed: String,
}

impl OrderAdapter {
    pub fn new(displayable_comment: String, shipping_speed: String) -> Self {
        Self {
            displayable_comment,
            shipping_speed,
        }
    }

    pub fn adapt(
        &self,
        order: &StoreOrder,
        address: &ShippingAddress,
        fulfillment_id: &str,
    ) -> anyhow::Result<FieldMap> {
        let mut fields = FieldMap::new();
        fields.insert("DisplayableOrderId", FieldValue::text(order.number.clone()));
        fields.insert(
            "DisplayableOrderDateTime",
            FieldValue::Text(order.date_placed.to_rfc3339()),
        );
        fields.insert(
            "DisplayableOrderComment",
            FieldValue::text(self.displayable_comment.clone()),
        );
        fields.insert("DestinationAddress", destination_address(address));
        fields.insert(
            "SellerFulfillmentOrderId",
            FieldValue::text(fulfillment_id.to_string()),
        );
        fields.insert(
            "ShippingSpeedCategory",
            FieldValue::text(self.shipping_speed.clone()),
        );
        if let Some(email) = &order.email {
            fields.insert_truthy(
                "NotificationEmailList",
                FieldValue::List(vec![FieldValue::text(email.clone())]),
            );
        }

        for name in ORDER_REQUIRED {
            match fields.get(name) {
                Some(value) if value.is_truthy() => {}
                _ => {
                    return Err(anyhow::anyhow!(
                        "required order field {} is missing or empty",
                        name
                    ))
                }
            }
        }
        Ok(fields)
    }
}

fn destination_address(address: &ShippingAddress) -> FieldValue {
    let mut entries: Vec<(String, FieldValue)> = vec![
        ("Name".into(), FieldValue::text(address.name.clone())),
        ("Line1".into(), FieldValue::text(address.line1.clone())),
    ];
    if let Some(line2) = &address.line2 {
        if !line2.is_empty() {
            entries.push(("Line2".into(), FieldValue::text(line2.clone())));
        }
    }
    if let Some(line3) = &address.line3 {
        if !line3.is_empty() {
            entries.push(("Line3".into(), FieldValue::text(line3.clone())));
        }
    }
    entries.push(("City".into(), FieldValue::text(address.city.clone())));
    if let Some(state) = &address.state {
        if !state.is_empty() {
            entries.push((
                "StateOrProvinceCode".into(),
                FieldValue::text(state.clone()),
            ));
        }
    }
    entries.push((
        "PostalCode".into(),
        FieldValue::text(address.postcode.clone()),
    ));
    entries.push((
        "CountryCode".into(),
        FieldValue::text(address.country_code.clone()),
    ));
    FieldValue::Map(entries)
}

/// Projects order lines onto the Items list of the outbound request
pub struct LineAdapter {
    pub currency_code: String,
}

impl LineAdapter {
    pub fn new(currency_code: String) -> Self {
        Self { currency_code }
    }

    pub fn adapt(&self, line: &OrderLine) -> anyhow::Result<FieldValue> {
        let mut fields = FieldMap::new();
        fields.insert("SellerSKU", FieldValue::text(line.partner_sku.clone()));
        fields.insert(
            "SellerFulfillmentOrderItemId",
            FieldValue::text(order_item_id(line)),
        );
        fields.insert("Quantity", FieldValue::Int(line.quantity as i64));
        if let Some(value) = per_unit_declared_value(line) {
            fields.insert(
                "PerUnitDeclaredValue",
                FieldValue::Map(vec![
                    (
                        "CurrencyCode".into(),
                        FieldValue::text(self.currency_code.clone()),
                    ),
                    ("Value".into(), FieldValue::Decimal(value)),
                ]),
            );
        }

        for name in LINE_REQUIRED {
            match fields.get(name) {
                Some(value) if value.is_truthy() => {}
                _ => {
                    return Err(anyhow::anyhow!(
                        "required line field {} is missing or empty",
                        name
                    ))
                }
            }
        }
        Ok(FieldValue::Map(fields.iter().cloned().collect()))
    }

    pub fn adapt_all(&self, lines: &[OrderLine]) -> anyhow::Result<FieldValue> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            items.push(self.adapt(line)?);
        }
        Ok(FieldValue::List(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::domain::a006_catalog_product::aggregate::CatalogProductId;
    use contracts::domain::a007_store_order::aggregate::StoreOrderId;
    use rust_decimal_macros::dec;

    fn sample_line(quantity: i32) -> OrderLine {
        OrderLine::new(
            StoreOrderId::new_v4(),
            CatalogProductId::new_v4(),
            "WALLET-1".into(),
            quantity,
        )
    }

    #[test]
    fn single_address_keeps_the_bare_order_number() {
        assert_eq!(fulfillment_ids("10042", 1), vec!["10042"]);
    }

    #[test]
    fn multiple_addresses_get_three_digit_suffixes() {
        assert_eq!(
            fulfillment_ids("10042", 2),
            vec!["10042-001", "10042-002"]
        );
    }

    #[test]
    fn declared_value_prefers_the_unit_price() {
        let mut line = sample_line(5);
        line.unit_price_incl_tax = Some(dec!(9.50));
        line.line_price_incl_tax = Some(dec!(64.95));
        assert_eq!(per_unit_declared_value(&line), Some(dec!(9.50)));
    }

    #[test]
    fn declared_value_divides_the_line_total() {
        let mut line = sample_line(5);
        line.line_price_incl_tax = Some(dec!(64.95));
        assert_eq!(per_unit_declared_value(&line), Some(dec!(12.99)));
    }

    #[test]
    fn declared_value_is_absent_without_price_or_quantity() {
        let line = sample_line(5);
        assert_eq!(per_unit_declared_value(&line), None);
        let mut zero_qty = sample_line(0);
        zero_qty.line_price_incl_tax = Some(dec!(64.95));
        assert_eq!(per_unit_declared_value(&zero_qty), None);
    }

    #[test]
    fn line_reference_overrides_the_sku_as_item_id() {
        let mut line = sample_line(1);
        assert_eq!(order_item_id(&line), "WALLET-1");
        line.partner_line_reference = Some("REF-7".into());
        assert_eq!(order_item_id(&line), "REF-7");
    }

    #[test]
    fn order_fields_require_the_full_set() {
        let order = StoreOrder::new_for_insert("10042".into(), Some("jo@example.com".into()));
        let address = ShippingAddress::new(
            "Jo Doe".into(),
            "1 Main St".into(),
            "Exeter".into(),
            "EX4 4PZ".into(),
            "GB".into(),
        );
        let adapter = OrderAdapter::new("Thanks!".into(), "Standard".into());
        let fields = adapter.adapt(&order, &address, "10042").unwrap();
        for name in ORDER_REQUIRED {
            assert!(fields.contains_key(name), "missing {}", name);
        }
        match fields.get("NotificationEmailList") {
            Some(FieldValue::List(emails)) => assert_eq!(emails.len(), 1),
            other => panic!("unexpected email list: {:?}", other),
        }
        match fields.get("DestinationAddress") {
            Some(FieldValue::Map(entries)) => {
                assert!(entries.iter().any(|(k, _)| k == "CountryCode"));
                assert!(!entries.iter().any(|(k, _)| k == "Line2"));
            }
            other => panic!("unexpected address: {:?}", other),
        }
    }

    #[test]
    fn empty_required_field_is_rejected() {
        let order = StoreOrder::new_for_insert("10042".into(), None);
        let address = ShippingAddress::new(
            "Jo Doe".into(),
            "1 Main St".into(),
            "Exeter".into(),
            "EX4 4PZ".into(),
            "GB".into(),
        );
        let adapter = OrderAdapter::new("Thanks!".into(), String::new());
        assert!(adapter.adapt(&order, &address, "10042").is_err());
    }

    #[test]
    fn zero_quantity_line_is_rejected() {
        let line = sample_line(0);
        let adapter = LineAdapter::new("USD".into());
        assert!(adapter.adapt(&line).is_err());
    }
}
