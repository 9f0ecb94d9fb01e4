use contracts::domain::a003_amazon_profile::aggregate::{AmazonProfile, FulfillmentBy};
use contracts::domain::a006_catalog_product::aggregate::{CatalogProduct, CatalogProductId};
use contracts::enums::OperationType;

use crate::shared::mws::{FieldMap, FieldValue, XmlNode};

use super::mappers::{MappingContext, ProductMapper};

const DOCUMENT_VERSION: &str = "1.01";
const SCHEMA_LOCATION: &str = "amzn-envelope.xsd";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Render one field as an XML element. Maps become nested elements,
/// lists repeat the element name.
fn field_to_nodes(name: &str, value: &FieldValue) -> Vec<XmlNode> {
    match value {
        FieldValue::Map(entries) => {
            let mut node = XmlNode::new(name);
            for (key, inner) in entries {
                for child in field_to_nodes(key, inner) {
                    node.push(child);
                }
            }
            vec![node]
        }
        FieldValue::List(items) => items
            .iter()
            .flat_map(|item| field_to_nodes(name, item))
            .collect(),
        scalar => vec![XmlNode::elem(name, scalar.render())],
    }
}

/// Feed envelope under construction. Message IDs are assigned from 1
/// in submission order; the products behind each message are recorded
/// so processing results can be traced back later.
pub struct FeedEnvelope {
    merchant_identifier: String,
    message_type: String,
    purge_and_replace: bool,
    messages: Vec<XmlNode>,
    products: Vec<(i64, CatalogProductId)>,
}

impl FeedEnvelope {
    pub fn new(merchant_identifier: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            merchant_identifier: merchant_identifier.into(),
            message_type: message_type.into(),
            purge_and_replace: false,
            messages: Vec::new(),
            products: Vec::new(),
        }
    }

    pub fn purge_and_replace(mut self, enabled: bool) -> Self {
        self.purge_and_replace = enabled;
        self
    }

    /// Append a payload message and return its assigned message ID
    pub fn add_message(
        &mut self,
        operation: OperationType,
        payload: XmlNode,
        product: Option<CatalogProductId>,
    ) -> i64 {
        let message_id = self.messages.len() as i64 + 1;
        let mut message = XmlNode::new("Message")
            .with_child(XmlNode::elem("MessageID", message_id.to_string()))
            .with_child(XmlNode::elem("OperationType", operation.as_str()));
        message.push(payload);
        self.messages.push(message);
        if let Some(product) = product {
            self.products.push((message_id, product));
        }
        message_id
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Message-to-product trace recorded while the envelope was built
    pub fn product_messages(&self) -> &[(i64, CatalogProductId)] {
        &self.products
    }

    pub fn build(&self) -> XmlNode {
        let mut envelope = XmlNode::new("AmazonEnvelope")
            .with_attr("xmlns:xsi", XSI_NAMESPACE)
            .with_attr("xsi:noNamespaceSchemaLocation", SCHEMA_LOCATION)
            .with_child(
                XmlNode::new("Header")
                    .with_child(XmlNode::elem("DocumentVersion", DOCUMENT_VERSION))
                    .with_child(XmlNode::elem(
                        "MerchantIdentifier",
                        self.merchant_identifier.clone(),
                    )),
            )
            .with_child(XmlNode::elem("MessageType", self.message_type.clone()))
            .with_child(XmlNode::elem(
                "PurgeAndReplace",
                if self.purge_and_replace { "true" } else { "false" },
            ));
        for message in &self.messages {
            envelope.push(message.clone());
        }
        envelope
    }
}

/// Builds Product feed envelopes from catalog products and their
/// profiles
pub struct ProductFeedWriter {
    mapper: ProductMapper,
}

impl ProductFeedWriter {
    pub fn new(mapper: ProductMapper) -> Self {
        Self { mapper }
    }

    pub fn write(
        &self,
        merchant_identifier: &str,
        items: &[(CatalogProduct, AmazonProfile)],
        purge_and_replace: bool,
    ) -> FeedEnvelope {
        let mut envelope = FeedEnvelope::new(merchant_identifier, "Product")
            .purge_and_replace(purge_and_replace);
        for (product, profile) in items {
            let ctx = MappingContext { product, profile };
            let mut payload = XmlNode::new("Product");
            for (name, value) in self.mapper.base_fields(&ctx).iter() {
                for node in field_to_nodes(name, value) {
                    payload.push(node);
                }
            }
            let description = self.mapper.description_fields(&ctx);
            if !description.is_empty() {
                let mut description_data = XmlNode::new("DescriptionData");
                for (name, value) in description.iter() {
                    for node in field_to_nodes(name, value) {
                        description_data.push(node);
                    }
                }
                payload.push(description_data);
            }
            envelope.add_message(OperationType::Update, payload, Some(product.base.id));
        }
        envelope
    }
}

impl Default for ProductFeedWriter {
    fn default() -> Self {
        Self::new(ProductMapper::new())
    }
}

/// Builds Inventory feed envelopes that move products between the
/// merchant and Amazon fulfillment networks
pub struct InventoryFeedWriter;

impl InventoryFeedWriter {
    /// One message per SKU. `fulfillment_center_id` names the regional
    /// network the product switches into.
    pub fn write(
        merchant_identifier: &str,
        items: &[(CatalogProductId, String, String)],
        switch_to: FulfillmentBy,
    ) -> FeedEnvelope {
        let mut envelope = FeedEnvelope::new(merchant_identifier, "Inventory");
        for (product, sku, fulfillment_center_id) in items {
            let payload = XmlNode::new("Inventory")
                .with_child(XmlNode::elem("SKU", sku.clone()))
                .with_child(XmlNode::elem(
                    "FulfillmentCenterID",
                    fulfillment_center_id.clone(),
                ))
                .with_child(XmlNode::elem("Lookup", "FulfillmentNetwork"))
                .with_child(XmlNode::elem("SwitchFulfillmentTo", switch_to.as_str()));
            envelope.add_message(OperationType::Update, payload, Some(*product));
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_items() -> Vec<(CatalogProduct, AmazonProfile)> {
        let mut product = CatalogProduct::new_for_insert(
            "Leather wallet".into(),
            Some("883028551234".into()),
        );
        product.brand = Some("Acme".into());
        let profile = AmazonProfile::new_for_insert(product.base.id, "WALLET-1".into());
        vec![(product, profile)]
    }

    #[test]
    fn envelope_carries_header_and_schema_location() {
        let writer = ProductFeedWriter::default();
        let items = sample_items();
        let envelope = writer.write("SELLER-1", &items, false).build();
        assert_eq!(envelope.attr("xsi:noNamespaceSchemaLocation"), Some(SCHEMA_LOCATION));
        let header = envelope.child("Header").unwrap();
        assert_eq!(header.child_text("DocumentVersion"), Some("1.01"));
        assert_eq!(header.child_text("MerchantIdentifier"), Some("SELLER-1"));
        assert_eq!(envelope.child_text("MessageType"), Some("Product"));
        assert_eq!(envelope.child_text("PurgeAndReplace"), Some("false"));
    }

    #[test]
    fn message_ids_start_at_one_and_trace_products() {
        let writer = ProductFeedWriter::default();
        let mut items = sample_items();
        items.extend(sample_items());
        let envelope = writer.write("SELLER-1", &items, false);
        let built = envelope.build();
        let ids: Vec<_> = built
            .children_named("Message")
            .filter_map(|m| m.child_text("MessageID"))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(envelope.product_messages().len(), 2);
        assert_eq!(envelope.product_messages()[0].0, 1);
        assert_eq!(envelope.product_messages()[1].0, 2);
    }

    #[test]
    fn product_message_nests_description_data() {
        let writer = ProductFeedWriter::default();
        let items = sample_items();
        let envelope = writer.write("SELLER-1", &items, false).build();
        let message = envelope.child("Message").unwrap();
        assert_eq!(message.child_text("OperationType"), Some("Update"));
        let product = message.child("Product").unwrap();
        assert_eq!(product.child_text("SKU"), Some("WALLET-1"));
        let spid = product.child("StandardProductID").unwrap();
        assert_eq!(spid.child_text("Type"), Some("UPC"));
        assert_eq!(spid.child_text("Value"), Some("883028551234"));
        let description = product.child("DescriptionData").unwrap();
        assert_eq!(description.child_text("Title"), Some("Leather wallet"));
        assert_eq!(description.child_text("Brand"), Some("Acme"));
    }

    #[test]
    fn inventory_messages_switch_fulfillment_network() {
        let product = CatalogProductId::new_v4();
        let items = vec![(product, "WALLET-1".to_string(), "AMAZON_NA".to_string())];
        let envelope =
            InventoryFeedWriter::write("SELLER-1", &items, FulfillmentBy::Amazon).build();
        assert_eq!(envelope.child_text("MessageType"), Some("Inventory"));
        let inventory = envelope.child("Message").unwrap().child("Inventory").unwrap();
        assert_eq!(inventory.child_text("SKU"), Some("WALLET-1"));
        assert_eq!(inventory.child_text("FulfillmentCenterID"), Some("AMAZON_NA"));
        assert_eq!(inventory.child_text("Lookup"), Some("FulfillmentNetwork"));
        assert_eq!(inventory.child_text("SwitchFulfillmentTo"), Some("AFN"));
    }
}
