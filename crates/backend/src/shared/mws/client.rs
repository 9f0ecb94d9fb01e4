use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use contracts::domain::a001_merchant_account::aggregate::MerchantAccount;

use super::api::MwsApi;
use super::error::MwsError;
use super::fields::{FieldMap, FieldValue};
use super::tree::XmlNode;

type HmacSha256 = Hmac<Sha256>;

/// (request path, API version) per service section
const FEEDS: (&str, &str) = ("/", "2009-01-01");
const OUTBOUND: (&str, &str) = ("/FulfillmentOutboundShipment/2010-10-01", "2010-10-01");
const INVENTORY: (&str, &str) = ("/FulfillmentInventory/2010-10-01", "2010-10-01");
const SELLERS: (&str, &str) = ("/Sellers/2011-07-01", "2011-07-01");
const PRODUCTS: (&str, &str) = ("/Products/2011-10-01", "2011-10-01");

/// Signed HTTP client for one merchant account. Every request carries
/// the common credential parameters and a Signature Version 2
/// HMAC-SHA256 signature over the canonical query string.
pub struct HttpMwsApi {
    seller_id: String,
    access_key: String,
    secret: String,
    host: String,
    client: reqwest::Client,
}

impl HttpMwsApi {
    pub fn new(merchant: &MerchantAccount) -> Self {
        Self {
            seller_id: merchant.seller_id.clone(),
            access_key: merchant.aws_api_key.clone(),
            secret: merchant.aws_api_secret.clone(),
            host: merchant.region.endpoint().to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn sign(&self, path: &str, query: &str) -> Result<String, MwsError> {
        let string_to_sign = format!("POST\n{}\n{}\n{}", self.host, path, query);
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| MwsError::Transport(format!("invalid signing key: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    async fn call(
        &self,
        section: (&str, &str),
        action: &str,
        mut params: BTreeMap<String, String>,
        body: Option<String>,
    ) -> Result<XmlNode, MwsError> {
        let (path, version) = section;
        params.insert("Action".into(), action.to_string());
        params.insert("AWSAccessKeyId".into(), self.access_key.clone());
        params.insert("SellerId".into(), self.seller_id.clone());
        params.insert("SignatureMethod".into(), "HmacSHA256".into());
        params.insert("SignatureVersion".into(), "2".into());
        params.insert(
            "Timestamp".into(),
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        params.insert("Version".into(), version.to_string());

        // BTreeMap iteration gives the byte-sorted order the canonical
        // string requires
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let signature = self.sign(path, &query)?;
        let signed_query = format!("{}&Signature={}", query, urlencoding::encode(&signature));

        let url = format!("https://{}{}?{}", self.host, path, signed_query);
        let request = match body {
            Some(content) => self
                .client
                .post(&url)
                .header("Content-Type", "text/xml")
                .body(content),
            None => self
                .client
                .post(&url)
                .header("Content-Type", "application/x-www-form-urlencoded"),
        };

        let response = request
            .send()
            .await
            .map_err(|e| MwsError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| MwsError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(parse_error_response(&text, status.as_u16()));
        }
        XmlNode::from_xml(&text)
    }
}

/// Error responses carry a structured Error element; anything else
/// degrades to a transport error with the status code.
fn parse_error_response(body: &str, status: u16) -> MwsError {
    if let Ok(tree) = XmlNode::from_xml(body) {
        if let Some(error) = tree.find_first("Error") {
            let request_id = tree
                .find_first("RequestID")
                .or_else(|| tree.find_first("RequestId"))
                .map(|n| n.text_content().to_string())
                .unwrap_or_default();
            return MwsError::Api {
                code: error.child_text("Code").unwrap_or_default().to_string(),
                reason: error.child_text("Type").unwrap_or_default().to_string(),
                message: error.child_text("Message").unwrap_or_default().to_string(),
                request_id,
            };
        }
    }
    MwsError::Transport(format!("request failed with status {}", status))
}

/// Flatten structured request fields into query parameters. Maps
/// become dotted prefixes and lists become `member.N` entries, both
/// nesting arbitrarily.
pub fn flatten_fields(fields: &FieldMap, out: &mut BTreeMap<String, String>) {
    for (name, value) in fields.iter() {
        flatten_value(name, value, out);
    }
}

fn flatten_value(prefix: &str, value: &FieldValue, out: &mut BTreeMap<String, String>) {
    match value {
        FieldValue::Map(entries) => {
            for (key, inner) in entries {
                flatten_value(&format!("{}.{}", prefix, key), inner, out);
            }
        }
        FieldValue::List(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(&format!("{}.member.{}", prefix, index + 1), item, out);
            }
        }
        scalar => {
            out.insert(prefix.to_string(), scalar.render());
        }
    }
}

fn id_list(name: &str, ids: &[String]) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for (index, id) in ids.iter().enumerate() {
        params.insert(format!("{}.Id.{}", name, index + 1), id.clone());
    }
    params
}

#[async_trait]
impl MwsApi for HttpMwsApi {
    async fn submit_feed(
        &self,
        feed_content: &str,
        feed_type: &str,
        marketplace_ids: &[String],
    ) -> Result<XmlNode, MwsError> {
        let mut params = id_list("MarketplaceIdList", marketplace_ids);
        params.insert("FeedType".into(), feed_type.to_string());
        self.call(FEEDS, "SubmitFeed", params, Some(feed_content.to_string()))
            .await
    }

    async fn get_feed_submission_list(
        &self,
        submission_ids: &[String],
    ) -> Result<XmlNode, MwsError> {
        let params = id_list("FeedSubmissionIdList", submission_ids);
        self.call(FEEDS, "GetFeedSubmissionList", params, None).await
    }

    async fn get_feed_submission_result(
        &self,
        submission_id: &str,
    ) -> Result<XmlNode, MwsError> {
        let mut params = BTreeMap::new();
        params.insert("FeedSubmissionId".into(), submission_id.to_string());
        self.call(FEEDS, "GetFeedSubmissionResult", params, None)
            .await
    }

    async fn cancel_feed_submissions(
        &self,
        submission_ids: &[String],
    ) -> Result<XmlNode, MwsError> {
        let params = id_list("FeedSubmissionIdList", submission_ids);
        self.call(FEEDS, "CancelFeedSubmissions", params, None).await
    }

    async fn create_fulfillment_order(&self, fields: &FieldMap) -> Result<XmlNode, MwsError> {
        let mut params = BTreeMap::new();
        flatten_fields(fields, &mut params);
        self.call(OUTBOUND, "CreateFulfillmentOrder", params, None)
            .await
    }

    async fn get_fulfillment_order(&self, fulfillment_id: &str) -> Result<XmlNode, MwsError> {
        let mut params = BTreeMap::new();
        params.insert(
            "SellerFulfillmentOrderId".into(),
            fulfillment_id.to_string(),
        );
        self.call(OUTBOUND, "GetFulfillmentOrder", params, None).await
    }

    async fn list_inventory_supply(&self, skus: &[String]) -> Result<XmlNode, MwsError> {
        let mut params = BTreeMap::new();
        for (index, sku) in skus.iter().enumerate() {
            params.insert(format!("SellerSkus.member.{}", index + 1), sku.clone());
        }
        self.call(INVENTORY, "ListInventorySupply", params, None)
            .await
    }

    async fn list_marketplace_participations(&self) -> Result<XmlNode, MwsError> {
        self.call(
            SELLERS,
            "ListMarketplaceParticipations",
            BTreeMap::new(),
            None,
        )
        .await
    }

    async fn get_matching_product_for_id(
        &self,
        marketplace_id: Option<&str>,
        id_type: &str,
        ids: &[String],
    ) -> Result<XmlNode, MwsError> {
        let mut params = id_list("IdList", ids);
        params.insert("IdType".into(), id_type.to_string());
        if let Some(marketplace_id) = marketplace_id {
            params.insert("MarketplaceId".into(), marketplace_id.to_string());
        }
        self.call(PRODUCTS, "GetMatchingProductForId", params, None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn maps_flatten_to_dotted_prefixes() {
        let mut fields = FieldMap::new();
        fields.insert(
            "DestinationAddress",
            FieldValue::Map(vec![
                ("Name".into(), FieldValue::text("John Doe")),
                ("City".into(), FieldValue::text("Exeter")),
            ]),
        );
        let mut params = BTreeMap::new();
        flatten_fields(&fields, &mut params);
        assert_eq!(
            params.get("DestinationAddress.Name").map(String::as_str),
            Some("John Doe")
        );
        assert_eq!(
            params.get("DestinationAddress.City").map(String::as_str),
            Some("Exeter")
        );
    }

    #[test]
    fn lists_flatten_to_one_based_member_entries() {
        let mut item = FieldMap::new();
        item.insert("SellerSKU", FieldValue::text("SKU-1"));
        item.insert("Quantity", FieldValue::Int(2));
        item.insert(
            "PerUnitDeclaredValue",
            FieldValue::Map(vec![
                ("CurrencyCode".into(), FieldValue::text("USD")),
                ("Value".into(), FieldValue::Decimal(dec!(12.99))),
            ]),
        );
        let mut fields = FieldMap::new();
        fields.insert(
            "Items",
            FieldValue::List(vec![FieldValue::Map(
                item.iter().cloned().collect::<Vec<_>>(),
            )]),
        );
        let mut params = BTreeMap::new();
        flatten_fields(&fields, &mut params);
        assert_eq!(
            params.get("Items.member.1.SellerSKU").map(String::as_str),
            Some("SKU-1")
        );
        assert_eq!(
            params.get("Items.member.1.Quantity").map(String::as_str),
            Some("2")
        );
        assert_eq!(
            params
                .get("Items.member.1.PerUnitDeclaredValue.Value")
                .map(String::as_str),
            Some("12.99")
        );
    }

    #[test]
    fn error_responses_surface_all_four_fields() {
        let body = r#"<?xml version="1.0"?>
            <ErrorResponse>
                <Error>
                    <Type>Sender</Type>
                    <Code>InvalidParameterValue</Code>
                    <Message>Value for parameter FeedType is invalid.</Message>
                </Error>
                <RequestID>abc-123</RequestID>
            </ErrorResponse>"#;
        match parse_error_response(body, 400) {
            MwsError::Api {
                code,
                reason,
                message,
                request_id,
            } => {
                assert_eq!(code, "InvalidParameterValue");
                assert_eq!(reason, "Sender");
                assert_eq!(message, "Value for parameter FeedType is invalid.");
                assert_eq!(request_id, "abc-123");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_error_bodies_become_transport_errors() {
        match parse_error_response("not xml at all", 503) {
            MwsError::Transport(message) => assert!(message.contains("503")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
