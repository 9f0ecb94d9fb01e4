use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use contracts::domain::a001_merchant_account::aggregate::MerchantAccount;
use contracts::domain::a003_amazon_profile::aggregate::{AmazonProfile, FulfillmentBy};
use contracts::domain::a004_feed_submission::aggregate::{
    FeedReport, FeedResult, FeedSubmission, FeedSubmissionMessage,
};
use contracts::domain::a006_catalog_product::aggregate::{CatalogProduct, CatalogProductId};
use contracts::enums::{FeedType, ProcessingStatus};
use contracts::usecases::u501_feed_export::response::{FeedInfo, SubmitFeedOutcome};

use crate::domain::a001_merchant_account::repository as merchants;
use crate::domain::a002_amazon_marketplace::repository as marketplaces;
use crate::domain::a003_amazon_profile::repository as profiles;
use crate::domain::a004_feed_submission::repository as submissions;
use crate::shared::mws::{ConnectionRegistry, MwsError, XmlNode};

use super::writers::{FeedEnvelope, InventoryFeedWriter, ProductFeedWriter};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("all products in a feed must belong to the same merchant")]
    MixedMerchants,
    #[error("nothing to submit, the feed has no messages")]
    EmptyFeed,
}

/// Feed export and submission lifecycle operations
pub struct FeedsGateway {
    registry: Arc<ConnectionRegistry>,
    writer: ProductFeedWriter,
}

impl FeedsGateway {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            writer: ProductFeedWriter::default(),
        }
    }

    pub fn with_writer(registry: Arc<ConnectionRegistry>, writer: ProductFeedWriter) -> Self {
        Self { registry, writer }
    }

    /// Build and submit a Product feed for one merchant. A dry run
    /// renders the envelope and stops short of the wire.
    pub async fn submit_product_feed(
        &self,
        merchant: &MerchantAccount,
        items: &[(CatalogProduct, AmazonProfile)],
        purge_and_replace: bool,
        dry_run: bool,
    ) -> anyhow::Result<SubmitFeedOutcome> {
        if items.is_empty() {
            return Err(FeedError::EmptyFeed.into());
        }
        let marketplace_ids = self.validate_single_merchant(merchant, items).await?;

        let envelope = self.writer.write(&merchant.seller_id, items, purge_and_replace);
        let xml = envelope.build().to_xml(false);
        if dry_run {
            return Ok(SubmitFeedOutcome::DryRun(vec![envelope.build().to_xml(true)]));
        }

        let api = self.registry.get(merchant);
        let response = api
            .submit_feed(&xml, FeedType::PostProductData.as_tag(), &marketplace_ids)
            .await?;
        let submission = self
            .record_submission(merchant, &response, Some(xml), envelope.product_messages())
            .await?;
        tracing::info!(
            "Submitted product feed {} with {} messages",
            submission.submission_id,
            items.len()
        );
        Ok(SubmitFeedOutcome::Submitted(vec![submission.submission_id]))
    }

    /// Switch products between fulfillment networks via an Inventory
    /// feed, then mirror the change on the local profiles
    pub async fn switch_product_fulfillment(
        &self,
        merchant: &MerchantAccount,
        items: &mut [(CatalogProduct, AmazonProfile)],
        switch_to: FulfillmentBy,
    ) -> anyhow::Result<FeedSubmission> {
        if items.is_empty() {
            return Err(FeedError::EmptyFeed.into());
        }
        let marketplace_ids = self.validate_single_merchant(merchant, items).await?;

        let mut messages: Vec<(CatalogProductId, String, String)> = Vec::new();
        for (product, profile) in items.iter() {
            let center = self
                .fulfillment_center_for(merchant, profile)
                .await?
                .unwrap_or_else(|| merchant.region.fulfillment_center().to_string());
            messages.push((product.base.id, profile.sku.clone(), center));
        }
        let envelope = InventoryFeedWriter::write(&merchant.seller_id, &messages, switch_to);
        let xml = envelope.build().to_xml(false);

        let api = self.registry.get(merchant);
        let response = api
            .submit_feed(
                &xml,
                FeedType::PostInventoryAvailabilityData.as_tag(),
                &marketplace_ids,
            )
            .await?;
        let submission = self
            .record_submission(merchant, &response, Some(xml), envelope.product_messages())
            .await?;

        for (_, profile) in items.iter_mut() {
            profile.fulfillment_by = switch_to;
            profile.before_write();
            profiles::update(profile).await?;
        }
        Ok(submission)
    }

    /// Poll the processing status of one submission. Returns whether
    /// the local status changed.
    pub async fn update_feed_submission(
        &self,
        submission: &mut FeedSubmission,
    ) -> anyhow::Result<bool> {
        let merchant = merchants::get_by_id(submission.merchant.value())
            .await?
            .ok_or_else(|| anyhow::anyhow!("merchant not found for submission"))?;
        let api = self.registry.get(&merchant);
        let response = api
            .get_feed_submission_list(std::slice::from_ref(&submission.submission_id))
            .await?;
        warn_on_has_next(&response);

        let Some(info) = find_submission_info(&response, &submission.submission_id) else {
            tracing::warn!(
                "Submission {} not present in status listing",
                submission.submission_id
            );
            return Ok(false);
        };
        let Some(status) = info
            .child_text("FeedProcessingStatus")
            .and_then(ProcessingStatus::from_tag)
        else {
            tracing::warn!(
                "Unknown processing status for submission {}",
                submission.submission_id
            );
            return Ok(false);
        };
        if status == submission.processing_status {
            return Ok(false);
        }
        submission.processing_status = status;
        submission.before_write();
        submissions::update(submission).await?;
        Ok(true)
    }

    /// Poll all non-terminal submissions, one status call per
    /// merchant. Returns only the submissions whose status moved.
    pub async fn update_feed_submissions(&self) -> anyhow::Result<Vec<FeedSubmission>> {
        let mut by_merchant: HashMap<Uuid, Vec<FeedSubmission>> = HashMap::new();
        for submission in submissions::list_unprocessed().await? {
            by_merchant
                .entry(submission.merchant.value())
                .or_default()
                .push(submission);
        }
        let mut changed = Vec::new();
        for (merchant_id, batch) in by_merchant {
            let Some(merchant) = merchants::get_by_id(merchant_id).await? else {
                tracing::error!(
                    "Merchant {} not found for {} pending submissions",
                    merchant_id,
                    batch.len()
                );
                continue;
            };
            match self.poll_merchant_batch(&merchant, batch).await {
                Ok(mut moved) => changed.append(&mut moved),
                Err(e) => tracing::error!(
                    "Failed to poll submissions for merchant {}: {:#}",
                    merchant.seller_id,
                    e
                ),
            }
        }
        tracing::info!("Updated feed submissions, {} changed", changed.len());
        Ok(changed)
    }

    /// Poll one merchant's pending submissions with a single listing
    /// call carrying all their IDs
    async fn poll_merchant_batch(
        &self,
        merchant: &MerchantAccount,
        batch: Vec<FeedSubmission>,
    ) -> anyhow::Result<Vec<FeedSubmission>> {
        let ids: Vec<String> = batch.iter().map(|s| s.submission_id.clone()).collect();
        let api = self.registry.get(merchant);
        let response = api.get_feed_submission_list(&ids).await?;
        warn_on_has_next(&response);

        let mut changed = Vec::new();
        for mut submission in batch {
            let Some(info) = find_submission_info(&response, &submission.submission_id) else {
                tracing::warn!(
                    "Submission {} not present in status listing",
                    submission.submission_id
                );
                continue;
            };
            let Some(status) = info
                .child_text("FeedProcessingStatus")
                .and_then(ProcessingStatus::from_tag)
            else {
                tracing::warn!(
                    "Unknown processing status for submission {}",
                    submission.submission_id
                );
                continue;
            };
            if status != submission.processing_status {
                submission.processing_status = status;
                submission.before_write();
                submissions::update(&submission).await?;
                changed.push(submission);
            }
        }
        Ok(changed)
    }

    /// Fetch and store the processing report of one submission. The
    /// report upserts; result line items append on every call.
    pub async fn process_submission_results(
        &self,
        submission: &FeedSubmission,
    ) -> anyhow::Result<Option<FeedReport>> {
        let merchant = merchants::get_by_id(submission.merchant.value())
            .await?
            .ok_or_else(|| anyhow::anyhow!("merchant not found for submission"))?;
        let api = self.registry.get(&merchant);
        let response = api
            .get_feed_submission_result(&submission.submission_id)
            .await?;

        let Some(processing_report) = response.find_first("ProcessingReport") else {
            return Err(MwsError::Parse("response has no ProcessingReport".into()).into());
        };
        let transaction_id = processing_report
            .child_text("DocumentTransactionID")
            .unwrap_or_default();
        if transaction_id != submission.submission_id {
            tracing::warn!(
                "Processing report for transaction {} does not match submission {}, skipped",
                transaction_id,
                submission.submission_id
            );
            return Ok(None);
        }

        let summary = processing_report.child("ProcessingSummary");
        let count = |name: &str| -> i32 {
            summary
                .and_then(|s| s.child_text(name))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        };
        let mut report = match submissions::get_report_by_submission(submission.base.id).await? {
            Some(existing) => existing,
            None => {
                let fresh = FeedReport {
                    id: Uuid::new_v4(),
                    submission: submission.base.id,
                    status_code: String::new(),
                    processed: 0,
                    successful: 0,
                    errors: 0,
                    warnings: 0,
                };
                submissions::insert_report(&fresh).await?;
                fresh
            }
        };
        report.status_code = processing_report
            .child_text("StatusCode")
            .unwrap_or_default()
            .to_string();
        report.processed = count("MessagesProcessed");
        report.successful = count("MessagesSuccessful");
        report.errors = count("MessagesWithError");
        report.warnings = count("MessagesWithWarning");
        submissions::update_report(&report).await?;

        for result in processing_report.children_named("Result") {
            let product = match result.path(&["AdditionalInfo", "SKU"]).and_then(|n| n.text.as_deref()) {
                Some(sku) => profiles::get_by_sku(sku).await?.map(|p| p.product),
                None => None,
            };
            let row = FeedResult {
                id: Uuid::new_v4(),
                report: report.id,
                message_code: result
                    .child_text("ResultMessageCode")
                    .unwrap_or_default()
                    .to_string(),
                result_type: result.child_text("ResultCode").unwrap_or_default().to_string(),
                description: result
                    .child_text("ResultDescription")
                    .unwrap_or_default()
                    .to_string(),
                product,
            };
            submissions::insert_result(&row).await?;
        }
        Ok(Some(report))
    }

    /// Ask the vendor to cancel a submission and merge the reported
    /// state locally. The local row is only written when the status
    /// actually moved; an unknown submission gets a fresh local row.
    pub async fn cancel_submission(
        &self,
        merchant: &MerchantAccount,
        submission_id: &str,
    ) -> anyhow::Result<FeedSubmission> {
        let api = self.registry.get(merchant);
        let ids = vec![submission_id.to_string()];
        let response = api.cancel_feed_submissions(&ids).await?;
        let info = find_submission_info(&response, submission_id)
            .ok_or_else(|| MwsError::Parse("cancellation response has no submission info".into()))?;
        let (parsed_id, feed_type, date_submitted, status) = parse_submission_info(info)?;

        match submissions::get_by_natural_key(&parsed_id, date_submitted, &feed_type).await? {
            Some(mut existing) => {
                if existing.processing_status != status {
                    existing.processing_status = status;
                    existing.before_write();
                    submissions::update(&existing).await?;
                }
                Ok(existing)
            }
            None => {
                let fresh = FeedSubmission::new_for_insert(
                    parsed_id,
                    feed_type,
                    date_submitted,
                    status,
                    merchant.base.id,
                );
                submissions::insert(&fresh).await?;
                Ok(fresh)
            }
        }
    }

    /// Remote listing of every submission the vendor knows for this
    /// merchant. Read-only, nothing is written locally.
    pub async fn list_submitted_feeds(
        &self,
        merchant: &MerchantAccount,
    ) -> anyhow::Result<Vec<FeedInfo>> {
        let api = self.registry.get(merchant);
        let response = api.get_feed_submission_list(&[]).await?;
        warn_on_has_next(&response);
        let parse_date = |info: &XmlNode, name: &str| -> Option<DateTime<Utc>> {
            info.child_text(name)
                .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                .map(|d| d.with_timezone(&Utc))
        };
        let mut feeds = Vec::new();
        for info in collect_submission_infos(&response) {
            feeds.push(FeedInfo {
                submission_id: info
                    .child_text("FeedSubmissionId")
                    .unwrap_or_default()
                    .to_string(),
                feed_type: info.child_text("FeedType").unwrap_or_default().to_string(),
                status: info
                    .child_text("FeedProcessingStatus")
                    .unwrap_or_default()
                    .to_string(),
                date_submitted: parse_date(info, "SubmittedDate"),
                date_processing_started: parse_date(info, "StartedProcessingDate"),
                date_processing_ended: parse_date(info, "CompletedProcessingDate"),
            });
        }
        Ok(feeds)
    }

    /// Look up ASINs for the given profiles by seller SKU and store
    /// them. Returns the number of profiles updated.
    pub async fn update_product_identifiers(
        &self,
        merchant: &MerchantAccount,
        items: &mut [AmazonProfile],
    ) -> anyhow::Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let skus: Vec<String> = items.iter().map(|p| p.sku.clone()).collect();
        let marketplace_ids: Vec<Option<String>> = {
            let known = marketplaces::list_by_merchant(merchant.base.id).await?;
            if known.is_empty() {
                vec![None]
            } else {
                known.into_iter().map(|m| Some(m.marketplace_id)).collect()
            }
        };

        let api = self.registry.get(merchant);
        let mut updated = 0;
        for marketplace_id in marketplace_ids {
            let response = api
                .get_matching_product_for_id(marketplace_id.as_deref(), "SellerSKU", &skus)
                .await?;
            for result in response.children_named("GetMatchingProductForIdResult") {
                if result.attr("status") != Some("Success") {
                    continue;
                }
                let Some(sku) = result.attr("Id") else { continue };
                let Some(asin) = result.find_first("ASIN").map(|n| n.text_content()) else {
                    continue;
                };
                if let Some(profile) = items.iter_mut().find(|p| p.sku == sku) {
                    if profile.asin.as_deref() != Some(asin) {
                        profile.asin = Some(asin.to_string());
                        profile.before_write();
                        profiles::update(profile).await?;
                        updated += 1;
                    }
                }
            }
        }
        tracing::info!("Updated identifiers for {} profiles", updated);
        Ok(updated)
    }

    /// Upsert a submission row from a SubmitFeed-style response, using
    /// the `(submission_id, date_submitted, feed_type)` natural key.
    /// Message-to-product links are written once, with the first
    /// insert of the row.
    async fn record_submission(
        &self,
        merchant: &MerchantAccount,
        response: &XmlNode,
        feed_xml: Option<String>,
        messages: &[(i64, CatalogProductId)],
    ) -> anyhow::Result<FeedSubmission> {
        let info = response
            .find_first("FeedSubmissionInfo")
            .ok_or_else(|| MwsError::Parse("response has no FeedSubmissionInfo".into()))?;
        let (submission_id, feed_type, date_submitted, status) = parse_submission_info(info)?;

        match submissions::get_by_natural_key(&submission_id, date_submitted, &feed_type).await? {
            Some(mut existing) => {
                // Link rows already exist for this natural key
                existing.processing_status = status;
                existing.before_write();
                submissions::update(&existing).await?;
                Ok(existing)
            }
            None => {
                let mut fresh = FeedSubmission::new_for_insert(
                    submission_id,
                    feed_type,
                    date_submitted,
                    status,
                    merchant.base.id,
                );
                fresh.feed_xml = feed_xml;
                submissions::insert(&fresh).await?;
                for (message_id, product) in messages {
                    submissions::insert_message(&FeedSubmissionMessage {
                        id: Uuid::new_v4(),
                        submission: fresh.base.id,
                        product: *product,
                        message_id: *message_id,
                    })
                    .await?;
                }
                Ok(fresh)
            }
        }
    }

    /// Check that every profile's marketplaces belong to the merchant
    /// submitting the feed, collecting the distinct marketplace IDs on
    /// the way
    async fn validate_single_merchant(
        &self,
        merchant: &MerchantAccount,
        items: &[(CatalogProduct, AmazonProfile)],
    ) -> anyhow::Result<Vec<String>> {
        let mut marketplace_ids: Vec<String> = Vec::new();
        for (_, profile) in items {
            for marketplace in &profile.marketplaces {
                let Some(found) = marketplaces::get_by_id(marketplace.value()).await? else {
                    continue;
                };
                if found.merchant != merchant.base.id {
                    return Err(FeedError::MixedMerchants.into());
                }
                if !marketplace_ids.contains(&found.marketplace_id) {
                    marketplace_ids.push(found.marketplace_id);
                }
            }
        }
        Ok(marketplace_ids)
    }

    async fn fulfillment_center_for(
        &self,
        _merchant: &MerchantAccount,
        profile: &AmazonProfile,
    ) -> anyhow::Result<Option<String>> {
        for marketplace in &profile.marketplaces {
            if let Some(found) = marketplaces::get_by_id(marketplace.value()).await? {
                return Ok(Some(found.fulfillment_center_id().to_string()));
            }
        }
        Ok(None)
    }
}

fn collect_submission_infos(response: &XmlNode) -> Vec<&XmlNode> {
    fn walk<'a>(node: &'a XmlNode, out: &mut Vec<&'a XmlNode>) {
        if node.name == "FeedSubmissionInfo" {
            out.push(node);
            return;
        }
        for child in &node.children {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    walk(response, &mut out);
    out
}

fn find_submission_info<'a>(response: &'a XmlNode, submission_id: &str) -> Option<&'a XmlNode> {
    collect_submission_infos(response)
        .into_iter()
        .find(|info| info.child_text("FeedSubmissionId") == Some(submission_id))
}

fn parse_submission_info(
    info: &XmlNode,
) -> Result<(String, FeedType, DateTime<Utc>, ProcessingStatus), MwsError> {
    let submission_id = info
        .child_text("FeedSubmissionId")
        .ok_or_else(|| MwsError::Parse("submission info has no FeedSubmissionId".into()))?
        .to_string();
    let feed_type = FeedType::from_tag(info.child_text("FeedType").unwrap_or_default());
    let date_submitted = info
        .child_text("SubmittedDate")
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|d| d.with_timezone(&Utc))
        .ok_or_else(|| MwsError::Parse("submission info has no valid SubmittedDate".into()))?;
    let status = info
        .child_text("FeedProcessingStatus")
        .and_then(ProcessingStatus::from_tag)
        .unwrap_or(ProcessingStatus::Submitted);
    Ok((submission_id, feed_type, date_submitted, status))
}

/// Listing responses are paginated; only the first page is consumed
fn warn_on_has_next(response: &XmlNode) {
    let has_next = response
        .find_first("HasNext")
        .map(|n| n.text_content() == "true")
        .unwrap_or(false);
    if has_next {
        tracing::warn!("Submission listing has further pages, only the first was fetched");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        init_test_db, registry_with, run, seeded_marketplace, seeded_merchant,
        seeded_product_with_profile, submission_info_node, submission_list_response,
        submit_feed_response, MockMwsApi,
    };
    use chrono::SubsecRound;

    fn gateway(mock: std::sync::Arc<MockMwsApi>) -> FeedsGateway {
        FeedsGateway::new(registry_with(mock))
    }

    #[test]
    fn dry_run_renders_without_touching_the_api() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let marketplace = seeded_marketplace(&merchant).await;
            let items = vec![seeded_product_with_profile(Some(&marketplace)).await];

            let mock = MockMwsApi::new();
            let gateway = gateway(mock.clone());
            let outcome = gateway
                .submit_product_feed(&merchant, &items, false, true)
                .await
                .unwrap();
            match outcome {
                SubmitFeedOutcome::DryRun(documents) => {
                    assert_eq!(documents.len(), 1);
                    assert!(documents[0].contains("<AmazonEnvelope"));
                    assert!(documents[0].contains(&merchant.seller_id));
                }
                other => panic!("expected dry run, got {:?}", other),
            }
            assert!(mock.calls().is_empty());
        });
    }

    #[test]
    fn submission_is_recorded_with_message_links() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let marketplace = seeded_marketplace(&merchant).await;
            let items = vec![
                seeded_product_with_profile(Some(&marketplace)).await,
                seeded_product_with_profile(Some(&marketplace)).await,
            ];

            let submission_id = Uuid::new_v4().simple().to_string();
            let submitted = Utc::now().trunc_subsecs(0);
            let mock = MockMwsApi::new();
            mock.queue(submit_feed_response(
                &submission_id,
                "_POST_PRODUCT_DATA_",
                submitted,
            ));
            let gateway = gateway(mock.clone());
            let outcome = gateway
                .submit_product_feed(&merchant, &items, false, false)
                .await
                .unwrap();
            match outcome {
                SubmitFeedOutcome::Submitted(ids) => assert_eq!(ids, vec![submission_id.clone()]),
                other => panic!("expected submission, got {:?}", other),
            }

            let stored = submissions::get_by_natural_key(
                &submission_id,
                submitted,
                &FeedType::PostProductData,
            )
            .await
            .unwrap()
            .expect("submission stored");
            assert_eq!(stored.processing_status, ProcessingStatus::Submitted);
            assert!(stored.feed_xml.as_deref().unwrap_or("").contains("<Message>"));
            let messages = submissions::list_messages(stored.base.id).await.unwrap();
            let ids: Vec<i64> = messages.iter().map(|m| m.message_id).collect();
            assert_eq!(ids, vec![1, 2]);
        });
    }

    #[test]
    fn foreign_marketplace_rejects_the_whole_feed() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let other = seeded_merchant().await;
            let foreign = seeded_marketplace(&other).await;
            let items = vec![seeded_product_with_profile(Some(&foreign)).await];

            let mock = MockMwsApi::new();
            let gateway = gateway(mock.clone());
            let err = gateway
                .submit_product_feed(&merchant, &items, false, false)
                .await
                .unwrap_err();
            assert!(err.to_string().contains("same merchant"));
            assert!(mock.calls().is_empty());
        });
    }

    #[test]
    fn polling_only_reports_real_status_changes() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let submission_id = Uuid::new_v4().simple().to_string();
            let mut submission = FeedSubmission::new_for_insert(
                submission_id.clone(),
                FeedType::PostProductData,
                Utc::now().trunc_subsecs(0),
                ProcessingStatus::Submitted,
                merchant.base.id,
            );
            submissions::insert(&submission).await.unwrap();

            let mock = MockMwsApi::new();
            let in_progress = || {
                submission_list_response(
                    vec![submission_info_node(
                        &submission_id,
                        "_POST_PRODUCT_DATA_",
                        submission.date_submitted,
                        "_IN_PROGRESS_",
                    )],
                    false,
                )
            };
            mock.queue(in_progress());
            mock.queue(in_progress());

            let gateway = gateway(mock);
            assert!(gateway.update_feed_submission(&mut submission).await.unwrap());
            assert_eq!(submission.processing_status, ProcessingStatus::InProgress);
            // Second poll reports the same state and must be a no-op
            assert!(!gateway.update_feed_submission(&mut submission).await.unwrap());
        });
    }

    #[test]
    fn resubmitted_feed_keeps_a_single_set_of_message_links() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let marketplace = seeded_marketplace(&merchant).await;
            let items = vec![
                seeded_product_with_profile(Some(&marketplace)).await,
                seeded_product_with_profile(Some(&marketplace)).await,
            ];

            let submission_id = Uuid::new_v4().simple().to_string();
            let submitted = Utc::now().trunc_subsecs(0);
            let mock = MockMwsApi::new();
            mock.queue(submit_feed_response(
                &submission_id,
                "_POST_PRODUCT_DATA_",
                submitted,
            ));
            mock.queue(submit_feed_response(
                &submission_id,
                "_POST_PRODUCT_DATA_",
                submitted,
            ));

            let gateway = gateway(mock);
            gateway
                .submit_product_feed(&merchant, &items, false, false)
                .await
                .unwrap();
            // The vendor reports the same submission for the retry;
            // the existing row merges without duplicating its links
            gateway
                .submit_product_feed(&merchant, &items, false, false)
                .await
                .unwrap();

            let stored = submissions::get_by_natural_key(
                &submission_id,
                submitted,
                &FeedType::PostProductData,
            )
            .await
            .unwrap()
            .expect("submission stored");
            let messages = submissions::list_messages(stored.base.id).await.unwrap();
            assert_eq!(messages.len(), 2);
        });
    }

    #[test]
    fn pending_submissions_poll_with_one_listing_call_per_merchant() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let submitted = Utc::now().trunc_subsecs(0);
            let mut batch = Vec::new();
            for _ in 0..2 {
                let submission = FeedSubmission::new_for_insert(
                    Uuid::new_v4().simple().to_string(),
                    FeedType::PostProductData,
                    submitted,
                    ProcessingStatus::Submitted,
                    merchant.base.id,
                );
                submissions::insert(&submission).await.unwrap();
                batch.push(submission);
            }
            let infos: Vec<XmlNode> = batch
                .iter()
                .map(|s| {
                    submission_info_node(
                        &s.submission_id,
                        "_POST_PRODUCT_DATA_",
                        s.date_submitted,
                        "_DONE_",
                    )
                })
                .collect();
            let mock = MockMwsApi::new();
            mock.queue(submission_list_response(infos, false));

            let gateway = gateway(mock.clone());
            let changed = gateway.poll_merchant_batch(&merchant, batch).await.unwrap();
            assert_eq!(changed.len(), 2);
            assert!(changed
                .iter()
                .all(|s| s.processing_status == ProcessingStatus::Done));
            assert_eq!(mock.calls().len(), 1);
        });
    }

    #[test]
    fn cancellation_creates_the_local_row_when_missing() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let submission_id = Uuid::new_v4().simple().to_string();
            let submitted = Utc::now().trunc_subsecs(0);
            let response = || {
                XmlNode::new("CancelFeedSubmissionsResponse").with_child(
                    XmlNode::new("CancelFeedSubmissionsResult").with_child(submission_info_node(
                        &submission_id,
                        "_POST_PRODUCT_DATA_",
                        submitted,
                        "_CANCELLED_",
                    )),
                )
            };
            let mock = MockMwsApi::new();
            mock.queue(response());
            mock.queue(response());

            let gateway = gateway(mock);
            let created = gateway
                .cancel_submission(&merchant, &submission_id)
                .await
                .unwrap();
            assert_eq!(created.processing_status, ProcessingStatus::Cancelled);
            let stored = submissions::get_by_natural_key(
                &submission_id,
                submitted,
                &FeedType::PostProductData,
            )
            .await
            .unwrap()
            .expect("row created locally");

            // Same reported state again: the stored row must not be
            // rewritten
            let merged = gateway
                .cancel_submission(&merchant, &submission_id)
                .await
                .unwrap();
            assert_eq!(merged.base.id, created.base.id);
            assert_eq!(
                merged.base.metadata.updated_at,
                stored.base.metadata.updated_at
            );
        });
    }

    #[test]
    fn processing_report_upserts_and_links_results() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let marketplace = seeded_marketplace(&merchant).await;
            let (product, profile) = seeded_product_with_profile(Some(&marketplace)).await;
            let submission_id = Uuid::new_v4().simple().to_string();
            let submission = FeedSubmission::new_for_insert(
                submission_id.clone(),
                FeedType::PostProductData,
                Utc::now().trunc_subsecs(0),
                ProcessingStatus::Done,
                merchant.base.id,
            );
            submissions::insert(&submission).await.unwrap();

            let report_response = |transaction_id: &str| {
                XmlNode::new("AmazonEnvelope").with_child(
                    XmlNode::new("Message").with_child(
                        XmlNode::new("ProcessingReport")
                            .with_child(XmlNode::elem("DocumentTransactionID", transaction_id))
                            .with_child(XmlNode::elem("StatusCode", "Complete"))
                            .with_child(
                                XmlNode::new("ProcessingSummary")
                                    .with_child(XmlNode::elem("MessagesProcessed", "2"))
                                    .with_child(XmlNode::elem("MessagesSuccessful", "1"))
                                    .with_child(XmlNode::elem("MessagesWithError", "1"))
                                    .with_child(XmlNode::elem("MessagesWithWarning", "0")),
                            )
                            .with_child(
                                XmlNode::new("Result")
                                    .with_child(XmlNode::elem("MessageID", "2"))
                                    .with_child(XmlNode::elem("ResultCode", "Error"))
                                    .with_child(XmlNode::elem("ResultMessageCode", "8560"))
                                    .with_child(XmlNode::elem(
                                        "ResultDescription",
                                        "SKU does not match any ASIN",
                                    ))
                                    .with_child(
                                        XmlNode::new("AdditionalInfo")
                                            .with_child(XmlNode::elem("SKU", profile.sku.clone())),
                                    ),
                            ),
                    ),
                )
            };
            let mock = MockMwsApi::new();
            mock.queue(report_response(&submission_id));
            mock.queue(report_response(&submission_id));
            mock.queue(report_response("some-other-transaction"));

            let gateway = gateway(mock);
            let report = gateway
                .process_submission_results(&submission)
                .await
                .unwrap()
                .expect("report");
            assert_eq!(report.status_code, "Complete");
            assert_eq!(report.processed, 2);
            assert_eq!(report.errors, 1);
            let results = submissions::list_results_by_report(report.id).await.unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].product, Some(product.base.id));

            // Fetching again reuses the same report row
            let again = gateway
                .process_submission_results(&submission)
                .await
                .unwrap()
                .expect("report");
            assert_eq!(again.id, report.id);

            // A transaction ID mismatch is skipped, not an error
            assert!(gateway
                .process_submission_results(&submission)
                .await
                .unwrap()
                .is_none());
        });
    }

    #[test]
    fn identifiers_update_matching_profiles_by_sku() {
        run(async {
            init_test_db().await;
            let merchant = seeded_merchant().await;
            let marketplace = seeded_marketplace(&merchant).await;
            let (_, profile) = seeded_product_with_profile(Some(&marketplace)).await;
            let mut items = vec![profile];

            let response = XmlNode::new("GetMatchingProductForIdResponse").with_child(
                XmlNode::new("GetMatchingProductForIdResult")
                    .with_attr("Id", items[0].sku.clone())
                    .with_attr("status", "Success")
                    .with_child(
                        XmlNode::new("Products").with_child(
                            XmlNode::new("Product").with_child(
                                XmlNode::new("Identifiers").with_child(
                                    XmlNode::new("MarketplaceASIN")
                                        .with_child(XmlNode::elem("ASIN", "B0EXAMPLE1")),
                                ),
                            ),
                        ),
                    ),
            );
            let mock = MockMwsApi::new();
            mock.queue(response);

            let gateway = gateway(mock);
            let updated = gateway
                .update_product_identifiers(&merchant, &mut items)
                .await
                .unwrap();
            assert_eq!(updated, 1);
            assert_eq!(items[0].asin.as_deref(), Some("B0EXAMPLE1"));
            let stored = profiles::get_by_sku(&items[0].sku).await.unwrap().unwrap();
            assert_eq!(stored.asin.as_deref(), Some("B0EXAMPLE1"));
        });
    }
}
