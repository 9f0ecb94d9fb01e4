use chrono::Utc;
use contracts::domain::a001_merchant_account::aggregate::MerchantAccountId;
use contracts::domain::a004_feed_submission::aggregate::{
    FeedReport, FeedResult, FeedSubmission, FeedSubmissionId, FeedSubmissionMessage,
};
use contracts::domain::a006_catalog_product::aggregate::CatalogProductId;
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use contracts::enums::{FeedType, ProcessingStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a004_feed_submission")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub submission_id: String,
    pub feed_type: String,
    pub date_submitted: chrono::DateTime<chrono::Utc>,
    pub processing_status: String,
    pub merchant: String,
    pub feed_xml: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub mod message {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "a004_feed_submission_message")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub submission: String,
        pub product: String,
        pub message_id: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod report {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "a004_feed_report")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub submission: String,
        pub status_code: String,
        pub processed: i32,
        pub successful: i32,
        pub errors: i32,
        pub warnings: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod result {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "a004_feed_result")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub report: String,
        pub message_code: String,
        pub result_type: String,
        pub description: String,
        pub product: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<Model> for FeedSubmission {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let merchant = Uuid::parse_str(&m.merchant).unwrap_or_else(|_| Uuid::new_v4());

        FeedSubmission {
            base: BaseAggregate::with_metadata(
                FeedSubmissionId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            submission_id: m.submission_id,
            feed_type: FeedType::from_tag(&m.feed_type),
            date_submitted: m.date_submitted,
            processing_status: ProcessingStatus::from_tag(&m.processing_status)
                .unwrap_or(ProcessingStatus::Submitted),
            merchant: MerchantAccountId(merchant),
            feed_xml: m.feed_xml,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

fn to_active(aggregate: &FeedSubmission) -> ActiveModel {
    ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        submission_id: Set(aggregate.submission_id.clone()),
        feed_type: Set(aggregate.feed_type.as_tag().to_string()),
        date_submitted: Set(aggregate.date_submitted),
        processing_status: Set(aggregate.processing_status.as_tag().to_string()),
        merchant: Set(aggregate.merchant.value().to_string()),
        feed_xml: Set(aggregate.feed_xml.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    }
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<FeedSubmission>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

/// Lookup by the `(submission_id, date_submitted, feed_type)` natural
/// key used for reconciliation
pub async fn get_by_natural_key(
    submission_id: &str,
    date_submitted: chrono::DateTime<chrono::Utc>,
    feed_type: &FeedType,
) -> anyhow::Result<Option<FeedSubmission>> {
    let result = Entity::find()
        .filter(Column::SubmissionId.eq(submission_id))
        .filter(Column::DateSubmitted.eq(date_submitted))
        .filter(Column::FeedType.eq(feed_type.as_tag()))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

/// All submissions still in a non-terminal processing state
pub async fn list_unprocessed() -> anyhow::Result<Vec<FeedSubmission>> {
    let items: Vec<FeedSubmission> = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .all(conn())
        .await?
        .into_iter()
        .map(FeedSubmission::from)
        .filter(|s| !s.processing_status.is_terminal())
        .collect();
    Ok(items)
}

pub async fn insert(aggregate: &FeedSubmission) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    to_active(aggregate).insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &FeedSubmission) -> anyhow::Result<()> {
    to_active(aggregate).update(conn()).await?;
    Ok(())
}

pub async fn insert_message(link: &FeedSubmissionMessage) -> anyhow::Result<()> {
    let active = message::ActiveModel {
        id: Set(link.id.to_string()),
        submission: Set(link.submission.value().to_string()),
        product: Set(link.product.value().to_string()),
        message_id: Set(link.message_id),
    };
    active.insert(conn()).await?;
    Ok(())
}

pub async fn list_messages(
    submission: FeedSubmissionId,
) -> anyhow::Result<Vec<FeedSubmissionMessage>> {
    let rows = message::Entity::find()
        .filter(message::Column::Submission.eq(submission.value().to_string()))
        .order_by_asc(message::Column::MessageId)
        .all(conn())
        .await?;
    let items = rows
        .into_iter()
        .filter_map(|row| {
            let id = Uuid::parse_str(&row.id).ok()?;
            let product = Uuid::parse_str(&row.product).ok()?;
            Some(FeedSubmissionMessage {
                id,
                submission,
                product: CatalogProductId(product),
                message_id: row.message_id,
            })
        })
        .collect();
    Ok(items)
}

pub async fn get_report_by_submission(
    submission: FeedSubmissionId,
) -> anyhow::Result<Option<FeedReport>> {
    let row = report::Entity::find()
        .filter(report::Column::Submission.eq(submission.value().to_string()))
        .one(conn())
        .await?;
    Ok(row.and_then(|r| {
        let id = Uuid::parse_str(&r.id).ok()?;
        Some(FeedReport {
            id,
            submission,
            status_code: r.status_code,
            processed: r.processed,
            successful: r.successful,
            errors: r.errors,
            warnings: r.warnings,
        })
    }))
}

fn report_to_active(report: &FeedReport) -> report::ActiveModel {
    report::ActiveModel {
        id: Set(report.id.to_string()),
        submission: Set(report.submission.value().to_string()),
        status_code: Set(report.status_code.clone()),
        processed: Set(report.processed),
        successful: Set(report.successful),
        errors: Set(report.errors),
        warnings: Set(report.warnings),
    }
}

pub async fn insert_report(report: &FeedReport) -> anyhow::Result<()> {
    report_to_active(report).insert(conn()).await?;
    Ok(())
}

pub async fn update_report(report: &FeedReport) -> anyhow::Result<()> {
    report_to_active(report).update(conn()).await?;
    Ok(())
}

pub async fn insert_result(result: &FeedResult) -> anyhow::Result<()> {
    let active = result::ActiveModel {
        id: Set(result.id.to_string()),
        report: Set(result.report.to_string()),
        message_code: Set(result.message_code.clone()),
        result_type: Set(result.result_type.clone()),
        description: Set(result.description.clone()),
        product: Set(result.product.map(|p| p.value().to_string())),
    };
    active.insert(conn()).await?;
    Ok(())
}

pub async fn list_results_by_report(report_id: Uuid) -> anyhow::Result<Vec<FeedResult>> {
    let rows = result::Entity::find()
        .filter(result::Column::Report.eq(report_id.to_string()))
        .all(conn())
        .await?;
    let items = rows
        .into_iter()
        .filter_map(|row| {
            let id = Uuid::parse_str(&row.id).ok()?;
            Some(FeedResult {
                id,
                report: report_id,
                message_code: row.message_code,
                result_type: row.result_type,
                description: row.description,
                product: row
                    .product
                    .as_deref()
                    .and_then(|p| Uuid::parse_str(p).ok())
                    .map(CatalogProductId),
            })
        })
        .collect();
    Ok(items)
}
