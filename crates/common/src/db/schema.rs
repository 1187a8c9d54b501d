//! Schema bootstrap derived from the entity definitions
//!
//! Creates every table (with foreign keys and cascades) plus the indexes
//! the entities cannot express on their own. Safe to run repeatedly.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{sea_query::Index, ConnectionTrait, EntityTrait, Schema};
use tracing::info;

/// Enforces one feedback row per (user, target type, target id)
pub const FEEDBACK_UNIQUE_INDEX: &str = "uq_feedback_user_target";

const FEEDBACK_TARGET_INDEX: &str = "idx_feedback_target";
const FEEDBACK_STATUS_INDEX: &str = "idx_feedback_status";

/// Create all tables and indexes that do not exist yet
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    // Parents before children so foreign keys resolve
    create_table(db, &schema, UserEntity).await?;
    create_table(db, &schema, TextSubmissionEntity).await?;
    create_table(db, &schema, TextAnalysisEntity).await?;
    create_table(db, &schema, ImageSubmissionEntity).await?;
    create_table(db, &schema, ImageAnalysisEntity).await?;
    create_table(db, &schema, FeedbackEntity).await?;

    let unique = Index::create()
        .if_not_exists()
        .name(FEEDBACK_UNIQUE_INDEX)
        .table(FeedbackEntity)
        .col(FeedbackColumn::UserId)
        .col(FeedbackColumn::TargetType)
        .col(FeedbackColumn::TargetId)
        .unique()
        .to_owned();

    let by_target = Index::create()
        .if_not_exists()
        .name(FEEDBACK_TARGET_INDEX)
        .table(FeedbackEntity)
        .col(FeedbackColumn::TargetType)
        .col(FeedbackColumn::TargetId)
        .to_owned();

    let by_status = Index::create()
        .if_not_exists()
        .name(FEEDBACK_STATUS_INDEX)
        .table(FeedbackEntity)
        .col(FeedbackColumn::Status)
        .to_owned();

    let backend = db.get_database_backend();
    for index in [unique, by_target, by_status] {
        db.execute(backend.build(&index)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();

    db.execute(db.get_database_backend().build(&statement)).await?;
    Ok(())
}
