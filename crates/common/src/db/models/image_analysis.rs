//! Image analysis result entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image_analysis_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub submission_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub verdict: String,

    pub confidence: f64,

    #[sea_orm(column_type = "Text")]
    pub summary: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub details: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::image_submission::Entity",
        from = "Column::SubmissionId",
        to = "super::image_submission::Column::Id",
        on_delete = "Cascade"
    )]
    Submission,
}

impl Related<super::image_submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
