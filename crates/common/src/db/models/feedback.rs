//! Feedback entity: a user's rating of one analysis result plus the
//! admin review lifecycle.
//!
//! The target is polymorphic: `target_type` says which result table
//! `target_id` points into. There is no foreign key on the target; the
//! result does not own its feedback.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// Which analysis store a feedback row points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    #[sea_orm(string_value = "text_analysis")]
    TextAnalysis,
    #[sea_orm(string_value = "image_analysis")]
    ImageAnalysis,
}

impl AnalysisKind {
    /// Human label used in reports and messages
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisKind::TextAnalysis => "Text analysis",
            AnalysisKind::ImageAnalysis => "Image analysis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    #[sea_orm(string_value = "thumbs_up")]
    ThumbsUp,
    #[sea_orm(string_value = "thumbs_down")]
    ThumbsDown,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::ThumbsUp => "thumbs_up",
            Rating::ThumbsDown => "thumbs_down",
        }
    }
}

/// Review status. Only ever advances: pending -> reviewed -> resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "reviewed")]
    Reviewed,
    #[sea_orm(string_value = "resolved")]
    Resolved,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::Reviewed => "reviewed",
            FeedbackStatus::Resolved => "resolved",
        }
    }
}

/// Upper bound on comment length, in characters
pub const MAX_COMMENT_LENGTH: u64 = 1000;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feedback")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub target_type: AnalysisKind,

    pub target_id: Uuid,

    pub rating: Rating,

    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,

    pub status: FeedbackStatus,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    pub resolved_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.status == FeedbackStatus::Pending
    }

    pub fn is_reviewed(&self) -> bool {
        self.status == FeedbackStatus::Reviewed
    }

    pub fn is_resolved(&self) -> bool {
        self.status == FeedbackStatus::Resolved
    }

    /// Pending feedback becomes reviewed. Reviewed or resolved feedback is
    /// left alone, so `None` means there is nothing to write.
    pub fn mark_reviewed(self) -> Option<ActiveModel> {
        if !self.is_pending() {
            return None;
        }

        let mut active: ActiveModel = self.into();
        active.status = Set(FeedbackStatus::Reviewed);
        Some(active)
    }

    /// Resolve and stamp `resolved_at`. Re-resolving re-stamps.
    pub fn mark_resolved(self, at: DateTimeWithTimeZone) -> ActiveModel {
        let mut active: ActiveModel = self.into();
        active.status = Set(FeedbackStatus::Resolved);
        active.resolved_at = Set(Some(at));
        active
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now: DateTimeWithTimeZone = Utc::now().into();

        if insert {
            if self.id.is_not_set() {
                self.id = Set(Uuid::new_v4());
            }
            if self.status.is_not_set() {
                self.status = Set(FeedbackStatus::Pending);
            }
            if self.resolved_at.is_not_set() {
                self.resolved_at = Set(None);
            }
            if self.created_at.is_not_set() {
                self.created_at = Set(now);
            }
        }
        self.updated_at = Set(now);

        Ok(self)
    }
}
