//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::response::PageParams;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fields needed to create an account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Admin-side feedback filters (`?status=pending&rating=thumbs_down`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackFilter {
    pub status: Option<FeedbackStatus>,
    pub rating: Option<Rating>,
    pub analysis_type: Option<AnalysisKind>,
    pub user_id: Option<Uuid>,
}

impl FeedbackFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(status) = self.status {
            cond = cond.add(FeedbackColumn::Status.eq(status));
        }
        if let Some(rating) = self.rating {
            cond = cond.add(FeedbackColumn::Rating.eq(rating));
        }
        if let Some(kind) = self.analysis_type {
            cond = cond.add(FeedbackColumn::TargetType.eq(kind));
        }
        if let Some(user_id) = self.user_id {
            cond = cond.add(FeedbackColumn::UserId.eq(user_id));
        }
        cond
    }
}

/// Aggregate feedback counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStatistics {
    pub total: u64,
    pub thumbs_up: u64,
    pub thumbs_down: u64,
    pub pending: u64,
    pub reviewed: u64,
    pub resolved: u64,
    /// Share of thumbs-up ratings, in percent
    pub satisfaction_rate: f64,
}

impl FeedbackStatistics {
    fn satisfaction(thumbs_up: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            let rate = thumbs_up as f64 / total as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        }
    }
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Insert a user. Email is stored lower-cased.
    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let email = new.email.trim().to_lowercase();
        let username = new.username.trim().to_string();

        if self.email_exists(&email).await? {
            return Err(AppError::DuplicateEmail { email });
        }
        if self.username_exists(&username).await? {
            return Err(AppError::DuplicateUsername { username });
        }

        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.clone()),
            username: Set(username.clone()),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            password_hash: Set(new.password_hash),
            is_active: Set(true),
            is_staff: Set(new.is_staff),
            is_superuser: Set(new.is_superuser),
            date_joined: Set(Utc::now().into()),
            last_login: Set(None),
        };

        match user.insert(self.write_conn()).await {
            Ok(user) => Ok(user),
            // Lost a race with a concurrent insert; ask the table which key clashed
            Err(e) if AppError::is_unique_violation(&e) => {
                if self.email_exists(&email).await? {
                    Err(AppError::DuplicateEmail { email })
                } else {
                    Err(AppError::DuplicateUsername { username })
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by email (case-insensitive)
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email.trim().to_lowercase()))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.find_user_by_email(email).await?.is_some())
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let count = UserEntity::find()
            .filter(UserColumn::Username.eq(username.trim()))
            .count(self.read_conn())
            .await?;
        Ok(count > 0)
    }

    /// Record a successful login
    pub async fn touch_last_login(&self, user: User) -> Result<User> {
        let mut active: UserActiveModel = user.into();
        active.last_login = Set(Some(Utc::now().into()));
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a user; submissions, analyses and feedback cascade
    pub async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let result = UserEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Submission & Analysis Operations
    // ========================================================================

    pub async fn create_text_submission(&self, user_id: Uuid, content: String) -> Result<TextSubmission> {
        let submission = TextSubmissionActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            content: Set(content),
            created_at: Set(Utc::now().into()),
        };

        submission.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn create_image_submission(
        &self,
        user_id: Uuid,
        file_name: String,
        content_type: String,
    ) -> Result<ImageSubmission> {
        let submission = ImageSubmissionActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            file_name: Set(file_name),
            content_type: Set(content_type),
            created_at: Set(Utc::now().into()),
        };

        submission.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Store a text analysis result under a fixed id
    pub async fn create_text_analysis(
        &self,
        id: Uuid,
        submission_id: Uuid,
        verdict: String,
        confidence: f64,
        summary: String,
        details: serde_json::Value,
    ) -> Result<TextAnalysis> {
        let analysis = TextAnalysisActiveModel {
            id: Set(id),
            submission_id: Set(submission_id),
            verdict: Set(verdict),
            confidence: Set(confidence),
            summary: Set(summary),
            details: Set(details),
            created_at: Set(Utc::now().into()),
        };

        analysis.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Store an image analysis result under a fixed id
    pub async fn create_image_analysis(
        &self,
        id: Uuid,
        submission_id: Uuid,
        verdict: String,
        confidence: f64,
        summary: String,
        details: serde_json::Value,
    ) -> Result<ImageAnalysis> {
        let analysis = ImageAnalysisActiveModel {
            id: Set(id),
            submission_id: Set(submission_id),
            verdict: Set(verdict),
            confidence: Set(confidence),
            summary: Set(summary),
            details: Set(details),
            created_at: Set(Utc::now().into()),
        };

        analysis.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Text analysis joined with its submission
    pub async fn find_text_analysis(&self, id: Uuid) -> Result<Option<(TextAnalysis, TextSubmission)>> {
        let row = TextAnalysisEntity::find_by_id(id)
            .find_also_related(TextSubmissionEntity)
            .one(self.read_conn())
            .await?;

        Ok(row.and_then(|(analysis, submission)| submission.map(|s| (analysis, s))))
    }

    /// Image analysis joined with its submission
    pub async fn find_image_analysis(&self, id: Uuid) -> Result<Option<(ImageAnalysis, ImageSubmission)>> {
        let row = ImageAnalysisEntity::find_by_id(id)
            .find_also_related(ImageSubmissionEntity)
            .one(self.read_conn())
            .await?;

        Ok(row.and_then(|(analysis, submission)| submission.map(|s| (analysis, s))))
    }

    // ========================================================================
    // Feedback Operations
    // ========================================================================

    /// Create a feedback row; a second row for the same target is refused
    pub async fn create_feedback(
        &self,
        user_id: Uuid,
        target_type: AnalysisKind,
        target_id: Uuid,
        rating: Rating,
        comment: Option<String>,
    ) -> Result<Feedback> {
        if self
            .find_feedback_for_target(user_id, target_type, target_id)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateFeedback);
        }

        let now = Utc::now();
        let feedback = FeedbackActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            target_type: Set(target_type),
            target_id: Set(target_id),
            rating: Set(rating),
            comment: Set(comment),
            status: Set(FeedbackStatus::Pending),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            resolved_at: Set(None),
        };

        // A concurrent insert can still trip the unique index
        feedback.insert(self.write_conn()).await.map_err(|e| {
            if AppError::is_unique_violation(&e) {
                AppError::DuplicateFeedback
            } else {
                e.into()
            }
        })
    }

    /// Find feedback by ID
    pub async fn find_feedback_by_id(&self, id: Uuid) -> Result<Option<Feedback>> {
        FeedbackEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// A user's feedback on one analysis, if any
    pub async fn find_feedback_for_target(
        &self,
        user_id: Uuid,
        target_type: AnalysisKind,
        target_id: Uuid,
    ) -> Result<Option<Feedback>> {
        FeedbackEntity::find()
            .filter(FeedbackColumn::UserId.eq(user_id))
            .filter(FeedbackColumn::TargetType.eq(target_type))
            .filter(FeedbackColumn::TargetId.eq(target_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List feedback matching a filter, newest first
    pub async fn list_feedback(
        &self,
        filter: &FeedbackFilter,
        page: PageParams,
    ) -> Result<(Vec<Feedback>, u64)> {
        let page = page.normalized();
        let paginator = FeedbackEntity::find()
            .filter(filter.condition())
            .order_by_desc(FeedbackColumn::CreatedAt)
            .paginate(self.read_conn(), page.page_size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;

        Ok((items, total))
    }

    /// List one user's feedback, newest first
    pub async fn list_user_feedback(
        &self,
        user_id: Uuid,
        page: PageParams,
    ) -> Result<(Vec<Feedback>, u64)> {
        let filter = FeedbackFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        self.list_feedback(&filter, page).await
    }

    /// Delete feedback by ID
    pub async fn delete_feedback(&self, id: Uuid) -> Result<bool> {
        let result = FeedbackEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Pending -> reviewed. Later states come back unchanged.
    pub async fn mark_feedback_reviewed(&self, id: Uuid) -> Result<Feedback> {
        let feedback = self.load_feedback_for_update(id).await?;

        match feedback.clone().mark_reviewed() {
            Some(active) => active.update(self.write_conn()).await.map_err(Into::into),
            None => Ok(feedback),
        }
    }

    /// Resolve and stamp `resolved_at` with the current time
    pub async fn mark_feedback_resolved(&self, id: Uuid) -> Result<Feedback> {
        let feedback = self.load_feedback_for_update(id).await?;

        feedback
            .mark_resolved(Utc::now().into())
            .update(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn load_feedback_for_update(&self, id: Uuid) -> Result<Feedback> {
        FeedbackEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::FeedbackNotFound { id: id.to_string() })
    }

    async fn count_feedback(&self, filter: &FeedbackFilter) -> Result<u64> {
        FeedbackEntity::find()
            .filter(filter.condition())
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Counts per rating and status; `None` covers every user
    pub async fn feedback_statistics(&self, user_id: Option<Uuid>) -> Result<FeedbackStatistics> {
        let base = FeedbackFilter {
            user_id,
            ..Default::default()
        };

        let total = self.count_feedback(&base).await?;
        let thumbs_up = self.count_feedback(&FeedbackFilter { rating: Some(Rating::ThumbsUp), ..base.clone() }).await?;
        let thumbs_down = self.count_feedback(&FeedbackFilter { rating: Some(Rating::ThumbsDown), ..base.clone() }).await?;
        let pending = self.count_feedback(&FeedbackFilter { status: Some(FeedbackStatus::Pending), ..base.clone() }).await?;
        let reviewed = self.count_feedback(&FeedbackFilter { status: Some(FeedbackStatus::Reviewed), ..base.clone() }).await?;
        let resolved = self.count_feedback(&FeedbackFilter { status: Some(FeedbackStatus::Resolved), ..base }).await?;

        Ok(FeedbackStatistics {
            total,
            thumbs_up,
            thumbs_down,
            pending,
            reviewed,
            resolved,
            satisfaction_rate: FeedbackStatistics::satisfaction(thumbs_up, total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;

    #[test]
    fn test_satisfaction_rate() {
        assert_eq!(FeedbackStatistics::satisfaction(0, 0), 0.0);
        assert_eq!(FeedbackStatistics::satisfaction(1, 3), 33.33);
        assert_eq!(FeedbackStatistics::satisfaction(4, 4), 100.0);
    }

    #[tokio::test]
    async fn test_resolving_twice_restamps() {
        let repo = test_support::memory_repository().await;
        let owner = test_support::user(&repo, "alice").await;
        let analysis = test_support::text_analysis(&repo, owner.id).await;
        let feedback = repo
            .create_feedback(owner.id, AnalysisKind::TextAnalysis, analysis, Rating::ThumbsDown, None)
            .await
            .unwrap();

        let first = repo.mark_feedback_resolved(feedback.id).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo.mark_feedback_resolved(feedback.id).await.unwrap();

        let t1 = first.resolved_at.unwrap();
        let t2 = second.resolved_at.unwrap();
        assert!(t2 >= t1);
        assert_eq!(second.status, FeedbackStatus::Resolved);

        let stored = repo.find_feedback_by_id(feedback.id).await.unwrap().unwrap();
        assert_eq!(stored.resolved_at, Some(t2));
    }

    #[tokio::test]
    async fn test_duplicate_user_keys_are_told_apart() {
        let repo = test_support::memory_repository().await;
        test_support::user(&repo, "alice").await;

        let new_user = |email: &str, username: &str| NewUser {
            email: email.to_string(),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "unused".to_string(),
            is_staff: false,
            is_superuser: false,
        };

        let err = repo.create_user(new_user("ALICE@example.com", "alice2")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail { .. }));

        let err = repo.create_user(new_user("other@example.com", "alice")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername { .. }));
    }

    #[test]
    fn test_filter_deserializes_wire_names() {
        let filter: FeedbackFilter = serde_json::from_value(serde_json::json!({
            "status": "reviewed",
            "rating": "thumbs_down",
            "analysis_type": "image_analysis",
        }))
        .unwrap();

        assert_eq!(filter.status, Some(FeedbackStatus::Reviewed));
        assert_eq!(filter.rating, Some(Rating::ThumbsDown));
        assert_eq!(filter.analysis_type, Some(AnalysisKind::ImageAnalysis));
        assert!(filter.user_id.is_none());
    }
}
