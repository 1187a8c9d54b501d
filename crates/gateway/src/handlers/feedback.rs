//! Feedback handlers for regular users

use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use lumen_common::{
    analysis::resolve_analysis,
    auth::AuthContext,
    db::models::{feedback::MAX_COMMENT_LENGTH, AnalysisKind, Feedback, FeedbackStatus, Rating},
    db::FeedbackStatistics,
    errors::{AppError, Result},
    metrics,
    response::{Envelope, PageParams, Paginated},
};
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Debug, Deserialize)]
pub struct SubmitFeedbackRequest {
    pub rating: Rating,
    #[serde(default)]
    pub comment: Option<String>,
}

impl SubmitFeedbackRequest {
    /// Blank comments are stored as absent
    fn normalized_comment(&self) -> Result<Option<String>> {
        let Some(comment) = self.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };

        if comment.chars().count() as u64 > MAX_COMMENT_LENGTH {
            return Err(AppError::Validation {
                message: format!("Comment must be at most {} characters", MAX_COMMENT_LENGTH),
                field: Some("comment".to_string()),
            });
        }

        Ok(Some(comment.to_string()))
    }
}

/// Feedback as returned by the API
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub analysis_type: AnalysisKind,
    pub analysis_id: Uuid,
    pub rating: Rating,
    pub comment: Option<String>,
    pub status: FeedbackStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub resolved_at: Option<DateTimeWithTimeZone>,
}

impl From<Feedback> for FeedbackResponse {
    fn from(feedback: Feedback) -> Self {
        Self {
            id: feedback.id,
            user_id: feedback.user_id,
            analysis_type: feedback.target_type,
            analysis_id: feedback.target_id,
            rating: feedback.rating,
            comment: feedback.comment,
            status: feedback.status,
            created_at: feedback.created_at,
            updated_at: feedback.updated_at,
            resolved_at: feedback.resolved_at,
        }
    }
}

pub(crate) fn paginate(items: Vec<Feedback>, total: u64, page: PageParams) -> Paginated<FeedbackResponse> {
    let page = page.normalized();
    Paginated {
        items: items.into_iter().map(Into::into).collect(),
        total,
        page: page.page,
        page_size: page.page_size,
    }
}

/// The requester's feedback, newest first
pub async fn list_feedback(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Envelope<Paginated<FeedbackResponse>>> {
    let (items, total) = state
        .repository()
        .list_user_feedback(auth.user_id, page)
        .await?;

    Ok(Envelope::ok(paginate(items, total, page), "Feedback retrieved"))
}

/// Counts per rating and status. Admins see everyone's feedback.
pub async fn statistics(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Envelope<FeedbackStatistics>> {
    let scope = if auth.is_admin() { None } else { Some(auth.user_id) };
    let stats = state.repository().feedback_statistics(scope).await?;

    Ok(Envelope::ok(stats, "Feedback statistics retrieved"))
}

/// Owner-only delete
pub async fn delete_feedback(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Envelope<()>> {
    let repo = state.repository();
    let feedback = repo
        .find_feedback_by_id(id)
        .await?
        .ok_or_else(|| AppError::FeedbackNotFound { id: id.to_string() })?;

    if feedback.user_id != auth.user_id {
        return Err(AppError::NotOwner {
            resource: "feedback".to_string(),
        });
    }

    repo.delete_feedback(id).await?;
    tracing::info!(feedback_id = %id, user_id = %auth.user_id, "Feedback deleted");

    Ok(Envelope::message("Feedback deleted"))
}

/// The requester's feedback on one analysis, or `null` if none was given
pub async fn analysis_feedback(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(analysis_id): ApiPath<Uuid>,
) -> Result<Envelope<Option<FeedbackResponse>>> {
    let repo = state.repository();
    let analysis = resolve_analysis(&repo, analysis_id).await?;
    if !auth.is_admin() {
        analysis.ensure_owned_by(auth.user_id)?;
    }

    let feedback = repo
        .find_feedback_for_target(auth.user_id, analysis.kind(), analysis.id())
        .await?;

    Ok(Envelope::ok(feedback.map(Into::into), "Feedback retrieved"))
}

/// Rate an analysis the requester owns. One feedback per analysis.
pub async fn submit_feedback(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(analysis_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<SubmitFeedbackRequest>,
) -> Result<Envelope<FeedbackResponse>> {
    let comment = request.normalized_comment()?;

    let repo = state.repository();
    let analysis = resolve_analysis(&repo, analysis_id).await?;
    analysis.ensure_owned_by(auth.user_id)?;

    let feedback = repo
        .create_feedback(auth.user_id, analysis.kind(), analysis.id(), request.rating, comment)
        .await?;

    metrics::record_feedback_submitted(analysis.kind().label(), feedback.rating.as_str());
    tracing::info!(
        feedback_id = %feedback.id,
        user_id = %auth.user_id,
        analysis_id = %analysis_id,
        analysis_type = ?analysis.kind(),
        "Feedback submitted"
    );

    Ok(Envelope::created(feedback.into(), "Feedback submitted"))
}
