//! Admin feedback review
//!
//! Every handler here requires the `admin` scope.

use axum::extract::State;
use uuid::Uuid;

use super::feedback::{paginate, FeedbackResponse};
use crate::extract::{ApiPath, ApiQuery};
use crate::AppState;
use lumen_common::{
    auth::AuthContext,
    db::FeedbackFilter,
    errors::Result,
    metrics,
    response::{Envelope, PageParams, Paginated},
};

/// All feedback, filterable by `status`, `rating`, `analysis_type` and `user_id`
pub async fn list_all_feedback(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(filter): ApiQuery<FeedbackFilter>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Envelope<Paginated<FeedbackResponse>>> {
    auth.require_admin()?;

    let (items, total) = state.repository().list_feedback(&filter, page).await?;

    Ok(Envelope::ok(paginate(items, total, page), "Feedback retrieved"))
}

/// Pending -> reviewed; reviewed or resolved feedback is returned unchanged
pub async fn mark_reviewed(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Envelope<FeedbackResponse>> {
    auth.require_admin()?;

    let feedback = state.repository().mark_feedback_reviewed(id).await?;

    metrics::record_feedback_transition(feedback.status.as_str());
    tracing::info!(
        feedback_id = %id,
        admin_id = %auth.user_id,
        status = feedback.status.as_str(),
        "Feedback marked reviewed"
    );

    Ok(Envelope::ok(feedback.into(), "Feedback marked as reviewed"))
}

/// Resolve and stamp `resolved_at`
pub async fn mark_resolved(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Envelope<FeedbackResponse>> {
    auth.require_admin()?;

    let feedback = state.repository().mark_feedback_resolved(id).await?;

    metrics::record_feedback_transition(feedback.status.as_str());
    tracing::info!(feedback_id = %id, admin_id = %auth.user_id, "Feedback resolved");

    Ok(Envelope::ok(feedback.into(), "Feedback marked as resolved"))
}
