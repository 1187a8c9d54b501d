//! Analysis report download and email
//!
//! Both routes are strictly owner-only: admins get no bypass here.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::extract::ApiPath;
use crate::AppState;
use lumen_common::{
    analysis::{resolve_analysis, ResolvedAnalysis},
    auth::AuthContext,
    db::models::User,
    errors::{AppError, Result},
    mail::{Attachment, OutgoingEmail},
    reports::ReportRenderer,
    response::Envelope,
};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Optional body of the email route
#[derive(Debug, Default, Deserialize)]
pub struct EmailReportRequest {
    /// Defaults to the requester's own address
    pub recipient: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmailReportResponse {
    pub analysis_id: Uuid,
    pub recipient: String,
}

/// Resolve and check ownership. Returns the owner for addressing.
async fn owned_analysis(
    state: &AppState,
    auth: &AuthContext,
    analysis_id: Uuid,
) -> Result<(ResolvedAnalysis, User)> {
    let repo = state.repository();
    let analysis = resolve_analysis(&repo, analysis_id).await?;
    analysis.ensure_owned_by(auth.user_id)?;

    let owner = repo
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound { id: auth.user_id.to_string() })?;

    Ok((analysis, owner))
}

fn parse_email_request(body: &Bytes) -> Result<EmailReportRequest> {
    let request: EmailReportRequest = if body.iter().all(u8::is_ascii_whitespace) {
        EmailReportRequest::default()
    } else {
        serde_json::from_slice(body).map_err(|e| AppError::InvalidFormat {
            message: format!("Invalid request body: {}", e),
        })?
    };

    if let Some(recipient) = &request.recipient {
        if !recipient.validate_email() {
            return Err(AppError::Validation {
                message: "Recipient must be a valid email address".to_string(),
                field: Some("recipient".to_string()),
            });
        }
    }

    Ok(request)
}

/// Stream the PDF report as an attachment
pub async fn download_report(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(analysis_id): ApiPath<Uuid>,
) -> Result<Response> {
    let (analysis, owner) = owned_analysis(&state, &auth, analysis_id).await?;
    let pdf = state.reports.render(&analysis, &owner.full_name())?;

    tracing::info!(
        analysis_id = %analysis_id,
        user_id = %auth.user_id,
        bytes = pdf.len(),
        "Report downloaded"
    );

    let disposition = format!(
        "attachment; filename=\"{}\"",
        ReportRenderer::file_name(&analysis)
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(pdf),
    )
        .into_response())
}

/// Email the PDF report to the requester or an explicit recipient
pub async fn email_report(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(analysis_id): ApiPath<Uuid>,
    body: Bytes,
) -> Result<Envelope<EmailReportResponse>> {
    // Ownership is settled before the body is looked at
    let (analysis, owner) = owned_analysis(&state, &auth, analysis_id).await?;
    let request = parse_email_request(&body)?;
    let pdf = state.reports.render(&analysis, &owner.full_name())?;
    let recipient = request.recipient.unwrap_or(owner.email);

    let email = OutgoingEmail {
        to: recipient.clone(),
        subject: format!(
            "{} report for analysis {}",
            analysis.kind().label(),
            analysis.id()
        ),
        body: format!(
            "Hello {},\n\nAttached is the {} report you requested.\n\nVerdict: {}\nConfidence: {:.1}%\n\n{}",
            owner.username,
            analysis.kind().label().to_lowercase(),
            analysis.verdict(),
            analysis.confidence() * 100.0,
            state.reports.organization(),
        ),
        attachments: vec![Attachment {
            filename: ReportRenderer::file_name(&analysis),
            content_type: PDF_CONTENT_TYPE.to_string(),
            data: pdf,
        }],
    };

    state.mailer.send(email).await?;

    tracing::info!(
        analysis_id = %analysis_id,
        user_id = %auth.user_id,
        transport = state.mailer.transport(),
        "Report emailed"
    );

    Ok(Envelope::ok(
        EmailReportResponse {
            analysis_id,
            recipient: recipient.clone(),
        },
        format!("Report sent to {}", recipient),
    ))
}
