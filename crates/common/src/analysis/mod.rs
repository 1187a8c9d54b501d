//! Polymorphic analysis lookup
//!
//! Feedback and reports address an analysis by id alone. The id is probed
//! against the text store first and the image store second; the first hit
//! wins. Ids are assumed unique across both stores, so a colliding image
//! result can never be reached through this lookup.

use crate::db::models::{
    AnalysisKind, ImageAnalysis, ImageSubmission, TextAnalysis, TextSubmission,
};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use chrono::{DateTime, FixedOffset};
use tracing::debug;
use uuid::Uuid;

/// Longest text excerpt carried into reports
const EXCERPT_CHARS: usize = 280;

/// An analysis result together with the submission that produced it
#[derive(Debug, Clone)]
pub enum ResolvedAnalysis {
    Text {
        analysis: TextAnalysis,
        submission: TextSubmission,
    },
    Image {
        analysis: ImageAnalysis,
        submission: ImageSubmission,
    },
}

impl ResolvedAnalysis {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            ResolvedAnalysis::Text { .. } => AnalysisKind::TextAnalysis,
            ResolvedAnalysis::Image { .. } => AnalysisKind::ImageAnalysis,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ResolvedAnalysis::Text { analysis, .. } => analysis.id,
            ResolvedAnalysis::Image { analysis, .. } => analysis.id,
        }
    }

    /// The user who made the submission
    pub fn owner_id(&self) -> Uuid {
        match self {
            ResolvedAnalysis::Text { submission, .. } => submission.user_id,
            ResolvedAnalysis::Image { submission, .. } => submission.user_id,
        }
    }

    pub fn verdict(&self) -> &str {
        match self {
            ResolvedAnalysis::Text { analysis, .. } => &analysis.verdict,
            ResolvedAnalysis::Image { analysis, .. } => &analysis.verdict,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            ResolvedAnalysis::Text { analysis, .. } => analysis.confidence,
            ResolvedAnalysis::Image { analysis, .. } => analysis.confidence,
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            ResolvedAnalysis::Text { analysis, .. } => &analysis.summary,
            ResolvedAnalysis::Image { analysis, .. } => &analysis.summary,
        }
    }

    pub fn details(&self) -> &serde_json::Value {
        match self {
            ResolvedAnalysis::Text { analysis, .. } => &analysis.details,
            ResolvedAnalysis::Image { analysis, .. } => &analysis.details,
        }
    }

    pub fn created_at(&self) -> DateTime<FixedOffset> {
        match self {
            ResolvedAnalysis::Text { analysis, .. } => analysis.created_at,
            ResolvedAnalysis::Image { analysis, .. } => analysis.created_at,
        }
    }

    /// What was analyzed: a text excerpt or the image file name
    pub fn subject(&self) -> String {
        match self {
            ResolvedAnalysis::Text { submission, .. } => {
                let mut excerpt: String = submission.content.chars().take(EXCERPT_CHARS).collect();
                if submission.content.chars().count() > EXCERPT_CHARS {
                    excerpt.push_str("...");
                }
                excerpt
            }
            ResolvedAnalysis::Image { submission, .. } => {
                format!("{} ({})", submission.file_name, submission.content_type)
            }
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id() == user_id
    }

    /// Fail with a permission error unless `user_id` owns the submission
    pub fn ensure_owned_by(&self, user_id: Uuid) -> Result<()> {
        if self.is_owned_by(user_id) {
            Ok(())
        } else {
            Err(AppError::NotOwner {
                resource: "analysis".to_string(),
            })
        }
    }
}

/// Find an analysis by id: text store first, then image store
pub async fn resolve_analysis(repo: &Repository, id: Uuid) -> Result<ResolvedAnalysis> {
    if let Some((analysis, submission)) = repo.find_text_analysis(id).await? {
        debug!(analysis_id = %id, kind = "text", "Analysis resolved");
        return Ok(ResolvedAnalysis::Text { analysis, submission });
    }

    if let Some((analysis, submission)) = repo.find_image_analysis(id).await? {
        debug!(analysis_id = %id, kind = "image", "Analysis resolved");
        return Ok(ResolvedAnalysis::Image { analysis, submission });
    }

    Err(AppError::AnalysisNotFound { id: id.to_string() })
}
