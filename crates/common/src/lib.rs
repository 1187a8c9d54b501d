//! Lumen Common Library
//!
//! Shared code for the Lumen gateway and console tools including:
//! - Database models and repository patterns
//! - Polymorphic analysis lookup
//! - Error types and the response envelope
//! - Configuration management
//! - Authentication utilities and account creation
//! - PDF reports and outbound email
//! - Metrics and observability

pub mod analysis;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod mail;
pub mod metrics;
pub mod reports;
pub mod response;
pub mod users;

// Re-export commonly used types
pub use analysis::{resolve_analysis, ResolvedAnalysis};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use mail::Mailer;
pub use reports::ReportRenderer;
pub use response::ApiResponse;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
