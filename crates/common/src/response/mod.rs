//! Uniform JSON envelope returned by every non-binary endpoint
//!
//! ```json
//! { "success": true, "message": "...", "data": {...}, "error": null, "timestamp": "..." }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope carrying data
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Successful envelope without a payload
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Failed envelope
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Envelope paired with a status code, so handlers can return `201 Created`
pub struct Envelope<T>(pub StatusCode, pub ApiResponse<T>);

impl<T> Envelope<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self(StatusCode::OK, ApiResponse::success(data, message))
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self(StatusCode::CREATED, ApiResponse::success(data, message))
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self(StatusCode::OK, ApiResponse::empty(message))
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

/// Page of results
#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Pagination query parameters (`?page=2&page_size=50`)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

pub const MAX_PAGE_SIZE: u64 = 100;

/// Highest page whose row offset still fits a signed 64-bit SQL OFFSET
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

fn default_page() -> u64 { 1 }
fn default_page_size() -> u64 { 20 }

impl Default for PageParams {
    fn default() -> Self {
        Self { page: default_page(), page_size: default_page_size() }
    }
}

impl PageParams {
    /// Clamp to sane bounds: pages in 1..=MAX_PAGE, size in 1..=MAX_PAGE_SIZE
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.clamp(1, MAX_PAGE),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Zero-based page index for sea-orm paginators
    pub fn index(&self) -> u64 {
        self.page.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::success(42, "done")).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "done");
        assert_eq!(body["data"], 42);
        assert!(body["error"].is_null());
        assert!(body["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_failure_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::failure("nope")).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
        assert!(body["message"].is_null());
        assert_eq!(body["error"], "nope");
    }

    #[test]
    fn test_page_params_normalized() {
        let params = PageParams { page: 0, page_size: 5000 }.normalized();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, MAX_PAGE_SIZE);
        assert_eq!(params.index(), 0);

        let params = PageParams { page: 3, page_size: 0 }.normalized();
        assert_eq!(params.page_size, 1);
        assert_eq!(params.index(), 2);
    }

    #[test]
    fn test_huge_page_offset_does_not_overflow() {
        let params = PageParams { page: u64::MAX, page_size: MAX_PAGE_SIZE }.normalized();
        assert_eq!(params.page, MAX_PAGE);

        let offset = params.index().checked_mul(params.page_size);
        assert!(offset.is_some_and(|o| o <= i64::MAX as u64));
    }
}
