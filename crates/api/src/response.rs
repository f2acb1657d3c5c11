//! Uniform response envelopes.
//!
//! Every endpoint answers with `{status, message, data}`; list endpoints
//! add `total`, `page` and `totalPages`. Error responses reuse the same
//! shape with `data: null` (see `error.rs`).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::db::Page;

/// Success envelope for single-entity responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK with a payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// 201 Created with a payload.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// 200 OK with no payload (deletes, clears).
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Success envelope for paginated list responses.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub status: u16,
    pub message: String,
    pub total: i64,
    pub data: Vec<T>,
    pub page: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl<T: Serialize> Paginated<T> {
    /// Wrap a page of results with its derived pagination metadata.
    pub fn new(message: impl Into<String>, data: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            total,
            data,
            page: page.skip / page.limit + 1,
            total_pages: (total + page.limit - 1) / page.limit,
        }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_metadata() {
        let page = Page::clamped(Some(10), Some(20), None);
        let wrapped = Paginated::new("ok", vec![1, 2, 3], 35, page);
        assert_eq!(wrapped.page, 3);
        assert_eq!(wrapped.total_pages, 4);
        assert_eq!(wrapped.total, 35);
    }

    #[test]
    fn test_first_page_defaults() {
        let page = Page::clamped(None, None, None);
        let wrapped: Paginated<i32> = Paginated::new("ok", Vec::new(), 0, page);
        assert_eq!(wrapped.page, 1);
        assert_eq!(wrapped.total_pages, 0);
    }
}
