use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use infra::pagination::LimitOffset;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::error::AppError;

/// Uniform response envelope: `{status, message, data?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

pub fn ok<T: Serialize>(message: &str, data: T) -> ApiResponse<T> {
    ApiResponse::new(StatusCode::OK, message, data)
}

pub fn created<T: Serialize>(message: &str, data: T) -> ApiResponse<T> {
    ApiResponse::new(StatusCode::CREATED, message, data)
}

/// Raw `limit`/`page` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub page: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            page: 1,
        }
    }
}

impl PageQuery {
    pub fn resolve(self) -> Result<PageRequest, AppError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let page = self.page.unwrap_or(1);

        let mut errors = Vec::new();
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            errors.push(format!("limit must be between 1 and {MAX_PAGE_LIMIT}"));
        }
        if page < 1 {
            errors.push("page must be at least 1".to_string());
        } else if (page - 1).checked_mul(limit).is_none() {
            errors.push("page is out of range".to_string());
        }

        if errors.is_empty() {
            Ok(PageRequest { limit, page })
        } else {
            Err(AppError::InvalidRequest(errors))
        }
    }
}

impl PageRequest {
    pub fn limit_offset(&self) -> LimitOffset {
        LimitOffset::from_page(self.limit, self.page)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Pagination {
    pub limit: i64,
    pub page: i64,
    pub total_page: i64,
    pub total_count: i64,
    pub first: String,
    pub last: String,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl Pagination {
    /// Build page metadata with links anchored at `base_url` + `path`.
    pub fn build(
        base_url: &str,
        path: &str,
        request: PageRequest,
        total_count: i64,
    ) -> Result<Self, AppError> {
        let total_page = total_pages(total_count, request.limit);
        let link = |page: i64| page_link(base_url, path, request.limit, page);

        Ok(Self {
            limit: request.limit,
            page: request.page,
            total_page,
            total_count,
            first: link(1)?,
            last: link(total_page)?,
            next: if request.page < total_page {
                Some(link(request.page + 1)?)
            } else {
                None
            },
            previous: if request.page > 1 {
                Some(link((request.page - 1).min(total_page))?)
            } else {
                None
            },
        })
    }
}

/// `ceil(total_count / limit)`, never below 1.
pub fn total_pages(total_count: i64, limit: i64) -> i64 {
    ((total_count + limit - 1) / limit).max(1)
}

fn page_link(base_url: &str, path: &str, limit: i64, page: i64) -> Result<String, AppError> {
    let mut url = Url::parse(&format!("{}{}", base_url.trim_end_matches('/'), path))
        .map_err(|e| AppError::Internal(format!("Invalid BASE_URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("limit", &limit.to_string())
        .append_pair("page", &page.to_string());
    Ok(url.to_string())
}

/// A page of results with its navigation metadata.
#[derive(Debug, Serialize)]
pub struct Paged<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_params_missing() {
        let req = PageQuery::default().resolve().unwrap();
        assert_eq!(req, PageRequest { limit: 10, page: 1 });
    }

    #[test]
    fn out_of_range_params_are_rejected() {
        let err = PageQuery {
            limit: Some(101),
            page: Some(0),
        }
        .resolve()
        .unwrap_err();

        match err {
            AppError::InvalidRequest(messages) => assert_eq!(messages.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn page_whose_offset_overflows_is_rejected() {
        let err = PageQuery {
            limit: Some(100),
            page: Some(i64::MAX),
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let far = PageQuery {
            limit: Some(100),
            page: Some(i64::MAX / 100),
        }
        .resolve()
        .unwrap();
        assert_eq!(far.limit_offset().offset, (i64::MAX / 100 - 1) * 100);
    }

    #[test]
    fn total_page_is_at_least_one() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(100, 1), 100);
    }

    #[test]
    fn links_are_anchored_at_base_url() {
        let p = Pagination::build(
            "https://api.majapahit.id/",
            "/api/v1/place",
            PageRequest { limit: 5, page: 2 },
            12,
        )
        .unwrap();

        assert_eq!(p.total_page, 3);
        assert_eq!(p.first, "https://api.majapahit.id/api/v1/place?limit=5&page=1");
        assert_eq!(p.last, "https://api.majapahit.id/api/v1/place?limit=5&page=3");
        assert_eq!(
            p.next.as_deref(),
            Some("https://api.majapahit.id/api/v1/place?limit=5&page=3")
        );
        assert_eq!(
            p.previous.as_deref(),
            Some("https://api.majapahit.id/api/v1/place?limit=5&page=1")
        );
    }

    #[test]
    fn edge_pages_have_no_next_or_previous() {
        let p = Pagination::build(
            "http://localhost:8080",
            "/api/v1/place",
            PageRequest { limit: 10, page: 1 },
            3,
        )
        .unwrap();

        assert!(p.next.is_none());
        assert!(p.previous.is_none());
    }
}
