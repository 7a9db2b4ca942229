use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::search::{DateRange, HealthReport, HealthStatus, SearchQuery, SearchResponse};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Deepest `page * limit` the engine pages into (`index.max_result_window`)
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Readiness probe: the document store must be reachable and not red
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = match &state.health {
        Some(checker) => checker.check().await,
        None => HealthReport {
            status: HealthStatus::Unknown,
            cluster: None,
            error: Some("no health checker configured".to_string()),
        },
    };

    let status = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy | HealthStatus::Unknown => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}

/// Prometheus metrics endpoint
pub async fn metrics() -> (StatusCode, String) {
    let metrics = crate::metrics::gather_metrics();
    (StatusCode::OK, metrics)
}

/// Raw search query parameters; parsed and validated in [`SearchParams::into_query`]
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub user_id: Option<String>,
    pub provider_id: Option<String>,
    pub tag_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_uuid(value: &Option<String>, name: &str) -> Result<Option<Uuid>> {
    non_empty(value)
        .map(|v| {
            Uuid::parse_str(v)
                .map_err(|_| AppError::InvalidUuid(format!("{} must be a valid UUID", name)))
        })
        .transpose()
}

fn parse_date(value: &Option<String>, name: &str) -> Result<Option<NaiveDate>> {
    non_empty(value)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .map_err(|_| AppError::InvalidDate(format!("{} must be in YYYY-MM-DD format", name)))
        })
        .transpose()
}

impl SearchParams {
    /// Build a query, rejecting malformed identifiers and dates. An
    /// unparsable or non-positive page becomes 1, and a limit outside
    /// `1..=max_limit` becomes `default_limit`. A page reaching past
    /// [`MAX_RESULT_WINDOW`] is rejected.
    pub fn into_query(self, default_limit: usize, max_limit: usize) -> Result<SearchQuery> {
        let user_id = parse_uuid(&self.user_id, "user_id")?;
        let tag_id = parse_uuid(&self.tag_id, "tag_id")?;
        let start = parse_date(&self.start_date, "start_date")?;
        let end = parse_date(&self.end_date, "end_date")?;

        let page = non_empty(&self.page)
            .and_then(|p| p.parse::<usize>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);
        let limit = non_empty(&self.limit)
            .and_then(|l| l.parse::<usize>().ok())
            .filter(|l| (1..=max_limit).contains(l))
            .unwrap_or(default_limit);
        if (page - 1)
            .checked_mul(limit)
            .and_then(|from| from.checked_add(limit))
            .map_or(true, |end| end > MAX_RESULT_WINDOW)
        {
            return Err(AppError::Validation(format!(
                "page {} is beyond the {} result window",
                page, MAX_RESULT_WINDOW
            )));
        }

        let mut query = SearchQuery::new(self.q.unwrap_or_default())
            .with_date_range(DateRange::from_dates(start, end))
            .with_page(page)
            .with_limit(limit);
        query.filters.user_id = user_id;
        query.filters.tag_id = tag_id;
        query.filters.provider = non_empty(&self.provider_id).map(str::to_string);

        Ok(query)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchEnvelope {
    pub success: bool,
    pub data: SearchResponse,
    pub pagination: Pagination,
}

/// Search conversations
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchEnvelope>> {
    let config = state.search.config();
    let query = params.into_query(config.default_page_size, config.max_page_size)?;

    let response = state.search.search(&query).await?;

    let limit = response.limit.max(1) as u64;
    let pagination = Pagination {
        page: response.page,
        limit: response.limit,
        total: response.total,
        total_pages: (response.total + limit - 1) / limit,
    };

    Ok(Json(SearchEnvelope {
        success: true,
        data: response,
        pagination,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> SearchParams {
        let mut p = SearchParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "q" => p.q = value,
                "user_id" => p.user_id = value,
                "provider_id" => p.provider_id = value,
                "tag_id" => p.tag_id = value,
                "start_date" => p.start_date = value,
                "end_date" => p.end_date = value,
                "page" => p.page = value,
                "limit" => p.limit = value,
                _ => {}
            }
        }
        p
    }

    #[test]
    fn test_defaults() {
        let query = params(&[]).into_query(10, 100).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);
        assert!(query.filters.is_empty());
    }

    #[test]
    fn test_invalid_uuid() {
        let err = params(&[("user_id", "not-a-uuid")]).into_query(10, 100).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_UUID");

        let err = params(&[("tag_id", "123")]).into_query(10, 100).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_UUID");
    }

    #[test]
    fn test_invalid_date() {
        let err = params(&[("start_date", "2024/01/01")]).into_query(10, 100).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATE");
    }

    #[test]
    fn test_page_and_limit_fallbacks() {
        let query = params(&[("page", "-3"), ("limit", "500")]).into_query(10, 100).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);

        let query = params(&[("page", "4"), ("limit", "25")]).into_query(10, 100).unwrap();
        assert_eq!(query.page, 4);
        assert_eq!(query.limit, 25);
    }

    #[test]
    fn test_page_past_result_window_is_rejected() {
        let err = params(&[("page", "18446744073709551615")])
            .into_query(10, 100)
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let err = params(&[("page", "1001"), ("limit", "10")]).into_query(10, 100).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let query = params(&[("page", "1000"), ("limit", "10")]).into_query(10, 100).unwrap();
        assert_eq!(query.page, 1000);
    }

    #[test]
    fn test_end_date_is_end_of_day() {
        let query = params(&[("end_date", "2024-01-31"), ("provider_id", "claude")])
            .into_query(10, 100)
            .unwrap();
        let end = query.filters.date_range.end.unwrap();
        assert_eq!(end.to_rfc3339(), "2024-01-31T23:59:59+00:00");
        assert_eq!(query.filters.provider.as_deref(), Some("claude"));
    }
}
