//! API端点实现
//!
//! 提供监控列表管理的RESTful接口

use super::{ApiResponse, AppState};
use crate::error::{SentinelError, WatchlistError};
use crate::service::ServiceSummary;
use crate::watchlist::{LocationRef, MonitoredUrl};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// 健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 版本信息
    pub version: String,
    /// 运行时间
    pub uptime_seconds: u64,
}

/// 添加URL请求体
#[derive(Debug, Deserialize)]
pub struct AddUrlRequest {
    pub url: String,
}

/// 删除URL查询参数
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

/// API错误，按错误类型映射HTTP状态码
#[derive(Debug)]
pub struct ApiError(SentinelError);

impl From<SentinelError> for ApiError {
    fn from(error: SentinelError) -> Self {
        Self(error)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            SentinelError::Watchlist(e) => match e {
                WatchlistError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
                WatchlistError::DuplicateEntry { .. } => StatusCode::CONFLICT,
                WatchlistError::CapacityExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                WatchlistError::NotFound { .. } => StatusCode::NOT_FOUND,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self.0 {
            SentinelError::Watchlist(e) => e.to_string(),
            other => {
                error!("API请求处理失败: {}", other);
                other.to_string()
            }
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let uptime = chrono::Utc::now() - state.start_time;
    Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    }))
}

/// GET /api/summary
pub async fn summary(State(state): State<AppState>) -> ApiResult<ServiceSummary> {
    let summary = state.service.summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// GET /api/owners/{owner}/urls
pub async fn list_urls(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> ApiResult<Vec<MonitoredUrl>> {
    let urls = state.service.request_list(&owner).await?;
    Ok(Json(ApiResponse::success(urls)))
}

/// POST /api/owners/{owner}/urls
pub async fn add_url(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    Json(request): Json<AddUrlRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MonitoredUrl>>), ApiError> {
    let entry = state.service.request_add(&owner, &request.url).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(entry))))
}

/// DELETE /api/owners/{owner}/urls?url=..
pub async fn delete_url(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<MonitoredUrl> {
    let removed = state.service.request_delete(&owner, &query.url).await?;
    Ok(Json(ApiResponse::success(removed)))
}

/// PUT /api/owners/{owner}/display
pub async fn bind_display(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    Json(location): Json<LocationRef>,
) -> ApiResult<LocationRef> {
    state.service.bind_display(&owner, location.clone()).await?;
    Ok(Json(ApiResponse::success(location)))
}

/// POST /api/owners/{owner}/display
pub async fn open_display(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> ApiResult<LocationRef> {
    let location = state.service.open_display(&owner).await?;
    Ok(Json(ApiResponse::success(location)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MonitorConfig, WebConfig};
    use crate::display::{DisplaySync, NoOpDisplay};
    use crate::engine::Engine;
    use crate::health::{ProbeOutcome, Prober};
    use crate::notification::{MessageTemplates, NoOpSender, NotificationDispatcher};
    use crate::service::WatchlistService;
    use crate::watchlist::{MemoryStore, WatchlistStore};
    use crate::web::router;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct UpProber;

    #[async_trait]
    impl Prober for UpProber {
        async fn probe(&self, _url: &str) -> ProbeOutcome {
            ProbeOutcome::Reachable
        }
    }

    fn app(api_key: Option<&str>) -> (Arc<MemoryStore>, axum::Router) {
        let store = Arc::new(MemoryStore::new());
        let templates = Arc::new(MessageTemplates::new().unwrap());
        let engine = Engine::new(
            MonitorConfig {
                max_urls_per_owner: 2,
                ..Default::default()
            },
            store.clone(),
            Arc::new(UpProber),
            NotificationDispatcher::new(Arc::new(NoOpSender), templates.clone()),
            DisplaySync::new(
                store.clone(),
                Arc::new(NoOpDisplay),
                templates,
                Duration::from_secs(60),
            ),
        );
        let config = WebConfig {
            enabled: true,
            api_key: api_key.map(str::to_string),
            ..Default::default()
        };
        let state = AppState::new(WatchlistService::new(Arc::new(engine)), config);
        (store, router(state))
    }

    fn add_request(owner: &str, url: &str) -> Request<Body> {
        Request::post(format!("/api/owners/{}/urls", owner))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "url": url }).to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_store, app) = app(Some("secret"));
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let (store, app) = app(None);

        let response = app
            .clone()
            .oneshot(add_request("42", "https://a.example"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::get("/api/owners/42/urls")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"][0]["url"], "https://a.example");
        assert_eq!(body["data"][0]["status"], "unknown");
        assert_eq!(body["data"][0]["failureCount"], 0);
        assert_eq!(store.total_urls().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejections_map_to_status_codes() {
        let (_store, app) = app(None);

        let invalid = app.clone().oneshot(add_request("1", "nope")).await.unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        app.clone()
            .oneshot(add_request("1", "https://a.example"))
            .await
            .unwrap();
        let duplicate = app
            .clone()
            .oneshot(add_request("1", "https://a.example"))
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        app.clone()
            .oneshot(add_request("1", "https://b.example"))
            .await
            .unwrap();
        let full = app
            .clone()
            .oneshot(add_request("1", "https://c.example"))
            .await
            .unwrap();
        assert_eq!(full.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let missing = app
            .oneshot(
                Request::delete("/api/owners/1/urls?url=https%3A%2F%2Fz.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let (_store, app) = app(Some("secret"));

        let denied = app
            .clone()
            .oneshot(Request::get("/api/summary").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .oneshot(
                Request::get("/api/summary")
                    .header("X-API-Key", "secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bind_display() {
        let (store, app) = app(None);

        let response = app
            .oneshot(
                Request::put("/api/owners/7/display")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"channelId":"c1","messageId":"m1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let binding = store.binding("7").await.unwrap().unwrap();
        assert_eq!(binding.location_ref.message_id, "m1");
    }
}
