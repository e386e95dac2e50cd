//! 认证模块
//!
//! 配置了API密钥时校验 `X-API-Key` 请求头

use super::{ApiResponse, AppState};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use tracing::warn;

/// API密钥头部名称
pub const API_KEY_HEADER: &str = "X-API-Key";

/// 从请求头中提取API密钥
fn api_key_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|value| value.to_str().ok())
}

/// API密钥认证中间件
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config.api_key.as_deref() else {
        return next.run(request).await;
    };

    let matched = api_key_from_headers(request.headers()).map(|provided| provided == expected);
    match matched {
        Some(true) => next.run(request).await,
        Some(false) => {
            warn!("API密钥无效: {}", request.uri().path());
            unauthorized("无效的API密钥")
        }
        None => unauthorized("缺少API密钥"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(message.to_string())),
    )
        .into_response()
}
