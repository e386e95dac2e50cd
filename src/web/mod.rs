//! Web API模块
//!
//! 提供监控列表管理和运行状态查询的HTTP接口

use crate::config::WebConfig;
use crate::service::WatchlistService;
use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use serde::Serialize;

pub mod api;
pub mod auth;
pub mod server;

pub use server::WebServer;

/// Web服务器共享状态
#[derive(Clone)]
pub struct AppState {
    /// 监控列表服务
    pub service: WatchlistService,
    /// Web配置
    pub config: WebConfig,
    /// 启动时间
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(service: WatchlistService, config: WebConfig) -> Self {
        Self {
            service,
            config,
            start_time: chrono::Utc::now(),
        }
    }
}

/// API响应包装器
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 是否成功
    pub success: bool,
    /// 响应数据
    pub data: Option<T>,
    /// 错误信息
    pub error: Option<String>,
    /// 时间戳
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// 创建错误响应
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// 构建全部路由
///
/// `/api/health` 不需要认证，其余接口在配置了API密钥时需要 `X-API-Key` 头。
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/summary", get(api::summary))
        .route(
            "/api/owners/{owner}/urls",
            get(api::list_urls).post(api::add_url).delete(api::delete_url),
        )
        .route(
            "/api/owners/{owner}/display",
            put(api::bind_display).post(api::open_display),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/api/health", get(api::health))
        .merge(protected)
        .with_state(state)
}
