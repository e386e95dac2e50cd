//! Web服务器实现
//!
//! 绑定监听地址并在收到关闭信号后优雅退出

use super::{router, AppState};
use crate::config::WebConfig;
use crate::service::WatchlistService;
use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Web服务器
pub struct WebServer {
    /// 配置
    config: WebConfig,
    /// 共享状态
    state: AppState,
}

impl WebServer {
    /// 创建新的Web服务器
    pub fn new(config: WebConfig, service: WatchlistService) -> Self {
        let state = AppState::new(service, config.clone());
        Self { config, state }
    }

    /// 启动Web服务器，直到收到关闭信号
    pub async fn start(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        if !self.config.enabled {
            info!("Web服务器已禁用");
            return Ok(());
        }

        if self.config.api_key.is_none() {
            tracing::warn!("未配置API密钥，管理接口不做认证");
        }

        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("绑定地址失败: {}", addr))?;

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        let app = router(self.state)
            .layer(cors)
            .layer(TraceLayer::new_for_http());

        info!("Web服务器已启动: http://{}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("接收到关闭信号，正在关闭Web服务器...");
            })
            .await
            .context("Web服务器运行失败")?;

        info!("Web服务器已关闭");
        Ok(())
    }
}
