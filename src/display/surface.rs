//! 摘要视图渲染面
//!
//! 摘要视图是一条可编辑的聊天消息。首次发布时创建消息并记下位置，
//! 之后按位置原地编辑。消息被删除后对应位置即视为失效。

use crate::watchlist::LocationRef;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// 一次渲染所需的全部内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
    /// 正文
    pub description: String,
    /// 所有用户的URL总数
    pub total_urls: usize,
    /// 轮询周期（秒）
    pub poll_interval_seconds: u64,
}

/// 原地更新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// 视图已更新
    Updated,
    /// 视图已不存在
    Stale,
}

/// 摘要视图渲染面trait
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// 发布一个新的摘要视图
    ///
    /// # 返回
    /// * `Result<LocationRef>` - 新视图的位置
    async fn publish(&self, view: &SummaryView) -> Result<LocationRef>;

    /// 按位置更新已有视图
    async fn update(&self, location: &LocationRef, view: &SummaryView) -> Result<RenderOutcome>;
}

/// 未配置渲染面时使用
#[derive(Debug, Default)]
pub struct NoOpDisplay;

#[async_trait]
impl DisplaySurface for NoOpDisplay {
    async fn publish(&self, _view: &SummaryView) -> Result<LocationRef> {
        Err(anyhow::anyhow!("未配置摘要视图webhook"))
    }

    async fn update(&self, _location: &LocationRef, _view: &SummaryView) -> Result<RenderOutcome> {
        Ok(RenderOutcome::Updated)
    }
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
    channel_id: String,
}

/// 基于webhook消息的渲染面
pub struct WebhookDisplay {
    client: Client,
    webhook_url: String,
}

impl WebhookDisplay {
    /// 创建webhook渲染面
    ///
    /// # 参数
    /// * `webhook_url` - 用于发布和编辑摘要消息的webhook
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("创建HTTP客户端失败")?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn build_body(view: &SummaryView) -> Value {
        json!({
            "embeds": [
                {
                    "title": "Uptime Sentinel",
                    "description": view.description,
                    "color": crate::notification::MessageType::Info.color(),
                    "fields": [
                        { "name": "URL总数", "value": view.total_urls.to_string(), "inline": true },
                        { "name": "检测周期", "value": format!("{}秒", view.poll_interval_seconds), "inline": true },
                        { "name": "状态", "value": if view.total_urls > 0 { "🟢" } else { "⚪" }, "inline": true },
                    ],
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                }
            ]
        })
    }
}

#[async_trait]
impl DisplaySurface for WebhookDisplay {
    async fn publish(&self, view: &SummaryView) -> Result<LocationRef> {
        let response = self
            .client
            .post(&self.webhook_url)
            .query(&[("wait", "true")])
            .json(&Self::build_body(view))
            .send()
            .await
            .context("发布摘要视图失败")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("发布摘要视图失败: {}", status));
        }

        let created: CreatedMessage = response.json().await.context("解析消息位置失败")?;
        debug!("摘要视图已发布: {}/{}", created.channel_id, created.id);

        Ok(LocationRef {
            channel_id: created.channel_id,
            message_id: created.id,
        })
    }

    async fn update(&self, location: &LocationRef, view: &SummaryView) -> Result<RenderOutcome> {
        let url = format!("{}/messages/{}", self.webhook_url, location.message_id);
        let response = self
            .client
            .patch(&url)
            .json(&Self::build_body(view))
            .send()
            .await
            .context("更新摘要视图失败")?;

        match response.status() {
            status if status.is_success() => Ok(RenderOutcome::Updated),
            StatusCode::NOT_FOUND => Ok(RenderOutcome::Stale),
            status => Err(anyhow::anyhow!("更新摘要视图失败: {}", status)),
        }
    }
}
