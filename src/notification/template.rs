//! 消息模板模块
//!
//! 使用Handlebars渲染通知正文和摘要视图

use crate::config::NotificationConfig;
use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

/// 离线通知模板名
pub const DOWN_TEMPLATE: &str = "down";
/// 恢复通知模板名
pub const BACK_ONLINE_TEMPLATE: &str = "back_online";
/// 自动移除通知模板名
pub const EVICTED_TEMPLATE: &str = "evicted";
/// 摘要视图模板名
pub const SUMMARY_TEMPLATE: &str = "summary";

/// 单个URL相关通知的模板上下文
#[derive(Debug, Clone, Serialize)]
pub struct UrlContext {
    /// 用户
    pub owner: String,
    /// URL
    pub url: String,
    /// 连续失败次数
    pub failure_count: u32,
    /// 时间戳
    pub timestamp: String,
}

/// 摘要视图的模板上下文
#[derive(Debug, Clone, Serialize)]
pub struct SummaryContext {
    /// 所有用户的URL总数
    pub total_urls: usize,
    /// 轮询周期（秒）
    pub poll_interval_seconds: u64,
    /// 是否有URL在监控中
    pub active: bool,
}

/// 消息模板集合
#[derive(Debug)]
pub struct MessageTemplates {
    registry: Handlebars<'static>,
}

impl MessageTemplates {
    /// 使用默认模板创建
    pub fn new() -> Result<Self> {
        Self::from_config(&NotificationConfig::default())
    }

    /// 使用配置中的模板覆盖默认模板
    pub fn from_config(config: &NotificationConfig) -> Result<Self> {
        let mut registry = Handlebars::new();
        // 输出是聊天消息而不是HTML
        registry.register_escape_fn(handlebars::no_escape);

        let templates = [
            (DOWN_TEMPLATE, config.down_template.as_deref(), DEFAULT_DOWN),
            (
                BACK_ONLINE_TEMPLATE,
                config.back_online_template.as_deref(),
                DEFAULT_BACK_ONLINE,
            ),
            (EVICTED_TEMPLATE, config.evicted_template.as_deref(), DEFAULT_EVICTED),
            (SUMMARY_TEMPLATE, config.summary_template.as_deref(), DEFAULT_SUMMARY),
        ];

        for (name, custom, default) in templates {
            registry
                .register_template_string(name, custom.unwrap_or(default))
                .with_context(|| format!("模板 {} 语法错误", name))?;
        }

        Ok(Self { registry })
    }

    /// 渲染指定模板
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.registry
            .render(name, context)
            .with_context(|| format!("渲染模板 {} 失败", name))
    }
}

const DEFAULT_DOWN: &str = "URL **{{url}}** 当前无法访问。";

const DEFAULT_BACK_ONLINE: &str = "URL **{{url}}** 已恢复访问。";

const DEFAULT_EVICTED: &str =
    "URL **{{url}}** 连续 {{failure_count}} 次检测失败，已从监控列表中移除。";

const DEFAULT_SUMMARY: &str = r#"使用下方按钮管理您监控的URL。
🔗 **URL总数**: {{total_urls}}
⏱️ **检测周期**: {{poll_interval_seconds}} 秒
♻️ **状态**: {{#if active}}🟢{{else}}⚪{{/if}}"#;
