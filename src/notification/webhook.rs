//! Webhook通知发送器模块
//!
//! 以聊天平台webhook的embed格式发送私信和审计消息

use crate::notification::sender::{AuditEntry, NotificationMessage, NotificationSender};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

/// Webhook通知发送器
pub struct WebhookSender {
    /// HTTP客户端
    client: Client,
    /// 私信webhook URL
    direct_webhook_url: Option<String>,
    /// 审计频道webhook URL
    audit_webhook_url: Option<String>,
}

impl WebhookSender {
    /// 创建新的webhook发送器
    ///
    /// # 参数
    /// * `direct_webhook_url` - 私信webhook URL
    /// * `audit_webhook_url` - 审计频道webhook URL
    ///
    /// # 返回
    /// * `Result<Self>` - 发送器实例
    pub fn new(direct_webhook_url: Option<String>, audit_webhook_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("创建HTTP客户端失败")?;

        Ok(Self {
            client,
            direct_webhook_url,
            audit_webhook_url,
        })
    }

    /// 构建私信消息体
    fn build_direct_body(&self, owner: &str, message: &NotificationMessage) -> Value {
        json!({
            "content": format!("<@{}>", owner),
            "allowed_mentions": { "users": [owner] },
            "embeds": [
                {
                    "title": message.title,
                    "description": message.content,
                    "color": message.message_type.color(),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                }
            ]
        })
    }

    /// 构建审计消息体
    fn build_audit_body(&self, entry: &AuditEntry) -> Value {
        json!({
            "allowed_mentions": { "parse": [] },
            "embeds": [
                {
                    "title": format!("🔔 {}", entry.action.label()),
                    "color": entry.action.color(),
                    "fields": [
                        { "name": "🔗 URL", "value": entry.url },
                        { "name": "👤 用户", "value": format!("<@{}>", entry.actor) },
                        { "name": "🆔 用户ID", "value": entry.actor },
                    ],
                    "timestamp": entry.timestamp.to_rfc3339(),
                    "footer": { "text": crate::APP_NAME },
                }
            ]
        })
    }

    /// 发送消息到webhook
    async fn send_to_webhook(&self, webhook_url: &str, body: &Value) -> Result<()> {
        debug!("发送消息到webhook: {}", webhook_url);

        let response = self
            .client
            .post(webhook_url)
            .json(body)
            .send()
            .await
            .context("发送webhook消息失败")?;

        if response.status().is_success() {
            debug!("webhook消息发送成功");
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("webhook消息发送失败: {} - {}", status, text);
            Err(anyhow::anyhow!("webhook消息发送失败: {}", status))
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send_direct(&self, owner: &str, message: &NotificationMessage) -> Result<()> {
        let Some(webhook_url) = &self.direct_webhook_url else {
            debug!("未配置私信webhook URL，跳过通知: {}", owner);
            return Ok(());
        };

        let body = self.build_direct_body(owner, message);
        self.send_to_webhook(webhook_url, &body).await
    }

    async fn send_audit(&self, entry: &AuditEntry) -> Result<()> {
        let Some(webhook_url) = &self.audit_webhook_url else {
            debug!("未配置审计webhook URL，跳过审计消息");
            return Ok(());
        };

        let body = self.build_audit_body(entry);
        self.send_to_webhook(webhook_url, &body).await
    }

    async fn test_connection(&self) -> Result<()> {
        let webhook_url = self
            .audit_webhook_url
            .as_ref()
            .or(self.direct_webhook_url.as_ref())
            .ok_or_else(|| anyhow::anyhow!("未配置任何webhook URL"))?;

        let body = json!({
            "embeds": [
                {
                    "title": "连接测试",
                    "description": "这是一条测试消息，用于验证webhook连接是否正常。",
                    "color": crate::notification::MessageType::Info.color(),
                }
            ]
        });
        self.send_to_webhook(webhook_url, &body).await?;
        info!("webhook连接测试成功");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::sender::{AuditAction, MessageType};
    use mockito::Matcher;

    fn message() -> NotificationMessage {
        NotificationMessage {
            title: "🔴 您的URL无法访问".to_string(),
            content: "URL **https://a.example** 当前无法访问。".to_string(),
            url: "https://a.example".to_string(),
            message_type: MessageType::Alert,
        }
    }

    #[tokio::test]
    async fn test_send_direct_mentions_owner() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/dm")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({ "content": "<@42>" })),
                Matcher::Regex(format!("\"color\":{}", 0xff0000)),
            ]))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let sender = WebhookSender::new(Some(format!("{}/dm", server.url())), None).unwrap();
        sender.send_direct("42", &message()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_audit_carries_actor_and_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/audit")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("https://a.example".to_string()),
                Matcher::Regex("<@7>".to_string()),
            ]))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let sender = WebhookSender::new(None, Some(format!("{}/audit", server.url()))).unwrap();
        let entry = AuditEntry::new(AuditAction::Deleted, "7", "https://a.example");
        sender.send_audit(&entry).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_webhook_is_skipped() {
        let sender = WebhookSender::new(None, None).unwrap();
        assert!(sender.send_direct("42", &message()).await.is_ok());
        assert!(sender
            .send_audit(&AuditEntry::new(AuditAction::Added, "42", "https://a.example"))
            .await
            .is_ok());
        assert!(sender.test_connection().await.is_err());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/dm")
            .with_status(404)
            .with_body("Unknown Webhook")
            .create_async()
            .await;

        let sender = WebhookSender::new(Some(format!("{}/dm", server.url())), None).unwrap();
        let err = sender.send_direct("42", &message()).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
