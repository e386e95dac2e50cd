//! 通知分发器
//!
//! 把状态转换和用户操作翻译成私信与审计消息。发送失败只记录日志，
//! 不会中断触发通知的检测或用户操作。

use crate::logging;
use crate::notification::sender::{
    AuditAction, AuditEntry, MessageType, NotificationMessage, NotificationSender,
};
use crate::notification::template::{
    MessageTemplates, UrlContext, BACK_ONLINE_TEMPLATE, DOWN_TEMPLATE, EVICTED_TEMPLATE,
};
use std::sync::Arc;
use tracing::{info, warn};

/// 通知分发器
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: Arc<dyn NotificationSender>,
    templates: Arc<MessageTemplates>,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>, templates: Arc<MessageTemplates>) -> Self {
        Self { sender, templates }
    }

    /// URL进入离线状态
    pub async fn notify_down(&self, owner: &str, url: &str) {
        self.send_direct(owner, url, 1, DOWN_TEMPLATE, "🔴 您的URL无法访问", MessageType::Alert)
            .await;
    }

    /// URL从离线恢复
    pub async fn notify_back_online(&self, owner: &str, url: &str) {
        self.send_direct(
            owner,
            url,
            0,
            BACK_ONLINE_TEMPLATE,
            "🟢 您的URL已恢复",
            MessageType::Recovery,
        )
        .await;
    }

    /// URL因连续失败被移除
    pub async fn notify_evicted(&self, owner: &str, url: &str, failure_count: u32) {
        self.send_direct(
            owner,
            url,
            failure_count,
            EVICTED_TEMPLATE,
            "⚠️ URL已移出监控",
            MessageType::Removal,
        )
        .await;
        self.audit(AuditAction::AutoEvicted, owner, url).await;
    }

    /// 记录审计并广播到审计频道
    pub async fn audit(&self, action: AuditAction, actor: &str, url: &str) {
        let entry = AuditEntry::new(action, actor, url);
        logging::audit_log(&entry);

        if let Err(e) = self.sender.send_audit(&entry).await {
            warn!("发送审计消息失败 {} {}: {:#}", action, url, e);
        }
    }

    async fn send_direct(
        &self,
        owner: &str,
        url: &str,
        failure_count: u32,
        template: &str,
        title: &str,
        message_type: MessageType,
    ) {
        let context = UrlContext {
            owner: owner.to_string(),
            url: url.to_string(),
            failure_count,
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        let content = match self.templates.render(template, &context) {
            Ok(content) => content,
            Err(e) => {
                warn!("渲染通知失败，使用URL作为正文: {:#}", e);
                url.to_string()
            }
        };

        let message = NotificationMessage {
            title: title.to_string(),
            content,
            url: url.to_string(),
            message_type,
        };

        match self.sender.send_direct(owner, &message).await {
            Ok(()) => info!("已通知用户 {}: {} ({:?})", owner, url, message_type),
            Err(e) => warn!("向用户 {} 发送私信失败: {:#}", owner, e),
        }
    }
}
