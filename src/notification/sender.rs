//! 通知发送器模块
//!
//! 定义通知发送的trait和基础实现

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// 通知消息结构
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    /// 消息标题
    pub title: String,
    /// 消息内容
    pub content: String,
    /// 相关URL
    pub url: String,
    /// 消息类型
    pub message_type: MessageType,
}

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// 离线告警
    Alert,
    /// 恢复通知
    Recovery,
    /// 自动移除通知
    Removal,
    /// 信息消息
    Info,
}

impl MessageType {
    /// 消息卡片颜色
    pub fn color(&self) -> u32 {
        match self {
            MessageType::Alert => 0xff0000,
            MessageType::Recovery => 0x00ff00,
            MessageType::Removal => 0xffa500,
            MessageType::Info => 0x5865f2,
        }
    }
}

/// 审计动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// 用户添加URL
    Added,
    /// 用户手动删除URL
    Deleted,
    /// 连续失败后自动移除
    AutoEvicted,
}

impl AuditAction {
    /// 审计消息标题
    pub fn label(&self) -> &'static str {
        match self {
            AuditAction::Added => "添加URL",
            AuditAction::Deleted => "删除URL",
            AuditAction::AutoEvicted => "连续失败后自动删除URL",
        }
    }

    pub fn color(&self) -> u32 {
        match self {
            AuditAction::Added => 0x00ff00,
            AuditAction::Deleted | AuditAction::AutoEvicted => 0xff0000,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Added => write!(f, "added"),
            AuditAction::Deleted => write!(f, "deleted"),
            AuditAction::AutoEvicted => write!(f, "auto_evicted"),
        }
    }
}

/// 审计记录
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// 记录ID
    pub id: Uuid,
    /// 记录时间
    pub timestamp: DateTime<Utc>,
    /// 动作类型
    pub action: AuditAction,
    /// 执行动作的用户
    pub actor: String,
    /// 相关URL
    pub url: String,
}

impl AuditEntry {
    pub fn new(action: AuditAction, actor: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            actor: actor.into(),
            url: url.into(),
        }
    }
}

/// 通知发送器trait
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 向单个用户发送私信
    ///
    /// # 参数
    /// * `owner` - 接收通知的用户
    /// * `message` - 通知消息
    ///
    /// # 返回
    /// * `Result<()>` - 发送结果
    async fn send_direct(&self, owner: &str, message: &NotificationMessage) -> Result<()>;

    /// 向审计频道广播一条记录
    async fn send_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// 测试连接
    async fn test_connection(&self) -> Result<()>;
}

/// 空的通知发送器实现（用于测试或禁用通知）
pub struct NoOpSender;

#[async_trait]
impl NotificationSender for NoOpSender {
    async fn send_direct(&self, _owner: &str, _message: &NotificationMessage) -> Result<()> {
        Ok(())
    }

    async fn send_audit(&self, _entry: &AuditEntry) -> Result<()> {
        Ok(())
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }
}
