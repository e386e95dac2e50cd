//! 通知模块
//!
//! 提供webhook通知、消息模板和通知分发功能

pub mod dispatcher;
pub mod sender;
pub mod template;
pub mod webhook;

// 重新导出主要类型
pub use dispatcher::NotificationDispatcher;
pub use sender::{
    AuditAction, AuditEntry, MessageType, NoOpSender, NotificationMessage, NotificationSender,
};
pub use template::MessageTemplates;
pub use webhook::WebhookSender;
