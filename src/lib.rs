//! Uptime Sentinel - URL可用性监控引擎
//!
//! 为每个用户维护一份URL监控列表，并定期检测其可达性：
//! - 按固定周期逐个探测URL，同一时刻只有一个检测循环
//! - 离线、恢复和自动移除时私信通知用户
//! - 连续失败达到阈值后自动移除
//! - 审计日志和实时摘要视图同步
//! - 可选的HTTP管理接口

pub mod cli;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod health;
pub mod logging;
pub mod notification;
pub mod service;
pub mod watchlist;
pub mod web;

// 重新导出主要类型
pub use config::Config;
pub use engine::{Engine, MonitorEvent};
pub use error::{Result, SentinelError};
pub use service::WatchlistService;
pub use watchlist::{MonitoredUrl, UrlStatus};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
