//! 监控列表模块
//!
//! 提供监控列表的数据模型和持久化存储

pub mod model;
pub mod store;

// 重新导出主要类型
pub use model::{
    validate_url, DisplayBinding, LocationRef, MonitoredUrl, OwnerId, UrlStatus, Watchlist,
};
pub use store::{JsonFileStore, MemoryStore, WatchlistStore};
