//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Uptime Sentinel 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum SentinelError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 监控列表操作错误
    #[error("监控列表错误: {0}")]
    Watchlist(#[from] WatchlistError),

    /// 持久化存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 探测器错误
    #[error("探测错误: {0}")]
    Probe(#[from] ProbeError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 监控列表操作被拒绝的原因
///
/// 这些错误会原样返回给发起请求的用户，且不会改变任何状态。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchlistError {
    /// URL格式无效
    #[error("无效的URL: {url}")]
    InvalidUrl { url: String },

    /// 已达到每个用户的URL上限
    #[error("已达到URL数量上限: {limit}")]
    CapacityExceeded { limit: usize },

    /// URL已存在于列表中
    #[error("URL已存在: {url}")]
    DuplicateEntry { url: String },

    /// URL不在列表中
    #[error("URL不存在: {url}")]
    NotFound { url: String },
}

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 读写存储文件失败
    #[error("存储文件读写失败 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 存储内容损坏
    #[error("存储内容解析失败: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// 探测器错误类型
///
/// 仅用于探测器构建阶段；单次探测失败不会产生错误，而是返回不可达结果。
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP客户端构建失败
    #[error("HTTP客户端构建失败: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, SentinelError>;
