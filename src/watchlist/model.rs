//! 监控列表数据模型
//!
//! 定义被监控的URL、其状态以及每个用户的有序监控列表

use crate::error::WatchlistError;
use serde::{Deserialize, Serialize};
use url::Url;

/// 用户标识
pub type OwnerId = String;

/// URL可用性状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UrlStatus {
    /// 尚未完成首次检测
    #[default]
    Unknown,
    /// 可访问
    Online,
    /// 不可访问
    Offline,
}

impl std::fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlStatus::Unknown => write!(f, "unknown"),
            UrlStatus::Online => write!(f, "online"),
            UrlStatus::Offline => write!(f, "offline"),
        }
    }
}

impl UrlStatus {
    /// 列表展示用的状态图标
    pub fn emoji(&self) -> &'static str {
        match self {
            UrlStatus::Online => "🟢",
            UrlStatus::Offline => "🔴",
            UrlStatus::Unknown => "⚪",
        }
    }
}

/// 被监控的URL条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredUrl {
    /// 被监控的地址
    pub url: String,
    /// 当前状态
    #[serde(default)]
    pub status: UrlStatus,
    /// 连续失败次数
    #[serde(default)]
    pub failure_count: u32,
}

impl MonitoredUrl {
    /// 创建处于初始状态的条目
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: UrlStatus::Unknown,
            failure_count: 0,
        }
    }

    /// 状态与失败计数是否一致
    pub fn is_consistent(&self) -> bool {
        match self.status {
            UrlStatus::Offline => true,
            _ => self.failure_count == 0,
        }
    }
}

/// 校验用户提交的URL
///
/// 要求是带主机名的绝对 http/https 地址，返回去除首尾空白后的字符串。
pub fn validate_url(raw: &str) -> Result<String, WatchlistError> {
    let trimmed = raw.trim();
    let invalid = || WatchlistError::InvalidUrl {
        url: trimmed.to_string(),
    };

    let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }

    Ok(trimmed.to_string())
}

/// 单个用户的有序监控列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watchlist {
    entries: Vec<MonitoredUrl>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MonitoredUrl] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonitoredUrl> {
        self.entries.iter()
    }

    /// 按URL字符串精确查找条目
    pub fn find(&self, url: &str) -> Option<&MonitoredUrl> {
        self.entries.iter().find(|entry| entry.url == url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.find(url).is_some()
    }

    /// 添加新的URL
    ///
    /// 先检查容量再检查重复，任何拒绝都不会修改列表。
    pub fn try_add(&mut self, url: String, limit: usize) -> Result<&MonitoredUrl, WatchlistError> {
        if self.entries.len() >= limit {
            return Err(WatchlistError::CapacityExceeded { limit });
        }
        if self.contains(&url) {
            return Err(WatchlistError::DuplicateEntry { url });
        }

        self.entries.push(MonitoredUrl::new(url));
        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    /// 删除指定URL
    pub fn remove(&mut self, url: &str) -> Result<MonitoredUrl, WatchlistError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.url == url)
            .ok_or_else(|| WatchlistError::NotFound {
                url: url.to_string(),
            })?;
        Ok(self.entries.remove(index))
    }

    /// 原位替换条目，条目不存在时返回 false
    pub fn replace(&mut self, entry: MonitoredUrl) -> bool {
        match self.entries.iter_mut().find(|item| item.url == entry.url) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }
}

/// 实时摘要视图所在位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRef {
    /// 频道ID
    pub channel_id: String,
    /// 消息ID
    pub message_id: String,
}

/// 用户与其摘要视图的绑定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayBinding {
    pub location_ref: LocationRef,
}
