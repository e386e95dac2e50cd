//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 监控引擎配置
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// 存储配置
    #[serde(default)]
    pub store: StoreConfig,
    /// 通知配置
    #[serde(default)]
    pub notification: NotificationConfig,
    /// 摘要视图配置
    #[serde(default)]
    pub display: DisplayConfig,
    /// Web API配置
    #[serde(default)]
    pub web: WebConfig,
}

/// 监控引擎配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// 轮询周期（秒）
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// 单次探测超时时间（秒）
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// 队列中两次探测之间的间隔（毫秒）
    #[serde(default = "default_pacing_delay")]
    pub pacing_delay_millis: u64,
    /// 每个用户最多监控的URL数量
    #[serde(default = "default_max_urls")]
    pub max_urls_per_owner: usize,
    /// 连续失败多少次后自动移除
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 探测请求使用的User-Agent
    pub user_agent: Option<String>,
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_millis)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            request_timeout_seconds: default_timeout(),
            pacing_delay_millis: default_pacing_delay(),
            max_urls_per_owner: default_max_urls(),
            failure_threshold: default_failure_threshold(),
            log_level: default_log_level(),
            user_agent: None,
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// JSON存储文件路径
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// 通知配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    /// 用户私信使用的webhook URL
    pub direct_webhook_url: Option<String>,
    /// 审计日志频道使用的webhook URL
    pub audit_webhook_url: Option<String>,
    /// 离线通知模板
    pub down_template: Option<String>,
    /// 恢复通知模板
    pub back_online_template: Option<String>,
    /// 自动移除通知模板
    pub evicted_template: Option<String>,
    /// 摘要视图模板
    pub summary_template: Option<String>,
}

/// 摘要视图配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// 发布与编辑摘要消息的webhook URL，未配置时不同步摘要视图
    pub webhook_url: Option<String>,
}

/// Web API配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    /// 是否启用 Web API
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,
    /// 绑定地址
    #[serde(default = "default_web_bind_address")]
    pub bind_address: String,
    /// 监听端口
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// API密钥，未配置时不校验
    pub api_key: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_web_enabled(),
            bind_address: default_web_bind_address(),
            port: default_web_port(),
            api_key: None,
        }
    }
}

// 默认值函数
fn default_poll_interval() -> u64 {
    60
}
fn default_timeout() -> u64 {
    10
}
fn default_pacing_delay() -> u64 {
    1000
}
fn default_max_urls() -> usize {
    10
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_store_path() -> PathBuf {
    PathBuf::from("data/watchlists.json")
}
fn default_web_enabled() -> bool {
    false
}
fn default_web_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_web_port() -> u16 {
    8080
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    let monitor = &config.monitor;

    if monitor.poll_interval_seconds == 0 {
        return Err("轮询周期不能为0".to_string());
    }

    if monitor.request_timeout_seconds == 0 {
        return Err("请求超时时间不能为0".to_string());
    }

    if monitor.max_urls_per_owner == 0 {
        return Err("每个用户的URL上限不能为0".to_string());
    }

    if monitor.failure_threshold == 0 {
        return Err("失败阈值不能为0".to_string());
    }

    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&monitor.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            monitor.log_level, valid_log_levels
        ));
    }

    if config.store.path.as_os_str().is_empty() {
        return Err("存储文件路径不能为空".to_string());
    }

    let webhooks = [
        ("direct_webhook_url", &config.notification.direct_webhook_url),
        ("audit_webhook_url", &config.notification.audit_webhook_url),
        ("display.webhook_url", &config.display.webhook_url),
    ];
    for (name, value) in webhooks {
        if let Some(url) = value {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("{} 的URL格式无效", name));
            }
        }
    }

    if config.web.enabled {
        if config.web.port == 0 {
            return Err("无效的Web服务器端口: 0".to_string());
        }
        if config.web.bind_address.is_empty() {
            return Err("Web服务器绑定地址不能为空".to_string());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.monitor.poll_interval_seconds, 60);
        assert_eq!(config.monitor.request_timeout_seconds, 10);
        assert_eq!(config.monitor.pacing_delay_millis, 1000);
        assert_eq!(config.monitor.max_urls_per_owner, 10);
        assert_eq!(config.monitor.failure_threshold, 5);
        assert_eq!(config.monitor.log_level, "info");
        assert!(!config.web.enabled);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.notification.direct_webhook_url = Some("https://hooks.example/dm".to_string());

        let serialized = toml::to_string(&config).expect("序列化失败");
        let deserialized: Config = toml::from_str(&serialized).expect("反序列化失败");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_validation_zero_threshold() {
        let mut config = Config::default();
        config.monitor.failure_threshold = 0;

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("失败阈值"));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.monitor.log_level = "verbose".to_string();

        assert!(validate_config(&config).unwrap_err().contains("日志级别"));
    }

    #[test]
    fn test_config_validation_invalid_webhook() {
        let mut config = Config::default();
        config.notification.audit_webhook_url = Some("ftp://nope".to_string());

        assert!(validate_config(&config)
            .unwrap_err()
            .contains("audit_webhook_url"));
    }

    #[test]
    fn test_config_validation_web_port() {
        let mut config = Config::default();
        config.web.enabled = true;
        config.web.port = 0;

        assert!(validate_config(&config).unwrap_err().contains("端口"));
    }

    #[test]
    fn test_durations() {
        let monitor = MonitorConfig::default();
        assert_eq!(monitor.poll_interval(), Duration::from_secs(60));
        assert_eq!(monitor.request_timeout(), Duration::from_secs(10));
        assert_eq!(monitor.pacing_delay(), Duration::from_secs(1));
    }
}
