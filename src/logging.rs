//! 日志系统模块
//!
//! 提供结构化日志配置和审计日志功能

use crate::notification::AuditEntry;
use log::LevelFilter;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（可选）
    pub file_path: Option<PathBuf>,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
        }
    }
}

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 当前配置
    current_config: Option<LogConfig>,
}

static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 重复调用不会重复安装subscriber，只返回新的句柄。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        let state_mutex =
            GLOBAL_LOGGING_STATE.get_or_init(|| Mutex::new(GlobalLoggingState::default()));
        let mut state = state_mutex
            .lock()
            .map_err(|_| anyhow::anyhow!("日志状态锁已损坏"))?;

        if !state.initialized {
            Self::init_log_tracer()?;
            Self::init_tracing_subscriber(&config)?;
            state.initialized = true;
            state.current_config = Some(config.clone());
        }

        Ok(Self { config })
    }

    /// 检查日志系统是否已初始化
    pub fn is_initialized() -> bool {
        GLOBAL_LOGGING_STATE
            .get()
            .and_then(|state| state.lock().ok().map(|s| s.initialized))
            .unwrap_or(false)
    }

    /// 获取当前日志配置（如果已初始化）
    pub fn current_config() -> Option<LogConfig> {
        GLOBAL_LOGGING_STATE
            .get()
            .and_then(|state| state.lock().ok().and_then(|s| s.current_config.clone()))
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接）
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let env_filter = EnvFilter::builder()
            .with_default_directive(Self::level_to_directive(config.level))
            .from_env_lossy()
            // 依赖库的连接日志过于冗长
            .add_directive("hyper=warn".parse()?)
            .add_directive("reqwest=warn".parse()?);

        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_target(true)
                .boxed()
        };

        let result = match (&config.file_path, config.console) {
            (Some(file_path), false) => {
                let file = std::fs::File::create(file_path)
                    .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true);
                tracing::subscriber::set_global_default(
                    registry().with(env_filter).with(file_layer),
                )
            }
            // LogTracer已单独安装，这里只设置全局dispatcher
            _ => {
                tracing::subscriber::set_global_default(registry().with(env_filter).with(fmt_layer))
            }
        };

        match result {
            Ok(()) => {
                tracing::info!("日志系统初始化完成");
                tracing::debug!("日志配置: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("a global default trace dispatcher has already been set") {
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("tracing subscriber初始化失败: {}", error_msg))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        let level = match level {
            LevelFilter::Off => TracingLevel::OFF,
            LevelFilter::Error => TracingLevel::ERROR,
            LevelFilter::Warn => TracingLevel::WARN,
            LevelFilter::Info => TracingLevel::INFO,
            LevelFilter::Debug => TracingLevel::DEBUG,
            LevelFilter::Trace => TracingLevel::TRACE,
        };
        Directive::from(level)
    }
}

/// 解析配置文件中的日志级别字符串
pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}

/// 记录审计日志
///
/// 审计记录同时以结构化字段和JSON两种形式输出，方便按 `audit` target 过滤。
pub fn audit_log(entry: &AuditEntry) {
    let audit_entry = json!({
        "id": entry.id,
        "timestamp": entry.timestamp.to_rfc3339(),
        "type": "audit",
        "action": entry.action,
        "actor": entry.actor,
        "url": entry.url,
    });

    tracing::info!(
        target: "audit",
        action = %entry.action,
        actor = %entry.actor,
        url = %entry.url,
        "AUDIT: {}",
        audit_entry
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::AuditAction;

    #[test]
    fn test_setup_logging_is_idempotent() {
        let config = LogConfig {
            level: LevelFilter::Debug,
            ..Default::default()
        };

        let first = LoggingSystem::setup_logging(config.clone());
        assert!(first.is_ok(), "{:?}", first.err());
        assert!(LoggingSystem::is_initialized());
        log::info!("log记录经由LogTracer转发");
        assert!(LoggingSystem::setup_logging(config).is_ok());
        assert!(LoggingSystem::current_config().is_some());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level("nonsense"), LevelFilter::Info);
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEntry::new(AuditAction::Added, "42", "https://a.example"));
    }
}
