//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Uptime Sentinel - URL可用性监控引擎
#[derive(Parser, Debug, Clone)]
#[command(
    name = "uptime-sentinel",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "SENTINEL_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，覆盖配置文件中的设置
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "SENTINEL_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,

    /// 以JSON格式输出日志
    #[arg(long, help = "以JSON格式输出日志")]
    pub json_logs: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动监控引擎
    Start {
        /// 轮询周期（秒）
        #[arg(
            short,
            long,
            value_name = "SECONDS",
            help = "轮询周期（秒）",
            env = "SENTINEL_INTERVAL"
        )]
        interval: Option<u64>,
    },

    /// 对单个URL执行一次探测
    Check {
        /// 要探测的URL
        #[arg(value_name = "URL", help = "要探测的URL")]
        url: String,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,

        /// 超时时间（秒）
        #[arg(
            short,
            long,
            value_name = "SECONDS",
            default_value = "10",
            help = "超时时间（秒）"
        )]
        timeout: u64,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = crate::config::DEFAULT_CONFIG_FILE
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,

        /// 配置模板类型
        #[arg(
            short,
            long,
            value_enum,
            default_value = "minimal",
            help = "配置模板类型"
        )]
        template: ConfigTemplate,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,

        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },

    /// 测试通知webhook连接
    TestNotification,

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

/// 配置模板类型
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum ConfigTemplate {
    /// 最小模板
    Minimal,
    /// 完整模板
    Full,
}

impl Args {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }
}
