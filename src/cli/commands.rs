//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, ConfigTemplate, OutputFormat};
use crate::config::TomlConfigLoader;
use crate::error::Result;
use crate::health::{HttpProber, ProbeOutcome, Prober};
use crate::notification::{NotificationSender, WebhookSender};
use crate::watchlist::UrlStatus;
use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, Instant};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init {
            config_path,
            force,
            template,
        } = &args.command
        {
            self.create_config_file(config_path, *force, *template).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    async fn create_config_file(
        &self,
        config_path: &Path,
        force: bool,
        template: ConfigTemplate,
    ) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, Self::template_content(template)).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件以设置通知webhook");

        Ok(())
    }

    /// 获取模板内容
    pub fn template_content(template: ConfigTemplate) -> &'static str {
        match template {
            ConfigTemplate::Minimal => MINIMAL_CONFIG,
            ConfigTemplate::Full => FULL_CONFIG,
        }
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;

        println!("✓ 配置文件验证通过");
        if verbose {
            let monitor = &config.monitor;
            println!("监控配置:");
            println!("  轮询周期: {}秒", monitor.poll_interval_seconds);
            println!("  请求超时: {}秒", monitor.request_timeout_seconds);
            println!("  检测间隔: {}毫秒", monitor.pacing_delay_millis);
            println!("  每用户URL上限: {}", monitor.max_urls_per_owner);
            println!("  失败阈值: {}", monitor.failure_threshold);
            println!("  日志级别: {}", monitor.log_level);
            println!("存储文件: {}", config.store.path.display());
            println!(
                "私信webhook: {}",
                configured(&config.notification.direct_webhook_url)
            );
            println!(
                "审计webhook: {}",
                configured(&config.notification.audit_webhook_url)
            );
            println!("摘要视图webhook: {}", configured(&config.display.webhook_url));
            println!(
                "Web API: {}",
                if config.web.enabled {
                    format!("{}:{}", config.web.bind_address, config.web.port)
                } else {
                    "未启用".to_string()
                }
            );
        }

        Ok(())
    }
}

fn configured(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "已配置"
    } else {
        "未配置"
    }
}

/// 检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check {
            url,
            format,
            timeout,
        } = &args.command
        {
            self.perform_check(url, *format, *timeout).await
        } else {
            Ok(())
        }
    }
}

impl CheckCommand {
    /// 执行一次探测并输出结果
    async fn perform_check(&self, url: &str, format: OutputFormat, timeout: u64) -> Result<()> {
        let url = crate::watchlist::validate_url(url)?;
        let prober = HttpProber::new(Duration::from_secs(timeout), None)?;

        let started = Instant::now();
        let outcome = prober.probe(&url).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match format {
            OutputFormat::Json => {
                let reason = match &outcome {
                    ProbeOutcome::Reachable => None,
                    ProbeOutcome::Unreachable { reason } => Some(reason.clone()),
                };
                let result = serde_json::json!({
                    "url": url,
                    "reachable": outcome.is_reachable(),
                    "reason": reason,
                    "elapsed_ms": elapsed_ms,
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            OutputFormat::Text => {
                let status = Self::status_of(&outcome);
                println!("{} {} {} ({}ms)", status.emoji(), url, status, elapsed_ms);
                if let ProbeOutcome::Unreachable { reason } = &outcome {
                    println!("   原因: {}", reason);
                }
            }
        }

        Ok(())
    }

    /// 单次探测结果对应的列表状态
    fn status_of(outcome: &ProbeOutcome) -> UrlStatus {
        if outcome.is_reachable() {
            UrlStatus::Online
        } else {
            UrlStatus::Offline
        }
    }
}

/// 测试通知命令
pub struct TestNotificationCommand;

#[async_trait]
impl Command for TestNotificationCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(args.get_config_path()).await?;

        let sender = WebhookSender::new(
            config.notification.direct_webhook_url.clone(),
            config.notification.audit_webhook_url.clone(),
        )?;
        sender.test_connection().await?;

        println!("✓ 测试消息已发送");
        Ok(())
    }
}

const MINIMAL_CONFIG: &str = r#"# Uptime Sentinel 配置文件

[monitor]
poll_interval_seconds = 60
max_urls_per_owner = 10
failure_threshold = 5

[store]
path = "data/watchlists.json"

[notification]
# direct_webhook_url = "https://chat.example.com/api/webhooks/dm"
# audit_webhook_url = "https://chat.example.com/api/webhooks/audit"
"#;

const FULL_CONFIG: &str = r#"# Uptime Sentinel 配置文件

[monitor]
# 轮询周期（秒）
poll_interval_seconds = 60
# 单次探测超时时间（秒）
request_timeout_seconds = 10
# 队列中两次探测之间的间隔（毫秒）
pacing_delay_millis = 1000
# 每个用户最多监控的URL数量
max_urls_per_owner = 10
# 连续失败多少次后自动移除
failure_threshold = 5
# 日志级别: trace, debug, info, warn, error
log_level = "info"
# user_agent = "uptime-sentinel"

[store]
path = "data/watchlists.json"

[notification]
# 私信与审计频道webhook，未配置时跳过发送
# direct_webhook_url = "https://chat.example.com/api/webhooks/dm"
# audit_webhook_url = "https://chat.example.com/api/webhooks/audit"
# 模板使用Handlebars语法，可用变量: owner, url, failure_count, timestamp
# down_template = "URL **{{url}}** 当前无法访问。"
# back_online_template = "URL **{{url}}** 已恢复访问。"
# evicted_template = "URL **{{url}}** 连续 {{failure_count}} 次检测失败，已移除。"

[display]
# 摘要视图webhook，未配置时不同步摘要视图
# webhook_url = "https://chat.example.com/api/webhooks/summary"

[web]
enabled = false
bind_address = "127.0.0.1"
port = 8080
# api_key = "change-me"
"#;
