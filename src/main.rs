//! Uptime Sentinel 主程序入口
//!
//! URL可用性监控引擎

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uptime_sentinel::cli::args::{Args, Commands};
use uptime_sentinel::cli::commands::{
    CheckCommand, Command, InitCommand, TestNotificationCommand, ValidateCommand, VersionCommand,
};
use uptime_sentinel::config::{Config, TomlConfigLoader};
use uptime_sentinel::display::{DisplaySurface, DisplaySync, NoOpDisplay, WebhookDisplay};
use uptime_sentinel::engine::Engine;
use uptime_sentinel::health::{HttpProber, PollScheduler};
use uptime_sentinel::logging::{self, LogConfig, LoggingSystem};
use uptime_sentinel::notification::{MessageTemplates, NotificationDispatcher, WebhookSender};
use uptime_sentinel::service::WatchlistService;
use uptime_sentinel::watchlist::JsonFileStore;
use uptime_sentinel::web::WebServer;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {:#}", e);
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Start { interval } => return execute_start_command(args, *interval).await,
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::TestNotification => Box::new(TestNotificationCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    setup_logging(args, None)?;
    command.execute(args).await?;
    Ok(())
}

/// 初始化日志系统，命令行参数优先于配置文件
fn setup_logging(args: &Args, config: Option<&Config>) -> Result<LoggingSystem> {
    let level = match (args.log_level, config) {
        (Some(level), _) => level.into(),
        (None, Some(config)) => logging::parse_level(&config.monitor.log_level),
        (None, None) => log::LevelFilter::Info,
    };

    let log_config = LogConfig {
        level,
        json_format: args.json_logs,
        ..Default::default()
    };
    LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")
}

/// 启动监控引擎并运行到收到关闭信号
async fn execute_start_command(args: &Args, interval: Option<u64>) -> Result<()> {
    let config = load_config(args, interval).await?;
    let _logging_system = setup_logging(args, Some(&config))?;
    install_panic_hook();

    info!("{} v{} 启动", uptime_sentinel::APP_NAME, uptime_sentinel::VERSION);

    let engine = Arc::new(initialize_engine(&config).await?);
    let service = WatchlistService::new(Arc::clone(&engine));

    let (shutdown_tx, _) = broadcast::channel(1);
    spawn_signal_listener(shutdown_tx.clone());
    spawn_event_logger(&engine, shutdown_tx.subscribe());

    let scheduler = Arc::new(PollScheduler::new(Arc::clone(&engine)));
    let scheduler_handle = {
        let scheduler = Arc::clone(&scheduler);
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move { scheduler.run(shutdown_rx).await })
    };

    let web_handle: Option<JoinHandle<()>> = if config.web.enabled {
        let server = WebServer::new(config.web.clone(), service);
        let shutdown_rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.start(shutdown_rx).await {
                error!("Web服务器异常退出: {:#}", e);
            }
        }))
    } else {
        None
    };

    info!("监控引擎已启动，轮询周期: {:?}", scheduler.period());

    if let Err(e) = scheduler_handle.await {
        error!("调度器任务异常退出: {}", e);
    }
    if let Some(handle) = web_handle {
        if let Err(e) = handle.await {
            error!("Web服务器任务异常退出: {}", e);
        }
    }

    info!("监控引擎已停止");
    Ok(())
}

/// 加载配置文件并应用命令行覆盖
async fn load_config(args: &Args, interval: Option<u64>) -> Result<Config> {
    let config_path = args.get_config_path();
    let loader = TomlConfigLoader::new(true);

    let mut config = if config_path.exists() {
        loader
            .load_from_file(&config_path)
            .await
            .with_context(|| format!("加载配置文件失败: {}", config_path.display()))?
    } else {
        eprintln!(
            "配置文件不存在: {}，使用默认配置。运行 'uptime-sentinel init' 可创建配置文件",
            config_path.display()
        );
        Config::default()
    };

    if let Some(seconds) = interval {
        config.monitor.poll_interval_seconds = seconds;
        loader.validate(&config)?;
    }

    Ok(config)
}

/// 组装监控引擎的全部组件
async fn initialize_engine(config: &Config) -> Result<Engine> {
    let store = Arc::new(
        JsonFileStore::open(&config.store.path)
            .await
            .with_context(|| format!("打开存储文件失败: {}", config.store.path.display()))?,
    );
    info!("存储文件: {}", store.path().display());

    let prober = Arc::new(HttpProber::new(
        config.monitor.request_timeout(),
        config.monitor.user_agent.as_deref(),
    )?);

    let templates = Arc::new(MessageTemplates::from_config(&config.notification)?);
    let sender = Arc::new(WebhookSender::new(
        config.notification.direct_webhook_url.clone(),
        config.notification.audit_webhook_url.clone(),
    )?);
    if config.notification.direct_webhook_url.is_none() {
        warn!("未配置私信webhook，用户将不会收到状态通知");
    }
    let dispatcher = NotificationDispatcher::new(sender, Arc::clone(&templates));

    let surface: Arc<dyn DisplaySurface> = match &config.display.webhook_url {
        Some(url) => Arc::new(WebhookDisplay::new(url.clone())?),
        None => {
            info!("未配置摘要视图webhook，摘要视图同步已禁用");
            Arc::new(NoOpDisplay)
        }
    };
    let display = DisplaySync::new(
        store.clone(),
        surface,
        templates,
        config.monitor.poll_interval(),
    );

    Ok(Engine::new(
        config.monitor.clone(),
        store,
        prober,
        dispatcher,
        display,
    ))
}

/// 监听Ctrl+C并广播关闭信号
fn spawn_signal_listener(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("收到中断信号，正在停止服务...");
                let _ = shutdown_tx.send(());
            }
            Err(err) => {
                error!("监听中断信号失败: {}", err);
            }
        }
    });
}

/// 把监控事件写入调试日志
fn spawn_event_logger(engine: &Engine, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => debug!("监控事件: {:?}", event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("事件日志落后，跳过 {} 条事件", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown_rx.recv() => break,
            }
        }
    });
}

/// 记录未捕获的panic，进程继续运行
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("未捕获的异常: {}", panic_info);
    }));
}
