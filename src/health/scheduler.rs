//! 轮询调度器
//!
//! 按固定周期把所有URL加入检测队列，并在没有排空循环时启动一个。
//! 启动时立即执行第一轮。

use crate::engine::Engine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// 轮询调度器
pub struct PollScheduler {
    engine: Arc<Engine>,
    period: Duration,
    /// 当前排空任务，任务确认队列为空后自行清空
    drain_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PollScheduler {
    /// 创建调度器，周期取自引擎配置
    pub fn new(engine: Arc<Engine>) -> Self {
        let period = engine.config().poll_interval();
        Self {
            engine,
            period,
            drain_task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 执行一轮：全部入队，然后确保有排空任务在运行
    pub async fn tick(&self) {
        match self.engine.enqueue_all().await {
            Ok(count) => debug!("调度周期触发，入队 {} 个URL", count),
            Err(e) => error!("URL入队失败: {}", e),
        }
        self.ensure_draining().await;
    }

    /// 没有排空任务在运行时启动一个
    ///
    /// 排空任务退出前持有 `drain_task` 锁确认队列为空并清空句柄，
    /// 因此这里看到句柄仍在时，刚入队的条目一定会被该任务处理。
    /// 上一个任务若因panic退出，只记录日志。
    pub async fn ensure_draining(&self) {
        let mut slot = self.drain_task.lock().await;

        if let Some(task) = slot.as_ref() {
            if !task.is_finished() {
                debug!("排空任务仍在运行，本轮条目由其继续处理");
                return;
            }
        }

        if let Some(task) = slot.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!("排空任务异常退出: {}", e);
                }
            }
        }

        if self.engine.queue().is_empty() {
            return;
        }

        let engine = Arc::clone(&self.engine);
        let drain_task = Arc::clone(&self.drain_task);
        *slot = Some(tokio::spawn(async move {
            loop {
                let drained = engine.drain().await;
                if let Some(processed) = drained {
                    debug!("排空任务完成，处理 {} 个条目", processed);
                }

                let mut slot = drain_task.lock().await;
                if drained.is_none() || engine.queue().is_empty() {
                    slot.take();
                    break;
                }
            }
        }));
    }

    /// 运行调度循环直到收到关闭信号
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!("轮询调度器已启动，周期: {:?}", self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = shutdown.recv() => {
                    info!("收到关闭信号，停止轮询调度器");
                    break;
                }
            }
        }

        self.stop().await;
    }

    /// 中止正在运行的排空任务
    pub async fn stop(&self) {
        if let Some(task) = self.drain_task.lock().await.take() {
            task.abort();
            debug!("已中止排空任务");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::display::{DisplaySync, NoOpDisplay};
    use crate::health::{ProbeOutcome, Prober};
    use crate::notification::{MessageTemplates, NoOpSender, NotificationDispatcher};
    use crate::watchlist::{MemoryStore, UrlStatus, Watchlist, WatchlistStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProber {
        probes: AtomicUsize,
    }

    #[async_trait]
    impl Prober for CountingProber {
        async fn probe(&self, _url: &str) -> ProbeOutcome {
            self.probes.fetch_add(1, Ordering::SeqCst);
            ProbeOutcome::Reachable
        }
    }

    async fn setup(prober: Arc<CountingProber>) -> (Arc<MemoryStore>, PollScheduler) {
        let store = Arc::new(MemoryStore::new());
        let mut list = Watchlist::new();
        list.try_add("https://a.example".to_string(), 10).unwrap();
        list.try_add("https://b.example".to_string(), 10).unwrap();
        store.save("1", list).await.unwrap();

        let templates = Arc::new(MessageTemplates::new().unwrap());
        let config = MonitorConfig {
            pacing_delay_millis: 1000,
            ..Default::default()
        };
        let engine = Engine::new(
            config,
            store.clone(),
            prober,
            NotificationDispatcher::new(Arc::new(NoOpSender), templates.clone()),
            DisplaySync::new(
                store.clone(),
                Arc::new(NoOpDisplay),
                templates,
                Duration::from_secs(60),
            ),
        );
        (store, PollScheduler::new(Arc::new(engine)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_probes_every_url_in_order() {
        let prober = Arc::new(CountingProber::default());
        let (store, scheduler) = setup(prober.clone()).await;

        scheduler.tick().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(prober.probes.load(Ordering::SeqCst), 2);
        let list = store.load("1").await.unwrap();
        assert!(list.iter().all(|entry| entry.status == UrlStatus::Online));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_ticks_share_one_drain() {
        let prober = Arc::new(CountingProber::default());
        let (_store, scheduler) = setup(prober.clone()).await;

        // 第二轮在第一轮排空期间触发，条目追加到同一队列
        scheduler.tick().await;
        scheduler.tick().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(prober.probes.load(Ordering::SeqCst), 4);
        assert!(scheduler.engine.queue().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_enqueued_during_drain_need_no_extra_tick() {
        let prober = Arc::new(CountingProber::default());
        let (_store, scheduler) = setup(prober.clone()).await;

        scheduler.tick().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(prober.probes.load(Ordering::SeqCst), 2);

        // 排空任务正在等待最后一个条目后的间隔
        scheduler.engine.enqueue_all().await.unwrap();
        scheduler.ensure_draining().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(prober.probes.load(Ordering::SeqCst), 4);
        assert!(scheduler.engine.queue().is_empty());
        assert!(scheduler.drain_task.lock().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let prober = Arc::new(CountingProber::default());
        let (_store, scheduler) = setup(prober.clone()).await;
        let scheduler = Arc::new(scheduler);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let runner = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(prober.probes.load(Ordering::SeqCst), 2);

        shutdown_tx.send(()).unwrap();
        runner.await.unwrap();
    }
}
