//! 监控引擎
//!
//! 把检测队列、探测器、状态机和各副作用执行者组合在一起。
//! 状态机本身是纯函数，这里负责读写存储并按顺序执行副作用。

use crate::config::MonitorConfig;
use crate::display::DisplaySync;
use crate::error::Result;
use crate::health::queue::{CheckItem, CheckQueue};
use crate::health::tracker::{self, Effect, Transition};
use crate::health::{ProbeOutcome, Prober};
use crate::notification::NotificationDispatcher;
use crate::watchlist::{OwnerId, UrlStatus, WatchlistStore};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// 对外广播的监控事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// 用户添加了URL
    Added { owner: OwnerId, url: String },
    /// 用户删除了URL
    Deleted { owner: OwnerId, url: String },
    /// URL状态发生变化
    StatusChanged {
        owner: OwnerId,
        url: String,
        old: UrlStatus,
        new: UrlStatus,
    },
    /// URL因连续失败被移除
    Evicted {
        owner: OwnerId,
        url: String,
        failure_count: u32,
    },
}

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 监控引擎
pub struct Engine {
    config: MonitorConfig,
    store: Arc<dyn WatchlistStore>,
    prober: Arc<dyn Prober>,
    dispatcher: NotificationDispatcher,
    display: DisplaySync,
    queue: CheckQueue,
    events: broadcast::Sender<MonitorEvent>,
    /// 串行化对存储的读-改-写
    mutation_lock: Mutex<()>,
}

impl Engine {
    /// 创建监控引擎
    ///
    /// # 参数
    /// * `config` - 监控配置
    /// * `store` - 监控列表存储
    /// * `prober` - URL探测器
    /// * `dispatcher` - 通知分发器
    /// * `display` - 摘要视图同步器
    pub fn new(
        config: MonitorConfig,
        store: Arc<dyn WatchlistStore>,
        prober: Arc<dyn Prober>,
        dispatcher: NotificationDispatcher,
        display: DisplaySync,
    ) -> Self {
        let queue = CheckQueue::new(config.pacing_delay());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            store,
            prober,
            dispatcher,
            display,
            queue,
            events,
            mutation_lock: Mutex::new(()),
        }
    }

    /// 订阅监控事件
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn queue(&self) -> &CheckQueue {
        &self.queue
    }

    /// 把所有用户的所有URL按存储顺序加入检测队列
    ///
    /// # 返回
    /// * `Result<usize>` - 入队的条目数
    pub async fn enqueue_all(&self) -> Result<usize> {
        let mut enqueued = 0;
        for owner in self.store.owners().await? {
            let watchlist = self.store.load(&owner).await?;
            enqueued += watchlist.len();
            self.queue.extend(
                watchlist
                    .iter()
                    .map(|entry| CheckItem::new(owner.clone(), entry.url.clone())),
            );
        }

        debug!("本轮入队 {} 个URL", enqueued);
        Ok(enqueued)
    }

    /// 排空检测队列
    ///
    /// 已有排空循环在运行时立即返回 `None`。
    pub async fn drain(&self) -> Option<usize> {
        self.queue.drain(|item| self.process_item(item)).await
    }

    /// 处理单个检测条目，任何错误都只记录日志
    async fn process_item(&self, item: CheckItem) {
        match self.store.load(&item.owner).await {
            Ok(watchlist) if !watchlist.contains(&item.url) => {
                debug!("URL已不在监控列表中，跳过检测: {}", item.url);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                error!("读取用户 {} 的监控列表失败: {}", item.owner, e);
                return;
            }
        }

        let outcome = self.prober.probe(&item.url).await;
        if let ProbeOutcome::Unreachable { reason } = &outcome {
            warn!("URL无法访问 {}: {}", item.url, reason);
        }

        if let Err(e) = self.apply_outcome(&item.owner, &item.url, &outcome).await {
            error!("处理检测结果失败 {}: {}", item.url, e);
        }
    }

    /// 把探测结果应用到存储中的条目并执行副作用
    ///
    /// 条目已被删除时不做任何事。
    ///
    /// # 返回
    /// * `Result<Option<Transition>>` - 实际发生的状态转换
    pub async fn apply_outcome(
        &self,
        owner: &str,
        url: &str,
        outcome: &ProbeOutcome,
    ) -> Result<Option<Transition>> {
        let transition = {
            let _guard = self.lock_mutations().await;
            let mut watchlist = self.store.load(owner).await?;
            let Some(current) = watchlist.find(url) else {
                debug!("检测期间URL已被删除: {}", url);
                return Ok(None);
            };

            let transition = tracker::apply(current, outcome, self.config.failure_threshold);
            if transition.is_evicted() {
                watchlist.remove(url)?;
            } else {
                watchlist.replace(transition.entry.clone());
            }
            self.store.save(owner, watchlist).await?;
            transition
        };

        if transition.status_changed() {
            info!(
                "URL状态变化 {}: {} -> {}",
                url, transition.previous, transition.entry.status
            );
            self.emit(MonitorEvent::StatusChanged {
                owner: owner.to_string(),
                url: url.to_string(),
                old: transition.previous,
                new: transition.entry.status,
            });
        }

        for effect in &transition.effects {
            match effect {
                Effect::NotifyDown => self.dispatcher.notify_down(owner, url).await,
                Effect::NotifyBackOnline => self.dispatcher.notify_back_online(owner, url).await,
                Effect::Evict => {
                    let failure_count = transition.entry.failure_count;
                    info!("URL连续失败 {} 次，已移除: {}", failure_count, url);
                    self.dispatcher
                        .notify_evicted(owner, url, failure_count)
                        .await;
                    self.emit(MonitorEvent::Evicted {
                        owner: owner.to_string(),
                        url: url.to_string(),
                        failure_count,
                    });
                    self.display.refresh().await;
                }
            }
        }

        Ok(Some(transition))
    }

    pub(crate) async fn lock_mutations(&self) -> MutexGuard<'_, ()> {
        self.mutation_lock.lock().await
    }

    pub(crate) fn store(&self) -> &Arc<dyn WatchlistStore> {
        &self.store
    }

    pub(crate) fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    pub(crate) fn display(&self) -> &DisplaySync {
        &self.display
    }

    pub(crate) fn emit(&self, event: MonitorEvent) {
        // 没有订阅者时发送失败是正常情况
        let _ = self.events.send(event);
    }
}
