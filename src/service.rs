//! 监控列表服务
//!
//! 面向用户的操作入口：添加、删除、查看URL以及绑定摘要视图。
//! 被拒绝的操作不会改变任何状态。

use crate::engine::{Engine, MonitorEvent};
use crate::error::{Result, WatchlistError};
use crate::health::CheckItem;
use crate::notification::AuditAction;
use crate::watchlist::{validate_url, DisplayBinding, LocationRef, MonitoredUrl};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// 运行状态摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    /// 拥有监控列表的用户数
    pub owners: usize,
    /// 所有用户的URL总数
    pub total_urls: usize,
    /// 等待检测的条目数
    pub queued: usize,
    /// 是否正在排空队列
    pub draining: bool,
    /// 轮询周期（秒）
    pub poll_interval_seconds: u64,
}

/// 监控列表服务
#[derive(Clone)]
pub struct WatchlistService {
    engine: Arc<Engine>,
}

impl WatchlistService {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// 为用户添加一个URL
    ///
    /// 新条目以未知状态加入列表末尾，并进入检测队列等待下一次排空。
    ///
    /// # 参数
    /// * `owner` - 发起请求的用户
    /// * `raw_url` - 用户提交的URL
    ///
    /// # 返回
    /// * `Result<MonitoredUrl>` - 新加入的条目
    pub async fn request_add(&self, owner: &str, raw_url: &str) -> Result<MonitoredUrl> {
        let url = validate_url(raw_url)?;
        let limit = self.engine.config().max_urls_per_owner;

        let entry = {
            let _guard = self.engine.lock_mutations().await;
            let mut watchlist = self.engine.store().load(owner).await?;
            let entry = watchlist.try_add(url, limit)?.clone();
            self.engine.store().save(owner, watchlist).await?;
            entry
        };

        info!("用户 {} 添加URL: {}", owner, entry.url);
        self.engine
            .queue()
            .enqueue(CheckItem::new(owner, entry.url.clone()));
        self.engine.emit(MonitorEvent::Added {
            owner: owner.to_string(),
            url: entry.url.clone(),
        });
        self.engine
            .dispatcher()
            .audit(AuditAction::Added, owner, &entry.url)
            .await;
        self.engine.display().refresh().await;

        Ok(entry)
    }

    /// 删除用户的一个URL
    pub async fn request_delete(&self, owner: &str, raw_url: &str) -> Result<MonitoredUrl> {
        let url = raw_url.trim();

        let removed = {
            let _guard = self.engine.lock_mutations().await;
            let mut watchlist = self.engine.store().load(owner).await?;
            let removed = watchlist.remove(url)?;
            self.engine.store().save(owner, watchlist).await?;
            removed
        };

        info!("用户 {} 删除URL: {}", owner, removed.url);
        self.engine.emit(MonitorEvent::Deleted {
            owner: owner.to_string(),
            url: removed.url.clone(),
        });
        self.engine
            .dispatcher()
            .audit(AuditAction::Deleted, owner, &removed.url)
            .await;
        self.engine.display().refresh().await;

        Ok(removed)
    }

    /// 按添加顺序列出用户的URL
    pub async fn request_list(&self, owner: &str) -> Result<Vec<MonitoredUrl>> {
        let watchlist = self.engine.store().load(owner).await?;
        Ok(watchlist.entries().to_vec())
    }

    /// 记录用户摘要视图的位置，替换旧绑定
    pub async fn bind_display(&self, owner: &str, location_ref: LocationRef) -> Result<()> {
        self.engine
            .store()
            .put_binding(owner, DisplayBinding { location_ref })
            .await?;
        Ok(())
    }

    /// 为用户发布新的摘要视图并绑定
    pub async fn open_display(&self, owner: &str) -> Result<LocationRef> {
        Ok(self.engine.display().open_view(owner).await?)
    }

    /// 当前运行状态
    pub async fn summary(&self) -> Result<ServiceSummary> {
        let store = self.engine.store();
        Ok(ServiceSummary {
            owners: store.owners().await?.len(),
            total_urls: store.total_urls().await?,
            queued: self.engine.queue().len(),
            draining: self.engine.queue().is_draining(),
            poll_interval_seconds: self.engine.config().poll_interval_seconds,
        })
    }
}

/// 判断错误是否属于应直接返回给用户的拒绝原因
pub fn rejection(error: &crate::SentinelError) -> Option<&WatchlistError> {
    match error {
        crate::SentinelError::Watchlist(e) => Some(e),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::display::{DisplaySync, NoOpDisplay};
    use crate::health::{ProbeOutcome, Prober};
    use crate::notification::{MessageTemplates, NoOpSender, NotificationDispatcher};
    use crate::watchlist::{MemoryStore, UrlStatus, WatchlistStore};
    use async_trait::async_trait;
    use std::time::Duration;

    struct UpProber;

    #[async_trait]
    impl Prober for UpProber {
        async fn probe(&self, _url: &str) -> ProbeOutcome {
            ProbeOutcome::Reachable
        }
    }

    fn service(store: Arc<MemoryStore>, max_urls: usize) -> WatchlistService {
        let templates = Arc::new(MessageTemplates::new().unwrap());
        let config = MonitorConfig {
            max_urls_per_owner: max_urls,
            pacing_delay_millis: 0,
            ..Default::default()
        };
        let engine = Engine::new(
            config,
            store.clone(),
            Arc::new(UpProber),
            NotificationDispatcher::new(Arc::new(NoOpSender), templates.clone()),
            DisplaySync::new(store, Arc::new(NoOpDisplay), templates, Duration::from_secs(60)),
        );
        WatchlistService::new(Arc::new(engine))
    }

    fn rejected(result: Result<MonitoredUrl>) -> WatchlistError {
        let err = result.unwrap_err();
        rejection(&err).cloned().unwrap()
    }

    #[tokio::test]
    async fn test_add_trims_and_enqueues() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone(), 10);

        let entry = service
            .request_add("1", "  https://a.example  ")
            .await
            .unwrap();

        assert_eq!(entry.url, "https://a.example");
        assert_eq!(entry.status, UrlStatus::Unknown);
        assert_eq!(service.engine().queue().len(), 1);
        assert_eq!(store.total_urls().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_rejections_leave_state_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone(), 1);

        assert_eq!(
            rejected(service.request_add("1", "not a url").await),
            WatchlistError::InvalidUrl {
                url: "not a url".to_string()
            }
        );
        assert_eq!(
            rejected(service.request_add("1", "ftp://a.example").await),
            WatchlistError::InvalidUrl {
                url: "ftp://a.example".to_string()
            }
        );

        service.request_add("1", "https://a.example").await.unwrap();

        // 容量检查先于重复检查
        assert_eq!(
            rejected(service.request_add("1", "https://a.example").await),
            WatchlistError::CapacityExceeded { limit: 1 }
        );
        assert_eq!(store.total_urls().await.unwrap(), 1);
        assert_eq!(service.engine().queue().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_rejected_below_capacity() {
        let service = service(Arc::new(MemoryStore::new()), 10);
        service.request_add("1", "https://a.example").await.unwrap();

        assert_eq!(
            rejected(service.request_add("1", "https://a.example").await),
            WatchlistError::DuplicateEntry {
                url: "https://a.example".to_string()
            }
        );
        // 其他用户可以添加相同的URL
        assert!(service.request_add("2", "https://a.example").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let service = service(Arc::new(MemoryStore::new()), 10);
        service.request_add("1", "https://a.example").await.unwrap();
        service.request_add("1", "https://b.example").await.unwrap();

        service.request_delete("1", "https://a.example").await.unwrap();
        assert_eq!(
            rejected(service.request_delete("1", "https://a.example").await),
            WatchlistError::NotFound {
                url: "https://a.example".to_string()
            }
        );

        let urls: Vec<String> = service
            .request_list("1")
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.url)
            .collect();
        assert_eq!(urls, vec!["https://b.example".to_string()]);
    }

    #[tokio::test]
    async fn test_deleted_url_in_queue_is_not_probed() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone(), 10);
        service.request_add("1", "https://a.example").await.unwrap();
        service.request_delete("1", "https://a.example").await.unwrap();

        assert_eq!(service.engine().drain().await, Some(1));
        assert!(store.load("1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let service = service(Arc::new(MemoryStore::new()), 10);
        service.request_add("1", "https://a.example").await.unwrap();
        service.request_add("2", "https://b.example").await.unwrap();

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.owners, 2);
        assert_eq!(summary.total_urls, 2);
        assert_eq!(summary.queued, 2);
        assert!(!summary.draining);
        assert_eq!(summary.poll_interval_seconds, 60);
    }
}
