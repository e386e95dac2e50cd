//! 检测队列
//!
//! 调度器和用户操作作为生产者写入，同一时刻最多只有一个消费循环在排空队列。
//! 排空过程中新加入的条目会被同一个循环继续处理。

use crate::watchlist::OwnerId;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// 一次待执行的检测
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckItem {
    /// URL所属用户
    pub owner: OwnerId,
    /// 被检测的URL
    pub url: String,
}

impl CheckItem {
    pub fn new(owner: impl Into<OwnerId>, url: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            url: url.into(),
        }
    }
}

/// 有序检测队列
pub struct CheckQueue {
    sender: mpsc::UnboundedSender<CheckItem>,
    /// 持有接收端即代表正在排空
    receiver: Mutex<mpsc::UnboundedReceiver<CheckItem>>,
    /// 尚未取出的条目数
    pending: AtomicUsize,
    /// 每个条目处理完后的等待时间
    pacing: Duration,
}

impl CheckQueue {
    /// 创建新的检测队列
    ///
    /// # 参数
    /// * `pacing` - 相邻两次检测之间的固定间隔
    pub fn new(pacing: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            pending: AtomicUsize::new(0),
            pacing,
        }
    }

    /// 追加一个检测条目，不做去重
    pub fn enqueue(&self, item: CheckItem) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.sender.send(item) {
            // 接收端与队列同生命周期，正常情况下不会发生
            self.pending.fetch_sub(1, Ordering::SeqCst);
            warn!("检测条目入队失败: {:?}", e.0);
        }
    }

    /// 批量追加检测条目
    pub fn extend<I: IntoIterator<Item = CheckItem>>(&self, items: I) {
        for item in items {
            self.enqueue(item);
        }
    }

    /// 尚未处理的条目数
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 当前是否有消费循环在运行
    pub fn is_draining(&self) -> bool {
        self.receiver.try_lock().is_err()
    }

    /// 排空队列
    ///
    /// 逐个取出队首条目交给 `handler`，每个条目处理完后等待固定间隔。
    /// 只有在检查时队列为空才会退出。已有消费循环在运行时立即返回 `None`。
    ///
    /// # 返回
    /// * `Option<usize>` - 本次处理的条目数
    pub async fn drain<F, Fut>(&self, mut handler: F) -> Option<usize>
    where
        F: FnMut(CheckItem) -> Fut,
        Fut: Future<Output = ()>,
    {
        let Ok(mut receiver) = self.receiver.try_lock() else {
            debug!("已有排空循环在运行，跳过");
            return None;
        };

        let mut processed = 0;
        while let Ok(item) = receiver.try_recv() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            handler(item).await;
            processed += 1;

            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        if processed > 0 {
            debug!("队列已排空，处理条目数: {}", processed);
        }
        Some(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_drain_preserves_order() {
        let queue = CheckQueue::new(Duration::ZERO);
        queue.extend([
            CheckItem::new("o1", "https://a.example"),
            CheckItem::new("o2", "https://b.example"),
            CheckItem::new("o1", "https://c.example"),
        ]);
        assert_eq!(queue.len(), 3);

        let mut seen = Vec::new();
        let processed = queue
            .drain(|item| {
                seen.push(item.url);
                async {}
            })
            .await;

        assert_eq!(processed, Some(3));
        assert_eq!(
            seen,
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_empty_drain_is_noop() {
        let queue = CheckQueue::new(Duration::from_secs(1));
        let mut calls = 0;
        let processed = queue
            .drain(|_| {
                calls += 1;
                async {}
            })
            .await;

        assert_eq!(processed, Some(0));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_duplicates_are_not_collapsed() {
        let queue = CheckQueue::new(Duration::ZERO);
        queue.enqueue(CheckItem::new("o", "https://a.example"));
        queue.enqueue(CheckItem::new("o", "https://a.example"));

        let processed = queue.drain(|_| async {}).await;
        assert_eq!(processed, Some(2));
    }

    #[tokio::test]
    async fn test_items_added_mid_drain_are_processed() {
        let queue = Arc::new(CheckQueue::new(Duration::ZERO));
        queue.enqueue(CheckItem::new("o", "https://first.example"));

        let producer = Arc::clone(&queue);
        let mut seen = Vec::new();
        let processed = queue
            .drain(|item| {
                if item.url == "https://first.example" {
                    producer.enqueue(CheckItem::new("o", "https://second.example"));
                }
                seen.push(item.url);
                async {}
            })
            .await;

        assert_eq!(processed, Some(2));
        assert_eq!(seen, vec!["https://first.example", "https://second.example"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_drain_is_rejected_while_running() {
        let queue = Arc::new(CheckQueue::new(Duration::from_secs(1)));
        queue.extend([
            CheckItem::new("o", "https://a.example"),
            CheckItem::new("o", "https://b.example"),
        ]);

        let first = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.drain(|_| async {}).await })
        };

        // 让第一个循环开始并停在间隔等待上
        while !queue.is_draining() {
            tokio::task::yield_now().await;
        }
        assert_eq!(queue.drain(|_| async {}).await, None);

        assert_eq!(first.await.unwrap(), Some(2));
        assert!(!queue.is_draining());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_items() {
        let queue = CheckQueue::new(Duration::from_secs(1));
        queue.extend([
            CheckItem::new("o", "https://a.example"),
            CheckItem::new("o", "https://b.example"),
            CheckItem::new("o", "https://c.example"),
        ]);

        let start = tokio::time::Instant::now();
        queue.drain(|_| async {}).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
