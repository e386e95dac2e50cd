//! URL状态机
//!
//! 纯函数：根据当前条目与探测结果计算下一状态和需要执行的副作用。
//! 不涉及网络或存储，副作用由调用方执行。

use crate::health::prober::ProbeOutcome;
use crate::watchlist::{MonitoredUrl, UrlStatus};

/// 状态转换产生的副作用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// 通知用户URL已离线
    NotifyDown,
    /// 通知用户URL已恢复
    NotifyBackOnline,
    /// 从监控列表中移除并通知用户
    Evict,
}

/// 一次状态转换的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// 转换前的状态
    pub previous: UrlStatus,
    /// 转换后的条目；被驱逐时仍保留最终计数，但不应写回列表
    pub entry: MonitoredUrl,
    /// 需要执行的副作用，按顺序执行
    pub effects: Vec<Effect>,
}

impl Transition {
    /// 条目是否应被删除
    pub fn is_evicted(&self) -> bool {
        self.effects.contains(&Effect::Evict)
    }

    /// 状态是否发生了变化
    pub fn status_changed(&self) -> bool {
        self.previous != self.entry.status
    }
}

/// 应用一次探测结果
///
/// # 参数
/// * `current` - 当前条目
/// * `outcome` - 探测结果
/// * `failure_threshold` - 连续失败多少次后驱逐
///
/// # 返回
/// * `Transition` - 下一状态和副作用
pub fn apply(current: &MonitoredUrl, outcome: &ProbeOutcome, failure_threshold: u32) -> Transition {
    let previous = current.status;
    let mut entry = current.clone();
    let mut effects = Vec::new();

    match outcome {
        ProbeOutcome::Reachable => {
            if previous == UrlStatus::Offline {
                effects.push(Effect::NotifyBackOnline);
            }
            entry.status = UrlStatus::Online;
            entry.failure_count = 0;
        }
        ProbeOutcome::Unreachable { .. } => {
            if previous == UrlStatus::Offline {
                entry.failure_count = current.failure_count.saturating_add(1);
            } else {
                // 从非离线状态进入离线时计数从1开始，只在这一次提醒用户
                entry.failure_count = 1;
                effects.push(Effect::NotifyDown);
            }
            entry.status = UrlStatus::Offline;

            if entry.failure_count >= failure_threshold {
                effects.push(Effect::Evict);
            }
        }
    }

    Transition {
        previous,
        entry,
        effects,
    }
}
