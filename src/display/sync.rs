//! 摘要视图同步
//!
//! 任一监控列表变化后重新计算全局URL总数，并刷新每个用户绑定的摘要视图。
//! 找不到的视图视为失效，直接删除绑定而不重试。

use crate::display::surface::{DisplaySurface, RenderOutcome, SummaryView};
use crate::notification::template::{MessageTemplates, SummaryContext, SUMMARY_TEMPLATE};
use crate::watchlist::{DisplayBinding, LocationRef, WatchlistStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 一次刷新的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// 成功更新的视图数
    pub updated: usize,
    /// 因失效被删除的绑定数
    pub removed: usize,
    /// 更新失败的视图数
    pub failed: usize,
}

/// 摘要视图同步器
#[derive(Clone)]
pub struct DisplaySync {
    store: Arc<dyn WatchlistStore>,
    surface: Arc<dyn DisplaySurface>,
    templates: Arc<MessageTemplates>,
    poll_interval: Duration,
}

impl DisplaySync {
    pub fn new(
        store: Arc<dyn WatchlistStore>,
        surface: Arc<dyn DisplaySurface>,
        templates: Arc<MessageTemplates>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            surface,
            templates,
            poll_interval,
        }
    }

    /// 根据URL总数构建摘要视图
    pub fn build_view(&self, total_urls: usize) -> SummaryView {
        let context = SummaryContext {
            total_urls,
            poll_interval_seconds: self.poll_interval.as_secs(),
            active: total_urls > 0,
        };

        let description = self
            .templates
            .render(SUMMARY_TEMPLATE, &context)
            .unwrap_or_else(|e| {
                warn!("渲染摘要视图失败: {:#}", e);
                format!("URL总数: {}", total_urls)
            });

        SummaryView {
            description,
            total_urls,
            poll_interval_seconds: context.poll_interval_seconds,
        }
    }

    /// 为用户发布新的摘要视图并替换旧绑定
    ///
    /// 旧视图不会被删除，只是不再更新。
    pub async fn open_view(&self, owner: &str) -> anyhow::Result<LocationRef> {
        let total = self.store.total_urls().await?;
        let location = self.surface.publish(&self.build_view(total)).await?;

        self.store
            .put_binding(
                owner,
                DisplayBinding {
                    location_ref: location.clone(),
                },
            )
            .await?;

        info!("用户 {} 的摘要视图已绑定到 {}/{}", owner, location.channel_id, location.message_id);
        Ok(location)
    }

    /// 刷新所有绑定的摘要视图
    ///
    /// 单个视图的失败只记录日志，不影响其他视图。
    pub async fn refresh(&self) -> SyncReport {
        let mut report = SyncReport::default();

        let total = match self.store.total_urls().await {
            Ok(total) => total,
            Err(e) => {
                warn!("读取URL总数失败，跳过摘要视图刷新: {}", e);
                return report;
            }
        };
        let bindings = match self.store.bindings().await {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!("读取摘要视图绑定失败: {}", e);
                return report;
            }
        };

        let view = self.build_view(total);
        for (owner, binding) in bindings {
            match self.surface.update(&binding.location_ref, &view).await {
                Ok(RenderOutcome::Updated) => report.updated += 1,
                Ok(RenderOutcome::Stale) => {
                    info!("用户 {} 的摘要视图已失效，删除绑定", owner);
                    if let Err(e) = self.store.remove_binding(&owner).await {
                        warn!("删除失效绑定失败 {}: {}", owner, e);
                    }
                    report.removed += 1;
                }
                Err(e) => {
                    warn!("更新用户 {} 的摘要视图失败: {:#}", owner, e);
                    report.failed += 1;
                }
            }
        }

        debug!("摘要视图刷新完成: {:?}", report);
        report
    }
}
