//! 监控列表持久化存储
//!
//! 以用户为键保存监控列表和摘要视图绑定，提供JSON文件和内存两种实现

use crate::error::StoreError;
use crate::watchlist::model::{DisplayBinding, OwnerId, Watchlist};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 存储操作结果
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 监控列表存储trait
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// 列出所有拥有监控列表的用户
    async fn owners(&self) -> StoreResult<Vec<OwnerId>>;

    /// 读取用户的监控列表，不存在时返回空列表
    async fn load(&self, owner: &str) -> StoreResult<Watchlist>;

    /// 覆盖写入用户的监控列表
    async fn save(&self, owner: &str, watchlist: Watchlist) -> StoreResult<()>;

    /// 所有用户的URL总数
    async fn total_urls(&self) -> StoreResult<usize>;

    /// 读取用户的摘要视图绑定
    async fn binding(&self, owner: &str) -> StoreResult<Option<DisplayBinding>>;

    /// 列出所有摘要视图绑定
    async fn bindings(&self) -> StoreResult<Vec<(OwnerId, DisplayBinding)>>;

    /// 写入绑定，替换该用户已有的绑定
    async fn put_binding(&self, owner: &str, binding: DisplayBinding) -> StoreResult<()>;

    /// 删除绑定
    async fn remove_binding(&self, owner: &str) -> StoreResult<()>;
}

/// 存储文档
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    watchlists: BTreeMap<OwnerId, Watchlist>,
    #[serde(default)]
    bindings: BTreeMap<OwnerId, DisplayBinding>,
}

impl StoreDocument {
    fn owners(&self) -> Vec<OwnerId> {
        self.watchlists.keys().cloned().collect()
    }

    fn load(&self, owner: &str) -> Watchlist {
        self.watchlists.get(owner).cloned().unwrap_or_default()
    }

    fn total_urls(&self) -> usize {
        self.watchlists.values().map(Watchlist::len).sum()
    }

    fn bindings(&self) -> Vec<(OwnerId, DisplayBinding)> {
        self.bindings
            .iter()
            .map(|(owner, binding)| (owner.clone(), binding.clone()))
            .collect()
    }
}

/// 基于单个JSON文件的存储
///
/// 内存中保留完整副本，每次修改后整体写回文件（先写临时文件再重命名）。
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    document: RwLock<StoreDocument>,
}

impl JsonFileStore {
    /// 打开存储文件，文件不存在时从空文档开始
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => StoreDocument::default(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("存储文件不存在，将创建新文件: {}", path.display());
                StoreDocument::default()
            }
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };

        debug!(
            "已加载存储文件 {}，用户数: {}",
            path.display(),
            document.watchlists.len()
        );

        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    /// 存储文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 在文档副本上修改并写回文件，写入成功后才替换内存中的文档
    async fn commit<F>(&self, mutate: F) -> StoreResult<()>
    where
        F: FnOnce(&mut StoreDocument) -> bool + Send,
    {
        let mut document = self.document.write().await;
        let mut updated = document.clone();
        if !mutate(&mut updated) {
            return Ok(());
        }

        self.persist(&updated).await?;
        *document = updated;
        Ok(())
    }

    async fn persist(&self, document: &StoreDocument) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
        }

        let json = serde_json::to_string_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl WatchlistStore for JsonFileStore {
    async fn owners(&self) -> StoreResult<Vec<OwnerId>> {
        Ok(self.document.read().await.owners())
    }

    async fn load(&self, owner: &str) -> StoreResult<Watchlist> {
        Ok(self.document.read().await.load(owner))
    }

    async fn save(&self, owner: &str, watchlist: Watchlist) -> StoreResult<()> {
        self.commit(|document| {
            document.watchlists.insert(owner.to_string(), watchlist);
            true
        })
        .await
    }

    async fn total_urls(&self) -> StoreResult<usize> {
        Ok(self.document.read().await.total_urls())
    }

    async fn binding(&self, owner: &str) -> StoreResult<Option<DisplayBinding>> {
        Ok(self.document.read().await.bindings.get(owner).cloned())
    }

    async fn bindings(&self) -> StoreResult<Vec<(OwnerId, DisplayBinding)>> {
        Ok(self.document.read().await.bindings())
    }

    async fn put_binding(&self, owner: &str, binding: DisplayBinding) -> StoreResult<()> {
        self.commit(|document| {
            document.bindings.insert(owner.to_string(), binding);
            true
        })
        .await
    }

    async fn remove_binding(&self, owner: &str) -> StoreResult<()> {
        self.commit(|document| document.bindings.remove(owner).is_some())
            .await
    }
}

/// 内存存储，进程退出后数据丢失
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: RwLock<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatchlistStore for MemoryStore {
    async fn owners(&self) -> StoreResult<Vec<OwnerId>> {
        Ok(self.document.read().await.owners())
    }

    async fn load(&self, owner: &str) -> StoreResult<Watchlist> {
        Ok(self.document.read().await.load(owner))
    }

    async fn save(&self, owner: &str, watchlist: Watchlist) -> StoreResult<()> {
        self.document
            .write()
            .await
            .watchlists
            .insert(owner.to_string(), watchlist);
        Ok(())
    }

    async fn total_urls(&self) -> StoreResult<usize> {
        Ok(self.document.read().await.total_urls())
    }

    async fn binding(&self, owner: &str) -> StoreResult<Option<DisplayBinding>> {
        Ok(self.document.read().await.bindings.get(owner).cloned())
    }

    async fn bindings(&self) -> StoreResult<Vec<(OwnerId, DisplayBinding)>> {
        Ok(self.document.read().await.bindings())
    }

    async fn put_binding(&self, owner: &str, binding: DisplayBinding) -> StoreResult<()> {
        self.document
            .write()
            .await
            .bindings
            .insert(owner.to_string(), binding);
        Ok(())
    }

    async fn remove_binding(&self, owner: &str) -> StoreResult<()> {
        self.document.write().await.bindings.remove(owner);
        Ok(())
    }
}
