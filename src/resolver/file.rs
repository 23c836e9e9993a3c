//! 文件持久化路由表
//!
//! 将路由表镜像到磁盘上的一个 JSON 文档，由后台循环每秒全量重写。
//! 每次重写前会先从磁盘重新加载并合并外部变更，多个进程可以共享
//! 同一份文件（last-writer-wins）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};
use tracing::{debug, info, warn};

use crate::error::InfraResult;
use crate::resolver::table::{RouteEntry, RouteTable};

/// 磁盘同步周期
const SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// 持久化文档格式
#[derive(Debug, Serialize, Deserialize)]
struct PersistedTable {
    /// 最后写入时间（RFC3339）
    updated: DateTime<Utc>,

    /// 服务名 -> { 路由哈希 -> 路由条目 }
    routes: HashMap<String, HashMap<String, RouteEntry>>,
}

/// 文件持久化路由表
///
/// 包装一张内存路由表，启动时从磁盘加载已有内容，之后由后台任务
/// 周期性地同步回磁盘。`shutdown()` 停止后台任务并做最后一次落盘。
pub struct FileTable {
    table: Arc<RouteTable>,
    path: PathBuf,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl FileTable {
    /// 打开（或创建）文件持久化路由表，并启动同步任务
    pub fn open(path: impl Into<PathBuf>) -> InfraResult<Self> {
        let path = path.into();
        let table = Arc::new(RouteTable::new());

        if path.exists() {
            let entries = load_entries(&path)?;
            table.merge(entries);
            info!(path = %path.display(), services = table.len(), "route table loaded from file");
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let sync_table = table.clone();
        let sync_path = path.clone();

        tokio::spawn(async move {
            let mut interval_timer = interval(SYNC_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        if let Err(e) = sync_once(&sync_table, &sync_path) {
                            warn!(path = %sync_path.display(), error = %e, "⚠️ Failed to sync route table to file");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        // 停止前做最后一次落盘
                        if let Err(e) = sync_once(&sync_table, &sync_path) {
                            warn!(path = %sync_path.display(), error = %e, "⚠️ Final route table sync failed");
                        }
                        info!(path = %sync_path.display(), "🛑 Route table sync task stopped");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            table,
            path,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// 获取内存路由表
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.clone()
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 停止后台同步任务
    ///
    /// 应该在进程关闭前显式调用，而不是依赖 Drop。
    pub async fn shutdown(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }
    }
}

impl Drop for FileTable {
    fn drop(&mut self) {
        // 没有显式调用 shutdown 时尽力通知后台任务退出
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.try_send(());
        }
    }
}

/// 执行一次同步：先合并磁盘上的外部变更，再全量重写
fn sync_once(table: &RouteTable, path: &Path) -> InfraResult<()> {
    if path.exists() {
        let entries = load_entries(path)?;
        table.merge(entries);
    }
    let doc = PersistedTable {
        updated: Utc::now(),
        routes: table.snapshot(),
    };
    let content = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, content)?;
    debug!(path = %path.display(), services = table.len(), "route table synced");
    Ok(())
}

/// 从磁盘读取持久化文档
fn load_entries(path: &Path) -> InfraResult<HashMap<String, HashMap<String, RouteEntry>>> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }
    let doc: PersistedTable = serde_json::from_str(&content)?;
    Ok(doc.routes)
}
