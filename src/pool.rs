//! 连接池
//!
//! 按地址维护空闲连接集合。连接被独占借出，调用方必须成对地
//! `release`；带错误归还的连接直接丢弃（fail-fast 失效策略），
//! 空闲超过 TTL 的连接在下次取用时被惰性淘汰。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Result, RpcError};
use crate::transport::ClientTransport;

/// 连接池配置
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// 每个地址保留的最大空闲连接数
    pub size: usize,

    /// 空闲连接存活时间
    pub ttl: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            size: 16,
            ttl: Duration::from_secs(60),
        }
    }
}

/// 空闲连接
struct IdleConn<C> {
    conn: C,
    released_at: Instant,
}

struct PoolInner<T: ClientTransport> {
    transport: Arc<T>,
    options: RwLock<PoolOptions>,
    idle: Mutex<HashMap<String, Vec<IdleConn<T::Conn>>>>,
}

/// 连接池
///
/// 可廉价克隆，所有克隆共享同一组空闲连接。
pub struct ConnPool<T: ClientTransport> {
    inner: Arc<PoolInner<T>>,
}

impl<T: ClientTransport> Clone for ConnPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ClientTransport> ConnPool<T> {
    /// 创建新的连接池
    pub fn new(transport: Arc<T>, options: PoolOptions) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                transport,
                options: RwLock::new(options),
                idle: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// （重新）配置池大小和 TTL
    pub fn init(&self, options: PoolOptions) {
        *self.inner.options.write().unwrap() = options;
    }

    /// 借出一个到 `address` 的连接
    ///
    /// 优先复用未过期的空闲连接，没有则拨号新建。借出的连接必须
    /// 通过 `release` 成对归还，否则等同于泄漏一个连接槽位。
    pub async fn get(&self, address: &str) -> Result<T::Conn> {
        let ttl = self.inner.options.read().unwrap().ttl;
        {
            let mut idle = self.inner.idle.lock().await;
            if let Some(conns) = idle.get_mut(address) {
                let before = conns.len();
                conns.retain(|entry| entry.released_at.elapsed() <= ttl);
                let expired = before - conns.len();
                if expired > 0 {
                    debug!(address = %address, expired, "idle connections evicted");
                }
                if let Some(entry) = conns.pop() {
                    return Ok(entry.conn);
                }
                idle.remove(address);
            }
        }
        self.inner.transport.dial(address).await
    }

    /// 归还连接
    ///
    /// `error` 非空时连接被视为不健康，直接关闭丢弃；否则带着
    /// 刷新后的时间戳回到空闲集合，超出池容量时淘汰最久空闲者。
    pub async fn release(&self, address: &str, conn: T::Conn, error: Option<&RpcError>) {
        if let Some(e) = error {
            debug!(address = %address, error = %e, "connection discarded");
            drop(conn);
            return;
        }

        let size = self.inner.options.read().unwrap().size;
        let mut idle = self.inner.idle.lock().await;
        let conns = idle.entry(address.to_string()).or_default();
        conns.push(IdleConn {
            conn,
            released_at: Instant::now(),
        });
        while conns.len() > size {
            conns.remove(0);
            debug!(address = %address, "oldest idle connection evicted (pool full)");
        }
    }

    /// 某个地址当前的空闲连接数
    pub async fn idle_count(&self, address: &str) -> usize {
        let idle = self.inner.idle.lock().await;
        idle.get(address).map(|conns| conns.len()).unwrap_or(0)
    }

    /// 清空所有空闲连接
    pub async fn clear(&self) {
        let mut idle = self.inner.idle.lock().await;
        idle.clear();
    }
}
