//! 流调用句柄

use bytes::Bytes;

use crate::error::{Result, RpcError};
use crate::pool::ConnPool;
use crate::transport::{ClientTransport, MessageStream};

/// 流调用句柄
///
/// 持有流期间的池化连接；`close` 把连接连同期间记录的首个错误
/// 一起归还连接池（有错误时连接被丢弃而不是复用）。没有显式
/// `close` 就丢弃句柄时，连接直接关闭，不回池。
pub struct CallStream<T: ClientTransport> {
    stream: T::Stream,
    pool: ConnPool<T>,
    address: String,
    conn: Option<T::Conn>,
    error: Option<RpcError>,
}

impl<T: ClientTransport> CallStream<T> {
    pub(crate) fn new(stream: T::Stream, pool: ConnPool<T>, address: String, conn: T::Conn) -> Self {
        Self {
            stream,
            pool,
            address,
            conn: Some(conn),
            error: None,
        }
    }

    /// 发送一条消息
    pub async fn send(&mut self, msg: Bytes) -> Result<()> {
        match self.stream.send(msg).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// 接收一条消息；流正常结束时返回 `None`
    pub async fn recv(&mut self) -> Result<Option<Bytes>> {
        match self.stream.recv().await {
            Ok(msg) => Ok(msg),
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// 流期间记录的首个错误
    pub fn error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }

    /// 对端地址
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 关闭流并归还连接
    pub async fn close(&mut self) -> Result<()> {
        let result = self.stream.close().await;
        if let Some(conn) = self.conn.take() {
            self.pool
                .release(&self.address, conn, self.error.as_ref())
                .await;
        }
        result
    }

    fn record_error(&mut self, error: &RpcError) {
        if self.error.is_none() {
            self.error = Some(error.clone());
        }
    }
}

impl<T: ClientTransport> Drop for CallStream<T> {
    fn drop(&mut self) {
        // 未显式 close 时连接状态未知，直接关闭而不是回池
        if let Some(conn) = self.conn.take() {
            drop(conn);
        }
    }
}
