//! 测试公共设施
//!
//! 提供可注入的桩传输：统计拨号与调用次数，可按需注入失败，
//! 用于验证连接池与重试行为。

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use flare_rpc_core::error::{Result, RpcError};
use flare_rpc_core::transport::{CallRequest, ClientTransport, MessageStream};

/// 桩连接
pub struct StubConn {
    pub address: String,
    pub id: usize,
}

/// 桩传输
///
/// `unary` 默认回显请求体；`fail_next`/`set_fail_all` 注入传输错误。
#[derive(Default)]
pub struct StubTransport {
    dials: AtomicUsize,
    conn_seq: AtomicUsize,
    calls: Mutex<HashMap<String, usize>>,
    last_headers: Mutex<HashMap<String, String>>,
    fail_remaining: AtomicUsize,
    fail_all: AtomicBool,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 到目前为止的拨号次数
    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// 发往某个地址的调用次数
    pub fn calls_to(&self, address: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// 所有调用的总次数
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// 让接下来的 `n` 次调用失败
    pub fn fail_next(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// 让所有调用失败
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// 最近一次调用携带的请求头
    pub fn last_headers(&self) -> HashMap<String, String> {
        self.last_headers.lock().unwrap().clone()
    }

    fn record_call(&self, address: &str) {
        let mut calls = self.calls.lock().unwrap();
        *calls.entry(address.to_string()).or_insert(0) += 1;
    }

    fn should_fail(&self) -> bool {
        if self.fail_all.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ClientTransport for StubTransport {
    type Conn = StubConn;
    type Stream = StubStream;

    async fn dial(&self, address: &str) -> Result<StubConn> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        Ok(StubConn {
            address: address.to_string(),
            id: self.conn_seq.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn unary(&self, conn: &StubConn, request: &CallRequest, body: Bytes) -> Result<Bytes> {
        self.record_call(&conn.address);
        *self.last_headers.lock().unwrap() = request.headers.clone();
        if self.should_fail() {
            return Err(RpcError::transport_error("stub: injected failure"));
        }
        Ok(body)
    }

    async fn open_stream(&self, conn: &StubConn, _request: &CallRequest) -> Result<StubStream> {
        self.record_call(&conn.address);
        if self.should_fail() {
            return Err(RpcError::transport_error("stub: injected failure"));
        }
        Ok(StubStream::default())
    }
}

/// 回显桩流：send 入队，recv 出队
#[derive(Default)]
pub struct StubStream {
    queue: VecDeque<Bytes>,
    closed: bool,
}

#[async_trait]
impl MessageStream for StubStream {
    async fn send(&mut self, msg: Bytes) -> Result<()> {
        if self.closed {
            return Err(RpcError::stream_closed("stub: send half closed"));
        }
        self.queue.push_back(msg);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Bytes>> {
        Ok(self.queue.pop_front())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
