//! 客户端传输层
//!
//! 把"拨号一个地址、在连接上发起一元/双向流调用"抽象成 trait，
//! 生产实现基于 tonic；测试可以注入桩实现统计拨号次数。

pub mod codec;
pub mod grpc;

pub use codec::RawCodec;
pub use grpc::{GrpcStream, GrpcTransport};

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};

use crate::error::{Result, RpcError};

/// 调用请求封套
///
/// 每次 `call`/`stream` 构造一次，不被保留。`method` 是完整的
/// gRPC 路径（如 `/helloworld.Greeter/SayHello`）。
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// 逻辑服务名
    pub service: String,

    /// 完整方法路径
    pub method: String,

    /// 请求头（最终转换为 gRPC metadata）
    pub headers: HashMap<String, String>,

    /// 单次尝试的超时时间
    pub timeout: Option<Duration>,
}

impl CallRequest {
    /// 创建新的请求封套
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    /// 添加请求头
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// 把请求头转换为 gRPC metadata
    pub fn metadata(&self) -> Result<MetadataMap> {
        let mut metadata = MetadataMap::new();
        for (key, value) in &self.headers {
            let key = MetadataKey::from_bytes(key.as_bytes())
                .map_err(|e| RpcError::invalid_parameter(format!("invalid header key: {}", e)))?;
            let value: MetadataValue<_> = value
                .parse()
                .map_err(|_| RpcError::invalid_parameter("invalid header value"))?;
            metadata.insert(key, value);
        }
        Ok(metadata)
    }
}

/// 拨号选项
#[derive(Debug, Clone)]
pub struct DialOptions {
    /// 建立连接的超时时间
    pub connect_timeout: Duration,

    /// 最大接收消息大小（字节）
    pub max_recv_msg_size: usize,

    /// 最大发送消息大小（字节）
    pub max_send_msg_size: usize,
}

impl Default for DialOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            max_recv_msg_size: 4 * 1024 * 1024,
            max_send_msg_size: 4 * 1024 * 1024,
        }
    }
}

/// 双向流的消息通道
#[async_trait]
pub trait MessageStream: Send {
    /// 发送一条消息
    async fn send(&mut self, msg: Bytes) -> Result<()>;

    /// 接收一条消息，流正常结束时返回 `None`
    async fn recv(&mut self) -> Result<Option<Bytes>>;

    /// 关闭发送半边
    async fn close(&mut self) -> Result<()>;
}

/// 客户端传输 trait
#[async_trait]
pub trait ClientTransport: Send + Sync + 'static {
    /// 连接类型
    type Conn: Send + Sync + 'static;

    /// 双向流类型
    type Stream: MessageStream + 'static;

    /// 拨号建立新连接
    async fn dial(&self, address: &str) -> Result<Self::Conn>;

    /// 一元调用
    async fn unary(&self, conn: &Self::Conn, request: &CallRequest, body: Bytes) -> Result<Bytes>;

    /// 打开双向流
    async fn open_stream(&self, conn: &Self::Conn, request: &CallRequest) -> Result<Self::Stream>;
}
