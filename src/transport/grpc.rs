//! tonic 传输实现

use async_trait::async_trait;
use bytes::Bytes;
use http::uri::PathAndQuery;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::client::Grpc;
use tonic::transport::{Channel, Endpoint};
use tonic::Streaming;
use tracing::debug;

use crate::error::{Result, RpcError};
use crate::transport::codec::RawCodec;
use crate::transport::{CallRequest, ClientTransport, DialOptions, MessageStream};

/// 流发送端的缓冲大小
const STREAM_BUFFER: usize = 16;

/// 基于 tonic 的 gRPC 传输
pub struct GrpcTransport {
    options: DialOptions,
}

impl GrpcTransport {
    /// 创建新的 gRPC 传输
    pub fn new(options: DialOptions) -> Self {
        Self { options }
    }

    /// 从调用请求构造 gRPC 调用句柄
    fn grpc(&self, conn: &Channel) -> Grpc<Channel> {
        Grpc::new(conn.clone())
            .max_decoding_message_size(self.options.max_recv_msg_size)
            .max_encoding_message_size(self.options.max_send_msg_size)
    }

    /// 解析方法路径
    fn path(request: &CallRequest) -> Result<PathAndQuery> {
        request
            .method
            .parse()
            .map_err(|_| RpcError::invalid_parameter(format!("invalid method path: {}", request.method)))
    }
}

impl Default for GrpcTransport {
    fn default() -> Self {
        Self::new(DialOptions::default())
    }
}

#[async_trait]
impl ClientTransport for GrpcTransport {
    type Conn = Channel;
    type Stream = GrpcStream;

    async fn dial(&self, address: &str) -> Result<Channel> {
        let uri = format!("http://{}", address);
        let endpoint = Endpoint::from_shared(uri)
            .map_err(|e| RpcError::dial_failed(format!("invalid address {}: {}", address, e)))?
            .connect_timeout(self.options.connect_timeout);
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| RpcError::dial_failed(format!("connect {} failed: {}", address, e)))?;
        debug!(address = %address, "connection dialed");
        Ok(channel)
    }

    async fn unary(&self, conn: &Channel, request: &CallRequest, body: Bytes) -> Result<Bytes> {
        let mut grpc = self.grpc(conn);
        grpc.ready()
            .await
            .map_err(|e| RpcError::transport_error(format!("connection not ready: {}", e)))?;

        let path = Self::path(request)?;
        let mut req = tonic::Request::new(body);
        *req.metadata_mut() = request.metadata()?;
        if let Some(timeout) = request.timeout {
            req.set_timeout(timeout);
        }

        let response = grpc
            .unary(req, path, RawCodec)
            .await
            .map_err(RpcError::from)?;
        Ok(response.into_inner())
    }

    async fn open_stream(&self, conn: &Channel, request: &CallRequest) -> Result<GrpcStream> {
        let mut grpc = self.grpc(conn);
        grpc.ready()
            .await
            .map_err(|e| RpcError::transport_error(format!("connection not ready: {}", e)))?;

        let path = Self::path(request)?;
        let (tx, rx) = mpsc::channel::<Bytes>(STREAM_BUFFER);
        let outbound = ReceiverStream::new(rx);
        let mut req = tonic::Request::new(outbound);
        *req.metadata_mut() = request.metadata()?;
        if let Some(timeout) = request.timeout {
            req.set_timeout(timeout);
        }

        let response = grpc
            .streaming(req, path, RawCodec)
            .await
            .map_err(RpcError::from)?;
        Ok(GrpcStream {
            tx: Some(tx),
            inbound: response.into_inner(),
        })
    }
}

/// gRPC 双向流
pub struct GrpcStream {
    /// 发送半边；`close` 后置 `None`，通知服务端流结束
    tx: Option<mpsc::Sender<Bytes>>,
    inbound: Streaming<Bytes>,
}

#[async_trait]
impl MessageStream for GrpcStream {
    async fn send(&mut self, msg: Bytes) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| RpcError::stream_closed("send half already closed"))?;
        tx.send(msg)
            .await
            .map_err(|_| RpcError::stream_closed("stream receiver dropped"))
    }

    async fn recv(&mut self) -> Result<Option<Bytes>> {
        self.inbound.message().await.map_err(RpcError::from)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx.take();
        Ok(())
    }
}
