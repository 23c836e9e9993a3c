//! RPC 客户端模块
//!
//! 调用编排：解析候选地址、按策略选择、从连接池借出连接、在截止
//! 时间内发起调用，传输类失败走指数退避重试，直到成功、取消或
//! 重试预算耗尽。

pub mod stream;

pub use stream::CallStream;

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{CallConfig, Config};
use crate::error::{ErrorCode, InfraResultExt, Result, RpcError};
use crate::metrics::MetricsCollector;
use crate::pool::{ConnPool, PoolOptions};
use crate::resolver::{LookupOptions, Resolver, ResolverFactory};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use crate::selector::{Selector, Strategy, new_selector};
use crate::transport::{CallRequest, ClientTransport, DialOptions, GrpcTransport, MessageStream};

/// 重试退避基准
const BACKOFF_BASE: Duration = Duration::from_millis(100);

/// 重试退避上限
const BACKOFF_CAP: Duration = Duration::from_secs(120);

/// 单次调用选项
///
/// 未设置的字段回落到客户端的全局配置。
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// 调用总超时
    pub request_timeout: Option<Duration>,

    /// 最大尝试次数（含首次），覆盖客户端级别的重试策略
    pub retries: Option<usize>,

    /// 每次调用附加的请求头
    pub headers: HashMap<String, String>,

    /// 地址过滤模式（仅本地解析器生效）
    pub address_filter: Option<String>,

    /// 取消令牌；取消总是优先于重试
    pub cancellation: Option<CancellationToken>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_address_filter(mut self, pattern: impl Into<String>) -> Self {
        self.address_filter = Some(pattern.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// RPC 客户端
///
/// 解析器在进程启动时构建一次并注入，客户端本身不持有全局状态。
pub struct RpcClient<T: ClientTransport = GrpcTransport> {
    resolver: Arc<dyn Resolver>,
    selector: Arc<dyn Selector>,
    retry_policy: Arc<dyn RetryPolicy>,
    transport: Arc<T>,
    pool: ConnPool<T>,
    call_config: CallConfig,
    metrics: MetricsCollector,
}

impl RpcClient<GrpcTransport> {
    /// 从 TOML 配置文件构建客户端
    pub fn from_config_file(path: &str) -> Result<Self> {
        let config = Config::load_from_file(path).into_rpc(
            ErrorCode::ConfigurationError,
            format!("load config {} failed", path),
        )?;
        Self::from_config(&config)
    }

    /// 从静态配置构建客户端（gRPC 传输）
    pub fn from_config(config: &Config) -> Result<Self> {
        let resolver = ResolverFactory::create(&config.resolver)?;
        let dial_options = DialOptions {
            max_recv_msg_size: config.call.max_recv_msg_size,
            max_send_msg_size: config.call.max_send_msg_size,
            ..DialOptions::default()
        };
        Ok(RpcClientBuilder::new(resolver)
            .transport(Arc::new(GrpcTransport::new(dial_options)))
            .strategy(config.call.load_balance)
            .pool_options(PoolOptions {
                size: config.pool.size,
                ttl: Duration::from_secs(config.pool.ttl),
            })
            .call_config(config.call.clone())
            .build())
    }
}

impl<T: ClientTransport> RpcClient<T> {
    /// 发起一元调用
    ///
    /// `body` 是已经序列化好的请求体；返回响应体字节。中间的重试
    /// 对调用方不可见，最终只有成功、取消或失败三种结果。
    pub async fn call(
        &self,
        service: &str,
        method: &str,
        body: Bytes,
        options: CallOptions,
    ) -> Result<Bytes> {
        Self::validate(service, method)?;

        let timeout = options
            .request_timeout
            .unwrap_or_else(|| self.call_config.request_timeout());
        let cancel = options.cancellation.clone().unwrap_or_default();
        let request = self.build_request(service, method, &options, timeout);

        let started = Instant::now();
        let mut attempts = 0usize;
        let result = match tokio::time::timeout(
            timeout,
            self.call_with_retry(&request, body, &options, &cancel, &mut attempts),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RpcError::request_timeout(format!(
                "call to {} exceeded {:?}",
                service, timeout
            ))),
        };

        self.metrics
            .record_call(result.is_ok(), attempts.max(1), started.elapsed())
            .await;
        result
    }

    /// 发起双向流调用
    ///
    /// 建立流并立即发送首条请求消息；返回的流句柄在关闭时把连接
    /// 连同期间发生的错误一起归还连接池。
    pub async fn stream(
        &self,
        service: &str,
        method: &str,
        first: Bytes,
        options: CallOptions,
    ) -> Result<CallStream<T>> {
        Self::validate(service, method)?;

        let timeout = options
            .request_timeout
            .unwrap_or_else(|| self.call_config.request_timeout());
        let cancel = options.cancellation.clone().unwrap_or_default();
        // 截止时间只约束流的建立，不随流的生命周期传播
        let request = self.build_request(service, method, &options, timeout);

        let mut attempts = 0usize;
        match tokio::time::timeout(
            timeout,
            self.stream_with_retry(&request, first, &options, &cancel, &mut attempts),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RpcError::request_timeout(format!(
                "stream to {} exceeded {:?}",
                service, timeout
            ))),
        }
    }

    /// 当前指标收集器
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// 底层连接池
    pub fn pool(&self) -> &ConnPool<T> {
        &self.pool
    }

    /// 注入的解析器
    pub fn resolver(&self) -> Arc<dyn Resolver> {
        self.resolver.clone()
    }

    // ============================================================
    // 内部实现
    // ============================================================

    fn validate(service: &str, method: &str) -> Result<()> {
        if service.is_empty() {
            return Err(RpcError::invalid_parameter("service name is empty"));
        }
        if method.is_empty() || !method.starts_with('/') {
            return Err(RpcError::invalid_parameter(format!(
                "method must be a full gRPC path, got {:?}",
                method
            )));
        }
        Ok(())
    }

    fn build_request(
        &self,
        service: &str,
        method: &str,
        options: &CallOptions,
        timeout: Duration,
    ) -> CallRequest {
        let mut request = CallRequest::new(service, method);
        for (key, value) in &options.headers {
            request.headers.insert(key.clone(), value.clone());
        }
        request
            .headers
            .entry("content-type".to_string())
            .or_insert_with(|| "application/protobuf".to_string());
        request
            .headers
            .insert("x-service-name".to_string(), service.to_string());
        request
            .headers
            .entry("x-request-id".to_string())
            .or_insert_with(|| uuid::Uuid::new_v4().to_string());
        request.timeout = Some(timeout);
        request
    }

    /// 解析候选地址；解析失败不重试，统一包装成查找错误
    async fn resolve(&self, service: &str, options: &CallOptions) -> Result<Vec<String>> {
        let mut lookup = LookupOptions::new();
        if let Some(filter) = &options.address_filter {
            lookup = lookup.with_address_filter(filter.clone());
        }
        let routes = self.resolver.lookup(service, lookup).await.map_err(|e| {
            RpcError::coded_with_details(
                ErrorCode::LookupFailed,
                format!("resolve {} failed", service),
                e.to_string(),
            )
        })?;
        Ok(routes.into_iter().map(|route| route.address).collect())
    }

    fn should_retry(&self, attempt: usize, error: &RpcError, override_attempts: Option<usize>) -> bool {
        match override_attempts {
            Some(max) => attempt < max && error.is_retryable(),
            None => self.retry_policy.should_retry(attempt, error),
        }
    }

    async fn call_with_retry(
        &self,
        request: &CallRequest,
        body: Bytes,
        options: &CallOptions,
        cancel: &CancellationToken,
        attempts: &mut usize,
    ) -> Result<Bytes> {
        let addresses = self.resolve(&request.service, options).await?;
        let mut next = self.selector.select(&addresses)?;

        loop {
            *attempts += 1;
            let address = next.next();
            match self.invoke_once(&address, request, body.clone(), cancel).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_canceled() => return Err(e),
                Err(e) => {
                    let attempt = *attempts;
                    if self.should_retry(attempt, &e, options.retries) {
                        let backoff = self.retry_policy.backoff_duration(attempt);
                        debug!(
                            service = %request.service,
                            address = %address,
                            attempt,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %e,
                            "call failed, retrying"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(backoff) => {}
                            _ = cancel.cancelled() => {
                                return Err(RpcError::canceled("call canceled during backoff"));
                            }
                        }
                    } else if e.is_retryable() {
                        return Err(RpcError::retry_exhausted(attempt, &e));
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }

    /// 单次调用：借连接、调用、按结果归还
    async fn invoke_once(
        &self,
        address: &str,
        request: &CallRequest,
        body: Bytes,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let conn = tokio::select! {
            conn = self.pool.get(address) => conn?,
            _ = cancel.cancelled() => return Err(RpcError::canceled("call canceled")),
        };
        let result = tokio::select! {
            result = self.transport.unary(&conn, request, body) => result,
            _ = cancel.cancelled() => Err(RpcError::canceled("call canceled")),
        };
        // 取消时连接状态未知，按出错处理丢弃
        self.pool.release(address, conn, result.as_ref().err()).await;
        result
    }

    async fn stream_with_retry(
        &self,
        request: &CallRequest,
        first: Bytes,
        options: &CallOptions,
        cancel: &CancellationToken,
        attempts: &mut usize,
    ) -> Result<CallStream<T>> {
        let addresses = self.resolve(&request.service, options).await?;
        let mut next = self.selector.select(&addresses)?;

        loop {
            *attempts += 1;
            let address = next.next();
            match self
                .establish_once(&address, request, first.clone(), cancel)
                .await
            {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_canceled() => return Err(e),
                Err(e) => {
                    let attempt = *attempts;
                    if self.should_retry(attempt, &e, options.retries) {
                        let backoff = self.retry_policy.backoff_duration(attempt);
                        debug!(
                            service = %request.service,
                            address = %address,
                            attempt,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %e,
                            "stream open failed, retrying"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(backoff) => {}
                            _ = cancel.cancelled() => {
                                return Err(RpcError::canceled("stream canceled during backoff"));
                            }
                        }
                    } else if e.is_retryable() {
                        return Err(RpcError::retry_exhausted(attempt, &e));
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }

    /// 单次建流：借连接、打开流、发送首条消息
    async fn establish_once(
        &self,
        address: &str,
        request: &CallRequest,
        first: Bytes,
        cancel: &CancellationToken,
    ) -> Result<CallStream<T>> {
        let conn = tokio::select! {
            conn = self.pool.get(address) => conn?,
            _ = cancel.cancelled() => return Err(RpcError::canceled("stream canceled")),
        };
        let result = tokio::select! {
            stream = self.transport.open_stream(&conn, request) => stream,
            _ = cancel.cancelled() => Err(RpcError::canceled("stream canceled")),
        };
        let mut stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                self.pool.release(address, conn, Some(&e)).await;
                return Err(e);
            }
        };

        // 流建立后立即发送首条请求消息
        if let Err(e) = stream.send(first).await {
            let e = RpcError::transport_error(format!("initial stream send failed: {}", e));
            self.pool.release(address, conn, Some(&e)).await;
            return Err(e);
        }

        Ok(CallStream::new(
            stream,
            self.pool.clone(),
            address.to_string(),
            conn,
        ))
    }
}

/// RPC 客户端构建器
pub struct RpcClientBuilder<T: ClientTransport = GrpcTransport> {
    resolver: Arc<dyn Resolver>,
    selector: Arc<dyn Selector>,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
    transport: Arc<T>,
    pool_options: PoolOptions,
    call_config: CallConfig,
}

impl RpcClientBuilder<GrpcTransport> {
    /// 创建构建器（默认 gRPC 传输 + 轮询选择器）
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            selector: new_selector(Strategy::RoundRobin),
            retry_policy: None,
            transport: Arc::new(GrpcTransport::default()),
            pool_options: PoolOptions::default(),
            call_config: CallConfig::default(),
        }
    }
}

impl<T: ClientTransport> RpcClientBuilder<T> {
    /// 替换传输实现（测试注入桩传输走这里）
    pub fn transport<U: ClientTransport>(self, transport: Arc<U>) -> RpcClientBuilder<U> {
        RpcClientBuilder {
            resolver: self.resolver,
            selector: self.selector,
            retry_policy: self.retry_policy,
            transport,
            pool_options: self.pool_options,
            call_config: self.call_config,
        }
    }

    /// 设置负载均衡策略
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.selector = new_selector(strategy);
        self
    }

    /// 设置自定义选择器
    pub fn selector(mut self, selector: Arc<dyn Selector>) -> Self {
        self.selector = selector;
        self
    }

    /// 设置重试策略
    pub fn retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// 设置连接池参数
    pub fn pool_options(mut self, options: PoolOptions) -> Self {
        self.pool_options = options;
        self
    }

    /// 设置调用参数
    pub fn call_config(mut self, config: CallConfig) -> Self {
        self.call_config = config;
        self
    }

    /// 构建客户端
    pub fn build(self) -> RpcClient<T> {
        let retry_policy = self.retry_policy.unwrap_or_else(|| {
            Arc::new(ExponentialBackoffPolicy::new(
                self.call_config.retries,
                BACKOFF_BASE,
                BACKOFF_CAP,
            ))
        });
        let pool = ConnPool::new(self.transport.clone(), self.pool_options);
        RpcClient {
            resolver: self.resolver,
            selector: self.selector,
            retry_policy,
            transport: self.transport,
            pool,
            call_config: self.call_config,
            metrics: MetricsCollector::new(),
        }
    }
}
