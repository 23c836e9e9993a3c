//! Flare IM RPC Client Core Library
//!
//! Provides the client-side gRPC infrastructure: service resolution, load
//! balancing, connection pooling and retrying unary/streaming calls.

pub mod config;
pub mod error;
pub mod resolver;
pub mod selector;

// gRPC 调用链路模块
pub mod client;
pub mod metrics;
pub mod pool;
pub mod retry;
pub mod transport;

// Re-exports
pub use config::{CallConfig, Config, PoolConfig, ResolverConfig, ResolverKind};
pub use error::{ErrorCategory, ErrorCode, InfraResult, Result, RpcError};

// 服务解析模块
pub use resolver::{
    ConsulResolver, FileTable, LocalResolver, LookupOptions, Resolver, ResolverFactory, Route,
    RouteEntry, RouteTable,
};
pub use selector::{Next, RandomSelector, RoundRobinSelector, Selector, Strategy, new_selector};

// gRPC 调用链路 re-exports
pub use client::{CallOptions, CallStream, RpcClient, RpcClientBuilder};
pub use metrics::{CallMetrics, MetricsCollector};
pub use pool::{ConnPool, PoolOptions};
pub use retry::{ExponentialBackoffPolicy, FixedRetryPolicy, RetryPolicy};
pub use transport::{
    CallRequest, ClientTransport, DialOptions, GrpcStream, GrpcTransport, MessageStream, RawCodec,
};
