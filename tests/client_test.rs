//! RPC 客户端端到端测试（桩传输）

mod common;

use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use flare_rpc_core::client::{CallOptions, RpcClient, RpcClientBuilder};
use flare_rpc_core::error::{ErrorCode, Result, RpcError};
use flare_rpc_core::resolver::{LocalResolver, Resolver, Route};
use flare_rpc_core::retry::{ExponentialBackoffPolicy, FixedRetryPolicy};
use flare_rpc_core::selector::{Next, Selector, Strategy};

use common::StubTransport;

const METHOD: &str = "/users.Users/Get";

/// 共享下标的顺序轮询选择器，让跨调用的分布可精确断言
struct SequentialSelector {
    index: Arc<AtomicUsize>,
}

impl SequentialSelector {
    fn new() -> Self {
        Self {
            index: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Selector for SequentialSelector {
    fn select(&self, addresses: &[String]) -> Result<Next> {
        if addresses.is_empty() {
            return Err(RpcError::none_available());
        }
        let addresses = addresses.to_vec();
        let index = self.index.clone();
        Ok(Next::new(move || {
            let i = index.fetch_add(1, Ordering::SeqCst);
            addresses[i % addresses.len()].clone()
        }))
    }

    fn strategy(&self) -> Strategy {
        Strategy::RoundRobin
    }
}

fn seeded_resolver(routes: &[(&str, &str)]) -> Arc<LocalResolver> {
    let resolver = Arc::new(LocalResolver::new());
    for (service, address) in routes {
        resolver
            .table()
            .update(Route::new(*service, *address))
            .expect("seeding route should succeed");
    }
    resolver
}

fn client_with(
    resolver: Arc<LocalResolver>,
    transport: Arc<StubTransport>,
) -> RpcClient<StubTransport> {
    RpcClientBuilder::new(resolver)
        .transport(transport)
        .retry_policy(Arc::new(ExponentialBackoffPolicy::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(10),
        )))
        .build()
}

#[tokio::test]
async fn test_call_echoes_body() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000")]);
    let transport = StubTransport::new();
    let client = client_with(resolver, transport.clone());

    let body = Bytes::from_static(b"ping");
    let resp = client
        .call("users", METHOD, body.clone(), CallOptions::new())
        .await
        .expect("call should succeed");
    assert_eq!(resp, body);
    assert_eq!(transport.total_calls(), 1);
}

#[tokio::test]
async fn test_calls_distribute_evenly_round_robin() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000"), ("users", "10.0.0.2:9000")]);
    let transport = StubTransport::new();
    let client = RpcClientBuilder::new(resolver)
        .transport(transport.clone())
        .selector(Arc::new(SequentialSelector::new()))
        .build();

    for _ in 0..10 {
        client
            .call("users", METHOD, Bytes::from_static(b"x"), CallOptions::new())
            .await
            .expect("call should succeed");
    }

    assert_eq!(transport.calls_to("10.0.0.1:9000"), 5);
    assert_eq!(transport.calls_to("10.0.0.2:9000"), 5);
}

#[tokio::test]
async fn test_default_round_robin_reaches_all_addresses() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000"), ("users", "10.0.0.2:9000")]);
    let transport = StubTransport::new();
    let client = client_with(resolver, transport.clone());

    for _ in 0..20 {
        client
            .call("users", METHOD, Bytes::from_static(b"x"), CallOptions::new())
            .await
            .unwrap();
    }

    // 每次调用的起点随机，但 20 次后两个地址都应该被命中
    assert!(transport.calls_to("10.0.0.1:9000") > 0);
    assert!(transport.calls_to("10.0.0.2:9000") > 0);
    assert_eq!(transport.total_calls(), 20);
}

#[tokio::test]
async fn test_retry_within_single_call_alternates_addresses() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000"), ("users", "10.0.0.2:9000")]);
    let transport = StubTransport::new();
    transport.fail_next(2);
    let client = client_with(resolver, transport.clone());

    client
        .call("users", METHOD, Bytes::from_static(b"x"), CallOptions::new())
        .await
        .expect("third attempt should succeed");

    // 一次调用内的重试沿着同一个生成器轮转，两个地址都被尝试过
    assert_eq!(transport.total_calls(), 3);
    assert!(transport.calls_to("10.0.0.1:9000") > 0);
    assert!(transport.calls_to("10.0.0.2:9000") > 0);
}

#[tokio::test]
async fn test_retry_budget_exhaustion() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000")]);
    let transport = StubTransport::new();
    transport.set_fail_all(true);
    let client = client_with(resolver, transport.clone());

    let err = client
        .call("users", METHOD, Bytes::from_static(b"x"), CallOptions::new())
        .await
        .expect_err("all attempts fail, call must fail");
    assert_eq!(err.code(), Some(ErrorCode::RetryExhausted));
    assert_eq!(transport.total_calls(), 3, "budget is 3 attempts");
}

#[tokio::test]
async fn test_per_call_retries_override() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000")]);
    let transport = StubTransport::new();
    transport.set_fail_all(true);
    let client = client_with(resolver, transport.clone());

    let err = client
        .call(
            "users",
            METHOD,
            Bytes::from_static(b"x"),
            CallOptions::new().with_retries(1),
        )
        .await
        .expect_err("single attempt must fail");
    assert_eq!(err.code(), Some(ErrorCode::RetryExhausted));
    assert_eq!(transport.total_calls(), 1);
}

#[tokio::test]
async fn test_resolution_failure_is_not_retried() {
    let resolver = Arc::new(LocalResolver::new());
    let transport = StubTransport::new();
    let client = client_with(resolver, transport.clone());

    let err = client
        .call("unknown", METHOD, Bytes::from_static(b"x"), CallOptions::new())
        .await
        .expect_err("unknown service must fail");
    assert_eq!(err.code(), Some(ErrorCode::LookupFailed));
    assert_eq!(transport.dial_count(), 0, "resolution failure must not dial");
}

#[tokio::test]
async fn test_invalid_parameters_fail_fast() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000")]);
    let transport = StubTransport::new();
    let client = client_with(resolver, transport.clone());

    let err = client
        .call("", METHOD, Bytes::new(), CallOptions::new())
        .await
        .expect_err("empty service must fail");
    assert_eq!(err.code(), Some(ErrorCode::InvalidParameter));

    let err = client
        .call("users", "no-leading-slash", Bytes::new(), CallOptions::new())
        .await
        .expect_err("bad method path must fail");
    assert_eq!(err.code(), Some(ErrorCode::InvalidParameter));

    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test]
async fn test_cancellation_interrupts_backoff() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000")]);
    let transport = StubTransport::new();
    transport.set_fail_all(true);

    // 失败后进入 30 秒退避，取消必须立刻打断
    let client = Arc::new(
        RpcClientBuilder::new(resolver)
            .transport(transport.clone())
            .retry_policy(Arc::new(FixedRetryPolicy::new(100, Duration::from_secs(30))))
            .build(),
    );

    let token = CancellationToken::new();
    let options = CallOptions::new()
        .with_request_timeout(Duration::from_secs(120))
        .with_cancellation(token.clone());

    let call_client = client.clone();
    let handle = tokio::spawn(async move {
        call_client
            .call("users", METHOD, Bytes::from_static(b"x"), options)
            .await
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    let canceled_at = Instant::now();
    token.cancel();

    let result = handle.await.expect("task must not panic");
    let elapsed = canceled_at.elapsed();
    assert!(
        elapsed < Duration::from_secs(1),
        "cancellation must interrupt backoff promptly, took {:?}",
        elapsed
    );
    let err = result.expect_err("canceled call must fail");
    assert_eq!(err.code(), Some(ErrorCode::Canceled));
}

#[tokio::test]
async fn test_stream_sends_initial_message_and_releases_on_close() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000")]);
    let transport = StubTransport::new();
    let client = client_with(resolver, transport.clone());

    let mut stream = client
        .stream(
            "users",
            "/users.Users/Watch",
            Bytes::from_static(b"hello"),
            CallOptions::new(),
        )
        .await
        .expect("stream should open");

    // 首条请求消息在建流时已发送，回显流里应该能读到
    let first = stream.recv().await.unwrap();
    assert_eq!(first, Some(Bytes::from_static(b"hello")));

    stream.send(Bytes::from_static(b"more")).await.unwrap();
    let next = stream.recv().await.unwrap();
    assert_eq!(next, Some(Bytes::from_static(b"more")));

    stream.close().await.expect("close should succeed");
    assert_eq!(
        client.pool().idle_count("10.0.0.1:9000").await,
        1,
        "clean close must return the connection to the pool"
    );
    assert_eq!(transport.dial_count(), 1);
}

#[tokio::test]
async fn test_default_headers_are_injected() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000")]);
    let transport = StubTransport::new();
    let client = client_with(resolver, transport.clone());

    client
        .call(
            "users",
            METHOD,
            Bytes::from_static(b"x"),
            CallOptions::new().with_header("x-tenant", "acme"),
        )
        .await
        .unwrap();

    let headers = transport.last_headers();
    assert_eq!(headers.get("content-type").unwrap(), "application/protobuf");
    assert_eq!(headers.get("x-service-name").unwrap(), "users");
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers.get("x-tenant").unwrap(), "acme");
}

#[tokio::test]
async fn test_content_type_can_be_overridden() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000")]);
    let transport = StubTransport::new();
    let client = client_with(resolver, transport.clone());

    client
        .call(
            "users",
            METHOD,
            Bytes::from_static(b"{}"),
            CallOptions::new().with_header("content-type", "application/json"),
        )
        .await
        .unwrap();

    let headers = transport.last_headers();
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
}

#[tokio::test]
async fn test_metrics_record_outcomes() {
    let resolver = seeded_resolver(&[("users", "10.0.0.1:9000")]);
    let transport = StubTransport::new();
    let client = client_with(resolver, transport.clone());

    client
        .call("users", METHOD, Bytes::from_static(b"x"), CallOptions::new())
        .await
        .unwrap();

    transport.set_fail_all(true);
    let _ = client
        .call("users", METHOD, Bytes::from_static(b"x"), CallOptions::new())
        .await;

    let metrics = client.metrics().snapshot().await;
    assert_eq!(metrics.calls_total, 2);
    assert_eq!(metrics.calls_success, 1);
    assert_eq!(metrics.calls_failed, 1);
    assert!(metrics.retries_total >= 2, "failed call burned retries");
}
