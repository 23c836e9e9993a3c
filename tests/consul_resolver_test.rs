//! Consul 解析器测试
//!
//! 大部分测试使用内置的 HTTP 桩服务器模拟 Consul 健康检查端点；
//! 标记为 `#[ignore]` 的测试需要运行中的 Consul 实例：
//!
//! ```bash
//! docker run -d --name consul-test -p 8500:8500 hashicorp/consul:1.18 agent -dev -client=0.0.0.0
//! cargo test --test consul_resolver_test -- --ignored
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use flare_rpc_core::error::ErrorCode;
use flare_rpc_core::resolver::{ConsulResolver, LookupOptions, Resolver};

/// 启动一个模拟 Consul 健康检查端点的 HTTP 桩服务器
///
/// 每个到来的连接计一次请求（响应带 `connection: close`，客户端
/// 不会复用连接）。返回 (监听地址, 请求计数)。
async fn spawn_mock_consul(payload: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("mock consul should bind");
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            hits_counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    payload.len(),
                    payload
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, hits)
}

const BILLING_PAYLOAD: &str = r#"[
  {"Service": {"ID": "billing-1", "Service": "billing", "Address": "10.0.0.7", "Port": 9100}},
  {"Service": {"ID": "billing-2", "Service": "billing", "Address": "10.0.0.8", "Port": 9100}}
]"#;

#[tokio::test]
async fn test_first_lookup_populates_table() {
    let (addr, hits) = spawn_mock_consul(BILLING_PAYLOAD).await;
    let resolver = ConsulResolver::new(format!("http://{}", addr));

    let routes = resolver
        .lookup("billing", LookupOptions::new())
        .await
        .expect("lookup should succeed");

    assert_eq!(routes.len(), 2);
    assert!(routes.iter().any(|r| r.address == "10.0.0.7:9100"));
    assert!(routes.iter().any(|r| r.address == "10.0.0.8:9100"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // 表已被填充
    let cached = resolver.table().find("billing").expect("table must be populated");
    assert_eq!(cached.len(), 2);

    resolver.shutdown();
}

#[tokio::test]
async fn test_second_lookup_hits_cache() {
    let (addr, hits) = spawn_mock_consul(BILLING_PAYLOAD).await;
    let resolver = ConsulResolver::new(format!("http://{}", addr));

    let first = resolver.lookup("billing", LookupOptions::new()).await.unwrap();
    let second = resolver.lookup("billing", LookupOptions::new()).await.unwrap();

    assert_eq!(first.len(), second.len());
    assert_eq!(
        hits.load(Ordering::SeqCst),
        1,
        "lookup inside the refresh window must be served from cache"
    );

    resolver.shutdown();
}

#[tokio::test]
async fn test_backend_error_surfaces() {
    // 绑定后立刻释放端口，查询必然连接失败
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let resolver = ConsulResolver::new(format!("http://{}", addr));
    let err = resolver
        .lookup("billing", LookupOptions::new())
        .await
        .expect_err("dead endpoint must fail");
    assert_eq!(err.code(), Some(ErrorCode::BackendError));

    resolver.shutdown();
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let (addr, _hits) = spawn_mock_consul(r#"[{"Service": {"ID": "x"}}]"#).await;
    let resolver = ConsulResolver::new(format!("http://{}", addr));

    let err = resolver
        .lookup("billing", LookupOptions::new())
        .await
        .expect_err("payload without Address must fail");
    assert_eq!(err.code(), Some(ErrorCode::BackendError));

    resolver.shutdown();
}

/// 需要运行中的 Consul（默认 http://127.0.0.1:8500，可用 CONSUL_URL 覆盖）
#[tokio::test]
#[ignore]
async fn test_live_consul_lookup() {
    let url = std::env::var("CONSUL_URL").unwrap_or_else(|_| "http://127.0.0.1:8500".to_string());
    let resolver = ConsulResolver::new(url);

    // consul 服务自身总是注册在 agent 里
    let routes = resolver
        .lookup("consul", LookupOptions::new())
        .await
        .expect("live consul lookup should succeed");
    assert!(!routes.is_empty(), "expected at least the consul service itself");

    resolver.shutdown();
}
