//! Consul 解析器
//!
//! 缓存未命中时同步查询 Consul 健康检查 API，填充路由表，并为
//! 每个首次解析的服务启动一个后台监视任务周期性刷新路由。

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, RpcError};
use crate::resolver::route::Route;
use crate::resolver::table::RouteTable;
use crate::resolver::{LookupOptions, Resolver};

/// 正常刷新间隔
const WATCH_INTERVAL: Duration = Duration::from_secs(5);

/// 查询出错后的退避间隔
const WATCH_ERROR_INTERVAL: Duration = Duration::from_secs(10);

/// Consul 解析器
pub struct ConsulResolver {
    table: Arc<RouteTable>,
    http_client: reqwest::Client,
    consul_url: String,
    /// 已启动监视任务的服务名，保证每个服务只有一个监视任务
    watching: Mutex<HashSet<String>>,
    cancel: CancellationToken,
}

impl ConsulResolver {
    /// 创建新的 Consul 解析器
    pub fn new(consul_url: impl Into<String>) -> Self {
        Self {
            table: Arc::new(RouteTable::new()),
            http_client: reqwest::Client::new(),
            consul_url: consul_url.into(),
            watching: Mutex::new(HashSet::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// 停止所有后台监视任务
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// 查询 Consul 健康检查端点，返回健康实例对应的路由
    async fn query(
        http_client: &reqwest::Client,
        consul_url: &str,
        service: &str,
    ) -> Result<Vec<Route>> {
        let url = format!("{}/v1/health/service/{}", consul_url, service);
        let resp = http_client
            .get(&url)
            .query(&[("passing", "true")])
            .send()
            .await
            .map_err(|e| RpcError::backend_error(format!("consul query failed: {}", e)))?;

        let services: Vec<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| RpcError::backend_error(format!("consul response invalid: {}", e)))?;

        let mut routes = Vec::new();
        for svc in services {
            let entry = svc
                .get("Service")
                .ok_or_else(|| RpcError::backend_error("consul response missing Service"))?;
            let address = entry
                .get("Address")
                .and_then(|v| v.as_str())
                .ok_or_else(|| RpcError::backend_error("consul response missing Address"))?;
            let port = entry
                .get("Port")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| RpcError::backend_error("consul response missing Port"))?;
            routes.push(Route::new(service, format!("{}:{}", address, port)));
        }
        Ok(routes)
    }

    /// 为服务启动后台监视任务（每个服务最多一个）
    fn spawn_watcher(&self, service: String) {
        {
            let mut watching = self.watching.lock().unwrap();
            if !watching.insert(service.clone()) {
                return;
            }
        }

        let table = self.table.clone();
        let http_client = self.http_client.clone();
        let consul_url = self.consul_url.clone();
        let cancel = self.cancel.clone();

        info!(service = %service, "consul watcher started");
        tokio::spawn(async move {
            let mut delay = WATCH_INTERVAL;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(service = %service, "🛑 Consul watcher stopped");
                        break;
                    }
                    _ = sleep(delay) => {
                        match Self::query(&http_client, &consul_url, &service).await {
                            Ok(routes) => {
                                debug!(service = %service, routes = routes.len(), "consul routes refreshed");
                                table.replace_service(&service, routes);
                                delay = WATCH_INTERVAL;
                            }
                            Err(e) => {
                                warn!(service = %service, error = %e, "⚠️ Consul refresh failed");
                                delay = WATCH_ERROR_INTERVAL;
                            }
                        }
                    }
                }
            }
        });
    }
}

#[async_trait]
impl Resolver for ConsulResolver {
    async fn lookup(&self, service: &str, _options: LookupOptions) -> Result<Vec<Route>> {
        // 缓存命中：表里已有条目时直接返回，不触发 Consul 查询
        if let Ok(routes) = self.table.find(service) {
            if !routes.is_empty() {
                return Ok(routes);
            }
        }

        // 缓存未命中：同步查询并填充，再启动后台刷新
        let routes = Self::query(&self.http_client, &self.consul_url, service).await?;
        for route in &routes {
            self.table.update(route.clone())?;
        }
        self.spawn_watcher(service.to_string());
        Ok(routes)
    }

    fn table(&self) -> Arc<RouteTable> {
        self.table.clone()
    }
}

impl Drop for ConsulResolver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
