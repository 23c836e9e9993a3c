//! 解析器工厂
//!
//! 从静态配置构建解析器实例，并注入静态路由种子。解析器在进程
//! 启动时构建一次，之后通过引用传入 RPC 客户端，不使用全局状态。

use std::sync::Arc;
use tracing::info;

use crate::config::{ResolverConfig, ResolverKind, parse_seed_endpoints};
use crate::error::Result;
use crate::resolver::consul::ConsulResolver;
use crate::resolver::local::LocalResolver;
use crate::resolver::route::Route;
use crate::resolver::Resolver;

/// 解析器工厂
pub struct ResolverFactory;

impl ResolverFactory {
    /// 从配置创建解析器
    ///
    /// `endpoints` 中的静态种子（`service:host:port` 列表）会被注入
    /// 到解析器的路由表中，本地和 Consul 两种后端都适用。
    pub fn create(config: &ResolverConfig) -> Result<Arc<dyn Resolver>> {
        let resolver: Arc<dyn Resolver> = match config.kind {
            ResolverKind::Local => Arc::new(LocalResolver::new()),
            ResolverKind::Consul => Arc::new(ConsulResolver::new(config.consul_url.clone())),
        };

        if let Some(raw) = &config.endpoints {
            let table = resolver.table();
            let mut seeded = 0usize;
            for (service, address) in parse_seed_endpoints(raw) {
                table.update(Route::new(service, address))?;
                seeded += 1;
            }
            if seeded > 0 {
                info!(seeded, "✅ Static routes seeded");
            }
        }

        Ok(resolver)
    }
}
