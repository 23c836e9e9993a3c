//! 服务解析模块
//!
//! 提供统一的服务名解析抽象：路由表（内存 / 文件持久化两种形态）、
//! 本地解析器和 Consul 解析器。解析器回答"某个逻辑服务名当前有
//! 哪些可用地址"，路由表是它的缓存与种子来源。

pub mod consul;
pub mod factory;
pub mod file;
pub mod local;
pub mod route;
pub mod table;

pub use consul::ConsulResolver;
pub use factory::ResolverFactory;
pub use file::FileTable;
pub use local::LocalResolver;
pub use route::Route;
pub use table::{RouteEntry, RouteTable};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// 查找选项
#[derive(Debug, Clone, Default)]
pub struct LookupOptions {
    /// 地址过滤模式，`*` 为通配符；`None` 等价于不过滤
    pub address_filter: Option<String>,
}

impl LookupOptions {
    /// 创建默认查找选项
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置地址过滤模式
    pub fn with_address_filter(mut self, pattern: impl Into<String>) -> Self {
        self.address_filter = Some(pattern.into());
        self
    }
}

/// 服务解析器 trait
///
/// 所有解析后端（本地表、Consul）都实现这个 trait。
/// 注意：由于需要动态分发（dyn），使用 async-trait。
#[async_trait]
pub trait Resolver: Send + Sync {
    /// 解析服务名，返回零个或多个路由
    async fn lookup(&self, service: &str, options: LookupOptions) -> Result<Vec<Route>>;

    /// 暴露底层路由表（用于启动阶段的静态种子注入）
    fn table(&self) -> Arc<RouteTable>;
}
