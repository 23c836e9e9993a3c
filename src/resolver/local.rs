//! 本地解析器
//!
//! 纯粹从自己的路由表提供解析结果，配合静态配置种子使用。

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Result, RpcError};
use crate::resolver::route::Route;
use crate::resolver::table::RouteTable;
use crate::resolver::{LookupOptions, Resolver};

/// 本地解析器
pub struct LocalResolver {
    table: Arc<RouteTable>,
}

impl LocalResolver {
    /// 创建空表的本地解析器
    pub fn new() -> Self {
        Self {
            table: Arc::new(RouteTable::new()),
        }
    }

    /// 用已有的路由表创建本地解析器（文件持久化表走这里）
    pub fn with_table(table: Arc<RouteTable>) -> Self {
        Self { table }
    }
}

impl Default for LocalResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for LocalResolver {
    async fn lookup(&self, service: &str, options: LookupOptions) -> Result<Vec<Route>> {
        let routes = self.table.find(service)?;
        let pattern = options.address_filter.as_deref().unwrap_or("*");
        let filtered: Vec<Route> = routes
            .into_iter()
            .filter(|route| wildcard_match(pattern, &route.address))
            .collect();
        if filtered.is_empty() {
            return Err(RpcError::route_not_found(service));
        }
        Ok(filtered)
    }

    fn table(&self) -> Arc<RouteTable> {
        self.table.clone()
    }
}

/// 通配符匹配，`*` 匹配任意（含空）子串
fn wildcard_match(pattern: &str, input: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let mut segments = pattern.split('*').peekable();
    let mut rest = input;
    let mut first = true;
    while let Some(segment) = segments.next() {
        let is_last = segments.peek().is_none();
        if first {
            // 首段必须是前缀
            match rest.strip_prefix(segment) {
                Some(r) => rest = r,
                None => return false,
            }
            first = false;
        } else if is_last {
            // 末段必须是后缀
            return rest.ends_with(segment);
        } else if segment.is_empty() {
            continue;
        } else {
            // 中间段在剩余输入中顺序查找
            match rest.find(segment) {
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
        }
    }
    // 模式不含 '*' 或以 '*' 结尾
    pattern.ends_with('*') || rest.is_empty()
}
