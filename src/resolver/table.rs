//! 路由表
//!
//! 内存中的多值映射：服务名 -> { 路由哈希 -> 路由条目 }。
//! 整张表由单把读写锁保护；服务数量级为几十个，粗粒度锁足够。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, RpcError};
use crate::resolver::route::Route;

/// 路由条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntry {
    /// 路由
    pub route: Route,

    /// 最后更新时间
    pub updated: DateTime<Utc>,
}

impl RouteEntry {
    /// 创建新的路由条目（更新时间为当前时刻）
    pub fn new(route: Route) -> Self {
        Self {
            route,
            updated: Utc::now(),
        }
    }
}

/// 路由表
pub struct RouteTable {
    inner: RwLock<HashMap<String, HashMap<String, RouteEntry>>>,
}

impl RouteTable {
    /// 创建空的路由表
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// 插入路由
    ///
    /// 同一服务下已存在相同哈希的条目时返回 `DuplicateRoute`。
    pub fn create(&self, route: Route) -> Result<()> {
        let hash = route.hash();
        let mut inner = self.inner.write().unwrap();
        let routes = inner.entry(route.service.clone()).or_default();
        if routes.contains_key(&hash) {
            return Err(RpcError::duplicate_route(route.to_string()));
        }
        routes.insert(hash, RouteEntry::new(route));
        Ok(())
    }

    /// 更新路由（幂等 upsert）
    ///
    /// 条目不存在时直接创建，存在时刷新更新时间。
    pub fn update(&self, route: Route) -> Result<()> {
        let hash = route.hash();
        let mut inner = self.inner.write().unwrap();
        let routes = inner.entry(route.service.clone()).or_default();
        routes.insert(hash, RouteEntry::new(route));
        Ok(())
    }

    /// 删除路由
    ///
    /// 服务或指定哈希不存在时返回 `RouteNotFound`；
    /// 服务的最后一条路由被删除后，服务键整体移除。
    pub fn delete(&self, route: &Route) -> Result<()> {
        let hash = route.hash();
        let mut inner = self.inner.write().unwrap();
        let routes = inner
            .get_mut(&route.service)
            .ok_or_else(|| RpcError::route_not_found(&route.service))?;
        if routes.remove(&hash).is_none() {
            return Err(RpcError::route_not_found(route.to_string()));
        }
        if routes.is_empty() {
            inner.remove(&route.service);
        }
        Ok(())
    }

    /// 查找路由
    ///
    /// `service` 为空时返回全表所有路由；指定的服务不存在时返回
    /// `RouteNotFound`。
    pub fn find(&self, service: &str) -> Result<Vec<Route>> {
        let inner = self.inner.read().unwrap();
        if service.is_empty() {
            return Ok(inner
                .values()
                .flat_map(|routes| routes.values().map(|entry| entry.route.clone()))
                .collect());
        }
        let routes = inner
            .get(service)
            .ok_or_else(|| RpcError::route_not_found(service))?;
        Ok(routes.values().map(|entry| entry.route.clone()).collect())
    }

    /// 获取当前所有服务名
    pub fn services(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap();
        inner.keys().cloned().collect()
    }

    /// 服务数量
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    /// 路由表是否为空
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }

    /// 用新的路由集合整体替换某个服务的条目
    ///
    /// 新集合中缺失的旧路由被删除，存在的路由被 upsert；
    /// 用于后端刷新循环的全量同步。
    pub fn replace_service(&self, service: &str, routes: Vec<Route>) {
        let mut inner = self.inner.write().unwrap();
        if routes.is_empty() {
            inner.remove(service);
            return;
        }
        let entries = routes
            .into_iter()
            .map(|route| (route.hash(), RouteEntry::new(route)))
            .collect();
        inner.insert(service.to_string(), entries);
    }

    /// 全表快照（供持久化使用）
    pub fn snapshot(&self) -> HashMap<String, HashMap<String, RouteEntry>> {
        self.inner.read().unwrap().clone()
    }

    /// 合并外部条目
    ///
    /// 不存在的条目被插入；已存在的条目只在外部时间戳更新时覆盖
    /// （last-writer-wins，供文件加载路径合并外部变更）。
    pub fn merge(&self, entries: HashMap<String, HashMap<String, RouteEntry>>) {
        let mut inner = self.inner.write().unwrap();
        for (service, routes) in entries {
            let current = inner.entry(service).or_default();
            for (hash, entry) in routes {
                match current.get(&hash) {
                    Some(existing) if existing.updated >= entry.updated => {}
                    _ => {
                        current.insert(hash, entry);
                    }
                }
            }
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}
