//! 客户端配置
//!
//! 提供 RPC 客户端的静态配置：解析器类型、静态路由种子、连接池
//! 参数和调用参数。支持 TOML 文件加载和环境变量覆盖。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::InfraResult;
use crate::selector::Strategy;

/// 客户端配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub call: CallConfig,
}

/// 解析器配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// 解析器类型：local, consul
    #[serde(default)]
    pub kind: ResolverKind,

    /// 静态路由种子，`service:host:port` 条目，逗号或分号分隔
    ///
    /// 例如 `users:10.0.0.1:9000;users:10.0.0.2:9000,billing:10.0.0.5:9100`
    #[serde(default)]
    pub endpoints: Option<String>,

    /// Consul HTTP 地址（kind = consul 时使用）
    #[serde(default = "default_consul_url")]
    pub consul_url: String,
}

fn default_consul_url() -> String {
    "http://localhost:8500".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            kind: ResolverKind::Local,
            endpoints: None,
            consul_url: default_consul_url(),
        }
    }
}

/// 解析器类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    #[default]
    Local,
    Consul,
}

impl std::str::FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(ResolverKind::Local),
            "consul" => Ok(ResolverKind::Consul),
            _ => Err(format!("Unknown resolver kind: {}", s)),
        }
    }
}

/// 连接池配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// 每个地址的最大空闲连接数
    pub size: usize,

    /// 空闲连接存活时间（秒），超过后在下次取用时被惰性淘汰
    pub ttl: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { size: 16, ttl: 60 }
    }
}

/// 调用配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallConfig {
    /// 负载均衡策略
    #[serde(default)]
    pub load_balance: Strategy,

    /// 单次调用的总超时时间（秒）
    pub request_timeout: u64,

    /// 最大尝试次数（含首次调用）
    pub retries: usize,

    /// 最大接收消息大小（字节）
    pub max_recv_msg_size: usize,

    /// 最大发送消息大小（字节）
    pub max_send_msg_size: usize,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            load_balance: Strategy::default(),
            request_timeout: 30,
            retries: 3,
            max_recv_msg_size: 4 * 1024 * 1024,
            max_send_msg_size: 4 * 1024 * 1024,
        }
    }
}

impl CallConfig {
    /// 请求超时时长
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl Config {
    /// 从 TOML 文件加载配置
    pub fn load_from_file(path: &str) -> InfraResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// 应用环境变量覆盖
    ///
    /// 支持的变量与默认值：
    /// - `RESOLVER_KIND`（local / consul）
    /// - `RESOLVER_ENDPOINTS`（静态路由种子）
    /// - `CONSUL_URL`
    /// - `POOL_SIZE` / `POOL_TTL_SECONDS`
    /// - `REQUEST_TIMEOUT_SECONDS` / `CALL_RETRIES`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(kind) = std::env::var("RESOLVER_KIND") {
            if let Ok(kind) = kind.parse() {
                self.resolver.kind = kind;
            }
        }
        if let Ok(endpoints) = std::env::var("RESOLVER_ENDPOINTS") {
            self.resolver.endpoints = Some(endpoints);
        }
        if let Ok(url) = std::env::var("CONSUL_URL") {
            self.resolver.consul_url = url;
        }
        if let Some(size) = env_parse::<usize>("POOL_SIZE") {
            self.pool.size = size;
        }
        if let Some(ttl) = env_parse::<u64>("POOL_TTL_SECONDS") {
            self.pool.ttl = ttl;
        }
        if let Some(timeout) = env_parse::<u64>("REQUEST_TIMEOUT_SECONDS") {
            self.call.request_timeout = timeout;
        }
        if let Some(retries) = env_parse::<usize>("CALL_RETRIES") {
            self.call.retries = retries;
        }
        if let Some(strategy) = env_parse::<Strategy>("LOAD_BALANCE") {
            self.call.load_balance = strategy;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// 解析静态路由种子列表
///
/// 条目格式 `service:host:port`，逗号或分号分隔；空白和空条目被忽略。
/// 返回 `(service, address)` 对，地址部分不做校验（由拨号时报错）。
pub fn parse_seed_endpoints(raw: &str) -> Vec<(String, String)> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            item.split_once(':')
                .map(|(service, address)| (service.trim().to_string(), address.trim().to_string()))
        })
        .filter(|(service, address)| !service.is_empty() && !address.is_empty())
        .collect()
}
