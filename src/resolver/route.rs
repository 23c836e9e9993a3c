//! 路由定义

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 路由
///
/// 标识一个 `(服务名, 网络地址)` 对。内容哈希作为路由表内部的
/// 去重键：相同的服务名和地址总是产生相同的哈希。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    /// 逻辑服务名（如 "message-orchestrator"）
    pub service: String,

    /// 网络地址，`host:port`
    pub address: String,
}

impl Route {
    /// 创建新的路由
    pub fn new(service: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            address: address.into(),
        }
    }

    /// 计算路由的内容哈希（SHA-256，十六进制编码）
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.service.as_bytes());
        hasher.update(self.address.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.service, self.address)
    }
}
