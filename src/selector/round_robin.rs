//! 轮询选择器

use rand::Rng;

use crate::error::{Result, RpcError};
use crate::selector::{Next, Selector, Strategy};

/// 轮询选择器
///
/// 从一个伪随机下标开始递增取模。随机起点避免多个客户端实例
/// 同时命中同一个下游地址；新的 `select` 调用会重新选择起点。
pub struct RoundRobinSelector;

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RoundRobinSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for RoundRobinSelector {
    fn select(&self, addresses: &[String]) -> Result<Next> {
        if addresses.is_empty() {
            return Err(RpcError::none_available());
        }
        let addresses = addresses.to_vec();
        let mut index = rand::thread_rng().gen_range(0..addresses.len());
        Ok(Next::new(move || {
            let address = addresses[index % addresses.len()].clone();
            index = index.wrapping_add(1);
            address
        }))
    }

    fn strategy(&self) -> Strategy {
        Strategy::RoundRobin
    }
}
