//! 随机选择器

use rand::Rng;

use crate::error::{Result, RpcError};
use crate::selector::{Next, Selector, Strategy};

/// 随机选择器
///
/// 每次调用均匀随机返回一个地址。
pub struct RandomSelector;

impl RandomSelector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for RandomSelector {
    fn select(&self, addresses: &[String]) -> Result<Next> {
        if addresses.is_empty() {
            return Err(RpcError::none_available());
        }
        let addresses = addresses.to_vec();
        Ok(Next::new(move || {
            let index = rand::thread_rng().gen_range(0..addresses.len());
            addresses[index].clone()
        }))
    }

    fn strategy(&self) -> Strategy {
        Strategy::Random
    }
}
