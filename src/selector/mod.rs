//! 负载均衡选择器模块
//!
//! 给定一组候选地址，返回一个按策略产生后续地址的生成器。

pub mod random;
pub mod round_robin;

pub use random::RandomSelector;
pub use round_robin::RoundRobinSelector;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

/// 负载均衡策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 轮询（Round Robin）
    #[default]
    RoundRobin,
    /// 随机（Random）
    Random,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace("-", "_").as_str() {
            "round_robin" | "roundrobin" => Ok(Strategy::RoundRobin),
            "random" => Ok(Strategy::Random),
            _ => Err(format!("Unknown selector strategy: {}", s)),
        }
    }
}

/// 地址生成器
///
/// 每次 `select` 调用产生一个独立的生成器，内部状态互不共享；
/// 跨任务共享同一个 `Next` 时需要调用方自行加锁。
pub struct Next {
    next_fn: Box<dyn FnMut() -> String + Send>,
}

impl Next {
    /// 用闭包构造生成器
    pub fn new(next_fn: impl FnMut() -> String + Send + 'static) -> Self {
        Self {
            next_fn: Box::new(next_fn),
        }
    }

    /// 产生下一个地址
    pub fn next(&mut self) -> String {
        (self.next_fn)()
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// 选择器 trait
pub trait Selector: Send + Sync {
    /// 为一组候选地址创建生成器
    ///
    /// `addresses` 为空时返回 `NoneAvailable`。
    fn select(&self, addresses: &[String]) -> Result<Next>;

    /// 当前策略
    fn strategy(&self) -> Strategy;
}

/// 按策略创建选择器
pub fn new_selector(strategy: Strategy) -> Arc<dyn Selector> {
    match strategy {
        Strategy::RoundRobin => Arc::new(RoundRobinSelector::new()),
        Strategy::Random => Arc::new(RandomSelector::new()),
    }
}
