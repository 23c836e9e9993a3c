//! Flare RPC Core 错误处理模块
//!
//! 提供统一的错误处理机制，支持错误代码分类、可重试性判定和
//! gRPC Status 双向转换

pub mod code;
pub mod conversions;
pub mod grpc;
pub mod rpc_error;

// 重新导出公共类型和函数
pub use code::{ErrorCategory, ErrorCode};
pub use rpc_error::{Result, RpcError};

/// 基础设施层默认使用的结果类型
pub type InfraResult<T> = anyhow::Result<T>;

/// 将基础设施错误转换为 `RpcError`
pub fn map_infra_error<E, S>(error: E, code: ErrorCode, message: S) -> RpcError
where
    E: std::fmt::Display,
    S: Into<String>,
{
    RpcError::coded_with_details(code, message, error.to_string())
}

/// `InfraResult` 的辅助扩展，用于快速转换为统一的错误类型
pub trait InfraResultExt<T> {
    fn into_rpc<S>(self, code: ErrorCode, message: S) -> Result<T>
    where
        S: Into<String>;
}

impl<T> InfraResultExt<T> for InfraResult<T> {
    fn into_rpc<S>(self, code: ErrorCode, message: S) -> Result<T>
    where
        S: Into<String>,
    {
        self.map_err(|err| map_infra_error(err, code, message))
    }
}
