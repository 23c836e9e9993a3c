//! Flare RPC 统一错误类型

use super::code::ErrorCode;
use thiserror::Error;

/// Flare RPC 统一错误类型
#[derive(Error, Debug, Clone)]
pub enum RpcError {
    /// 带错误代码的错误（稳态失败路径统一走这里）
    #[error("错误 [{code}] {reason}", code = .code.as_str())]
    Coded {
        code: ErrorCode,
        reason: String,
        details: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// 系统错误（用于内部错误，不暴露给调用方细节）
    #[error("系统错误: {0}")]
    System(String),
}

impl RpcError {
    /// 创建带错误代码的错误
    pub fn coded(code: ErrorCode, reason: impl Into<String>) -> Self {
        RpcError::Coded {
            code,
            reason: reason.into(),
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// 创建带错误代码和详情的错误
    pub fn coded_with_details(
        code: ErrorCode,
        reason: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        RpcError::Coded {
            code,
            reason: reason.into(),
            details: Some(details.into()),
            timestamp: chrono::Utc::now(),
        }
    }

    /// 创建系统错误
    pub fn system(msg: impl Into<String>) -> Self {
        RpcError::System(msg.into())
    }

    // ============================================================
    // 便捷方法：路由表相关错误
    // ============================================================

    /// 路由不存在
    pub fn route_not_found(service: impl Into<String>) -> Self {
        Self::coded(
            ErrorCode::RouteNotFound,
            format!("route not found: {}", service.into()),
        )
    }

    /// 路由已存在
    pub fn duplicate_route(service: impl Into<String>) -> Self {
        Self::coded(
            ErrorCode::DuplicateRoute,
            format!("route already exists: {}", service.into()),
        )
    }

    // ============================================================
    // 便捷方法：解析器相关错误
    // ============================================================

    /// 解析失败（后端错误包装）
    pub fn lookup_failed(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::LookupFailed, reason)
    }

    /// 后端查询错误
    pub fn backend_error(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::BackendError, reason)
    }

    // ============================================================
    // 便捷方法：选择器相关错误
    // ============================================================

    /// 没有可用的候选地址
    pub fn none_available() -> Self {
        Self::coded(ErrorCode::NoneAvailable, "no addresses available")
    }

    // ============================================================
    // 便捷方法：连接与传输相关错误
    // ============================================================

    /// 拨号失败
    pub fn dial_failed(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::DialFailed, reason)
    }

    /// 连接已关闭
    pub fn connection_closed(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::ConnectionClosed, reason)
    }

    /// 传输错误
    pub fn transport_error(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::TransportError, reason)
    }

    // ============================================================
    // 便捷方法：调用相关错误
    // ============================================================

    /// 参数错误
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::InvalidParameter, reason)
    }

    /// 请求超时
    pub fn request_timeout(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::RequestTimeout, reason)
    }

    /// 调用被取消
    pub fn canceled(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::Canceled, reason)
    }

    /// 重试预算耗尽
    pub fn retry_exhausted(attempts: usize, last: &RpcError) -> Self {
        Self::coded_with_details(
            ErrorCode::RetryExhausted,
            format!("retry budget exhausted after {} attempts", attempts),
            last.to_string(),
        )
    }

    /// 流已关闭
    pub fn stream_closed(reason: impl Into<String>) -> Self {
        Self::coded(ErrorCode::StreamClosed, reason)
    }

    // ============================================================
    // 信息获取方法
    // ============================================================

    /// 获取错误代码
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            RpcError::Coded { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// 获取错误原因
    pub fn reason(&self) -> &str {
        match self {
            RpcError::Coded { reason, .. } => reason,
            RpcError::System(msg) => msg,
        }
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        self.code().map(|code| code.is_retryable()).unwrap_or(false)
    }

    /// 判断是否为取消错误
    pub fn is_canceled(&self) -> bool {
        matches!(self.code(), Some(ErrorCode::Canceled))
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, RpcError>;
