//! 错误代码和错误类别定义
//!
//! 错误代码按类别分组，每个类别占用1000个代码范围：
//! - 1000-1999: 路由表相关错误
//! - 2000-2999: 解析器相关错误
//! - 3000-3999: 选择器相关错误
//! - 4000-4999: 连接与传输相关错误
//! - 5000-5999: 调用相关错误
//! - 6000-6999: 系统相关错误

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 路由表相关错误 (1000-1999)
    // ============================================================
    RouteNotFound = 1000,
    DuplicateRoute = 1001,

    // ============================================================
    // 解析器相关错误 (2000-2999)
    // ============================================================
    ResolverNotDetected = 2000,
    LookupFailed = 2001,
    BackendError = 2002,
    TableSyncFailed = 2003,

    // ============================================================
    // 选择器相关错误 (3000-3999)
    // ============================================================
    NoneAvailable = 3000,
    SelectorNotDetected = 3001,

    // ============================================================
    // 连接与传输相关错误 (4000-4999)
    // ============================================================
    DialFailed = 4000,
    ConnectionClosed = 4001,
    ConnectionExpired = 4002,
    TransportError = 4003,
    ResourceExhausted = 4004,

    // ============================================================
    // 调用相关错误 (5000-5999)
    // ============================================================
    InvalidParameter = 5000,
    RequestTimeout = 5001,
    Canceled = 5002,
    RetryExhausted = 5003,
    StreamClosed = 5004,
    CallFailed = 5005,

    // ============================================================
    // 系统相关错误 (6000-6999)
    // ============================================================
    InternalError = 6000,
    ConfigurationError = 6001,
    SerializationError = 6002,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 从数字值创建错误代码
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1000 => Some(ErrorCode::RouteNotFound),
            1001 => Some(ErrorCode::DuplicateRoute),
            2000 => Some(ErrorCode::ResolverNotDetected),
            2001 => Some(ErrorCode::LookupFailed),
            2002 => Some(ErrorCode::BackendError),
            2003 => Some(ErrorCode::TableSyncFailed),
            3000 => Some(ErrorCode::NoneAvailable),
            3001 => Some(ErrorCode::SelectorNotDetected),
            4000 => Some(ErrorCode::DialFailed),
            4001 => Some(ErrorCode::ConnectionClosed),
            4002 => Some(ErrorCode::ConnectionExpired),
            4003 => Some(ErrorCode::TransportError),
            4004 => Some(ErrorCode::ResourceExhausted),
            5000 => Some(ErrorCode::InvalidParameter),
            5001 => Some(ErrorCode::RequestTimeout),
            5002 => Some(ErrorCode::Canceled),
            5003 => Some(ErrorCode::RetryExhausted),
            5004 => Some(ErrorCode::StreamClosed),
            5005 => Some(ErrorCode::CallFailed),
            6000 => Some(ErrorCode::InternalError),
            6001 => Some(ErrorCode::ConfigurationError),
            6002 => Some(ErrorCode::SerializationError),
            _ => None,
        }
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RouteNotFound => "ROUTE_NOT_FOUND",
            ErrorCode::DuplicateRoute => "DUPLICATE_ROUTE",
            ErrorCode::ResolverNotDetected => "RESOLVER_NOT_DETECTED",
            ErrorCode::LookupFailed => "LOOKUP_FAILED",
            ErrorCode::BackendError => "BACKEND_ERROR",
            ErrorCode::TableSyncFailed => "TABLE_SYNC_FAILED",
            ErrorCode::NoneAvailable => "NONE_AVAILABLE",
            ErrorCode::SelectorNotDetected => "SELECTOR_NOT_DETECTED",
            ErrorCode::DialFailed => "DIAL_FAILED",
            ErrorCode::ConnectionClosed => "CONNECTION_CLOSED",
            ErrorCode::ConnectionExpired => "CONNECTION_EXPIRED",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
            ErrorCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ErrorCode::InvalidParameter => "INVALID_PARAMETER",
            ErrorCode::RequestTimeout => "REQUEST_TIMEOUT",
            ErrorCode::Canceled => "CANCELED",
            ErrorCode::RetryExhausted => "RETRY_EXHAUSTED",
            ErrorCode::StreamClosed => "STREAM_CLOSED",
            ErrorCode::CallFailed => "CALL_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
        }
    }

    /// 获取错误代码的类别（用于错误分类）
    pub fn category(&self) -> ErrorCategory {
        let code = self.as_u32();
        match code {
            1000..=1999 => ErrorCategory::Route,
            2000..=2999 => ErrorCategory::Resolver,
            3000..=3999 => ErrorCategory::Selector,
            4000..=4999 => ErrorCategory::Transport,
            5000..=5999 => ErrorCategory::Call,
            _ => ErrorCategory::System,
        }
    }

    /// 判断是否为可重试的错误
    ///
    /// 只有传输类错误驱动客户端的退避重试；路由、解析、选择和参数
    /// 错误属于确定性失败，重试不会改变结果。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::DialFailed
                | ErrorCode::ConnectionClosed
                | ErrorCode::ConnectionExpired
                | ErrorCode::TransportError
                | ErrorCode::ResourceExhausted
                | ErrorCode::RequestTimeout
        )
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Route,
    Resolver,
    Selector,
    Transport,
    Call,
    System,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Route => write!(f, "ROUTE"),
            ErrorCategory::Resolver => write!(f, "RESOLVER"),
            ErrorCategory::Selector => write!(f, "SELECTOR"),
            ErrorCategory::Transport => write!(f, "TRANSPORT"),
            ErrorCategory::Call => write!(f, "CALL"),
            ErrorCategory::System => write!(f, "SYSTEM"),
        }
    }
}
