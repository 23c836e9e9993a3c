//! 外部错误到 RpcError 的转换

use super::{ErrorCode, RpcError};
use tonic::{Code, Status};

impl From<Status> for RpcError {
    fn from(status: Status) -> Self {
        let code = match status.code() {
            Code::Unavailable => ErrorCode::TransportError,
            Code::DeadlineExceeded => ErrorCode::RequestTimeout,
            Code::ResourceExhausted => ErrorCode::ResourceExhausted,
            Code::Cancelled => ErrorCode::Canceled,
            Code::InvalidArgument => ErrorCode::InvalidParameter,
            Code::NotFound => ErrorCode::RouteNotFound,
            _ => ErrorCode::CallFailed,
        };
        RpcError::coded(code, status.message().to_string())
    }
}

impl From<tonic::transport::Error> for RpcError {
    fn from(err: tonic::transport::Error) -> Self {
        RpcError::dial_failed(err.to_string())
    }
}

impl From<std::io::Error> for RpcError {
    fn from(err: std::io::Error) -> Self {
        RpcError::coded(ErrorCode::InternalError, err.to_string())
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::coded(ErrorCode::SerializationError, err.to_string())
    }
}
