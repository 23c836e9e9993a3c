//! gRPC 错误处理
//!
//! 提供 gRPC Status 与 RpcError 之间的转换

use super::{ErrorCode, RpcError};
use tonic::{Code, Status};

impl From<RpcError> for Status {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Coded {
                code,
                reason,
                details,
                ..
            } => {
                let grpc_code = map_error_code_to_grpc(code);
                let mut status = Status::new(grpc_code, reason);

                // 将错误详情添加到 status 的 metadata 中
                if let Some(details) = details {
                    if let Ok(value) = details.parse() {
                        status.metadata_mut().insert("error-details", value);
                    }
                }

                // 添加错误代码到 metadata
                if let Ok(value) = code.as_u32().to_string().parse() {
                    status.metadata_mut().insert("error-code", value);
                }

                status
            }
            RpcError::System(msg) => Status::internal(msg),
        }
    }
}

/// 将 Flare 错误代码映射到 gRPC 状态码
fn map_error_code_to_grpc(code: ErrorCode) -> Code {
    match code {
        // 路由相关
        ErrorCode::RouteNotFound => Code::NotFound,
        ErrorCode::DuplicateRoute => Code::AlreadyExists,

        // 解析相关：对调用方统一表现为内部错误
        ErrorCode::ResolverNotDetected
        | ErrorCode::LookupFailed
        | ErrorCode::BackendError
        | ErrorCode::TableSyncFailed => Code::Internal,

        // 选择相关
        ErrorCode::NoneAvailable => Code::Unavailable,
        ErrorCode::SelectorNotDetected => Code::Internal,

        // 传输相关
        ErrorCode::DialFailed
        | ErrorCode::ConnectionClosed
        | ErrorCode::ConnectionExpired
        | ErrorCode::TransportError
        | ErrorCode::RetryExhausted => Code::Unavailable,
        ErrorCode::ResourceExhausted => Code::ResourceExhausted,

        // 调用相关
        ErrorCode::InvalidParameter => Code::InvalidArgument,
        ErrorCode::RequestTimeout => Code::DeadlineExceeded,
        ErrorCode::Canceled => Code::Cancelled,
        ErrorCode::StreamClosed => Code::Aborted,
        ErrorCode::CallFailed => Code::Unknown,

        // 系统相关
        ErrorCode::InternalError
        | ErrorCode::ConfigurationError
        | ErrorCode::SerializationError => Code::Internal,
    }
}
