//! 网关错误类型定义
//!
//! 本模块定义了网关中使用的所有错误类型，以及它们到 HTTP 状态码和稳定错误码的映射。

use std::net::SocketAddr;

use thiserror::Error;

use crate::gateway::schema::ValidationError;

/// 网关核心错误类型
#[derive(Error, Debug)]
pub enum GatewayError {
    // ==================== 请求处理错误 ====================

    /// 没有路由匹配 method + path
    #[error("路由未找到: {method} {path}")]
    RouteNotFound {
        method: String,
        path: String,
    },

    /// 参数或请求体未通过 schema 校验
    #[error("请求校验失败: {}", join_errors(.0))]
    ValidationFailed(Vec<ValidationError>),

    /// 解析器找不到具名动作
    #[error("动作未找到: '{0}'")]
    ActionNotFound(String),

    /// 动作返回值不符合声明的响应 schema（程序缺陷）
    #[error("响应契约被破坏: {}", join_errors(.0))]
    ResponseContractViolation(Vec<ValidationError>),

    // ==================== 启动期错误 ====================

    /// 路由已存在
    #[error("路由已存在: {method} {pattern}")]
    RouteAlreadyExists {
        method: String,
        pattern: String,
    },

    /// 路由模式无效
    #[error("路由模式无效: '{pattern}' - {reason}")]
    InvalidRoutePattern {
        pattern: String,
        reason: String,
    },

    /// 动作重复注册
    #[error("动作已注册: '{0}'")]
    ActionAlreadyRegistered(String),

    /// 监听端口绑定失败
    #[error("监听 {addr} 失败: {source}")]
    StartupFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        key: String,
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ==================== 通用错误 ====================

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 网关操作结果类型别名
pub type Result<T> = std::result::Result<T, GatewayError>;

/// 状态码常量
pub mod status_code {
    /// 成功
    pub const OK: u16 = 200;

    /// 请求格式错误
    pub const BAD_REQUEST: u16 = 400;

    /// 未找到
    pub const NOT_FOUND: u16 = 404;

    /// 冲突
    pub const CONFLICT: u16 = 409;

    /// 内部错误
    pub const INTERNAL_ERROR: u16 = 500;
}

/// 错误码常量
pub mod error_code {
    // 请求错误 (GATEWAY-xxx)
    pub const ROUTE_NOT_FOUND: &str = "GATEWAY-001";
    pub const VALIDATION_FAILED: &str = "GATEWAY-002";
    pub const ACTION_NOT_FOUND: &str = "GATEWAY-003";
    pub const RESPONSE_CONTRACT_VIOLATION: &str = "GATEWAY-004";

    // 启动错误 (STARTUP-xxx)
    pub const ROUTE_ALREADY_EXISTS: &str = "STARTUP-001";
    pub const INVALID_ROUTE_PATTERN: &str = "STARTUP-002";
    pub const ACTION_ALREADY_REGISTERED: &str = "STARTUP-003";
    pub const BIND_FAILED: &str = "STARTUP-004";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    pub const INTERNAL: &str = "INTERNAL";
}

impl GatewayError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound { .. } => error_code::ROUTE_NOT_FOUND,
            GatewayError::ValidationFailed(_) => error_code::VALIDATION_FAILED,
            GatewayError::ActionNotFound(_) => error_code::ACTION_NOT_FOUND,
            GatewayError::ResponseContractViolation(_) => error_code::RESPONSE_CONTRACT_VIOLATION,
            GatewayError::RouteAlreadyExists { .. } => error_code::ROUTE_ALREADY_EXISTS,
            GatewayError::InvalidRoutePattern { .. } => error_code::INVALID_ROUTE_PATTERN,
            GatewayError::ActionAlreadyRegistered(_) => error_code::ACTION_ALREADY_REGISTERED,
            GatewayError::StartupFailed { .. } => error_code::BIND_FAILED,
            GatewayError::ConfigLoadFailed(_) | GatewayError::Yaml(_) => {
                error_code::CONFIG_LOAD_FAILED
            }
            GatewayError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            _ => error_code::INTERNAL,
        }
    }

    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::RouteNotFound { .. } => status_code::NOT_FOUND,
            GatewayError::ActionNotFound(_) => status_code::NOT_FOUND,
            GatewayError::ValidationFailed(_) => status_code::BAD_REQUEST,
            GatewayError::RouteAlreadyExists { .. } => status_code::CONFLICT,
            GatewayError::ActionAlreadyRegistered(_) => status_code::CONFLICT,
            _ => status_code::INTERNAL_ERROR,
        }
    }

    /// 字段级校验错误（仅校验类错误携带）
    pub fn field_errors(&self) -> Option<&[ValidationError]> {
        match self {
            GatewayError::ValidationFailed(errors)
            | GatewayError::ResponseContractViolation(errors) => Some(errors),
            _ => None,
        }
    }
}
