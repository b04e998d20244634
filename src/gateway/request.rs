//! 动作请求与响应数据结构
//!
//! - `ActionRequest`：每次入站调用创建，由分发器独占，响应发出后丢弃
//! - `ActionResult`：解析器返回的结果，序列化后即丢弃，不持久化
//! - `DispatchResponse`：状态码 + JSON 响应体，交给传输层写出

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::route_table::Method;
use super::schema::ValidationError;
use crate::utils::{format_timestamp, status_code, GatewayError};

/// 动作请求
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// 请求唯一标识（UUID v4）
    pub request_id: String,
    /// 动作名，取自路径段，非空
    pub action_name: String,
    /// 入站 HTTP 方法
    pub method: Method,
    /// 已通过路由 body schema 校验的完整请求体；路由未声明 body 时为 `None`
    pub body: Option<Value>,
    /// 请求体中的 `payload` 字段（若存在）
    pub payload: Option<Value>,
    /// 接收时间
    pub received_at: DateTime<Utc>,
}

impl ActionRequest {
    /// 创建动作请求
    pub fn new(request_id: impl Into<String>, action_name: impl Into<String>, method: Method) -> Self {
        Self {
            request_id: request_id.into(),
            action_name: action_name.into(),
            method,
            body: None,
            payload: None,
            received_at: Utc::now(),
        }
    }

    /// 附带已校验的请求体，并从中取出 `payload`
    pub fn with_body(mut self, body: Value) -> Self {
        self.payload = body.get("payload").cloned();
        self.body = Some(body);
        self
    }

    /// `payload` 为对象时返回其字段
    pub fn payload_object(&self) -> Option<&Map<String, Value>> {
        self.payload.as_ref().and_then(Value::as_object)
    }
}

/// 动作结果
///
/// `action_name` 总是等于来源请求的动作名；线上字段名为 `lambda`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(rename = "lambda")]
    pub action_name: String,
    /// ISO-8601 UTC
    pub timestamp: String,
}

impl ActionResult {
    /// 成功结果
    pub fn success(request: &ActionRequest, message: impl Into<String>, at: &DateTime<Utc>) -> Self {
        Self {
            success: true,
            message: message.into(),
            action_name: request.action_name.clone(),
            timestamp: format_timestamp(at),
        }
    }

    /// 失败结果（动作自身报告的失败）
    pub fn failure(request: &ActionRequest, message: impl Into<String>, at: &DateTime<Utc>) -> Self {
        Self {
            success: false,
            ..Self::success(request, message, at)
        }
    }
}

/// 错误信息
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// 错误码
    pub code: String,
    /// 错误消息
    pub message: String,
    /// 字段级错误
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationError>>,
}

impl ErrorInfo {
    /// 创建新的错误信息
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// 添加字段级错误
    pub fn with_details(mut self, details: Vec<ValidationError>) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&GatewayError> for ErrorInfo {
    fn from(err: &GatewayError) -> Self {
        let info = ErrorInfo::new(err.error_code(), err.to_string());
        match err.field_errors() {
            Some(errors) => info.with_details(errors.to_vec()),
            None => info,
        }
    }
}

/// 分发结果：状态码 + JSON 响应体
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: Value,
}

impl DispatchResponse {
    /// 200 响应
    pub fn ok(body: Value) -> Self {
        Self {
            status: status_code::OK,
            body,
        }
    }

    /// 错误响应，响应体为 `{"error": {...}}`
    pub fn error(status: u16, error: ErrorInfo) -> Self {
        Self {
            status,
            body: json!({ "error": error }),
        }
    }

    /// 是否成功
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 是否为客户端错误
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// 是否为服务端错误
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

impl From<&GatewayError> for DispatchResponse {
    fn from(err: &GatewayError) -> Self {
        DispatchResponse::error(err.status_code(), ErrorInfo::from(err))
    }
}
