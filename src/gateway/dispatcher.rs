//! 请求分发器
//!
//! 每个入站请求的处理流程：
//!
//! 1. 在路由表中匹配 method + path，未命中 → 404
//! 2. 解码路径参数并按 `params_schema` 校验 → 400
//! 3. 路由声明了请求体 schema 时校验请求体 → 400
//! 4. 构造 `ActionRequest`，经解析器调用动作（唯一的挂起点）
//! 5. 按 `response_schema` 校验动作结果，不符即程序缺陷 → 500
//! 6. 序列化结果 → 200
//!
//! 分发器不持有跨请求的可变状态（统计计数器除外），可重入、可并发调用。

use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

use super::request::{ActionRequest, DispatchResponse};
use super::resolver::ActionResolver;
use super::route_table::{Method, RouteMatch, RouteTable};
use super::schema::{Schema, SchemaRegistry, ValidationError, ValidationErrorCode, ValidationOutcome};
use crate::utils::{generate_request_id, status_code, GatewayError, Result};

// ============================================================================
// 统计
// ============================================================================

/// 分发统计
#[derive(Debug)]
pub struct DispatcherStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    not_found_requests: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    total_latency_us: AtomicU64,
    min_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

impl Default for DispatcherStats {
    fn default() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            not_found_requests: AtomicU64::new(0),
            client_errors: AtomicU64::new(0),
            server_errors: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            min_latency_us: AtomicU64::new(u64::MAX),
            max_latency_us: AtomicU64::new(0),
        }
    }
}

impl DispatcherStats {
    /// 记录一次请求
    pub fn record(&self, status: u16, latency_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.min_latency_us.fetch_min(latency_us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(latency_us, Ordering::Relaxed);

        let counter = match status {
            200..=299 => &self.successful_requests,
            status_code::NOT_FOUND => &self.not_found_requests,
            400..=499 => &self.client_errors,
            _ => &self.server_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取统计快照
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let total_latency = self.total_latency_us.load(Ordering::Relaxed);
        let min_latency = self.min_latency_us.load(Ordering::Relaxed);

        DispatcherStatsSnapshot {
            total_requests: total,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            not_found_requests: self.not_found_requests.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            avg_latency_us: if total > 0 { total_latency / total } else { 0 },
            min_latency_us: if min_latency == u64::MAX { 0 } else { min_latency },
            max_latency_us: self.max_latency_us.load(Ordering::Relaxed),
        }
    }
}

/// 分发统计快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    /// 404（未命中路由或动作不存在）
    pub not_found_requests: u64,
    /// 除 404 外的 4xx
    pub client_errors: u64,
    pub server_errors: u64,
    pub avg_latency_us: u64,
    pub min_latency_us: u64,
    pub max_latency_us: u64,
}

// ============================================================================
// 分发器
// ============================================================================

/// 请求分发器
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    schemas: Arc<SchemaRegistry>,
    resolver: Arc<dyn ActionResolver>,
    stats: DispatcherStats,
}

impl Dispatcher {
    /// 创建分发器
    pub fn new(
        routes: Arc<RouteTable>,
        schemas: Arc<SchemaRegistry>,
        resolver: Arc<dyn ActionResolver>,
    ) -> Self {
        Self {
            routes,
            schemas,
            resolver,
            stats: DispatcherStats::default(),
        }
    }

    /// 路由表
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Schema 注册表
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// 统计快照
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// 处理一个入站请求
    ///
    /// 所有请求级错误都在这里转换为结构化响应，不会向上传播。
    pub async fn handle(&self, method: &str, path: &str, body: &[u8]) -> DispatchResponse {
        let start = Instant::now();
        let request_id = generate_request_id();
        let span = info_span!("dispatch", request_id = %request_id, method = %method, path = %path);

        let response = async {
            match self.dispatch(&request_id, method, path, body).await {
                Ok(response) => {
                    debug!(elapsed_us = start.elapsed().as_micros() as u64, "请求处理完成");
                    response
                }
                Err(err) => {
                    log_failure(&err);
                    DispatchResponse::from(&err)
                }
            }
        }
        .instrument(span)
        .await;

        self.stats
            .record(response.status, start.elapsed().as_micros() as u64);
        response
    }

    async fn dispatch(
        &self,
        request_id: &str,
        method: &str,
        path: &str,
        body: &[u8],
    ) -> Result<DispatchResponse> {
        let not_found = || GatewayError::RouteNotFound {
            method: method.to_string(),
            path: path.to_string(),
        };

        // 1. 路由匹配
        let parsed_method = Method::parse(method).ok_or_else(not_found)?;
        let found = self.routes.find(parsed_method, path).ok_or_else(not_found)?;
        let route = found.route;

        // 2. 路径参数
        let params = self.validate_params(&found)?;
        let action_name = params
            .get(&route.action_param)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GatewayError::Internal(format!("动作参数 '{}' 未绑定", route.action_param))
            })?
            .to_string();

        // 3. 请求体
        let mut request = ActionRequest::new(request_id, action_name, parsed_method);
        if let Some(ref schema) = route.body_schema {
            request = request.with_body(self.validate_body(schema, body)?);
        }

        // 4. 调用动作
        let expected_name = request.action_name.clone();

        let handler = self.resolver.resolve(&expected_name).await?;
        let result = handler.invoke(request).await;

        // 5. 响应契约
        if result.action_name != expected_name {
            return Err(GatewayError::ResponseContractViolation(vec![ValidationError::new(
                "response.lambda",
                ValidationErrorCode::Mismatch,
                format!("期望 '{}'，实际为 '{}'", expected_name, result.action_name),
            )]));
        }
        let value = serde_json::to_value(&result)?;
        if let ValidationOutcome::Invalid(errors) =
            self.schemas.validate(&route.response_schema, &value, "response")
        {
            return Err(GatewayError::ResponseContractViolation(errors));
        }

        // 6. 序列化
        Ok(DispatchResponse::ok(value))
    }

    /// 解码并校验路径参数
    fn validate_params(&self, found: &RouteMatch<'_>) -> Result<Map<String, Value>> {
        let mut params = Map::new();
        let mut errors = Vec::new();

        for (name, raw) in found.params.iter() {
            match percent_decode_str(raw).decode_utf8() {
                Ok(decoded) => {
                    params.insert(name.to_string(), Value::String(decoded.into_owned()));
                }
                Err(_) => errors.push(ValidationError::new(
                    format!("params.{}", name),
                    ValidationErrorCode::Malformed,
                    "百分号编码解码后不是合法 UTF-8",
                )),
            }
        }
        if !errors.is_empty() {
            return Err(GatewayError::ValidationFailed(errors));
        }

        let params = Value::Object(params);
        self.schemas
            .parse(&found.route.params_schema, params, "params")
            .map_err(GatewayError::ValidationFailed)
    }

    /// 解析并校验请求体
    ///
    /// 空请求体视为缺省：schema 中所有字段均可选时等价于 `{}`。
    /// 返回校验通过的原始 JSON，字段结构由路由的 body schema 决定。
    fn validate_body(&self, schema: &Schema, body: &[u8]) -> Result<Value> {
        let absent = body.iter().all(u8::is_ascii_whitespace);

        let value = if absent {
            match schema {
                Schema::Object(object) if object.all_optional() => Value::Object(Map::new()),
                _ => {
                    return Err(GatewayError::ValidationFailed(vec![ValidationError::new(
                        "body",
                        ValidationErrorCode::Missing,
                        "缺少请求体",
                    )]))
                }
            }
        } else {
            serde_json::from_slice(body).map_err(|e| {
                GatewayError::ValidationFailed(vec![ValidationError::new(
                    "body",
                    ValidationErrorCode::Malformed,
                    format!("请求体不是合法 JSON: {}", e),
                )])
            })?
        };

        self.schemas
            .parse(schema, value, "body")
            .map_err(GatewayError::ValidationFailed)
    }
}

fn log_failure(err: &GatewayError) {
    match err {
        GatewayError::RouteNotFound { .. } => debug!(error = %err, "路由未命中"),
        GatewayError::ValidationFailed(_) | GatewayError::ActionNotFound(_) => {
            info!(error_code = err.error_code(), error = %err, "请求被拒绝")
        }
        _ => error!(error_code = err.error_code(), error = %err, "请求处理失败"),
    }
}
