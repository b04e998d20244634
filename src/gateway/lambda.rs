//! Lambda 路由声明
//!
//! 声明 `GET /run/:lambda_name` 与 `POST /run/:lambda_name` 两条路由及其 schema：
//!
//! - 路径参数：`{ lambda_name: 非空字符串 }`
//! - 请求体（仅 POST）：`{ payload?: Record<string, unknown> }`
//! - 响应：`{ success: bool, message: string, lambda: string, timestamp: string }`

use std::sync::Arc;
use tracing::debug;

use super::dispatcher::Dispatcher;
use super::resolver::ActionResolver;
use super::route_table::{Method, Route, RouteTable};
use super::schema::{ObjectSchema, Schema, SchemaRegistry};
use crate::core::SchemaConfig;
use crate::utils::Result;

/// 路由模式
pub const LAMBDA_ROUTE_PATTERN: &str = "/run/:lambda_name";

/// 携带动作名的路径参数
pub const LAMBDA_NAME_PARAM: &str = "lambda_name";

/// Schema 名称
pub mod schema_names {
    pub const PARAMS: &str = "lambda.params";
    pub const BODY: &str = "lambda.body";
    pub const RESPONSE: &str = "lambda.response";
}

/// 路径参数 schema
pub fn params_schema() -> Schema {
    ObjectSchema::new()
        .required(LAMBDA_NAME_PARAM, Schema::non_empty_string())
        .into()
}

/// 请求体 schema
pub fn body_schema() -> Schema {
    ObjectSchema::new()
        .optional("payload", Schema::record(Schema::Unknown))
        .into()
}

/// 响应 schema
pub fn response_schema() -> Schema {
    ObjectSchema::new()
        .required("success", Schema::Bool)
        .required("message", Schema::string())
        .required("lambda", Schema::non_empty_string())
        .required("timestamp", Schema::non_empty_string())
        .into()
}

/// 向注册表登记 lambda schema，并返回对应的两条路由
pub fn register(registry: &mut SchemaRegistry) -> Result<Vec<Route>> {
    let params = registry.register(schema_names::PARAMS, params_schema())?;
    let body = registry.register(schema_names::BODY, body_schema())?;
    let response = registry.register(schema_names::RESPONSE, response_schema())?;

    let get = Route::new(
        Method::Get,
        LAMBDA_ROUTE_PATTERN,
        LAMBDA_NAME_PARAM,
        Arc::clone(&params),
        Arc::clone(&response),
    )?;
    let post = Route::new(Method::Post, LAMBDA_ROUTE_PATTERN, LAMBDA_NAME_PARAM, params, response)?
        .with_body(body);

    Ok(vec![get, post])
}

/// 使用 lambda 路由组装分发器
pub fn build_dispatcher(
    config: &SchemaConfig,
    resolver: Arc<dyn ActionResolver>,
) -> Result<Dispatcher> {
    let mut registry = SchemaRegistry::new(config.strict);
    let mut routes = RouteTable::new();
    for route in register(&mut registry)? {
        routes.register(route)?;
    }

    debug!(
        routes = routes.len(),
        schemas = registry.names().len(),
        strict = registry.is_strict(),
        "lambda 路由已装配"
    );

    Ok(Dispatcher::new(Arc::new(routes), Arc::new(registry), resolver))
}
