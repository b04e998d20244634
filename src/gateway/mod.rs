//! 网关
//!
//! 请求校验与动作分发：
//!
//! - `schema` - 声明式形状与校验
//! - `route_table` - method + 路径模式到路由的映射
//! - `dispatcher` - 匹配、校验、调用、序列化
//! - `resolver` - 动作名到可调用单元的解析接缝
//! - `request` - 请求、结果与响应数据结构
//! - `lambda` - `/run/:lambda_name` 路由声明
//! - `server` - HTTP 传输与服务生命周期

pub mod dispatcher;
pub mod lambda;
pub mod request;
pub mod resolver;
pub mod route_table;
pub mod schema;
pub mod server;

pub use dispatcher::{Dispatcher, DispatcherStats, DispatcherStatsSnapshot};
pub use lambda::{build_dispatcher, LAMBDA_NAME_PARAM, LAMBDA_ROUTE_PATTERN};
pub use request::{ActionRequest, ActionResult, DispatchResponse, ErrorInfo};
pub use resolver::{ActionHandler, ActionResolver, EchoHandler, EchoResolver, RegistryResolver};
pub use route_table::{Method, PathParams, PathPattern, Route, RouteMatch, RouteSummary, RouteTable};
pub use schema::{
    validate, ObjectSchema, Schema, SchemaRegistry, ValidationError, ValidationErrorCode,
    ValidationOutcome,
};
pub use server::{router, BoundServer, Gateway, GatewayServer};
