//! # Lambda Gateway - 请求校验动作分发网关
//!
//! 一个小型 HTTP 前端：按声明的 schema 校验入站请求，解析具名动作并调用，
//! 再按响应 schema 校验结果后返回结构化 JSON。
//!
//! - **Schema 注册表**: 声明式形状，纯函数校验，字段级错误
//! - **路由表**: method + 路径模式匹配，启动后只读
//! - **分发器**: 匹配 → 校验 → 调用 → 校验响应 → 序列化
//! - **动作解析器**: 接入真实执行器的唯一接缝
//! - **配置与日志**: YAML/JSON 配置，结构化日志
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use lambda_gateway::{Gateway, GatewayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::default();
//!     let server = Gateway::from_config(&config)?.into_server().bind().await?;
//!
//!     server
//!         .serve(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## 模块结构
//!
//! - `gateway` - schema、路由、分发器、解析器与服务启动
//! - `core` - 网关配置
//! - `utils` - 错误类型、日志、时钟与请求 ID

#![warn(rustdoc::missing_crate_level_docs)]

pub mod core;
pub mod gateway;
pub mod utils;

// 重导出常用类型，方便使用
pub use gateway::{
    ActionHandler, ActionRequest, ActionResolver, ActionResult, BoundServer, DispatchResponse,
    Dispatcher, EchoResolver, Gateway, GatewayServer, Method, ObjectSchema, RegistryResolver,
    Route, RouteTable, Schema, SchemaRegistry, ValidationError, ValidationErrorCode,
    ValidationOutcome,
};

pub use utils::{error_code, status_code, GatewayError, Result};
pub use utils::logger::{LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};

pub use crate::core::config::{GatewayConfig, GatewayConfigBuilder, LogConfig, SchemaConfig, ServerConfig};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
