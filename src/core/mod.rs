//! 核心模块
//!
//! 包含网关配置。

pub mod config;

pub use config::{
    GatewayConfig, GatewayConfigBuilder, LogConfig, SchemaConfig, ServerConfig, ENV_PREFIX,
};
