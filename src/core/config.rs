//! 网关配置
//!
//! 定义网关的配置结构和加载逻辑。配置来源按优先级从低到高：
//! 默认值 → 配置文件（YAML 或 JSON）→ 环境变量 → 命令行参数。

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::utils::logger::LOG_LEVELS;
use crate::utils::{GatewayError, Result};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "LAMBDA_GATEWAY";

/// 监听配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 优雅关闭等待时间（毫秒）
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_output: false,
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Schema 校验配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// 严格模式：对象中出现未声明的字段时报告 `unknown_field`
    #[serde(default)]
    pub strict: bool,
}

/// 网关配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// 配置文件路径
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 监听配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,

    /// Schema 校验配置
    #[serde(default)]
    pub schema: SchemaConfig,

    /// 是否为开发模式
    #[serde(default)]
    pub dev_mode: bool,
}

impl GatewayConfig {
    /// 创建配置构建器
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    /// 从文件加载配置
    ///
    /// 扩展名为 `.json` 时按 JSON 解析，否则按 YAML 解析。
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            GatewayError::ConfigLoadFailed(format!("读取 {} 失败: {}", path.display(), e))
        })?;

        let mut config: GatewayConfig = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.config_path = Some(path);
        Ok(config)
    }

    /// 合并另一个配置（只覆盖非默认值）
    pub fn merge(&mut self, other: GatewayConfig) {
        if other.server.host != default_host() {
            self.server.host = other.server.host;
        }
        if other.server.port != default_port() {
            self.server.port = other.server.port;
        }
        if other.server.shutdown_grace_ms != default_shutdown_grace_ms() {
            self.server.shutdown_grace_ms = other.server.shutdown_grace_ms;
        }
        if other.logging.level != default_log_level() {
            self.logging.level = other.logging.level;
        }
        if other.logging.json_format {
            self.logging.json_format = true;
        }
        if other.logging.file_output {
            self.logging.file_output = true;
            self.logging.log_dir = other.logging.log_dir;
        }
        if other.schema.strict {
            self.schema.strict = true;
        }
        if other.dev_mode {
            self.dev_mode = true;
        }
    }

    /// 应用环境变量覆盖
    ///
    /// 读取 `LAMBDA_GATEWAY_HOST`、`LAMBDA_GATEWAY_PORT`、`LAMBDA_GATEWAY_LOG_LEVEL`。
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(format!("{}_{}", ENV_PREFIX, key)).ok())
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| GatewayError::InvalidConfigValue {
                key: "server.port".to_string(),
                reason: format!("'{}' 不是合法端口", port),
            })?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(GatewayError::InvalidConfigValue {
                key: "server.host".to_string(),
                reason: "监听地址不能为空".to_string(),
            });
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(GatewayError::InvalidConfigValue {
                key: "logging.level".to_string(),
                reason: format!("未知日志级别 '{}'，可选: {}", self.logging.level, LOG_LEVELS.join(", ")),
            });
        }

        Ok(())
    }

    /// 解析监听地址
    ///
    /// 主机名经 `tokio::net::lookup_host` 异步解析。
    pub async fn socket_addr(&self) -> Result<SocketAddr> {
        let target = (self.server.host.as_str(), self.server.port);
        tokio::net::lookup_host(target)
            .await
            .map_err(|e| GatewayError::InvalidConfigValue {
                key: "server.host".to_string(),
                reason: format!("无法解析 '{}': {}", self.server.host, e),
            })?
            .next()
            .ok_or_else(|| GatewayError::InvalidConfigValue {
                key: "server.host".to_string(),
                reason: format!("'{}' 没有可用地址", self.server.host),
            })
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置监听地址
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    /// 设置监听端口
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// 设置优雅关闭等待时间
    pub fn shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.config.server.shutdown_grace_ms = ms;
        self
    }

    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用 JSON 格式日志
    pub fn json_logging(mut self) -> Self {
        self.config.logging.json_format = true;
        self
    }

    /// 启用文件日志
    pub fn file_logging(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.logging.file_output = true;
        self.config.logging.log_dir = Some(log_dir.into());
        self
    }

    /// 启用 schema 严格模式
    pub fn strict_schema(mut self) -> Self {
        self.config.schema.strict = true;
        self
    }

    /// 启用开发模式
    pub fn dev_mode(mut self) -> Self {
        self.config.dev_mode = true;
        self
    }

    /// 构建配置
    pub fn build(self) -> GatewayConfig {
        self.config
    }
}
