//! 工具模块
//!
//! 包含错误类型、请求 ID、时钟和日志系统等通用工具。

pub mod clock;
pub mod error;
pub mod id;
pub mod logger;

// 重导出常用类型
pub use clock::{format_timestamp, parse_timestamp, Clock, ManualClock, SystemClock};
pub use error::{error_code, status_code, GatewayError, Result};
pub use id::{generate_request_id, is_valid_request_id};
pub use logger::{LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};
