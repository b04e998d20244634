//! 动作解析器
//!
//! 把路径中的动作名解析为可调用单元。这是接入真实执行器的唯一接缝：
//! 替换解析器实现不需要改动路由表、schema 或分发器。
//!
//! - `EchoResolver`：占位实现，任何非空动作名都解析成功，调用总是返回成功
//! - `RegistryResolver`：按名称注册处理器，未注册的动作返回 `ActionNotFound`

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::request::{ActionRequest, ActionResult};
use crate::utils::{Clock, GatewayError, Result, SystemClock};

/// 可调用的动作
///
/// 调用可能挂起（例如等待远端执行），分发器在此处让出，不阻塞其他并发请求。
/// 传输层断开时调用的 future 会被丢弃；有副作用的实现需自行定义取消语义。
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// 执行动作。动作自身的失败通过 `ActionResult::success = false` 表达
    async fn invoke(&self, request: ActionRequest) -> ActionResult;
}

/// 动作解析器
#[async_trait]
pub trait ActionResolver: Send + Sync {
    /// 将动作名解析为处理器
    ///
    /// # Errors
    ///
    /// 找不到动作时返回 `GatewayError::ActionNotFound`
    async fn resolve(&self, action_name: &str) -> Result<Arc<dyn ActionHandler>>;
}

// ============================================================================
// EchoResolver
// ============================================================================

/// 确认调用的占位处理器
pub struct EchoHandler {
    clock: Arc<dyn Clock>,
}

impl EchoHandler {
    /// 使用指定时钟创建
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl ActionHandler for EchoHandler {
    async fn invoke(&self, request: ActionRequest) -> ActionResult {
        let message = format!(
            "Lambda \"{}\" was called successfully ({})",
            request.action_name, request.method
        );
        ActionResult::success(&request, message, &self.clock.now())
    }
}

/// 占位解析器：不做任何实际计算
pub struct EchoResolver {
    handler: Arc<dyn ActionHandler>,
}

impl EchoResolver {
    /// 使用系统时钟创建
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// 使用指定时钟创建
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            handler: Arc::new(EchoHandler::new(clock)),
        }
    }
}

impl Default for EchoResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionResolver for EchoResolver {
    async fn resolve(&self, action_name: &str) -> Result<Arc<dyn ActionHandler>> {
        if action_name.is_empty() {
            return Err(GatewayError::ActionNotFound(String::new()));
        }
        Ok(Arc::clone(&self.handler))
    }
}

// ============================================================================
// RegistryResolver
// ============================================================================

/// 按名称注册处理器的解析器
///
/// 启动时填充，之后只读。
#[derive(Default)]
pub struct RegistryResolver {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl RegistryResolver {
    /// 创建空解析器
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器，重复名称返回 `ActionAlreadyRegistered`
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Result<()> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(GatewayError::ActionAlreadyRegistered(name));
        }
        debug!(action = %name, "注册动作");
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// 链式注册
    pub fn with_handler(mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Result<Self> {
        self.register(name, handler)?;
        Ok(self)
    }

    /// 已注册的动作名（排序后）
    pub fn actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ActionResolver for RegistryResolver {
    async fn resolve(&self, action_name: &str) -> Result<Arc<dyn ActionHandler>> {
        self.handlers
            .get(action_name)
            .cloned()
            .ok_or_else(|| GatewayError::ActionNotFound(action_name.to_string()))
    }
}
