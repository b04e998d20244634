//! 服务启动
//!
//! HTTP 传输使用 axum。所有请求经由同一个 fallback 处理器转交给分发器，
//! 路由匹配完全由网关自己的路由表完成。
//!
//! 生命周期：`Gateway::from_config` → `GatewayServer::bind` → `BoundServer::serve`。
//! 绑定失败是唯一的进程级致命错误。

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method as HttpMethod, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, instrument, warn};

use super::dispatcher::{Dispatcher, DispatcherStatsSnapshot};
use super::lambda::build_dispatcher;
use super::resolver::{ActionResolver, EchoResolver};
use crate::core::GatewayConfig;
use crate::utils::{GatewayError, Result};

// ============================================================================
// 网关装配
// ============================================================================

/// 装配好的网关：配置 + 分发器
pub struct Gateway {
    config: GatewayConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Gateway {
    /// 使用默认 lambda 路由和占位解析器装配
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Self::with_resolver(config, Arc::new(EchoResolver::new()))
    }

    /// 使用指定解析器装配
    pub fn with_resolver(config: &GatewayConfig, resolver: Arc<dyn ActionResolver>) -> Result<Self> {
        let dispatcher = build_dispatcher(&config.schema, resolver)?;
        Ok(Self {
            config: config.clone(),
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// 配置
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// 分发器
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// 转为服务器
    pub fn into_server(self) -> GatewayServer {
        GatewayServer::new(self.config, self.dispatcher)
    }
}

// ============================================================================
// 服务器
// ============================================================================

/// 未绑定的服务器
pub struct GatewayServer {
    config: GatewayConfig,
    dispatcher: Arc<Dispatcher>,
}

impl GatewayServer {
    /// 创建服务器
    pub fn new(config: GatewayConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// 绑定监听地址
    ///
    /// # Errors
    ///
    /// 地址无效时返回 `InvalidConfigValue`，绑定失败（端口占用、权限不足）时返回 `StartupFailed`
    #[instrument(skip(self), fields(host = %self.config.server.host, port = self.config.server.port))]
    pub async fn bind(self) -> Result<BoundServer> {
        let addr = self.config.socket_addr().await?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::StartupFailed { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| GatewayError::StartupFailed { addr, source })?;

        info!(addr = %local_addr, "监听已绑定");

        Ok(BoundServer {
            listener,
            local_addr,
            dispatcher: self.dispatcher,
            shutdown_grace: Duration::from_millis(self.config.server.shutdown_grace_ms),
        })
    }
}

/// 已绑定监听地址的服务器
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    shutdown_grace: Duration,
}

impl BoundServer {
    /// 实际监听地址（端口为 0 时由系统分配）
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 服务请求，直到 `shutdown` 完成
    ///
    /// 关闭信号到达后停止接受新连接，并在宽限期内等待进行中的请求完成。
    /// 返回关闭时的统计快照。
    pub async fn serve<F>(self, shutdown: F) -> Result<DispatcherStatsSnapshot>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(Arc::clone(&self.dispatcher));
        let shutdown_started = Arc::new(Notify::new());
        let notifier = Arc::clone(&shutdown_started);

        info!(addr = %self.local_addr, "网关开始服务");

        let listener = self.listener;
        let server = async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown.await;
                    info!("收到关闭信号，等待进行中的请求完成");
                    notifier.notify_one();
                })
                .await
        };

        let grace = self.shutdown_grace;
        tokio::select! {
            result = server => result?,
            _ = async {
                shutdown_started.notified().await;
                tokio::time::sleep(grace).await;
            } => {
                warn!(grace_ms = grace.as_millis() as u64, "优雅关闭超时，放弃进行中的请求");
            }
        }

        let stats = self.dispatcher.stats();
        info!(
            total = stats.total_requests,
            ok = stats.successful_requests,
            not_found = stats.not_found_requests,
            client_errors = stats.client_errors,
            server_errors = stats.server_errors,
            avg_latency_us = stats.avg_latency_us,
            "网关已关闭"
        );
        Ok(stats)
    }
}

/// 构建 axum 路由：单一 fallback 处理器
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new().fallback(dispatch).with_state(dispatcher)
}

async fn dispatch(
    State(dispatcher): State<Arc<Dispatcher>>,
    method: HttpMethod,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or_else(|| uri.path());
    let response = dispatcher.handle(method.as_str(), path, &body).await;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}
