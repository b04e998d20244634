//! # 端到端集成测试
//!
//! 在真实套接字上启动网关，通过 HTTP 客户端验证：
//! - 启动 → 请求 → 响应 → 优雅关闭
//! - 状态码与 JSON 响应体
//! - 绑定失败

use std::net::SocketAddr;
use std::sync::Arc;

use lambda_gateway::gateway::DispatcherStatsSnapshot;
use lambda_gateway::{Gateway, GatewayConfig, GatewayError, RegistryResolver};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// ============================================================================
// 测试辅助
// ============================================================================

struct RunningGateway {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<lambda_gateway::Result<DispatcherStatsSnapshot>>,
}

impl RunningGateway {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) -> DispatcherStatsSnapshot {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap().unwrap()
    }
}

fn test_config() -> GatewayConfig {
    GatewayConfig::builder()
        .host("127.0.0.1")
        .port(0)
        .shutdown_grace_ms(1000)
        .build()
}

async fn start(gateway: Gateway) -> RunningGateway {
    let bound = gateway.into_server().bind().await.unwrap();
    let addr = bound.local_addr();
    let (shutdown, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(bound.serve(async move {
        let _ = rx.await;
    }));

    RunningGateway {
        addr,
        shutdown,
        handle,
    }
}

async fn start_echo() -> RunningGateway {
    start(Gateway::from_config(&test_config()).unwrap()).await
}

// ============================================================================
// 请求流程
// ============================================================================

/// 测试 GET 请求
#[tokio::test]
async fn test_e2e_get_lambda() {
    let gateway = start_echo().await;
    let client = reqwest::Client::new();

    let response = client.get(gateway.url("/run/foo")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json")));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(
        body["message"],
        json!("Lambda \"foo\" was called successfully (GET)")
    );
    assert_eq!(body["lambda"], json!("foo"));
    assert!(body["timestamp"].is_string());

    gateway.stop().await;
}

/// 测试 POST 请求携带负载
#[tokio::test]
async fn test_e2e_post_lambda() {
    let gateway = start_echo().await;
    let client = reqwest::Client::new();

    let response = client
        .post(gateway.url("/run/bar"))
        .json(&json!({"payload": {"x": 1}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        json!("Lambda \"bar\" was called successfully (POST)")
    );
    assert_eq!(body["lambda"], json!("bar"));

    gateway.stop().await;
}

/// 测试 POST 空请求体
#[tokio::test]
async fn test_e2e_post_without_body() {
    let gateway = start_echo().await;

    let response = reqwest::Client::new()
        .post(gateway.url("/run/bar"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    gateway.stop().await;
}

/// 测试百分号编码的动作名
#[tokio::test]
async fn test_e2e_percent_encoded_name() {
    let gateway = start_echo().await;

    let body: Value = reqwest::get(gateway.url("/run/hello%20world?trace=1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["lambda"], json!("hello world"));

    gateway.stop().await;
}

// ============================================================================
// 错误场景
// ============================================================================

/// 测试请求体校验失败
#[tokio::test]
async fn test_e2e_invalid_payload() {
    let gateway = start_echo().await;

    let response = reqwest::Client::new()
        .post(gateway.url("/run/bar"))
        .json(&json!({"payload": "not-an-object"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["details"][0]["path"], json!("body.payload"));

    gateway.stop().await;
}

/// 测试未命中路由
#[tokio::test]
async fn test_e2e_not_found() {
    let gateway = start_echo().await;
    let client = reqwest::Client::new();

    for path in ["/unknown/path", "/run/", "/"] {
        let response = client.get(gateway.url(path)).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 404, "path {}", path);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], json!("GATEWAY-001"));
    }

    let response = client.delete(gateway.url("/run/foo")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    gateway.stop().await;
}

/// 测试注册表解析器未找到动作
#[tokio::test]
async fn test_e2e_action_not_found() {
    let gateway = Gateway::with_resolver(&test_config(), Arc::new(RegistryResolver::new())).unwrap();
    let gateway = start(gateway).await;

    let response = reqwest::get(gateway.url("/run/foo")).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], json!("GATEWAY-003"));

    gateway.stop().await;
}

// ============================================================================
// 生命周期
// ============================================================================

/// 测试关闭后返回统计
#[tokio::test]
async fn test_e2e_shutdown_reports_stats() {
    let gateway = start_echo().await;
    let client = reqwest::Client::new();

    client.get(gateway.url("/run/a")).send().await.unwrap();
    client.get(gateway.url("/run/b")).send().await.unwrap();
    client.get(gateway.url("/nowhere")).send().await.unwrap();

    let stats = gateway.stop().await;
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.successful_requests, 2);
    assert_eq!(stats.not_found_requests, 1);
}

/// 测试端口被占用时绑定失败
#[tokio::test]
async fn test_e2e_bind_conflict() {
    let gateway = start_echo().await;

    let config = GatewayConfig::builder()
        .host("127.0.0.1")
        .port(gateway.addr.port())
        .build();
    let result = Gateway::from_config(&config).unwrap().into_server().bind().await;

    match result {
        Err(GatewayError::StartupFailed { addr, .. }) => {
            assert_eq!(addr.port(), gateway.addr.port());
        }
        _ => panic!("expected StartupFailed"),
    }

    gateway.stop().await;
}
