//! 分发器集成测试
//!
//! 覆盖 `/run/:lambda_name` 的完整请求流程：路由匹配 → 参数/请求体校验 →
//! 动作调用 → 响应契约校验 → 序列化。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use lambda_gateway::gateway::build_dispatcher;
use lambda_gateway::gateway::lambda::{params_schema, response_schema};
use lambda_gateway::utils::{parse_timestamp, ManualClock};
use lambda_gateway::{
    ActionHandler, ActionRequest, ActionResult, Dispatcher, EchoResolver, Method, ObjectSchema,
    RegistryResolver, Route, RouteTable, Schema, SchemaConfig, SchemaRegistry,
};
use serde_json::{json, Value};

// ============================================================================
// 测试辅助
// ============================================================================

fn echo_dispatcher() -> Dispatcher {
    build_dispatcher(&SchemaConfig::default(), Arc::new(EchoResolver::new())).unwrap()
}

fn registry_dispatcher(resolver: RegistryResolver) -> Dispatcher {
    build_dispatcher(&SchemaConfig::default(), Arc::new(resolver)).unwrap()
}

/// 返回空时间戳，违反响应 schema
struct BrokenTimestampHandler;

#[async_trait]
impl ActionHandler for BrokenTimestampHandler {
    async fn invoke(&self, request: ActionRequest) -> ActionResult {
        let mut result = ActionResult::success(&request, "ok", &Utc::now());
        result.timestamp = String::new();
        result
    }
}

/// 批处理路由：负载为数字数组，另有可选标签
fn batch_dispatcher(resolver: RegistryResolver) -> Dispatcher {
    let mut registry = SchemaRegistry::new(false);
    let params = registry.register("batch.params", params_schema()).unwrap();
    let response = registry.register("batch.response", response_schema()).unwrap();
    let body = registry
        .register(
            "batch.body",
            ObjectSchema::new()
                .required("payload", Schema::array(Schema::Number))
                .optional("label", Schema::string())
                .into(),
        )
        .unwrap();

    let mut routes = RouteTable::new();
    routes
        .register(
            Route::new(Method::Post, "/batch/:lambda_name", "lambda_name", params, response)
                .unwrap()
                .with_body(body),
        )
        .unwrap();

    Dispatcher::new(Arc::new(routes), Arc::new(registry), Arc::new(resolver))
}

/// 汇总数组负载与标签
struct SumHandler;

#[async_trait]
impl ActionHandler for SumHandler {
    async fn invoke(&self, request: ActionRequest) -> ActionResult {
        let sum: f64 = request
            .payload
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_f64).sum())
            .unwrap_or_default();
        let label = request
            .body
            .as_ref()
            .and_then(|body| body.get("label"))
            .and_then(Value::as_str)
            .unwrap_or("-");
        ActionResult::success(&request, format!("sum={} label={}", sum, label), &Utc::now())
    }
}

/// 报告自身失败的动作
struct QuotaHandler;

#[async_trait]
impl ActionHandler for QuotaHandler {
    async fn invoke(&self, request: ActionRequest) -> ActionResult {
        ActionResult::failure(&request, "quota exceeded", &Utc::now())
    }
}

// ============================================================================
// 成功路径
// ============================================================================

#[tokio::test]
async fn test_get_run_foo() {
    let response = echo_dispatcher().handle("GET", "/run/foo", b"").await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["success"], json!(true));
    assert_eq!(
        response.body["message"],
        json!("Lambda \"foo\" was called successfully (GET)")
    );
    assert_eq!(response.body["lambda"], json!("foo"));

    let timestamp = response.body["timestamp"].as_str().unwrap();
    assert!(parse_timestamp(timestamp).is_some());
    assert!(timestamp.ends_with('Z'));
}

#[tokio::test]
async fn test_post_run_bar_with_payload() {
    let response = echo_dispatcher()
        .handle("POST", "/run/bar", br#"{"payload": {"x": 1}}"#)
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["success"], json!(true));
    assert_eq!(
        response.body["message"],
        json!("Lambda \"bar\" was called successfully (POST)")
    );
    assert_eq!(response.body["lambda"], json!("bar"));
}

#[tokio::test]
async fn test_post_without_payload_field() {
    let response = echo_dispatcher().handle("POST", "/run/bar", b"{}").await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_lambda_name_identity() {
    let dispatcher = echo_dispatcher();
    let names = ["foo", "a", "resize-image", "v1.2.3", "UPPER_case", "名字", "x~y"];

    for name in names {
        for method in ["GET", "POST"] {
            let path = format!("/run/{}", name);
            let response = dispatcher.handle(method, &path, b"").await;
            assert_eq!(response.status, 200, "{} {}", method, path);
            assert_eq!(response.body["lambda"], json!(name), "{} {}", method, path);
        }
    }
}

#[tokio::test]
async fn test_get_ignores_body() {
    let response = echo_dispatcher().handle("GET", "/run/foo", b"not json at all").await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_action_reported_failure_is_still_200() {
    let dispatcher = registry_dispatcher(
        RegistryResolver::new()
            .with_handler("quota", Arc::new(QuotaHandler))
            .unwrap(),
    );

    let response = dispatcher.handle("POST", "/run/quota", b"").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["success"], json!(false));
    assert_eq!(response.body["lambda"], json!("quota"));
}

// ============================================================================
// 时间戳与幂等性
// ============================================================================

#[tokio::test]
async fn test_timestamps_are_monotonic() {
    let dispatcher = echo_dispatcher();
    let mut previous = None;

    for _ in 0..50 {
        let response = dispatcher.handle("GET", "/run/tick", b"").await;
        let timestamp = parse_timestamp(response.body["timestamp"].as_str().unwrap()).unwrap();
        if let Some(previous) = previous {
            assert!(timestamp >= previous);
        }
        previous = Some(timestamp);
    }
}

#[tokio::test]
async fn test_repeated_get_is_idempotent() {
    let dispatcher = echo_dispatcher();
    let mut bodies = Vec::new();

    for _ in 0..5 {
        let mut response = dispatcher.handle("GET", "/run/foo", b"").await;
        assert_eq!(response.status, 200);
        response.body.as_object_mut().unwrap().remove("timestamp");
        bodies.push(response.body);
    }

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_manual_clock_timestamps() {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()));
    let dispatcher = build_dispatcher(
        &SchemaConfig::default(),
        Arc::new(EchoResolver::with_clock(clock.clone())),
    )
    .unwrap();

    let first = dispatcher.handle("GET", "/run/foo", b"").await;
    clock.advance(Duration::milliseconds(1500));
    let second = dispatcher.handle("GET", "/run/foo", b"").await;

    assert_eq!(first.body["timestamp"], json!("2024-05-01T12:00:00.000Z"));
    assert_eq!(second.body["timestamp"], json!("2024-05-01T12:00:01.500Z"));
}

// ============================================================================
// 客户端错误
// ============================================================================

#[tokio::test]
async fn test_payload_not_object_is_400() {
    let response = echo_dispatcher()
        .handle("POST", "/run/bar", br#"{"payload": "not-an-object"}"#)
        .await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body["error"]["code"], json!("GATEWAY-002"));

    let details = response.body["error"]["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["path"], json!("body.payload"));
    assert_eq!(details[0]["code"], json!("wrong_type"));
}

#[tokio::test]
async fn test_payload_null_is_400() {
    let response = echo_dispatcher()
        .handle("POST", "/run/bar", br#"{"payload": null}"#)
        .await;
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_strict_mode_unknown_field() {
    let dispatcher = build_dispatcher(
        &SchemaConfig { strict: true },
        Arc::new(EchoResolver::new()),
    )
    .unwrap();

    let response = dispatcher
        .handle("POST", "/run/bar", br#"{"payload": {}, "debug": true}"#)
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body["error"]["details"][0]["path"], json!("body.debug"));
    assert_eq!(response.body["error"]["details"][0]["code"], json!("unknown_field"));

    // payload 内部是任意值映射，不受严格模式影响
    let response = dispatcher
        .handle("POST", "/run/bar", br#"{"payload": {"anything": [1, 2]}}"#)
        .await;
    assert_eq!(response.status, 200);
}

// ============================================================================
// 未命中
// ============================================================================

#[tokio::test]
async fn test_unknown_path_is_404() {
    let response = echo_dispatcher().handle("GET", "/unknown/path", b"").await;
    assert_eq!(response.status, 404);
    assert_eq!(response.body["error"]["code"], json!("GATEWAY-001"));
}

#[tokio::test]
async fn test_missing_lambda_name_is_404() {
    let dispatcher = echo_dispatcher();
    for path in ["/run/", "/run", "/run/foo/extra", "/", ""] {
        let response = dispatcher.handle("GET", path, b"").await;
        assert_eq!(response.status, 404, "path {:?}", path);
    }
}

#[tokio::test]
async fn test_unrouted_method_is_404() {
    let dispatcher = echo_dispatcher();
    for method in ["PUT", "DELETE", "PATCH"] {
        let response = dispatcher.handle(method, "/run/foo", b"").await;
        assert_eq!(response.status, 404, "method {}", method);
    }
}

#[tokio::test]
async fn test_unregistered_action_is_404() {
    let dispatcher = registry_dispatcher(RegistryResolver::new());

    let response = dispatcher.handle("GET", "/run/foo", b"").await;
    assert_eq!(response.status, 404);
    assert_eq!(response.body["error"]["code"], json!("GATEWAY-003"));
}

// ============================================================================
// 服务端错误
// ============================================================================

#[tokio::test]
async fn test_response_contract_violation_is_500() {
    let dispatcher = registry_dispatcher(
        RegistryResolver::new()
            .with_handler("broken", Arc::new(BrokenTimestampHandler))
            .unwrap(),
    );

    let response = dispatcher.handle("GET", "/run/broken", b"").await;
    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"]["code"], json!("GATEWAY-004"));
    assert_eq!(
        response.body["error"]["details"][0]["path"],
        json!("response.timestamp")
    );
    assert!(response.body.get("success").is_none());
}

// ============================================================================
// 自定义请求体 schema
// ============================================================================

#[tokio::test]
async fn test_array_payload_route() {
    let resolver = RegistryResolver::new()
        .with_handler("sum", Arc::new(SumHandler))
        .unwrap();
    let dispatcher = batch_dispatcher(resolver);

    let response = dispatcher
        .handle("POST", "/batch/sum", br#"{"payload":[1,2]}"#)
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["lambda"], json!("sum"));
    assert_eq!(response.body["message"], json!("sum=3 label=-"));
}

#[tokio::test]
async fn test_declared_body_fields_reach_handler() {
    let resolver = RegistryResolver::new()
        .with_handler("sum", Arc::new(SumHandler))
        .unwrap();
    let dispatcher = batch_dispatcher(resolver);

    let response = dispatcher
        .handle(
            "POST",
            "/batch/sum",
            br#"{"payload":[0.5,1.5,2],"label":"nightly"}"#,
        )
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["message"], json!("sum=4 label=nightly"));
}

#[tokio::test]
async fn test_array_payload_route_rejects_bad_bodies() {
    let dispatcher = batch_dispatcher(
        RegistryResolver::new()
            .with_handler("sum", Arc::new(SumHandler))
            .unwrap(),
    );

    let missing = dispatcher.handle("POST", "/batch/sum", b"").await;
    assert_eq!(missing.status, 400);
    assert_eq!(missing.body["error"]["details"][0]["code"], json!("missing"));

    let wrong = dispatcher
        .handle("POST", "/batch/sum", br#"{"payload":[1,"two"]}"#)
        .await;
    assert_eq!(wrong.status, 400);
    assert_eq!(
        wrong.body["error"]["details"][0]["path"],
        json!("body.payload[1]")
    );
}

// ============================================================================
// 并发
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_are_independent() {
    let dispatcher = Arc::new(echo_dispatcher());

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                let path = format!("/run/job-{}", i);
                let response = dispatcher.handle("GET", &path, b"").await;
                (i, response)
            })
        })
        .collect();

    for task in tasks {
        let (i, response) = task.await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body["lambda"], json!(format!("job-{}", i)));
    }

    assert_eq!(dispatcher.stats().total_requests, 32);
    assert_eq!(dispatcher.stats().successful_requests, 32);
}
