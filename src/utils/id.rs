//! 请求 ID 生成

/// 生成 UUID v4 格式的请求 ID
///
/// 每个入站请求分配一个，贯穿日志 span 和 `ActionRequest`。
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 检查字符串是否为合法的请求 ID
pub fn is_valid_request_id(id: &str) -> bool {
    uuid::Uuid::parse_str(id).is_ok()
}
