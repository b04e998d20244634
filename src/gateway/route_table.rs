//! 路由表
//!
//! 将 HTTP 方法 + 路径模式映射到路由声明（参数/请求体/响应 schema 与目标动作参数）。
//! 路由表在启动时填充，之后以 `Arc` 共享、只读，请求路径上不加锁。

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use super::schema::Schema;
use crate::utils::{GatewayError, Result};

/// 路径参数名：字母或下划线开头，之后为字母、数字、下划线
static PARAM_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid param name regex"));

// ============================================================================
// HTTP 方法
// ============================================================================

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// 不区分大小写解析，未知方法返回 `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "PATCH" => Some(Method::Patch),
            "DELETE" => Some(Method::Delete),
            "HEAD" => Some(Method::Head),
            "OPTIONS" => Some(Method::Options),
            _ => None,
        }
    }

    /// 大写方法名
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// 路径模式
// ============================================================================

/// 路径段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// 字面量，必须完全相等
    Literal(String),
    /// 具名参数，绑定一个非空段
    Param(String),
}

/// 路径模式，例如 `/run/:lambda_name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// 解析路径模式
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| GatewayError::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let rest = pattern.strip_prefix('/').ok_or_else(|| invalid("必须以 '/' 开头"))?;
        let mut segments = Vec::new();
        let mut names = HashSet::new();

        if !rest.is_empty() {
            for part in rest.split('/') {
                if part.is_empty() {
                    return Err(invalid("不允许空路径段"));
                }
                match part.strip_prefix(':') {
                    Some(name) => {
                        if !PARAM_NAME_REGEX.is_match(name) {
                            return Err(invalid(&format!("参数名无效: '{}'", name)));
                        }
                        if !names.insert(name) {
                            return Err(invalid(&format!("参数名重复: '{}'", name)));
                        }
                        segments.push(Segment::Param(name.to_string()));
                    }
                    None => segments.push(Segment::Literal(part.to_string())),
                }
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// 原始模式字符串
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 路径段
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// 参数段数量，越少越具体
    pub fn param_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Param(_)))
            .count()
    }

    /// 是否声明了指定参数
    pub fn has_param(&self, name: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Param(p) if p == name))
    }

    /// 忽略参数名的形状，用于判重：`/run/:a` 与 `/run/:b` 形状相同
    fn shape(&self) -> Vec<Option<&str>> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => Some(l.as_str()),
                Segment::Param(_) => None,
            })
            .collect()
    }

    /// 匹配已切分的路径段，成功时返回绑定的原始（未解码）参数值
    pub fn match_segments(&self, path: &[&str]) -> Option<PathParams> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(expected) if expected == actual => {}
                Segment::Param(name) if !actual.is_empty() => {
                    params.values.push((name.clone(), (*actual).to_string()));
                }
                _ => return None,
            }
        }
        Some(params)
    }
}

/// 切分请求路径：去掉查询串和前导 `/`
pub fn split_path(path: &str) -> Vec<&str> {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

/// 绑定的路径参数（按模式中的顺序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    values: Vec<(String, String)>,
}

impl PathParams {
    /// 按名称取原始值
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// 遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// 路由
// ============================================================================

/// 路由声明
///
/// `action_param` 指定哪个路径参数携带要调用的动作名。
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub params_schema: Arc<Schema>,
    pub body_schema: Option<Arc<Schema>>,
    pub response_schema: Arc<Schema>,
    pub action_param: String,
}

impl Route {
    /// 创建路由
    ///
    /// # Errors
    ///
    /// 模式无效或 `action_param` 不是模式中的参数时返回 `InvalidRoutePattern`
    pub fn new(
        method: Method,
        pattern: &str,
        action_param: impl Into<String>,
        params_schema: Arc<Schema>,
        response_schema: Arc<Schema>,
    ) -> Result<Self> {
        let pattern = PathPattern::parse(pattern)?;
        let action_param = action_param.into();
        if !pattern.has_param(&action_param) {
            return Err(GatewayError::InvalidRoutePattern {
                pattern: pattern.as_str().to_string(),
                reason: format!("缺少动作参数 ':{}'", action_param),
            });
        }

        Ok(Self {
            method,
            pattern,
            params_schema,
            body_schema: None,
            response_schema,
            action_param,
        })
    }

    /// 声明请求体 schema
    pub fn with_body(mut self, schema: Arc<Schema>) -> Self {
        self.body_schema = Some(schema);
        self
    }

    /// 摘要
    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            method: self.method,
            pattern: self.pattern.as_str().to_string(),
            has_body: self.body_schema.is_some(),
        }
    }
}

/// 路由摘要（用于日志和 `routes` 命令）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub method: Method,
    pub pattern: String,
    pub has_body: bool,
}

/// 一次匹配的结果
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: PathParams,
}

// ============================================================================
// 路由表
// ============================================================================

/// 路由表
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// 创建空路由表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册路由，`(method, pattern)` 形状重复时返回 `RouteAlreadyExists`
    pub fn register(&mut self, route: Route) -> Result<()> {
        let shape = route.pattern.shape();
        let duplicate = self
            .routes
            .iter()
            .any(|r| r.method == route.method && r.pattern.shape() == shape);
        if duplicate {
            return Err(GatewayError::RouteAlreadyExists {
                method: route.method.to_string(),
                pattern: route.pattern.as_str().to_string(),
            });
        }

        self.routes.push(route);
        Ok(())
    }

    /// 查找路由
    ///
    /// 方法必须完全一致。多条模式同时命中时取参数段最少的；同样具体时按注册顺序。
    /// 未命中返回 `None`，这是正常结果而非错误。
    pub fn find(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        let segments = split_path(path);
        self.routes
            .iter()
            .filter(|r| r.method == method)
            .filter_map(|r| r.pattern.match_segments(&segments).map(|p| (r, p)))
            .min_by_key(|(r, _)| r.pattern.param_count())
            .map(|(route, params)| RouteMatch { route, params })
    }

    /// 所有路由摘要（按注册顺序）
    pub fn list(&self) -> Vec<RouteSummary> {
        self.routes.iter().map(Route::summary).collect()
    }

    /// 路由数量
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
