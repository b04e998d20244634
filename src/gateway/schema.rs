//! Schema 注册表
//!
//! 声明式描述请求参数、请求体和响应的形状，并对 JSON 值做校验。
//! 校验是纯函数：无副作用、结果确定、从不 panic，总是返回 `Valid` 或 `Invalid`。
//! 校验通过后再用 serde 解析为强类型结构体。

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::utils::{GatewayError, Result};

// ============================================================================
// Schema 定义
// ============================================================================

/// 值的形状
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// 字符串，长度（按字符计）不少于 `min_length`
    String {
        /// 最小长度
        min_length: usize,
    },
    /// 数字
    Number,
    /// 布尔
    Bool,
    /// 具名字段的对象
    Object(ObjectSchema),
    /// 元素形状一致的数组
    Array(Box<Schema>),
    /// 字符串键到统一形状值的映射
    Record(Box<Schema>),
    /// 任意值（包括 null）
    Unknown,
}

impl Schema {
    /// 任意字符串
    pub fn string() -> Self {
        Schema::String { min_length: 0 }
    }

    /// 非空字符串
    pub fn non_empty_string() -> Self {
        Schema::String { min_length: 1 }
    }

    /// 数组
    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    /// 映射
    pub fn record(values: Schema) -> Self {
        Schema::Record(Box::new(values))
    }

    /// 期望的 JSON 类型名
    pub fn kind_name(&self) -> &'static str {
        match self {
            Schema::String { .. } => "string",
            Schema::Number => "number",
            Schema::Bool => "boolean",
            Schema::Object(_) | Schema::Record(_) => "object",
            Schema::Array(_) => "array",
            Schema::Unknown => "unknown",
        }
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        Schema::Object(object)
    }
}

/// 对象字段
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// 字段名
    pub name: String,
    /// 字段形状
    pub schema: Schema,
    /// 是否必填
    pub required: bool,
}

/// 对象形状，字段按声明顺序校验
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    fields: Vec<FieldSchema>,
}

impl ObjectSchema {
    /// 空对象
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加必填字段
    pub fn required(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            schema,
            required: true,
        });
        self
    }

    /// 添加可选字段
    pub fn optional(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            schema,
            required: false,
        });
        self
    }

    /// 已声明的字段
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// 查找字段
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// 是否所有字段都可选（此时缺省整个值等价于空对象）
    pub fn all_optional(&self) -> bool {
        self.fields.iter().all(|f| !f.required)
    }
}

// ============================================================================
// 校验结果
// ============================================================================

/// 校验错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorCode {
    /// 必填字段缺失
    Missing,
    /// 类型不符
    WrongType,
    /// 严格模式下出现未声明的字段
    UnknownField,
    /// 字符串过短
    TooShort,
    /// 原始输入无法解码（JSON 或百分号编码无效）
    Malformed,
    /// 类型正确但取值与期望不一致（如结果中的动作名与请求不符）
    Mismatch,
}

impl std::fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationErrorCode::Missing => write!(f, "missing"),
            ValidationErrorCode::WrongType => write!(f, "wrong_type"),
            ValidationErrorCode::UnknownField => write!(f, "unknown_field"),
            ValidationErrorCode::TooShort => write!(f, "too_short"),
            ValidationErrorCode::Malformed => write!(f, "malformed"),
            ValidationErrorCode::Mismatch => write!(f, "mismatch"),
        }
    }
}

/// 字段级校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// 出错字段路径，如 `body.payload`
    pub path: String,
    /// 错误码
    pub code: ValidationErrorCode,
    /// 错误描述
    pub message: String,
}

impl ValidationError {
    /// 创建新的校验错误
    pub fn new(path: impl Into<String>, code: ValidationErrorCode, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message)
    }
}

/// 一次校验的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// 通过
    Valid,
    /// 未通过，每个失败字段一条
    Invalid(Vec<ValidationError>),
}

impl ValidationOutcome {
    /// 是否通过
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    /// 错误列表（通过时为空）
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ValidationOutcome::Valid => &[],
            ValidationOutcome::Invalid(errors) => errors,
        }
    }

    fn from_errors(errors: Vec<ValidationError>) -> Self {
        if errors.is_empty() {
            ValidationOutcome::Valid
        } else {
            ValidationOutcome::Invalid(errors)
        }
    }
}

// ============================================================================
// 校验
// ============================================================================

/// 按 schema 校验 JSON 值
///
/// `root` 是错误路径的前缀（如 `params`、`body`），`strict` 控制是否报告未声明字段。
/// 收集所有失败字段；容器类型不符时不再深入。
pub fn validate(schema: &Schema, value: &Value, root: &str, strict: bool) -> ValidationOutcome {
    let mut errors = Vec::new();
    check(schema, value, root, strict, &mut errors);
    ValidationOutcome::from_errors(errors)
}

fn check(schema: &Schema, value: &Value, path: &str, strict: bool, errors: &mut Vec<ValidationError>) {
    match (schema, value) {
        (Schema::Unknown, _) => {}
        (Schema::String { min_length }, Value::String(s)) => {
            if s.chars().count() < *min_length {
                errors.push(ValidationError::new(
                    path,
                    ValidationErrorCode::TooShort,
                    format!("长度至少为 {}", min_length),
                ));
            }
        }
        (Schema::Number, Value::Number(_)) | (Schema::Bool, Value::Bool(_)) => {}
        (Schema::Object(object), Value::Object(map)) => {
            for field in object.fields() {
                let field_path = join_path(path, &field.name);
                match map.get(&field.name) {
                    Some(v) => check(&field.schema, v, &field_path, strict, errors),
                    None if field.required => errors.push(ValidationError::new(
                        field_path,
                        ValidationErrorCode::Missing,
                        "缺少必填字段",
                    )),
                    None => {}
                }
            }
            if strict {
                for key in map.keys().filter(|k| object.field(k).is_none()) {
                    errors.push(ValidationError::new(
                        join_path(path, key),
                        ValidationErrorCode::UnknownField,
                        "未声明的字段",
                    ));
                }
            }
        }
        (Schema::Record(values), Value::Object(map)) => {
            for (key, v) in map {
                check(values, v, &join_path(path, key), strict, errors);
            }
        }
        (Schema::Array(items), Value::Array(list)) => {
            for (i, v) in list.iter().enumerate() {
                check(items, v, &format!("{}[{}]", path, i), strict, errors);
            }
        }
        (expected, actual) => errors.push(ValidationError::new(
            path,
            ValidationErrorCode::WrongType,
            format!("期望 {}，实际为 {}", expected.kind_name(), json_kind(actual)),
        )),
    }
}

fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}

/// JSON 值的类型名
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// 注册表
// ============================================================================

/// Schema 注册表
///
/// 启动时填充，之后只读。持有全局的严格模式开关。
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
    strict: bool,
}

impl SchemaRegistry {
    /// 创建空注册表
    pub fn new(strict: bool) -> Self {
        Self {
            schemas: HashMap::new(),
            strict,
        }
    }

    /// 是否为严格模式
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// 注册具名 schema
    pub fn register(&mut self, name: impl Into<String>, schema: Schema) -> Result<Arc<Schema>> {
        let name = name.into();
        if self.schemas.contains_key(&name) {
            return Err(GatewayError::InitFailed(format!("schema 已注册: '{}'", name)));
        }
        let schema = Arc::new(schema);
        self.schemas.insert(name, Arc::clone(&schema));
        Ok(schema)
    }

    /// 按名称获取
    pub fn get(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(name).cloned()
    }

    /// 已注册的名称（排序后）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.keys().cloned().collect();
        names.sort();
        names
    }

    /// 按注册表的严格模式校验
    pub fn validate(&self, schema: &Schema, value: &Value, root: &str) -> ValidationOutcome {
        validate(schema, value, root, self.strict)
    }

    /// 按名称校验
    pub fn validate_named(&self, name: &str, value: &Value, root: &str) -> Result<ValidationOutcome> {
        let schema = self
            .get(name)
            .ok_or_else(|| GatewayError::Internal(format!("schema 未注册: '{}'", name)))?;
        Ok(self.validate(&schema, value, root))
    }

    /// 校验后解析为强类型
    pub fn parse<T: DeserializeOwned>(
        &self,
        schema: &Schema,
        value: Value,
        root: &str,
    ) -> std::result::Result<T, Vec<ValidationError>> {
        if let ValidationOutcome::Invalid(errors) = self.validate(schema, &value, root) {
            return Err(errors);
        }
        serde_json::from_value(value).map_err(|e| {
            vec![ValidationError::new(root, ValidationErrorCode::Malformed, e.to_string())]
        })
    }
}
