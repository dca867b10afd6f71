//! 工具参数 schema：由 schemars 从参数类型生成声明，校验是纯函数
//!
//! 声明给模型的 JSON Schema 与校验所用的类型是同一个结构体，二者不会漂移。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::ToolValidationError;

/// 工具参数类型：反序列化即结构校验，check 负责取值约束
pub trait ToolArgs: DeserializeOwned + Serialize + JsonSchema {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// 已通过校验（并补齐默认值）的参数
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedArgs(Value);

impl ValidatedArgs {
    pub fn from_typed<A: Serialize>(args: &A) -> Result<Self, String> {
        serde_json::to_value(args).map(Self).map_err(|e| e.to_string())
    }

    /// 不做类型约束的工具直接接受对象载荷
    pub fn from_object(payload: &Value) -> Result<Self, String> {
        if payload.is_object() {
            Ok(Self(payload.clone()))
        } else {
            Err(format!("expected a JSON object, got {}", payload))
        }
    }

    pub fn into_typed<A: DeserializeOwned>(self) -> Result<A, String> {
        serde_json::from_value(self.0).map_err(|e| e.to_string())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// 生成参数类型的 JSON Schema（去掉 $schema / title 等模型用不到的元字段）
pub fn parameters_schema<A: JsonSchema>() -> Value {
    let schema = schema_for!(A);
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| {
        serde_json::json!({ "type": "object", "properties": {} })
    });
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

/// (schema, payload) -> 类型化参数
pub fn validate<A: ToolArgs>(tool: &str, payload: &Value) -> Result<A, ToolValidationError> {
    if !payload.is_object() {
        return Err(ToolValidationError::Malformed {
            tool: tool.to_string(),
            reason: format!("expected a JSON object, got {}", payload),
        });
    }
    let args: A = serde_json::from_value(payload.clone()).map_err(|e| {
        ToolValidationError::Malformed {
            tool: tool.to_string(),
            reason: e.to_string(),
        }
    })?;
    args.check().map_err(|reason| ToolValidationError::Constraint {
        tool: tool.to_string(),
        reason,
    })?;
    Ok(args)
}
