//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / validate / execute），
//! 由 ToolSet 按名注册与查找；ToolSet 只构建一次，以引用传入执行器，没有全局注册表。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::ToolValidationError;
use crate::tools::schema::ValidatedArgs;

/// 暴露给模型的工具声明
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具 trait：名称、描述（供模型选择）、参数 schema、校验与异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认接受任意对象
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行前的参数校验，不产生副作用
    fn validate(&self, args: &Value) -> Result<ValidatedArgs, ToolValidationError> {
        ValidatedArgs::from_object(args).map_err(|reason| ToolValidationError::Malformed {
            tool: self.name().to_string(),
            reason,
        })
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<String, String>;
}

/// 工具集合：保持注册顺序，声明列表因此是确定的
#[derive(Default, Clone)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具会被替换
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&i) => self.tools[i] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools
            .iter()
            .map(|t| ToolDeclaration {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedTool(&'static str, &'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            self.1
        }

        async fn execute(&self, _args: ValidatedArgs) -> Result<String, String> {
            Ok(self.1.to_string())
        }
    }

    #[test]
    fn test_registration_order_and_replace() {
        let set = ToolSet::new()
            .with(NamedTool("b", "first b"))
            .with(NamedTool("a", "a"))
            .with(NamedTool("b", "second b"));
        assert_eq!(set.tool_names(), vec!["b", "a"]);
        assert_eq!(set.len(), 2);
        let decls = set.declarations();
        assert_eq!(decls[0].description, "second b");
        assert!(set.get("c").is_none());
    }

    #[test]
    fn test_default_validate_requires_object() {
        let tool = NamedTool("t", "d");
        assert!(tool.validate(&serde_json::json!({"k": 1})).is_ok());
        assert!(tool.validate(&serde_json::json!([1, 2])).is_err());
    }
}
