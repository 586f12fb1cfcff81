//! Tool schema, the [`Tool`] trait tools implement, and the per-agent
//! [`ToolRegistry`] (§4.2).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::RunContext;
use crate::error::ToolError;

/// The logical JSON-Schema-style type tag for one [`ToolParameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    fn json_schema_name(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }
}

/// One parameter in a [`ToolSchema`].
#[derive(Debug, Clone)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    pub enum_values: Option<Vec<String>>,
    pub default: Option<Value>,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: false,
            enum_values: None,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_enum(mut self, values: Vec<String>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A tool's public, immutable-after-registration contract (§3).
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Vec<ToolParameter>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Renders to a JSON Schema object (`type: object`, `properties`,
    /// `required`), the shape a tool-calling-capable model consumes —
    /// used by [`crate::agent::function_agent::FunctionAgent`] when it
    /// hands tool definitions to the model.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut field = serde_json::Map::new();
            field.insert("type".to_string(), Value::String(param.param_type.json_schema_name().to_string()));
            field.insert("description".to_string(), Value::String(param.description.clone()));
            if let Some(values) = &param.enum_values {
                field.insert(
                    "enum".to_string(),
                    Value::Array(values.iter().cloned().map(Value::String).collect()),
                );
            }
            if let Some(default) = &param.default {
                field.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(field));
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": required,
        })
    }

    /// Renders the catalog-entry text the ReAct prompt protocol uses:
    /// name + description, one line per parameter with its
    /// name/type/required/description (§4.4).
    pub fn to_prompt_text(&self) -> String {
        let mut out = format!("{}: {}\n", self.name, self.description);
        for param in &self.parameters {
            out.push_str(&format!(
                "  - {} ({}{}): {}\n",
                param.name,
                param.param_type.json_schema_name(),
                if param.required { ", required" } else { ", optional" },
                param.description,
            ));
        }
        out
    }
}

/// A named capability with a typed schema and an execute operation.
/// Side effects are permitted; tool authors own their own argument
/// validation, resource limits, and safety (§6) — the registry only
/// guarantees the arguments map is well-formed.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> &ToolSchema;
    async fn execute(&self, ctx: &RunContext, args: HashMap<String, Value>) -> Result<Value, ToolError>;
}

/// Per-agent name→tool map enforcing the unique-name invariant (§4.2).
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with [`ToolError::InvalidRegistration`] if the name is
    /// empty or already registered. The tool's schema is read once here
    /// (via `tool.schema()`) and is treated as immutable thereafter —
    /// nothing in this crate calls `schema()` again after registration.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name();
        if name.is_empty() {
            return Err(ToolError::InvalidRegistration(
                "tool name must be non-empty".to_string(),
            ));
        }
        if self.tools.contains_key(name) {
            return Err(ToolError::InvalidRegistration(format!(
                "tool already registered: {name}"
            )));
        }
        tracing::debug!(tool = name, "registering tool");
        self.tools.insert(name.to_string(), tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    /// Tools ordered by name, for a deterministic catalog rendering (the
    /// ReAct prompt and any test asserting on catalog text should not
    /// depend on `HashMap` iteration order).
    pub fn sorted(&self) -> Vec<&Arc<dyn Tool>> {
        let mut tools: Vec<&Arc<dyn Tool>> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopTool {
        schema: ToolSchema,
    }

    #[async_trait]
    impl Tool for NoopTool {
        fn name(&self) -> &str {
            &self.schema.name
        }
        fn description(&self) -> &str {
            &self.schema.description
        }
        fn schema(&self) -> &ToolSchema {
            &self.schema
        }
        async fn execute(&self, _ctx: &RunContext, _args: HashMap<String, Value>) -> Result<Value, ToolError> {
            Ok(Value::String("ok".to_string()))
        }
    }

    fn tool(name: &str) -> Arc<dyn Tool> {
        Arc::new(NoopTool {
            schema: ToolSchema::new(name, "does nothing", vec![]),
        })
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a")).unwrap();
        let err = registry.register(tool("a")).unwrap_err();
        assert!(matches!(err, ToolError::InvalidRegistration(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_rejects_empty_name() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(tool("")).unwrap_err();
        assert!(matches!(err, ToolError::InvalidRegistration(_)));
    }

    #[test]
    fn schema_to_json_schema_lists_required_fields() {
        let schema = ToolSchema::new(
            "add",
            "add two numbers",
            vec![
                ToolParameter::new("a", ParamType::Number, "first").required(),
                ToolParameter::new("b", ParamType::Number, "second").required(),
            ],
        );
        let json = schema.to_json_schema();
        assert_eq!(json["required"], serde_json::json!(["a", "b"]));
        assert_eq!(json["properties"]["a"]["type"], "number");
    }
}
