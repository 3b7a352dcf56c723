//! Tool trait contract and closure-backed tools.
//!
//! ```rust
//! use ptooling::{FunctionTool, ParameterSchema, ParameterSpec, Tool, ToolKind, ToolOutcome};
//! use serde_json::json;
//!
//! let tool = FunctionTool::new(
//!     ToolKind::UpdateMemory,
//!     "Remember a fact about the user",
//!     ParameterSchema::new().with(ParameterSpec::string("text", "fact").max_chars(300)),
//!     |args, _ctx| async move { ToolOutcome::success(json!({ "echo": args["text"] })) },
//! );
//!
//! assert_eq!(tool.definition().name, "updateMemory");
//! ```

use std::future::Future;
use std::sync::Arc;

use pcommon::BoxFuture;
use pprovider::ToolDefinition;
use serde_json::{Map, Value};

use crate::{ParameterSchema, ToolExecutionContext, ToolKind, ToolOutcome};

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn description(&self) -> &str;

    fn schema(&self) -> &ParameterSchema;

    /// Runs with arguments already validated against [`Tool::schema`].
    fn execute<'a>(
        &'a self,
        args: Map<String, Value>,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, ToolOutcome>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.kind().wire_name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema().to_json_schema().to_string(),
        }
    }
}

type ToolHandler =
    dyn Fn(Map<String, Value>, ToolExecutionContext) -> ToolFuture<'static, ToolOutcome> + Send + Sync;

pub struct FunctionTool {
    kind: ToolKind,
    description: String,
    schema: ParameterSchema,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(
        kind: ToolKind,
        description: impl Into<String>,
        schema: ParameterSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(Map<String, Value>, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolOutcome> + Send + 'static,
    {
        let handler: Arc<ToolHandler> =
            Arc::new(move |args, context| Box::pin(handler(args, context)));

        Self {
            kind,
            description: description.into(),
            schema,
            handler,
        }
    }
}

impl Tool for FunctionTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn execute<'a>(
        &'a self,
        args: Map<String, Value>,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, ToolOutcome> {
        (self.handler)(args, context.clone())
    }
}
