//! Tool registry keyed by [`ToolKind`].

use std::future::Future;
use std::sync::Arc;

use pcommon::Registry;
use pprovider::ToolDefinition;
use serde_json::{Map, Value};

use crate::{
    FunctionTool, ParameterSchema, Tool, ToolError, ToolExecutionContext, ToolKind, ToolOutcome,
};

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Registry<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `tool` under its kind, replacing any previous tool of that kind.
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.kind(), Arc::new(tool));
    }

    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    pub fn register_fn<F, Fut>(
        &mut self,
        kind: ToolKind,
        description: impl Into<String>,
        schema: ParameterSchema,
        handler: F,
    ) where
        F: Fn(Map<String, Value>, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolOutcome> + Send + 'static,
    {
        self.register(FunctionTool::new(kind, description, schema, handler));
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ToolKind) -> bool {
        self.tools.contains_key(&kind)
    }

    pub fn remove(&mut self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.remove(&kind)
    }

    /// Definitions for every registered tool, in [`ToolKind::ALL`] order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.list_active(&ToolKind::ALL)
    }

    /// Definitions for the enabled subset, in [`ToolKind::ALL`] order.
    pub fn list_active(&self, enabled: &[ToolKind]) -> Vec<ToolDefinition> {
        ToolKind::ALL
            .into_iter()
            .filter(|kind| enabled.contains(kind))
            .filter_map(|kind| self.tools.get(&kind))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Resolves `name`, validates `raw_args` against the tool schema, then runs it.
    pub async fn invoke(
        &self,
        name: &str,
        raw_args: &str,
        context: &ToolExecutionContext,
    ) -> Result<ToolOutcome, ToolError> {
        let kind: ToolKind = name.parse()?;
        let tool = self
            .get(kind)
            .ok_or_else(|| ToolError::not_found(format!("tool '{name}' is not registered")))?;
        let args = tool
            .schema()
            .validate(raw_args)
            .map_err(|err| err.for_tool(name))?;

        Ok(tool.execute(args, context).await)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
