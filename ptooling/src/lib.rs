//! Tool registry and runtime: a closed set of tool kinds, typed argument
//! schemas, and a timeout-bounded executor whose failures stay in-band.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ptooling::prelude::*;
//! use serde_json::json;
//!
//! let mut registry = ToolRegistry::new();
//! registry.register_fn(
//!     ToolKind::UpdateMemory,
//!     "Remember a fact about the user",
//!     ParameterSchema::new().with(ParameterSpec::string("text", "fact").max_chars(300)),
//!     |_args, _ctx| async { ToolOutcome::success(json!({"message": "ok"})) },
//! );
//!
//! let runtime = DefaultToolRuntime::new(Arc::new(registry));
//! assert_eq!(runtime.registry().list_active(&ToolKind::ALL).len(), 1);
//! ```

mod error;
mod hooks;
mod kind;
mod registry;
mod runtime;
mod schema;
mod tool;
mod types;

pub mod prelude {
    pub use crate::{
        DefaultToolRuntime, ParameterSchema, ParameterSpec, Tool, ToolError, ToolErrorKind,
        ToolExecutionContext, ToolExecutionResult, ToolFuture, ToolKind, ToolOutcome,
        ToolRegistry, ToolRuntime,
    };
}

pub use error::{ToolError, ToolErrorKind};
pub use hooks::{NoopToolRuntimeHooks, ToolEvent, ToolRuntimeHooks};
pub use kind::ToolKind;
pub use registry::ToolRegistry;
pub use runtime::{DEFAULT_TOOL_TIMEOUT, DefaultToolRuntime, ToolRuntime};
pub use schema::{ParameterKind, ParameterSchema, ParameterSpec, required_number, required_string};
pub use tool::{FunctionTool, Tool, ToolFuture};
pub use types::{ToolExecutionContext, ToolExecutionResult, ToolOutcome};
