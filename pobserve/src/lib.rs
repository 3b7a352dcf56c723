//! Observability hooks for provider attempts, tool runs, and chat turns.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pchat::TurnHooks;
//! use pobserve::{MetricsObservabilityHooks, SafeTurnHooks, TracingObservabilityHooks};
//!
//! let hooks: Arc<dyn TurnHooks> = Arc::new(SafeTurnHooks::new(TracingObservabilityHooks));
//! let _metrics = MetricsObservabilityHooks;
//! # let _ = hooks;
//! ```

mod combined;
mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use combined::ObservabilityHooks;
pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeProviderHooks, SafeToolHooks, SafeTurnHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, ObservabilityHooks, SafeProviderHooks, SafeToolHooks,
        SafeTurnHooks, TracingObservabilityHooks,
    };
}
