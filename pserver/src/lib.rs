//! HTTP surface for palaver.
//!
//! [`api::build_router`] exposes chat turns as Server-Sent Events alongside
//! history, deletion, visibility, and image upload routes. Callers are
//! resolved through an [`identity::IdentityProvider`].

pub mod api;
pub mod config;
pub mod error;
pub mod identity;

pub use api::{AppState, MAX_UPLOAD_BYTES, build_router, serve};
pub use config::ServerConfig;
pub use error::{ApiError, ErrorFormat};
pub use identity::{IdentityProvider, StaticTokenIdentity};
