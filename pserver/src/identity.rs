//! Caller identity from request headers.

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use palaver::{BoxFuture, ChatError, UserIdentity};

pub trait IdentityProvider: Send + Sync {
    /// `None` for anonymous or unrecognized callers.
    fn identify<'a>(&'a self, headers: &'a HeaderMap) -> BoxFuture<'a, Option<UserIdentity>>;
}

/// Maps bearer tokens to a fixed set of users.
///
/// ```rust
/// use axum::http::{HeaderMap, HeaderValue};
/// use pserver::identity::{IdentityProvider, StaticTokenIdentity};
///
/// let identity = StaticTokenIdentity::parse("tok-1:alice:Alice:alice@example.com").unwrap();
/// let mut headers = HeaderMap::new();
/// headers.insert("authorization", HeaderValue::from_static("Bearer tok-1"));
///
/// let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let user = runtime.block_on(identity.identify(&headers)).expect("known token");
/// assert_eq!(user.id.as_str(), "alice");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentity {
    users: HashMap<String, UserIdentity>,
}

impl StaticTokenIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: impl Into<String>, identity: UserIdentity) -> Self {
        self.users.insert(token.into(), identity);
        self
    }

    /// Parses `token:id:name:email` entries separated by `;`. Name and email
    /// may be empty.
    pub fn parse(entries: &str) -> Result<Self, ChatError> {
        let mut identity = Self::new();
        for entry in entries.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
            let mut fields = entry.splitn(4, ':').map(str::trim);
            let token = fields.next().unwrap_or_default();
            let id = fields.next().unwrap_or_default();
            if token.is_empty() || id.is_empty() {
                return Err(ChatError::invalid_request(format!(
                    "user entry needs a token and an id: '{entry}'"
                )));
            }

            let mut user = UserIdentity::new(id);
            if let Some(name) = fields.next().filter(|name| !name.is_empty()) {
                user = user.with_name(name);
            }
            if let Some(email) = fields.next().filter(|email| !email.is_empty()) {
                user = user.with_email(email);
            }
            identity = identity.with_user(token, user);
        }
        Ok(identity)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl IdentityProvider for StaticTokenIdentity {
    fn identify<'a>(&'a self, headers: &'a HeaderMap) -> BoxFuture<'a, Option<UserIdentity>> {
        Box::pin(async move {
            let token = headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::trim)?;
            self.users.get(token).cloned()
        })
    }
}
