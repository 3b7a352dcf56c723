use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use palaver::{
    ChatService, ConversationId, ConversationPage, MessageId, ObjectStorage, TurnRequest,
    UserIdentity, Visibility,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{ApiError, ErrorFormat};
use crate::identity::IdentityProvider;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;
const ALLOWED_UPLOAD_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub objects: Arc<dyn ObjectStorage>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Directory served under `/files`, when uploads live on local disk.
    pub static_root: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        chat: ChatService,
        objects: Arc<dyn ObjectStorage>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            chat,
            objects,
            identity,
            static_root: None,
        }
    }

    pub fn with_static_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.static_root = Some(root.into());
        self
    }

    async fn caller(&self, headers: &HeaderMap) -> Option<UserIdentity> {
        self.identity.identify(headers).await
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat_turn).delete(chat_delete))
        .route("/api/chat/visibility", patch(chat_visibility))
        .route("/api/history", get(history))
        .route(
            "/api/files/upload",
            post(file_upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        );

    if let Some(root) = &state.static_root {
        router = router.nest_service("/files", ServeDir::new(root));
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The body is decoded after the caller is resolved, so an anonymous request
/// is 401 whatever its shape and a malformed one is 400.
async fn chat_turn(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let caller = state
        .caller(&headers)
        .await
        .ok_or_else(ApiError::unauthorized)?;
    let request: TurnRequest = decode_body(&body)?;
    let turn = state.chat.stream_turn(Some(caller), request).await?;

    let events = turn.map(|item| {
        let event = match item {
            Ok(frame) => Event::default().data(frame.to_json()),
            Err(error) => {
                let message = if error.is_user_error() {
                    error.message
                } else {
                    crate::error::INTERNAL_ERROR_MESSAGE.to_string()
                };
                Event::default()
                    .event("error")
                    .data(json!({ "error": message }).to_string())
            }
        };
        Ok::<_, Infallible>(event)
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn decode_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| {
        ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid request body: {err}"))
    })
}

#[derive(Debug, Deserialize)]
struct ChatIdQuery {
    id: Option<String>,
}

async fn chat_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChatIdQuery>,
) -> Result<&'static str, ApiError> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .map(ConversationId::from)
        .ok_or_else(ApiError::not_found)?;

    let caller = state.caller(&headers).await;
    state.chat.delete_conversation(caller.as_ref(), &id).await?;
    Ok("Chat deleted")
}

#[derive(Debug, Deserialize)]
struct VisibilityRequest {
    id: String,
    visibility: Visibility,
}

async fn chat_visibility(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let caller = state
        .caller(&headers)
        .await
        .ok_or_else(ApiError::unauthorized)?;
    let request: VisibilityRequest = decode_body(&body)?;
    state
        .chat
        .update_visibility(
            Some(&caller),
            &ConversationId::from(request.id),
            request.visibility,
        )
        .await?;
    Ok("Visibility updated")
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ConversationPage>, ApiError> {
    let caller = state.caller(&headers).await;
    let page = state
        .chat
        .list_history(caller.as_ref(), query.page, query.limit)
        .await
        .map_err(|error| ApiError::from(error).with_format(ErrorFormat::Json))?;
    Ok(Json(page))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    url: String,
    name: String,
    content_type: String,
}

async fn file_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    if state.caller(&headers).await.is_none() {
        return Err(ApiError::unauthorized().with_format(ErrorFormat::Json));
    }

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ApiError::json(StatusCode::BAD_REQUEST, format!("Multipart error: {err}"))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|err| {
            ApiError::json(
                StatusCode::BAD_REQUEST,
                format!("Failed to read file: {err}"),
            )
        })?;

        let problems = upload_problems(data.len(), &content_type);
        if !problems.is_empty() {
            return Err(ApiError::json(StatusCode::BAD_REQUEST, problems.join(", ")));
        }

        let key = upload_key(&name, &content_type);
        let stored = state
            .objects
            .put(&key, data.to_vec(), &content_type)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, key = %key, "upload failed");
                ApiError::json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload file")
            })?;

        info!(key = %stored.key, bytes = data.len(), "file uploaded");
        return Ok(Json(UploadResponse {
            url: stored.url,
            name,
            content_type,
        }));
    }

    Err(ApiError::json(StatusCode::BAD_REQUEST, "No file uploaded"))
}

fn upload_problems(size: usize, content_type: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if size > MAX_UPLOAD_BYTES {
        problems.push("File size should be less than 5MB");
    }
    if !ALLOWED_UPLOAD_TYPES.contains(&content_type) {
        problems.push("File type should be JPEG or PNG");
    }
    problems
}

/// `uploads/<stem>.<ext>`, where the stem is the file name up to its first
/// dot, reduced to characters safe in a storage key.
fn upload_key(file_name: &str, content_type: &str) -> String {
    let stem: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
        .collect();
    let stem = if stem.is_empty() {
        MessageId::generate().into_inner()
    } else {
        stem
    };
    let extension = if content_type == "image/png" { "png" } else { "jpg" };
    format!("uploads/{stem}.{extension}")
}
