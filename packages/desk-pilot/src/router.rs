//! HTTP surface: health plus the chat endpoint that streams session events.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::Event;
use axum::response::{IntoResponse, Response, Sse};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use utoipa::{OpenApi, ToSchema};

use desk_pilot_desktop::{
    ActionExecutor, DesktopSurface, ResolutionScaler, SandboxProvisioner, SANDBOX_TIMEOUT_MS,
};
use desk_pilot_error::{ErrorType, PilotError, ProblemDetails};
use desk_pilot_schema::{
    ActionDescriptor, ActionPayload, ActionResult, ChatMessage, ModelProvider, Point, Role,
    ScrollDirection, StreamEvent,
};

use crate::config::{Config, DEFAULT_RESOLUTION};
use crate::providers::adapter_for;
use crate::session::{CancelFlag, SessionLoop};

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "desk-pilot",
        description = "Model-driven remote desktop sessions streamed over SSE."
    ),
    paths(get_health, post_chat),
    components(schemas(
        HealthResponse,
        ChatRequest,
        ChatMessage,
        Role,
        ModelProvider,
        StreamEvent,
        ActionDescriptor,
        ActionResult,
        ActionPayload,
        Point,
        ScrollDirection,
        ProblemDetails,
        ErrorType,
    )),
    tags(
        (name = "meta", description = "Service metadata"),
        (name = "chat", description = "Desktop interaction sessions")
    )
)]
pub struct ApiDoc;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(get_health))
        .route("/v1/chat", post(post_chat))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pilot(#[from] PilotError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem: ProblemDetails = match &self {
            ApiError::Pilot(err) => err.to_problem_details(),
        };
        let status =
            StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(problem)).into_response()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub sandbox_id: Option<String>,
    /// Native resolution of the sandbox display, `[width, height]`.
    #[serde(default)]
    #[schema(value_type = Option<Vec<u32>>)]
    pub resolution: Option<(u32, u32)>,
    #[serde(default)]
    pub model: ModelProvider,
}

#[utoipa::path(
    get,
    path = "/v1/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "meta"
)]
/// Health
async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[utoipa::path(
    post,
    path = "/v1/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "SSE stream of session events"),
        (status = 400, description = "Invalid request", body = ProblemDetails),
        (status = 500, description = "Configuration fault", body = ProblemDetails),
        (status = 502, description = "Sandbox or provider unavailable", body = ProblemDetails)
    ),
    tag = "chat"
)]
/// Chat
///
/// Starts (or reattaches to) a desktop session and streams interaction
/// events until the conversation completes, fails, or is cancelled.
async fn post_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let config = &state.config;

    // Configuration faults fail fast, before any sandbox or stream work.
    let adapter = adapter_for(request.model, config)?;
    let desktop_api_key = config.desktop_api_key()?.to_string();

    let resolution = request.resolution.unwrap_or(DEFAULT_RESOLUTION);
    if resolution.0 == 0 || resolution.1 == 0 {
        return Err(PilotError::invalid_request("resolution must be non-zero").into());
    }

    let provisioner = SandboxProvisioner::new(config.desktop_api_url.clone(), desktop_api_key);
    let (created, surface) = match &request.sandbox_id {
        Some(sandbox_id) => {
            let (_, surface) = provisioner.connect(sandbox_id).await?;
            (None, surface)
        }
        None => {
            let (handle, surface) = provisioner.create(resolution).await?;
            (Some(handle), surface)
        }
    };
    let sandbox_id = surface.sandbox_id().to_string();
    surface.set_timeout(SANDBOX_TIMEOUT_MS).await?;

    let executor = ActionExecutor::new(Arc::new(surface), ResolutionScaler::new(resolution));
    let cancel = CancelFlag::new();
    let (events, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    let session = SessionLoop::new(
        adapter,
        executor,
        request.messages,
        created,
        cancel.clone(),
        events,
    );
    let span = tracing::info_span!(
        "session",
        sandbox_id = %sandbox_id,
        provider = request.model.as_str()
    );
    tokio::spawn(session.run().instrument(span));

    Ok(Sse::new(event_stream(receiver, cancel)))
}

/// Encodes loop events as SSE records. Dropping the stream (client
/// disconnect) trips the same cancellation flag as an explicit cancel.
fn event_stream(
    receiver: mpsc::Receiver<StreamEvent>,
    cancel: CancelFlag,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = CancelOnDrop(cancel);
    ReceiverStream::new(receiver).map(move |event| {
        let _ = &guard;
        Ok(to_sse_event(&event))
    })
}

struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|_| Event::default().data("{}"))
}
