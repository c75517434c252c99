//! HTTP/WebSocket Handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;

use weather_advisor::{
    AdviceFragment, AdviceOrchestrator, AdviceRequest, AdvisorError, Coordinate,
    CurrentConditions, ErrorKind, StreamOutcome,
};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub model: String,
    pub provider_connected: bool,
}

#[derive(Debug, Serialize)]
pub struct AdviceResponse {
    pub advice: String,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Frames sent over the advice WebSocket
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamFrame<'a> {
    Fragment { text: &'a str, is_final: bool },
    Error { code: &'a str, error: String },
}

impl StreamFrame<'_> {
    fn into_message(self) -> Option<Message> {
        serde_json::to_string(&self)
            .ok()
            .map(|json| Message::Text(json.into()))
    }
}

/// `AdvisorError` rendered as `{"error","code"}` with a status per kind
#[derive(Debug)]
pub struct ApiError(AdvisorError);

impl From<AdvisorError> for ApiError {
    fn from(err: AdvisorError) -> Self {
        Self(err)
    }
}

pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::UpstreamUnavailable
        | ErrorKind::Decode
        | ErrorKind::Generation
        | ErrorKind::NoResponse => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().into(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);
    let composer = state.orchestrator.composer();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: composer.provider_name().to_string(),
        model: composer.model().to_string(),
        provider_connected,
    })
}

/// Single-shot advice
pub async fn advice_handler(
    State(state): State<AppState>,
    Json(payload): Json<AdviceRequest>,
) -> Result<Json<AdviceResponse>, ApiError> {
    let advice = state.orchestrator.get_advice(&payload).await?;

    Ok(Json(AdviceResponse {
        advice: advice.text,
        request_id: advice.request_id.to_string(),
    }))
}

/// Current conditions at one coordinate
pub async fn weather_handler(
    State(state): State<AppState>,
    Json(coord): Json<Coordinate>,
) -> Result<Json<CurrentConditions>, ApiError> {
    Ok(Json(state.orchestrator.current_weather(coord).await?))
}

/// Prometheus scrape endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render_prometheus(),
    )
}

/// WebSocket streaming advice
pub async fn advice_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();
    relay_advice(sender, receiver, state.orchestrator).await;
}

async fn send_error<S>(sender: &mut S, err: &AdvisorError)
where
    S: Sink<Message> + Unpin,
{
    let frame = StreamFrame::Error {
        code: err.code(),
        error: err.to_string(),
    };
    if let Some(message) = frame.into_message() {
        let _ = sender.send(message).await;
    }
}

/// First text frame, parsed as an advice request. `None` if the client
/// left before sending one.
async fn read_request<R, E>(receiver: &mut R) -> Option<Result<AdviceRequest, AdvisorError>>
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                return Some(
                    serde_json::from_str(text.as_str())
                        .map_err(|e| AdvisorError::InvalidRequest(e.to_string())),
                );
            }
            Ok(Message::Close(_)) => return None,
            Err(e) => {
                tracing::debug!("WebSocket closed before request: {}", e);
                return None;
            }
            _ => {}
        }
    }
    None
}

/// One request per connection: relay fragments until the orchestrator
/// finishes or the client goes away, then close.
pub(crate) async fn relay_advice<S, R, E>(
    mut sender: S,
    mut receiver: R,
    orchestrator: Arc<AdviceOrchestrator>,
) where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    let request = match read_request(&mut receiver).await {
        Some(Ok(request)) => request,
        Some(Err(err)) => {
            send_error(&mut sender, &err).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
        None => return,
    };

    let config = orchestrator.config().clone();
    let (tx, mut rx) = mpsc::channel::<AdviceFragment>(config.stream_buffer);
    let task = tokio::spawn(async move { orchestrator.stream_advice(&request, tx).await });

    loop {
        tokio::select! {
            fragment = rx.recv() => {
                let Some(fragment) = fragment else { break };
                let frame = StreamFrame::Fragment {
                    text: &fragment.text,
                    is_final: fragment.is_final,
                };
                let Some(message) = frame.into_message() else { break };
                if sender.send(message).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    // Closes the relay; a still-running orchestrator sees it and stops
    drop(rx);

    match task.await {
        Ok(Ok(StreamOutcome::Completed | StreamOutcome::Cancelled)) => {}
        Ok(Ok(StreamOutcome::TimedOut)) => {
            send_error(&mut sender, &AdvisorError::DeadlineExceeded(config.stream_timeout)).await;
        }
        Ok(Err(err)) => send_error(&mut sender, &err).await,
        Err(e) => tracing::error!("Stream task failed: {}", e),
    }

    let _ = sender.send(Message::Close(None)).await;
}
