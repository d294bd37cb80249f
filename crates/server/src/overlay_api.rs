use std::sync::Arc;

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use futures::{stream, StreamExt};
use shared::{
    domain::OverlayState,
    error::ApiError,
    protocol::{
        OverlayClientEvent, OverlayReply, OverlayServerEvent, UpdateMarqueeRequest,
        UpdateTransitionRequest,
    },
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::{
    errors::BroadcastStreamRecvError, BroadcastStream, UnboundedReceiverStream,
};
use tracing::{error, info, warn};

use crate::{app_state::OverlayAppState, pages, push::send_event, status_for};

type ReplyError = (StatusCode, Json<OverlayReply>);

pub(crate) fn build_router(state: Arc<OverlayAppState>) -> Router {
    Router::new()
        .route("/", get(|| async { Html(pages::OVERLAY_INDEX) }))
        .route("/overlay/marquee", get(|| async { Html(pages::MARQUEE) }))
        .route("/overlay/transition", get(|| async { Html(pages::TRANSITION) }))
        .route("/control", get(|| async { Html(pages::CONTROL) }))
        .route("/api/update_marquee", post(update_marquee))
        .route("/api/toggle_marquee", post(toggle_marquee))
        .route("/api/show_transition", post(show_transition))
        .route("/api/hide_transition", post(hide_transition))
        .route("/api/update_transition", post(update_transition))
        .route("/api/get_state", get(get_state))
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn update_marquee(
    State(state): State<Arc<OverlayAppState>>,
    payload: Result<Json<UpdateMarqueeRequest>, JsonRejection>,
) -> Result<Json<OverlayReply>, ReplyError> {
    let Json(req) = payload.map_err(malformed)?;
    state
        .overlay
        .update_marquee(&req.text)
        .await
        .map_err(rejected)?;
    Ok(Json(OverlayReply::ok("Marquesina actualizada correctamente")))
}

async fn toggle_marquee(State(state): State<Arc<OverlayAppState>>) -> Json<OverlayReply> {
    let marquee = state.overlay.toggle_marquee().await;
    let status = if marquee.visible {
        "mostrada"
    } else {
        "ocultada"
    };
    Json(OverlayReply {
        visible: Some(marquee.visible),
        ..OverlayReply::ok(format!("Marquesina {status}"))
    })
}

async fn show_transition(State(state): State<Arc<OverlayAppState>>) -> Json<OverlayReply> {
    state.overlay.show_transition().await;
    Json(OverlayReply::ok("Pantalla de transición mostrada"))
}

async fn hide_transition(State(state): State<Arc<OverlayAppState>>) -> Json<OverlayReply> {
    state.overlay.hide_transition().await;
    Json(OverlayReply::ok("Pantalla de transición ocultada"))
}

async fn update_transition(
    State(state): State<Arc<OverlayAppState>>,
    payload: Result<Json<UpdateTransitionRequest>, JsonRejection>,
) -> Result<Json<OverlayReply>, ReplyError> {
    let Json(req) = payload.map_err(malformed)?;
    state.overlay.update_transition(&req).await;
    Ok(Json(OverlayReply::ok("Transición actualizada correctamente")))
}

async fn get_state(State(state): State<Arc<OverlayAppState>>) -> Json<OverlayState> {
    Json(state.overlay.state().await)
}

fn malformed(rejection: JsonRejection) -> ReplyError {
    error!(%rejection, "malformed overlay request body");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(OverlayReply::failed(rejection.body_text())),
    )
}

fn rejected(err: ApiError) -> ReplyError {
    warn!(code = ?err.code, message = %err.message, "overlay command rejected");
    (status_for(err.code), Json(OverlayReply::failed(err.message)))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<OverlayAppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<OverlayAppState>, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (initial, events_rx) = state.overlay.connect().await;
    info!("overlay viewer connected");

    if send_event(&mut sender, &OverlayServerEvent::InitialState(initial))
        .await
        .is_err()
    {
        return;
    }

    // Replies for this viewer only, merged with the shared broadcast.
    let (direct_tx, direct_rx) = mpsc::unbounded_channel::<OverlayServerEvent>();
    let broadcasts = BroadcastStream::new(events_rx).filter_map(|item| async move {
        match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "overlay viewer lagged behind broadcasts");
                None
            }
        }
    });
    let mut outgoing = Box::pin(stream::select(
        UnboundedReceiverStream::new(direct_rx),
        broadcasts,
    ));

    let send_task = tokio::spawn(async move {
        while let Some(event) = outgoing.next().await {
            if send_event(&mut sender, &event).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let reply = match serde_json::from_str::<OverlayClientEvent>(&text) {
            Ok(OverlayClientEvent::RequestState) => {
                OverlayServerEvent::InitialState(state.overlay.state().await)
            }
            Err(err) => {
                warn!(error = %err, "undecodable overlay frame");
                OverlayServerEvent::Error(ApiError::validation(format!("Mensaje no válido: {err}")))
            }
        };
        if direct_tx.send(reply).is_err() {
            break;
        }
    }

    send_task.abort();
    info!("overlay viewer disconnected");
}

#[cfg(test)]
#[path = "tests/overlay_api_tests.rs"]
mod tests;
