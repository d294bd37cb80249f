use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use control_api::SubscriberId;
use futures::StreamExt;
use shared::{
    domain::{GameSnapshot, Question, TeamId},
    error::ApiError,
    protocol::{GameClientEvent, GameServerEvent},
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{app_state::QuizAppState, pages, push::send_event, status_for};

pub(crate) fn build_router(state: Arc<QuizAppState>) -> Router {
    Router::new()
        .route("/", get(|| async { Html(pages::QUIZ_INDEX) }))
        .route("/moderador", get(|| async { Html(pages::MODERATOR) }))
        .route("/tablero", get(|| async { Html(pages::BOARD) }))
        .route("/marcador", get(|| async { Html(pages::SCOREBOARD) }))
        .route("/respuestas/:team_id", get(answer_panel))
        .route("/api/questions/:question_type", get(questions_by_type))
        .route("/api/game_state", get(game_state))
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<QuizAppState>>) -> Result<&'static str, StatusCode> {
    if let Some(storage) = &state.storage {
        storage.health_check().await.map_err(|error| {
            error!(%error, "storage health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        })?;
    }
    Ok("ok")
}

async fn answer_panel(Path(team_id): Path<String>) -> Response {
    match team_id.parse::<TeamId>() {
        Ok(team) => Html(pages::answer_panel(team)).into_response(),
        Err(()) => (StatusCode::BAD_REQUEST, pages::INVALID_TEAM).into_response(),
    }
}

async fn questions_by_type(
    State(state): State<Arc<QuizAppState>>,
    Path(question_type): Path<String>,
) -> Result<Json<Vec<Question>>, (StatusCode, Json<ApiError>)> {
    let questions = state
        .game
        .questions_by_type(&question_type)
        .await
        .map_err(|e| (status_for(e.code), Json(e)))?;
    Ok(Json(questions))
}

async fn game_state(State(state): State<Arc<QuizAppState>>) -> Json<GameSnapshot> {
    Json(state.game.game_state().await)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<QuizAppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<QuizAppState>, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (subscriber, mut events_rx) = state.game.connect().await;
    info!(subscriber = %subscriber.0, "quiz client connected");

    // Room broadcasts and this client's replies share one queue, so replies
    // never overtake the broadcasts their command produced.
    let send_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if send_event(&mut sender, &event).await.is_err() {
                break;
            }
        }
    });
    let connection = ClientConnection::new(Arc::clone(&state), subscriber, send_task);

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let reply = match serde_json::from_str::<GameClientEvent>(&text) {
            Ok(command) => state.game.handle(subscriber, command).await,
            Err(err) => {
                warn!(subscriber = %subscriber.0, error = %err, "undecodable quiz frame");
                Some(GameServerEvent::Error(ApiError::validation(format!(
                    "Mensaje no válido: {err}"
                ))))
            }
        };
        if let Some(reply) = reply {
            if !state.game.hub().emit_to(subscriber, reply).await {
                break;
            }
        }
    }

    connection.close().await;
}

/// Owns a quiz client's hub registration and outbound task.
///
/// `close` unregisters in line. If the command loop unwinds or its future is
/// dropped first, `Drop` aborts the send task and unregisters on the runtime.
struct ClientConnection {
    state: Option<Arc<QuizAppState>>,
    subscriber: SubscriberId,
    send_task: JoinHandle<()>,
}

impl ClientConnection {
    fn new(state: Arc<QuizAppState>, subscriber: SubscriberId, send_task: JoinHandle<()>) -> Self {
        Self {
            state: Some(state),
            subscriber,
            send_task,
        }
    }

    async fn close(mut self) {
        if let Some(state) = self.state.take() {
            state.game.disconnect(self.subscriber).await;
        }
        info!(subscriber = %self.subscriber.0, "quiz client disconnected");
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        self.send_task.abort();
        let Some(state) = self.state.take() else {
            return;
        };
        let subscriber = self.subscriber;
        warn!(subscriber = %subscriber.0, "quiz client dropped before closing");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    state.game.disconnect(subscriber).await;
                });
            }
            Err(_) => error!(subscriber = %subscriber.0, "no runtime left to unregister quiz client"),
        }
    }
}

#[cfg(test)]
#[path = "tests/quiz_api_tests.rs"]
mod tests;
