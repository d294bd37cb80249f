use super::*;
use crate::{
    app_state::quiz_state,
    config::{QuestionSource, Settings},
};
use axum::{body, body::Body, http::Request};
use serde_json::Value;
use tower::ServiceExt;

async fn builtin_app() -> (Router, Arc<QuizAppState>) {
    let state = quiz_state(&Settings::default()).await.expect("state");
    (build_router(Arc::clone(&state)), state)
}

async fn database_app() -> (Router, Arc<QuizAppState>) {
    let settings = Settings {
        database_url: "sqlite::memory:".into(),
        question_source: QuestionSource::Database,
        record_sessions: true,
        ..Settings::default()
    };
    let state = quiz_state(&settings).await.expect("state");
    (build_router(Arc::clone(&state)), state)
}

async fn get(app: &Router, path: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::get(path).body(Body::empty()).expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, bytes.to_vec())
}

#[tokio::test]
async fn pages_and_healthz_respond() {
    let (app, _) = builtin_app().await;
    for path in ["/", "/moderador", "/tablero", "/marcador", "/respuestas/team1"] {
        let (status, _) = get(&app, path).await;
        assert_eq!(status, StatusCode::OK, "{path}");
    }
    let (status, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn answer_panel_is_bound_to_its_team() {
    let (app, _) = builtin_app().await;
    let (status, body) = get(&app, "/respuestas/team2").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).expect("utf8");
    assert!(html.contains("const TEAM_ID = 'team2';"));
    assert!(html.contains("Equipo Rojo"));
    assert!(!html.contains("{{"));
}

#[tokio::test]
async fn unknown_answer_panel_team_is_rejected_in_plain_text() {
    let (app, _) = builtin_app().await;
    let (status, body) = get(&app, "/respuestas/team3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        String::from_utf8(body).expect("utf8"),
        "Equipo no válido. Use team1 o team2."
    );
}

#[tokio::test]
async fn questions_by_type_filters_catalogue() {
    let (app, _) = builtin_app().await;
    let (status, body) = get(&app, "/api/questions/opcion_multiple").await;
    assert_eq!(status, StatusCode::OK);
    let questions: Vec<Question> = serde_json::from_slice(&body).expect("json");
    let ids: Vec<i64> = questions.iter().map(|q| q.id.0).collect();
    assert_eq!(ids, vec![3, 4, 6, 8]);

    let (status, body) = get(&app, "/api/questions/ensayo").await;
    assert_eq!(status, StatusCode::OK);
    let questions: Vec<Question> = serde_json::from_slice(&body).expect("json");
    assert!(questions.is_empty());
}

#[tokio::test]
async fn game_state_reflects_controller_changes() {
    let (app, state) = builtin_app().await;
    let (_, body) = get(&app, "/api/game_state").await;
    let snapshot: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(snapshot["game_active"], false);
    assert_eq!(snapshot["target_team"], "both");
    assert!(snapshot["current_question"].is_null());
    assert_eq!(snapshot["teams"]["team1"]["name"], "Equipo Azul");

    state
        .game
        .send_question(shared::domain::QuestionId(3), Some("team2"))
        .await
        .expect("send");
    state.game.update_score("team1", -5).await.expect("score");

    let (_, body) = get(&app, "/api/game_state").await;
    let snapshot: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(snapshot["game_active"], true);
    assert_eq!(snapshot["show_answer"], false);
    assert_eq!(snapshot["target_team"], "team2");
    assert_eq!(snapshot["current_question"]["type"], "opcion_multiple");
    assert_eq!(snapshot["teams"]["team1"]["score"], -5);
    assert_eq!(snapshot["teams"]["team1"]["wrong_answers"], 1);
}

#[tokio::test]
async fn database_source_serves_seeded_questions_and_records_sessions() {
    let (app, state) = database_app().await;
    let (status, body) = get(&app, "/api/questions/cierto_falso").await;
    assert_eq!(status, StatusCode::OK);
    let questions: Vec<Question> = serde_json::from_slice(&body).expect("json");
    assert_eq!(questions.len(), 4);
    assert_eq!(questions[0].options, vec!["Cierto", "Falso"]);

    let (status, _) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    state
        .game
        .send_question(shared::domain::QuestionId(1), None)
        .await
        .expect("send");
    state.game.team_answer("team2", "Cierto").await.expect("answer");

    let storage = state.storage.as_ref().expect("storage");
    let session = state
        .game
        .recorder()
        .expect("recorder")
        .current_session()
        .await;
    let teams = storage.session_teams(session).await.expect("teams");
    assert_eq!(teams[0].team.slug, "team2");
    assert_eq!(teams[0].current_score, 10);
}

async fn wait_for_subscribers(state: &QuizAppState, expected: usize) {
    for _ in 0..100 {
        if state.game.hub().subscriber_count().await == expected {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!(
        "expected {expected} subscribers, still {}",
        state.game.hub().subscriber_count().await
    );
}

#[tokio::test]
async fn closed_connection_unregisters_subscriber() {
    let (_, state) = builtin_app().await;
    let (subscriber, _rx) = state.game.connect().await;
    let send_task = tokio::spawn(std::future::pending::<()>());
    let connection = ClientConnection::new(Arc::clone(&state), subscriber, send_task);
    assert_eq!(state.game.hub().subscriber_count().await, 1);

    connection.close().await;
    assert_eq!(state.game.hub().subscriber_count().await, 0);
}

#[tokio::test]
async fn connection_unwound_by_a_panic_still_unregisters() {
    let (_, state) = builtin_app().await;
    let (subscriber, _rx) = state.game.connect().await;
    state
        .game
        .join(subscriber, control_api::DISPLAY_ROOM)
        .await
        .expect("join");
    let send_task = tokio::spawn(std::future::pending::<()>());
    let abort_handle = send_task.abort_handle();

    let task_state = Arc::clone(&state);
    let command_loop = tokio::spawn(async move {
        let _connection = ClientConnection::new(task_state, subscriber, send_task);
        panic!("command handler failed");
    });
    assert!(command_loop.await.expect_err("panicked").is_panic());

    wait_for_subscribers(&state, 0).await;
    assert_eq!(
        state.game.hub().member_count(control_api::DISPLAY_ROOM).await,
        0
    );
    for _ in 0..100 {
        if abort_handle.is_finished() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("send task still running");
}
