use super::*;
use crate::app_state::overlay_state;
use axum::{body, body::Body, http::Request};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> (Router, Arc<OverlayAppState>) {
    let state = overlay_state();
    (build_router(Arc::clone(&state)), state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).expect("json"))
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post_empty(path: &str) -> Request<Body> {
    Request::post(path).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn healthz_and_pages_respond() {
    let (app, _) = test_app();
    for path in ["/", "/overlay/marquee", "/overlay/transition", "/control", "/healthz"] {
        let request = Request::get(path).body(Body::empty()).expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn get_state_returns_defaults() {
    let (app, _) = test_app();
    let request = Request::get("/api/get_state")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marquee"]["visible"], true);
    assert_eq!(body["transition"]["visible"], false);
    assert_eq!(body["transition"]["message"], "Mientras tanto...");
}

#[tokio::test]
async fn update_marquee_trims_and_broadcasts() {
    let (app, state) = test_app();
    let (_, mut rx) = state.overlay.connect().await;

    let (status, body) = send(
        &app,
        post_json("/api/update_marquee", json!({ "text": "  Culto de oración  " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "message": "Marquesina actualizada correctamente" })
    );
    assert_eq!(state.overlay.state().await.marquee.text, "Culto de oración");
    assert!(matches!(
        rx.try_recv(),
        Ok(OverlayServerEvent::MarqueeUpdate(m)) if m.text == "Culto de oración"
    ));
}

#[tokio::test]
async fn empty_marquee_text_is_a_bad_request() {
    let (app, state) = test_app();
    let before = state.overlay.state().await;

    for payload in [json!({ "text": "   " }), json!({})] {
        let (status, body) = send(&app, post_json("/api/update_marquee", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "success": false, "error": "Texto no puede estar vacío" })
        );
    }
    assert_eq!(state.overlay.state().await, before);
}

#[tokio::test]
async fn malformed_body_is_an_internal_error() {
    let (app, _) = test_app();
    let request = Request::post("/api/update_marquee")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn toggle_reports_new_visibility() {
    let (app, _) = test_app();
    let (status, body) = send(&app, post_empty("/api/toggle_marquee")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "message": "Marquesina ocultada", "visible": false })
    );

    let (_, body) = send(&app, post_empty("/api/toggle_marquee")).await;
    assert_eq!(body["message"], "Marquesina mostrada");
    assert_eq!(body["visible"], true);
}

#[tokio::test]
async fn transition_show_update_hide() {
    let (app, state) = test_app();

    let (_, body) = send(&app, post_empty("/api/show_transition")).await;
    assert_eq!(body["message"], "Pantalla de transición mostrada");
    assert!(state.overlay.state().await.transition.visible);

    let (status, body) = send(
        &app,
        post_json(
            "/api/update_transition",
            json!({ "message": "Regresamos pronto", "church_name": "" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Transición actualizada correctamente");
    let transition = state.overlay.state().await.transition;
    assert_eq!(transition.message, "Regresamos pronto");
    assert_eq!(transition.church_name, "Iglesia Agua Viva");

    let (_, body) = send(&app, post_empty("/api/hide_transition")).await;
    assert_eq!(body["message"], "Pantalla de transición ocultada");
    assert!(!state.overlay.state().await.transition.visible);
}
