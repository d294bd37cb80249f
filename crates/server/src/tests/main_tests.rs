use super::*;
use axum::{body::Body, http::Request};
use clap::CommandFactory;
use tower::ServiceExt;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn bind_flag_is_accepted_after_the_subcommand() {
    let cli = Cli::try_parse_from(["server", "quiz", "--bind", "127.0.0.1:5050"]).expect("parse");
    assert_eq!(cli.app, AppKind::Quiz);
    assert_eq!(cli.bind.as_deref(), Some("127.0.0.1:5050"));

    let cli = Cli::try_parse_from(["server", "overlay"]).expect("parse");
    assert_eq!(cli.app, AppKind::Overlay);
    assert!(cli.bind.is_none());
}

#[test]
fn application_must_be_named() {
    assert!(Cli::try_parse_from(["server"]).is_err());
    assert!(Cli::try_parse_from(["server", "chat"]).is_err());
}

#[test]
fn error_codes_map_to_http_statuses() {
    assert_eq!(status_for(ErrorCode::Validation), StatusCode::BAD_REQUEST);
    assert_eq!(status_for(ErrorCode::NotFound), StatusCode::NOT_FOUND);
    assert_eq!(status_for(ErrorCode::Precondition), StatusCode::CONFLICT);
    assert_eq!(status_for(ErrorCode::Internal), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn each_application_serves_its_own_pages() {
    let settings = Settings::default();
    let overlay = build_app(AppKind::Overlay, &settings).await.expect("overlay");
    let quiz = build_app(AppKind::Quiz, &settings).await.expect("quiz");

    let control = Request::get("/control").body(Body::empty()).expect("request");
    assert_eq!(
        overlay.clone().oneshot(control).await.expect("response").status(),
        StatusCode::OK
    );
    let moderator = Request::get("/moderador").body(Body::empty()).expect("request");
    assert_eq!(
        overlay.oneshot(moderator).await.expect("response").status(),
        StatusCode::NOT_FOUND
    );

    let moderator = Request::get("/moderador").body(Body::empty()).expect("request");
    assert_eq!(
        quiz.oneshot(moderator).await.expect("response").status(),
        StatusCode::OK
    );
}
