use std::sync::Arc;

use control_api::{
    BuiltinQuestions, GameController, GameRules, GameState, OverlayController, SessionRecorder,
    StateStore,
};
use shared::domain::{default_teams, OverlayState};
use storage::Storage;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::{prepare_database_url, QuestionSource, Settings};

const OVERLAY_EVENT_CAPACITY: usize = 256;

#[derive(Clone)]
pub(crate) struct OverlayAppState {
    pub(crate) overlay: Arc<OverlayController>,
}

#[derive(Clone)]
pub(crate) struct QuizAppState {
    pub(crate) game: Arc<GameController>,
    pub(crate) storage: Option<Storage>,
}

pub(crate) fn overlay_state() -> Arc<OverlayAppState> {
    let (events, _) = broadcast::channel(OVERLAY_EVENT_CAPACITY);
    let overlay = OverlayController::new(StateStore::new(OverlayState::default()), events);
    Arc::new(OverlayAppState {
        overlay: Arc::new(overlay),
    })
}

pub(crate) async fn quiz_state(settings: &Settings) -> anyhow::Result<Arc<QuizAppState>> {
    let rules = GameRules {
        allow_answers_after_reveal: settings.allow_answers_after_reveal,
    };
    let store = StateStore::new(GameState::default());

    let (game, storage) = match settings.question_source {
        QuestionSource::Builtin => {
            if settings.record_sessions {
                warn!("session recording requires the database question source; disabled");
            }
            let questions = BuiltinQuestions::default();
            info!(questions = questions.len(), "using built-in question catalogue");
            (GameController::new(store, Arc::new(questions), rules), None)
        }
        QuestionSource::Database => {
            let database_url = prepare_database_url(&settings.database_url)?;
            let storage = Storage::new(&database_url).await.map_err(|error| {
                error!(
                    %database_url,
                    %error,
                    "failed to open SQLite database; verify parent directory exists and permissions are correct"
                );
                error
            })?;
            info!(%database_url, "using database question catalogue");

            let mut game = GameController::new(store, Arc::new(storage.clone()), rules);
            if settings.record_sessions {
                let recorder = SessionRecorder::start(storage.clone(), &default_teams()).await?;
                game = game.with_recorder(recorder);
            }
            (game, Some(storage))
        }
    };

    Ok(Arc::new(QuizAppState {
        game: Arc::new(game),
        storage,
    }))
}
