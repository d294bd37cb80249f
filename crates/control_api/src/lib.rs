pub mod game;
pub mod hub;
pub mod overlay;
pub mod questions;
pub mod recorder;
pub mod store;

pub use game::{GameController, GamePhase, GameRules, GameState, DISPLAY_ROOM, SCOREBOARD_ROOM};
pub use hub::{RoomHub, SubscriberId};
pub use overlay::OverlayController;
pub use questions::{BuiltinQuestions, QuestionBank};
pub use recorder::SessionRecorder;
pub use store::StateStore;

use shared::error::ApiError;
use tracing::error;

/// Collapses an infrastructure failure into the caller-facing error.
pub fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %err, "internal error");
    ApiError::internal("Error interno del servidor")
}
