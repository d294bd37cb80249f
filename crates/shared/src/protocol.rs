use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    domain::{
        GameSnapshot, MarqueeState, OverlayState, Question, TargetTeam, TeamId, Teams,
        TransitionState,
    },
    error::ApiError,
};

/// Outcome of a command as seen by the caller that issued it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Ack<T> {
    Success(T),
    Error(ApiError),
}

impl<T> From<Result<T, ApiError>> for Ack<T> {
    fn from(value: Result<T, ApiError>) -> Self {
        match value {
            Ok(payload) => Ack::Success(payload),
            Err(error) => Ack::Error(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Done {}

// Overlay push channel.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OverlayClientEvent {
    RequestState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OverlayServerEvent {
    InitialState(OverlayState),
    MarqueeUpdate(MarqueeState),
    TransitionUpdate(TransitionState),
    Error(ApiError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMarqueeRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTransitionRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub church_name: Option<String>,
    #[serde(default)]
    pub service_info: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl OverlayReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            visible: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            visible: None,
        }
    }
}

// Quiz push channel.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum GameClientEvent {
    Join {
        room: String,
    },
    Leave {
        room: String,
    },
    SendQuestion {
        /// Numbers and numeric strings are accepted; anything else reads as no id.
        #[serde(default, deserialize_with = "lenient_id")]
        question_id: Option<i64>,
        #[serde(default)]
        target_team: Option<String>,
    },
    ShowAnswer,
    UpdateScore {
        team_id: String,
        #[serde(default)]
        points: i64,
    },
    TeamAnswer {
        team_id: String,
        answer: String,
    },
    ResetGame,
    GetGameState,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(id)) => Some(id),
        Some(RawId::Text(text)) => text.trim().parse().ok(),
        Some(RawId::Other(_)) | None => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSent {
    pub question: Question,
    pub target_team: TargetTeam,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question: Question,
    pub target_team: TargetTeam,
    pub game_active: bool,
    pub show_answer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectAnswer {
    pub correct_answer: String,
    pub show_answer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamsPayload {
    pub teams: Teams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdated {
    pub teams: Teams,
    pub updated_team: TeamId,
    pub points_added: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerVerdict {
    pub is_correct: bool,
    pub points: i64,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAnswered {
    pub team_id: TeamId,
    pub team_name: String,
    pub answer: String,
    pub is_correct: bool,
    pub points: i64,
    pub teams: Teams,
    pub target_team: TargetTeam,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReset {
    pub teams: Teams,
    pub current_question: Option<Question>,
    pub game_active: bool,
    pub show_answer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum GameServerEvent {
    Status(StatusMessage),
    QuestionSent(Ack<QuestionSent>),
    NewQuestion(NewQuestion),
    AnswerShown(Ack<Done>),
    ShowCorrectAnswer(CorrectAnswer),
    ScoreUpdateConfirmed(Ack<TeamsPayload>),
    ScoreUpdated(ScoreUpdated),
    AnswerResult(Ack<AnswerVerdict>),
    TeamAnswered(TeamAnswered),
    ResetConfirmed(Ack<Notice>),
    GameReset(GameReset),
    GameState(GameSnapshot),
    Error(ApiError),
}

impl GameServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameServerEvent::Status(_) => "status",
            GameServerEvent::QuestionSent(_) => "question_sent",
            GameServerEvent::NewQuestion(_) => "new_question",
            GameServerEvent::AnswerShown(_) => "answer_shown",
            GameServerEvent::ShowCorrectAnswer(_) => "show_correct_answer",
            GameServerEvent::ScoreUpdateConfirmed(_) => "score_update_confirmed",
            GameServerEvent::ScoreUpdated(_) => "score_updated",
            GameServerEvent::AnswerResult(_) => "answer_result",
            GameServerEvent::TeamAnswered(_) => "team_answered",
            GameServerEvent::ResetConfirmed(_) => "reset_confirmed",
            GameServerEvent::GameReset(_) => "game_reset",
            GameServerEvent::GameState(_) => "game_state",
            GameServerEvent::Error(_) => "error",
        }
    }
}
