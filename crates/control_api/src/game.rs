use std::sync::Arc;

use shared::{
    domain::{
        default_teams, GameSnapshot, Question, QuestionId, QuestionKind, TargetTeam, Team, TeamId,
        Teams,
    },
    error::ApiError,
    protocol::{
        Ack, AnswerVerdict, CorrectAnswer, Done, GameClientEvent, GameReset, GameServerEvent,
        NewQuestion, Notice, QuestionSent, ScoreUpdated, StatusMessage, TeamAnswered,
        TeamsPayload,
    },
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    hub::{RoomHub, SubscriberId},
    internal,
    questions::QuestionBank,
    recorder::SessionRecorder,
    store::StateStore,
};

pub const DISPLAY_ROOM: &str = "display";
pub const SCOREBOARD_ROOM: &str = "scoreboard";

pub const CORRECT_ANSWER_POINTS: i64 = 10;
pub const WRONG_ANSWER_POINTS: i64 = -5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    /// Whether teams may still score once the moderator has revealed the answer.
    pub allow_answers_after_reveal: bool,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            allow_answers_after_reveal: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GamePhase {
    Idle,
    QuestionLive {
        question: Question,
        target: TargetTeam,
    },
    AnswerRevealed {
        question: Question,
        target: TargetTeam,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub teams: Teams,
    pub phase: GamePhase,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            teams: default_teams(),
            phase: GamePhase::Idle,
        }
    }
}

impl GameState {
    pub fn current_question(&self) -> Option<&Question> {
        match &self.phase {
            GamePhase::Idle => None,
            GamePhase::QuestionLive { question, .. } | GamePhase::AnswerRevealed { question, .. } => {
                Some(question)
            }
        }
    }

    pub fn target_team(&self) -> TargetTeam {
        match &self.phase {
            GamePhase::Idle => TargetTeam::Both,
            GamePhase::QuestionLive { target, .. } | GamePhase::AnswerRevealed { target, .. } => {
                *target
            }
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            current_question: self.current_question().cloned(),
            target_team: self.target_team(),
            teams: self.teams.clone(),
            game_active: !matches!(self.phase, GamePhase::Idle),
            show_answer: matches!(self.phase, GamePhase::AnswerRevealed { .. }),
        }
    }

    fn award(&mut self, team: TeamId, points: i64) -> Result<&Team, ApiError> {
        let entry = self
            .teams
            .entry(team)
            .or_insert_with(|| Team::fresh(team));
        entry.award(points)?;
        Ok(entry)
    }
}

pub struct GameController {
    store: StateStore<GameState>,
    hub: RoomHub<GameServerEvent>,
    questions: Arc<dyn QuestionBank>,
    rules: GameRules,
    recorder: Option<SessionRecorder>,
}

impl GameController {
    pub fn new(
        store: StateStore<GameState>,
        questions: Arc<dyn QuestionBank>,
        rules: GameRules,
    ) -> Self {
        Self {
            store,
            hub: RoomHub::new(),
            questions,
            rules,
            recorder: None,
        }
    }

    pub fn with_recorder(mut self, recorder: SessionRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn hub(&self) -> &RoomHub<GameServerEvent> {
        &self.hub
    }

    pub fn recorder(&self) -> Option<&SessionRecorder> {
        self.recorder.as_ref()
    }

    pub async fn connect(&self) -> (SubscriberId, mpsc::UnboundedReceiver<GameServerEvent>) {
        self.hub.register().await
    }

    pub async fn disconnect(&self, subscriber: SubscriberId) {
        self.hub.unregister(subscriber).await;
    }

    pub async fn join(&self, subscriber: SubscriberId, room: &str) -> Result<(), ApiError> {
        let room = room_name(room)?;
        self.hub.join(subscriber, room).await;
        self.hub
            .emit_to_room(
                room,
                GameServerEvent::Status(StatusMessage {
                    msg: format!("Cliente conectado a {room}"),
                }),
            )
            .await;
        info!(subscriber = %subscriber.0, room, "subscriber joined room");
        Ok(())
    }

    pub async fn leave(&self, subscriber: SubscriberId, room: &str) -> Result<(), ApiError> {
        let room = room_name(room)?;
        self.hub.leave(subscriber, room).await;
        self.hub
            .emit_to_room(
                room,
                GameServerEvent::Status(StatusMessage {
                    msg: format!("Cliente desconectado de {room}"),
                }),
            )
            .await;
        info!(subscriber = %subscriber.0, room, "subscriber left room");
        Ok(())
    }

    pub async fn questions_by_type(&self, raw_kind: &str) -> Result<Vec<Question>, ApiError> {
        let Ok(kind) = raw_kind.parse::<QuestionKind>() else {
            return Ok(Vec::new());
        };
        self.questions.questions_by_type(kind).await.map_err(internal)
    }

    pub async fn question_by_id(&self, question_id: QuestionId) -> Result<Question, ApiError> {
        self.questions
            .question_by_id(question_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| ApiError::not_found("Pregunta no encontrada"))
    }

    pub async fn game_state(&self) -> GameSnapshot {
        self.store.read().await.snapshot()
    }

    pub async fn send_question(
        &self,
        question_id: QuestionId,
        target_team: Option<&str>,
    ) -> Result<QuestionSent, ApiError> {
        let target = match target_team {
            None => TargetTeam::Both,
            Some(raw) => raw
                .parse::<TargetTeam>()
                .map_err(|_| ApiError::validation("Equipo objetivo no válido"))?,
        };
        let question = self.question_by_id(question_id).await?;

        let mut state = self.store.lock().await;
        state.phase = GamePhase::QuestionLive {
            question: question.clone(),
            target,
        };
        self.hub
            .emit_to_room(
                DISPLAY_ROOM,
                GameServerEvent::NewQuestion(NewQuestion {
                    question: question.clone(),
                    target_team: target,
                    game_active: true,
                    show_answer: false,
                }),
            )
            .await;
        drop(state);

        info!(question_id = question.id.0, ?target, "question sent");
        Ok(QuestionSent {
            question,
            target_team: target,
        })
    }

    pub async fn show_answer(&self) -> Result<Done, ApiError> {
        let mut state = self.store.lock().await;
        let (question, target) = match &state.phase {
            GamePhase::Idle => return Err(ApiError::precondition("No hay pregunta activa")),
            GamePhase::QuestionLive { question, target }
            | GamePhase::AnswerRevealed { question, target } => (question.clone(), *target),
        };
        let correct_answer = question.correct_answer.clone();
        state.phase = GamePhase::AnswerRevealed { question, target };
        self.hub
            .emit_to_room(
                DISPLAY_ROOM,
                GameServerEvent::ShowCorrectAnswer(CorrectAnswer {
                    correct_answer: correct_answer.clone(),
                    show_answer: true,
                }),
            )
            .await;
        drop(state);

        info!(%correct_answer, "answer revealed");
        Ok(Done {})
    }

    pub async fn update_score(&self, team_id: &str, points: i64) -> Result<TeamsPayload, ApiError> {
        let team = team_id
            .parse::<TeamId>()
            .map_err(|_| ApiError::not_found("Equipo no encontrado"))?;

        let mut state = self.store.lock().await;
        state.award(team, points)?;
        let teams = state.teams.clone();
        let event = GameServerEvent::ScoreUpdated(ScoreUpdated {
            teams: teams.clone(),
            updated_team: team,
            points_added: points,
        });
        self.hub.emit_to_room(DISPLAY_ROOM, event.clone()).await;
        self.hub.emit_to_room(SCOREBOARD_ROOM, event).await;
        drop(state);

        info!(%team, points, "score updated");
        if let Some(recorder) = &self.recorder {
            recorder.record_score(team, points).await;
        }
        Ok(TeamsPayload { teams })
    }

    pub async fn team_answer(&self, team_id: &str, answer: &str) -> Result<AnswerVerdict, ApiError> {
        let mut state = self.store.lock().await;
        let (question_id, correct_answer, target, revealed) = match &state.phase {
            GamePhase::Idle => return Err(ApiError::precondition("No hay pregunta activa")),
            GamePhase::QuestionLive { question, target } => {
                (question.id, question.correct_answer.clone(), *target, false)
            }
            GamePhase::AnswerRevealed { question, target } => {
                (question.id, question.correct_answer.clone(), *target, true)
            }
        };

        let team = team_id.parse::<TeamId>().ok();
        if target != TargetTeam::Both && !team.is_some_and(|t| target.admits(t)) {
            return Err(ApiError::precondition(
                "Esta pregunta no está dirigida a tu equipo",
            ));
        }
        if revealed && !self.rules.allow_answers_after_reveal {
            return Err(ApiError::precondition("La respuesta ya fue revelada"));
        }
        let team = team.ok_or_else(|| ApiError::not_found("Equipo no encontrado"))?;

        let is_correct = answer == correct_answer;
        let points = if is_correct {
            CORRECT_ANSWER_POINTS
        } else {
            WRONG_ANSWER_POINTS
        };
        let team_name = state.award(team, points)?.name.clone();
        let teams = state.teams.clone();

        self.hub
            .emit_to_room(
                DISPLAY_ROOM,
                GameServerEvent::TeamAnswered(TeamAnswered {
                    team_id: team,
                    team_name,
                    answer: answer.to_string(),
                    is_correct,
                    points,
                    teams: teams.clone(),
                    target_team: target,
                }),
            )
            .await;
        self.hub
            .emit_to_room(
                SCOREBOARD_ROOM,
                GameServerEvent::ScoreUpdated(ScoreUpdated {
                    teams,
                    updated_team: team,
                    points_added: points,
                }),
            )
            .await;
        drop(state);

        info!(%team, answer, is_correct, points, "team answered");
        if let Some(recorder) = &self.recorder {
            recorder
                .record_answer(team, question_id, answer, is_correct, points)
                .await;
        }
        Ok(AnswerVerdict {
            is_correct,
            points,
            correct_answer,
        })
    }

    pub async fn reset_game(&self) -> Notice {
        let mut state = self.store.lock().await;
        state.phase = GamePhase::Idle;
        for team in state.teams.values_mut() {
            team.clear();
        }
        let event = GameServerEvent::GameReset(GameReset {
            teams: state.teams.clone(),
            current_question: None,
            game_active: false,
            show_answer: false,
        });
        self.hub.emit_to_room(DISPLAY_ROOM, event.clone()).await;
        self.hub.emit_to_room(SCOREBOARD_ROOM, event).await;
        drop(state);

        info!("game reset");
        if let Some(recorder) = &self.recorder {
            recorder.restart().await;
        }
        Notice {
            message: "Juego reiniciado".into(),
        }
    }

    /// Applies one push-channel command and returns the reply for its sender, if any.
    pub async fn handle(
        &self,
        subscriber: SubscriberId,
        event: GameClientEvent,
    ) -> Option<GameServerEvent> {
        match event {
            GameClientEvent::Join { room } => self
                .join(subscriber, &room)
                .await
                .map_err(|e| rejected("join", e))
                .err()
                .map(GameServerEvent::Error),
            GameClientEvent::Leave { room } => self
                .leave(subscriber, &room)
                .await
                .map_err(|e| rejected("leave", e))
                .err()
                .map(GameServerEvent::Error),
            GameClientEvent::SendQuestion {
                question_id,
                target_team,
            } => {
                let sent = match question_id {
                    Some(id) => {
                        self.send_question(QuestionId(id), target_team.as_deref())
                            .await
                    }
                    None => Err(ApiError::not_found("Pregunta no encontrada")),
                };
                Some(GameServerEvent::QuestionSent(Ack::from(
                    sent.map_err(|e| rejected("send_question", e)),
                )))
            }
            GameClientEvent::ShowAnswer => Some(GameServerEvent::AnswerShown(Ack::from(
                self.show_answer()
                    .await
                    .map_err(|e| rejected("show_answer", e)),
            ))),
            GameClientEvent::UpdateScore { team_id, points } => {
                Some(GameServerEvent::ScoreUpdateConfirmed(Ack::from(
                    self.update_score(&team_id, points)
                        .await
                        .map_err(|e| rejected("update_score", e)),
                )))
            }
            GameClientEvent::TeamAnswer { team_id, answer } => {
                Some(GameServerEvent::AnswerResult(Ack::from(
                    self.team_answer(&team_id, &answer)
                        .await
                        .map_err(|e| rejected("team_answer", e)),
                )))
            }
            GameClientEvent::ResetGame => Some(GameServerEvent::ResetConfirmed(Ack::Success(
                self.reset_game().await,
            ))),
            GameClientEvent::GetGameState => Some(GameServerEvent::GameState(self.game_state().await)),
        }
    }
}

fn room_name(raw: &str) -> Result<&str, ApiError> {
    let room = raw.trim();
    if room.is_empty() {
        return Err(ApiError::validation("Sala no puede estar vacía"));
    }
    Ok(room)
}

fn rejected(command: &'static str, error: ApiError) -> ApiError {
    warn!(command, code = ?error.code, message = %error.message, "command rejected");
    error
}

#[cfg(test)]
#[path = "tests/game_tests.rs"]
mod tests;
