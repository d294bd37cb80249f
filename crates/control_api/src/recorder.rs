use std::collections::BTreeMap;

use anyhow::{Context, Result};
use shared::domain::{QuestionId, SessionId, TeamId, Teams};
use storage::Storage;
use tokio::sync::Mutex;
use tracing::{error, info};

const SESSION_NAME: &str = "Sesión de Juego";
const SESSION_OWNER: &str = "Sistema";

/// Mirrors quiz scoring into the session history tables.
///
/// Failures are logged and never surface to the command that triggered them;
/// the in-memory game stays authoritative.
pub struct SessionRecorder {
    storage: Storage,
    team_rows: BTreeMap<TeamId, i64>,
    session: Mutex<SessionId>,
}

impl SessionRecorder {
    pub async fn start(storage: Storage, teams: &Teams) -> Result<Self> {
        let mut team_rows = BTreeMap::new();
        for (id, team) in teams {
            let row = storage
                .ensure_team(id.as_str(), &team.name, &team.color)
                .await
                .with_context(|| format!("registering team {id}"))?;
            team_rows.insert(*id, row);
        }
        let session = open_session(&storage, &team_rows).await?;
        info!(session_id = session.0, "game session opened");

        Ok(Self {
            storage,
            team_rows,
            session: Mutex::new(session),
        })
    }

    pub async fn current_session(&self) -> SessionId {
        *self.session.lock().await
    }

    pub async fn record_score(&self, team: TeamId, points: i64) {
        let session = self.session.lock().await;
        if let Err(err) = self.try_record_score(*session, team, points).await {
            error!(session_id = session.0, %team, error = %err, "failed to record score");
        }
    }

    pub async fn record_answer(
        &self,
        team: TeamId,
        question_id: QuestionId,
        answer: &str,
        is_correct: bool,
        points: i64,
    ) {
        let session = self.session.lock().await;
        let result = async {
            let row = self.team_row(team)?;
            self.storage
                .record_question_response(*session, question_id, row, answer, is_correct, points)
                .await?;
            self.try_record_score(*session, team, points).await
        }
        .await;
        if let Err(err) = result {
            error!(session_id = session.0, %team, error = %err, "failed to record answer");
        }
    }

    /// Closes the running session and opens a fresh one.
    pub async fn restart(&self) {
        let mut session = self.session.lock().await;
        let result = async {
            self.storage.end_game_session(*session).await?;
            open_session(&self.storage, &self.team_rows).await
        }
        .await;
        match result {
            Ok(next) => {
                info!(previous = session.0, session_id = next.0, "game session restarted");
                *session = next;
            }
            Err(err) => error!(session_id = session.0, error = %err, "failed to restart session"),
        }
    }

    async fn try_record_score(&self, session: SessionId, team: TeamId, points: i64) -> Result<()> {
        let row = self.team_row(team)?;
        self.storage
            .update_team_score_in_session(session, row, points)
            .await
    }

    fn team_row(&self, team: TeamId) -> Result<i64> {
        self.team_rows
            .get(&team)
            .copied()
            .with_context(|| format!("team {team} has no stored row"))
    }
}

async fn open_session(storage: &Storage, team_rows: &BTreeMap<TeamId, i64>) -> Result<SessionId> {
    let session = storage
        .create_game_session(SESSION_NAME, SESSION_OWNER)
        .await
        .context("opening game session")?;
    for row in team_rows.values() {
        storage.add_team_to_session(session, *row).await?;
    }
    Ok(session)
}
