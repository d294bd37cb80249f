use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    CategorySummary, Question, QuestionId, QuestionKind, SessionId, TeamRecord,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub kind: QuestionKind,
    pub question: String,
    pub correct_answer: String,
    pub category: String,
    pub difficulty: i64,
    pub options: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StoredSession {
    pub session_id: SessionId,
    pub session_name: String,
    pub created_by: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct SessionTeamScore {
    pub team: TeamRecord,
    pub current_score: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
}

#[derive(Debug, Clone)]
pub struct StoredResponse {
    pub response_id: i64,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub team_id: i64,
    pub team_name: String,
    pub question: String,
    pub correct_answer: String,
    pub given_answer: String,
    pub is_correct: bool,
    pub points_awarded: i64,
    pub answered_at: DateTime<Utc>,
}

const QUESTION_SELECT: &str = "SELECT q.id, q.type, q.question, q.correct_answer, q.difficulty,
        COALESCE(c.name, '') AS category_name, qo.option_text
     FROM questions q
     LEFT JOIN categories c ON c.id = q.category_id
     LEFT JOIN question_options qo ON qo.question_id = q.id";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<CategorySummary>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| CategorySummary {
                id: r.get::<i64, _>(0),
                name: r.get::<String, _>(1),
            })
            .collect())
    }

    pub async fn questions_by_type(&self, kind: QuestionKind) -> Result<Vec<Question>> {
        let rows = sqlx::query(&format!(
            "{QUESTION_SELECT}
             WHERE q.type = ? AND q.is_active = 1
             ORDER BY q.id, qo.option_order"
        ))
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;
        fold_question_rows(rows)
    }

    pub async fn question_by_id(&self, question_id: QuestionId) -> Result<Option<Question>> {
        let rows = sqlx::query(&format!(
            "{QUESTION_SELECT}
             WHERE q.id = ? AND q.is_active = 1
             ORDER BY qo.option_order"
        ))
        .bind(question_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(fold_question_rows(rows)?.into_iter().next())
    }

    /// Inserts a question with its options in one transaction, creating the category on demand.
    pub async fn insert_question(&self, new_question: &NewQuestion) -> Result<QuestionId> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM categories WHERE name = ?")
            .bind(&new_question.category)
            .fetch_optional(&mut *tx)
            .await?;
        let category_id = match existing {
            Some(row) => row.get::<i64, _>(0),
            None => sqlx::query("INSERT INTO categories (name) VALUES (?) RETURNING id")
                .bind(&new_question.category)
                .fetch_one(&mut *tx)
                .await?
                .get::<i64, _>(0),
        };

        let question_id = sqlx::query(
            "INSERT INTO questions (type, question, correct_answer, category_id, difficulty)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(new_question.kind.as_str())
        .bind(&new_question.question)
        .bind(&new_question.correct_answer)
        .bind(category_id)
        .bind(new_question.difficulty)
        .fetch_one(&mut *tx)
        .await?
        .get::<i64, _>(0);

        let options: Vec<String> =
            if new_question.options.is_empty() && new_question.kind == QuestionKind::CiertoFalso {
                vec!["Cierto".to_string(), "Falso".to_string()]
            } else {
                new_question.options.clone()
            };
        for (index, option) in options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO question_options (question_id, option_text, option_order)
                 VALUES (?, ?, ?)",
            )
            .bind(question_id)
            .bind(option)
            .bind(index as i64 + 1)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(QuestionId(question_id))
    }

    pub async fn list_teams(&self) -> Result<Vec<TeamRecord>> {
        let rows =
            sqlx::query("SELECT id, slug, name, color FROM teams WHERE is_active = 1 ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(team_from_row).collect())
    }

    pub async fn ensure_team(&self, slug: &str, name: &str, color: &str) -> Result<i64> {
        let rec = sqlx::query(
            "INSERT INTO teams (slug, name, color) VALUES (?, ?, ?)
             ON CONFLICT(slug) DO UPDATE SET slug=excluded.slug
             RETURNING id",
        )
        .bind(slug)
        .bind(name)
        .bind(color)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.get::<i64, _>(0))
    }

    pub async fn create_game_session(
        &self,
        session_name: &str,
        created_by: &str,
    ) -> Result<SessionId> {
        let rec = sqlx::query(
            "INSERT INTO game_sessions (session_name, created_by) VALUES (?, ?) RETURNING id",
        )
        .bind(session_name)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(SessionId(rec.get::<i64, _>(0)))
    }

    pub async fn add_team_to_session(&self, session_id: SessionId, team_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_teams (session_id, team_id) VALUES (?, ?)
             ON CONFLICT(session_id, team_id) DO NOTHING",
        )
        .bind(session_id.0)
        .bind(team_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_team_score_in_session(
        &self,
        session_id: SessionId,
        team_id: i64,
        points: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE session_teams
             SET current_score = current_score + ?,
                 correct_answers = correct_answers + CASE WHEN ? > 0 THEN 1 ELSE 0 END,
                 wrong_answers = wrong_answers + CASE WHEN ? <= 0 THEN 1 ELSE 0 END
             WHERE session_id = ? AND team_id = ?",
        )
        .bind(points)
        .bind(points)
        .bind(points)
        .bind(session_id.0)
        .bind(team_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_question_response(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        team_id: i64,
        given_answer: &str,
        is_correct: bool,
        points_awarded: i64,
    ) -> Result<i64> {
        let rec = sqlx::query(
            "INSERT INTO question_responses
             (session_id, question_id, team_id, given_answer, is_correct, points_awarded)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(session_id.0)
        .bind(question_id.0)
        .bind(team_id)
        .bind(given_answer)
        .bind(is_correct)
        .bind(points_awarded)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.get::<i64, _>(0))
    }

    pub async fn session_teams(&self, session_id: SessionId) -> Result<Vec<SessionTeamScore>> {
        let rows = sqlx::query(
            "SELECT t.id, t.slug, t.name, t.color, st.current_score, st.correct_answers, st.wrong_answers
             FROM teams t
             INNER JOIN session_teams st ON st.team_id = t.id
             WHERE st.session_id = ? AND t.is_active = 1
             ORDER BY st.current_score DESC, t.name",
        )
        .bind(session_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| SessionTeamScore {
                team: team_from_row(r),
                current_score: r.get::<i64, _>(4),
                correct_answers: r.get::<i64, _>(5),
                wrong_answers: r.get::<i64, _>(6),
            })
            .collect())
    }

    pub async fn session_history(&self, session_id: SessionId) -> Result<Vec<StoredResponse>> {
        let rows = sqlx::query(
            "SELECT qr.id, qr.session_id, qr.question_id, qr.team_id, t.name, q.question,
                    q.correct_answer, qr.given_answer, qr.is_correct, qr.points_awarded, qr.answered_at
             FROM question_responses qr
             INNER JOIN questions q ON q.id = qr.question_id
             INNER JOIN teams t ON t.id = qr.team_id
             WHERE qr.session_id = ?
             ORDER BY qr.answered_at DESC, qr.id DESC",
        )
        .bind(session_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| StoredResponse {
                response_id: r.get::<i64, _>(0),
                session_id: SessionId(r.get::<i64, _>(1)),
                question_id: QuestionId(r.get::<i64, _>(2)),
                team_id: r.get::<i64, _>(3),
                team_name: r.get::<String, _>(4),
                question: r.get::<String, _>(5),
                correct_answer: r.get::<String, _>(6),
                given_answer: r.get::<String, _>(7),
                is_correct: r.get::<bool, _>(8),
                points_awarded: r.get::<i64, _>(9),
                answered_at: r.get::<DateTime<Utc>, _>(10),
            })
            .collect())
    }

    pub async fn list_sessions(&self) -> Result<Vec<StoredSession>> {
        let rows = sqlx::query(
            "SELECT id, session_name, created_by, start_time, end_time, is_active
             FROM game_sessions
             ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| StoredSession {
                session_id: SessionId(r.get::<i64, _>(0)),
                session_name: r.get::<String, _>(1),
                created_by: r.get::<String, _>(2),
                start_time: r.get::<DateTime<Utc>, _>(3),
                end_time: r.get::<Option<DateTime<Utc>>, _>(4),
                is_active: r.get::<bool, _>(5),
            })
            .collect())
    }

    pub async fn end_game_session(&self, session_id: SessionId) -> Result<bool> {
        let affected = sqlx::query(
            "UPDATE game_sessions
             SET end_time = CURRENT_TIMESTAMP, is_active = 0
             WHERE id = ? AND is_active = 1",
        )
        .bind(session_id.0)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }
}

fn team_from_row(r: &SqliteRow) -> TeamRecord {
    TeamRecord {
        id: r.get::<i64, _>(0),
        slug: r.get::<String, _>(1),
        name: r.get::<String, _>(2),
        color: r.get::<String, _>(3),
    }
}

/// Collapses the question/option join, which yields one row per option, into questions.
fn fold_question_rows(rows: Vec<SqliteRow>) -> Result<Vec<Question>> {
    let mut questions: Vec<Question> = Vec::new();
    for r in rows {
        let id = QuestionId(r.get::<i64, _>(0));
        let option = r.get::<Option<String>, _>(6);
        if let Some(last) = questions.last_mut().filter(|q| q.id == id) {
            last.options.extend(option);
            continue;
        }

        let raw_kind = r.get::<String, _>(1);
        let kind = raw_kind
            .parse::<QuestionKind>()
            .map_err(|_| anyhow!("question {} has unknown type '{raw_kind}'", id.0))?;
        questions.push(Question {
            id,
            kind,
            question: r.get::<String, _>(2),
            options: option.into_iter().collect(),
            correct_answer: r.get::<String, _>(3),
            category: r.get::<String, _>(5),
            difficulty: r.get::<i64, _>(4),
        });
    }
    Ok(questions)
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
