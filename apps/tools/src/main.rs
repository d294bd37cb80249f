use std::io::{self, Write};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use shared::domain::{QuestionKind, SessionId};
use storage::{NewQuestion, Storage};

#[derive(Parser, Debug)]
#[command(name = "tools", about = "Quiz database administration")]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/tablero.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Adds a question; true/false questions get "Cierto"/"Falso" when no options are given.
    AddQuestion {
        /// cierto_falso or opcion_multiple
        kind: String,
        question: String,
        correct_answer: String,
        #[arg(long, default_value = "General")]
        category: String,
        #[arg(long, default_value_t = 1)]
        difficulty: i64,
        #[arg(long = "option")]
        options: Vec<String>,
    },
    ListQuestions {
        kind: String,
    },
    ListCategories,
    ListTeams,
    ListSessions,
    SessionTeams {
        session_id: i64,
    },
    SessionHistory {
        session_id: i64,
    },
    EndSession {
        session_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    run(&storage, cli.command, &mut io::stdout().lock()).await
}

async fn run(storage: &Storage, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::AddQuestion {
            kind,
            question,
            correct_answer,
            category,
            difficulty,
            options,
        } => {
            let kind = parse_kind(&kind)?;
            if kind == QuestionKind::OpcionMultiple && options.is_empty() {
                bail!("multiple-choice questions need at least one --option");
            }
            if !options.is_empty() && !options.contains(&correct_answer) {
                bail!("correct answer '{correct_answer}' is not one of the options");
            }
            let question_id = storage
                .insert_question(&NewQuestion {
                    kind,
                    question,
                    correct_answer,
                    category,
                    difficulty,
                    options,
                })
                .await?;
            writeln!(out, "created question_id={}", question_id.0)?;
        }
        Command::ListQuestions { kind } => {
            for q in storage.questions_by_type(parse_kind(&kind)?).await? {
                writeln!(
                    out,
                    "{}\t[{}] {}\t-> {}\t({})",
                    q.id.0,
                    q.category,
                    q.question,
                    q.correct_answer,
                    q.options.join(" | ")
                )?;
            }
        }
        Command::ListCategories => {
            for category in storage.list_categories().await? {
                writeln!(out, "{}\t{}", category.id, category.name)?;
            }
        }
        Command::ListTeams => {
            for team in storage.list_teams().await? {
                writeln!(out, "{}\t{}\t{}\t{}", team.id, team.slug, team.name, team.color)?;
            }
        }
        Command::ListSessions => {
            for session in storage.list_sessions().await? {
                let state = if session.is_active { "active" } else { "closed" };
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{state}",
                    session.session_id.0,
                    session.session_name,
                    session.created_by,
                    session.start_time.to_rfc3339()
                )?;
            }
        }
        Command::SessionTeams { session_id } => {
            for score in storage.session_teams(SessionId(session_id)).await? {
                writeln!(
                    out,
                    "{}\t{}\tcorrect={}\twrong={}",
                    score.team.name, score.current_score, score.correct_answers, score.wrong_answers
                )?;
            }
        }
        Command::SessionHistory { session_id } => {
            for response in storage.session_history(SessionId(session_id)).await? {
                let verdict = if response.is_correct { "correct" } else { "wrong" };
                writeln!(
                    out,
                    "{}\t{}\t{}\t'{}'\t{verdict}\t{:+}",
                    response.answered_at.to_rfc3339(),
                    response.team_name,
                    response.question,
                    response.given_answer,
                    response.points_awarded
                )?;
            }
        }
        Command::EndSession { session_id } => {
            if storage.end_game_session(SessionId(session_id)).await? {
                writeln!(out, "closed session_id={session_id}")?;
            } else {
                writeln!(out, "session_id={session_id} was not active")?;
            }
        }
    }

    Ok(())
}

fn parse_kind(raw: &str) -> Result<QuestionKind> {
    raw.parse()
        .map_err(|()| anyhow!("unknown question type '{raw}'; use cierto_falso or opcion_multiple"))
}
