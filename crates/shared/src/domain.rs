use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(QuestionId);
id_newtype!(SessionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamId {
    Team1,
    Team2,
}

impl TeamId {
    pub const ALL: [TeamId; 2] = [TeamId::Team1, TeamId::Team2];

    pub fn as_str(self) -> &'static str {
        match self {
            TeamId::Team1 => "team1",
            TeamId::Team2 => "team2",
        }
    }

    pub fn default_name(self) -> &'static str {
        match self {
            TeamId::Team1 => "Equipo Azul",
            TeamId::Team2 => "Equipo Rojo",
        }
    }

    pub fn default_color(self) -> &'static str {
        match self {
            TeamId::Team1 => "blue-600",
            TeamId::Team2 => "red-600",
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamId {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "team1" => Ok(TeamId::Team1),
            "team2" => Ok(TeamId::Team2),
            _ => Err(()),
        }
    }
}

/// Which team(s) may answer the live question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTeam {
    Team1,
    Team2,
    #[default]
    Both,
}

impl TargetTeam {
    pub fn admits(self, team: TeamId) -> bool {
        match self {
            TargetTeam::Both => true,
            TargetTeam::Team1 => team == TeamId::Team1,
            TargetTeam::Team2 => team == TeamId::Team2,
        }
    }
}

impl FromStr for TargetTeam {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "team1" => Ok(TargetTeam::Team1),
            "team2" => Ok(TargetTeam::Team2),
            "both" => Ok(TargetTeam::Both),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    CiertoFalso,
    OpcionMultiple,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::CiertoFalso => "cierto_falso",
            QuestionKind::OpcionMultiple => "opcion_multiple",
        }
    }
}

impl FromStr for QuestionKind {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "cierto_falso" => Ok(QuestionKind::CiertoFalso),
            "opcion_multiple" => Ok(QuestionKind::OpcionMultiple),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub category: String,
    pub difficulty: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub score: i64,
    pub color: String,
    pub correct_answers: i64,
    pub wrong_answers: i64,
}

impl Team {
    pub fn fresh(id: TeamId) -> Self {
        Self {
            name: id.default_name().to_string(),
            score: 0,
            color: id.default_color().to_string(),
            correct_answers: 0,
            wrong_answers: 0,
        }
    }

    /// Points above zero count as a correct answer, anything else as a wrong one.
    /// A score that would leave the `i64` range is refused and nothing changes.
    pub fn award(&mut self, points: i64) -> Result<(), ApiError> {
        self.score = self
            .score
            .checked_add(points)
            .ok_or_else(|| ApiError::validation("Puntos fuera de rango"))?;
        if points > 0 {
            self.correct_answers += 1;
        } else {
            self.wrong_answers += 1;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.score = 0;
        self.correct_answers = 0;
        self.wrong_answers = 0;
    }
}

pub type Teams = BTreeMap<TeamId, Team>;

pub fn default_teams() -> Teams {
    TeamId::ALL
        .into_iter()
        .map(|id| (id, Team::fresh(id)))
        .collect()
}

/// Wire projection of the quiz state shared by every viewer role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub current_question: Option<Question>,
    pub target_team: TargetTeam,
    pub teams: Teams,
    pub game_active: bool,
    pub show_answer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarqueeState {
    pub text: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionState {
    pub visible: bool,
    pub message: String,
    pub church_name: String,
    pub service_info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayState {
    pub marquee: MarqueeState,
    pub transition: TransitionState,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            marquee: MarqueeState {
                text: "Bienvenidos a Iglesia Agua Viva ✝ Servicio Dominical - 10:00 AM 🙏 Unidos en fe y oración"
                    .into(),
                visible: true,
            },
            transition: TransitionState {
                visible: false,
                message: "Mientras tanto...".into(),
                church_name: "Iglesia Agua Viva".into(),
                service_info: "Servicio Dominical - 10:00 AM".into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub color: String,
}
