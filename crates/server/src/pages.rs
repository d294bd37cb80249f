use shared::domain::TeamId;

pub(crate) const OVERLAY_INDEX: &str = include_str!("../pages/overlay/index.html");
pub(crate) const MARQUEE: &str = include_str!("../pages/overlay/marquee.html");
pub(crate) const TRANSITION: &str = include_str!("../pages/overlay/transition.html");
pub(crate) const CONTROL: &str = include_str!("../pages/overlay/control.html");

pub(crate) const QUIZ_INDEX: &str = include_str!("../pages/quiz/index.html");
pub(crate) const MODERATOR: &str = include_str!("../pages/quiz/moderador.html");
pub(crate) const BOARD: &str = include_str!("../pages/quiz/tablero.html");
pub(crate) const SCOREBOARD: &str = include_str!("../pages/quiz/marcador.html");
const ANSWER_PANEL: &str = include_str!("../pages/quiz/respuestas.html");

pub(crate) const INVALID_TEAM: &str = "Equipo no válido. Use team1 o team2.";

/// Answer panel bound to one team.
pub(crate) fn answer_panel(team: TeamId) -> String {
    let color = match team {
        TeamId::Team1 => "blue",
        TeamId::Team2 => "red",
    };
    ANSWER_PANEL
        .replace("{{team_id}}", team.as_str())
        .replace("{{team_name}}", team.default_name())
        .replace("{{team_color}}", color)
}
