//! Core data model types for calcbot.
//!
//! These are the values that flow between the engines, the session store,
//! and the chat gateway.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one user's quiz progress (the chat user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey(pub i64);

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Quiz
// ---------------------------------------------------------------------------

/// A multiple-choice question from the question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// The question text shown to the user.
    pub text: String,
    /// Answer options, in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct: usize,
}

/// Progress of one user through the quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    /// Who this session belongs to.
    pub key: SessionKey,
    /// Zero-based pointer to the current question.
    pub index: usize,
    /// Number of questions currently answered correctly.
    pub score: u32,
    /// Chosen option per question index.
    #[serde(default)]
    pub answers: BTreeMap<usize, usize>,
}

impl QuizSession {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            index: 0,
            score: 0,
            answers: BTreeMap::new(),
        }
    }
}

/// Final result of a finished quiz, delivered to the user and the admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizOutcome {
    pub key: SessionKey,
    /// "First Last" of the user, trimmed.
    pub display_name: String,
    pub score: u32,
    pub total: usize,
    pub finished_at: DateTime<Utc>,
}

impl QuizOutcome {
    /// Message for the user who finished the quiz.
    pub fn user_text(&self) -> String {
        format!("Тест завершен! Ваш счет: {}/{}", self.score, self.total)
    }

    /// Summary line for the admin channel.
    pub fn admin_text(&self) -> String {
        format!(
            "Пользователь {} (ID: {}) завершил тест с результатом {}/{}.",
            self.display_name, self.key, self.score, self.total
        )
    }
}

// ---------------------------------------------------------------------------
// Function analysis
// ---------------------------------------------------------------------------

/// A real root of the derivative together with the function value there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPoint {
    pub x: f64,
    /// `x` rounded to two decimals for display.
    pub formatted: String,
    /// `f(x)`, always finite.
    pub value: f64,
}

/// Discretized `(x, f(x))` pairs used to draw the graph.
///
/// Points where `f` is undefined carry `NaN` in `ys`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleCurve {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl SampleCurve {
    /// Iterate over the finite points only.
    pub fn finite_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs
            .iter()
            .copied()
            .zip(self.ys.iter().copied())
            .filter(|(_, y)| y.is_finite())
    }
}

/// Everything the analysis pipeline produces for one expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The parsed expression, printed back; used as the plot legend.
    pub expression_label: String,
    /// The simplified derivative, printed.
    pub derivative_text: String,
    /// Real critical points in solver order.
    pub critical_points: Vec<CriticalPoint>,
    pub curve: SampleCurve,
}

impl AnalysisResult {
    /// The textual report sent before the plot.
    pub fn summary(&self) -> String {
        let points: Vec<&str> = self
            .critical_points
            .iter()
            .map(|p| p.formatted.as_str())
            .collect();
        format!(
            "Производная функции: {}\nКритические точки: {}",
            self.derivative_text,
            points.join(", ")
        )
    }
}

// ---------------------------------------------------------------------------
// Chat actions
// ---------------------------------------------------------------------------

/// Slash commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Help,
}

impl FromStr for Command {
    type Err = String;

    /// Accepts `/start`, `start`, and the `/start@botname` group form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('/');
        let name = name.split('@').next().unwrap_or_default();
        match name.to_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

/// Inline button callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    EnterFunction,
    ShowDocs,
    StartTest,
    BackToMenu,
    PrevQuestion,
    Answer(usize),
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonAction::EnterFunction => write!(f, "enter_function"),
            ButtonAction::ShowDocs => write!(f, "show_docs"),
            ButtonAction::StartTest => write!(f, "start_test"),
            ButtonAction::BackToMenu => write!(f, "back_to_menu"),
            ButtonAction::PrevQuestion => write!(f, "prev_question"),
            ButtonAction::Answer(n) => write!(f, "answer_{n}"),
        }
    }
}

impl FromStr for ButtonAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enter_function" => Ok(ButtonAction::EnterFunction),
            "show_docs" => Ok(ButtonAction::ShowDocs),
            "start_test" => Ok(ButtonAction::StartTest),
            "back_to_menu" => Ok(ButtonAction::BackToMenu),
            "prev_question" => Ok(ButtonAction::PrevQuestion),
            other => other
                .strip_prefix("answer_")
                .and_then(|n| n.parse::<usize>().ok())
                .map(ButtonAction::Answer)
                .ok_or_else(|| format!("unknown button: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_action_display_and_parse() {
        for action in [
            ButtonAction::EnterFunction,
            ButtonAction::ShowDocs,
            ButtonAction::StartTest,
            ButtonAction::BackToMenu,
            ButtonAction::PrevQuestion,
            ButtonAction::Answer(3),
        ] {
            assert_eq!(action.to_string().parse::<ButtonAction>(), Ok(action));
        }
        assert!("answer_".parse::<ButtonAction>().is_err());
        assert!("answer_x".parse::<ButtonAction>().is_err());
        assert!("delete_everything".parse::<ButtonAction>().is_err());
    }

    #[test]
    fn command_parse() {
        assert_eq!("/start".parse::<Command>(), Ok(Command::Start));
        assert_eq!("/help@calc_bot".parse::<Command>(), Ok(Command::Help));
        assert_eq!("START".parse::<Command>(), Ok(Command::Start));
        assert!("/quit".parse::<Command>().is_err());
    }

    #[test]
    fn summary_joins_points() {
        let result = AnalysisResult {
            expression_label: "x**3 - 3*x".into(),
            derivative_text: "3*x**2 - 3".into(),
            critical_points: vec![
                CriticalPoint {
                    x: -1.0,
                    formatted: "-1.00".into(),
                    value: 2.0,
                },
                CriticalPoint {
                    x: 1.0,
                    formatted: "1.00".into(),
                    value: -2.0,
                },
            ],
            curve: SampleCurve::default(),
        };
        assert_eq!(
            result.summary(),
            "Производная функции: 3*x**2 - 3\nКритические точки: -1.00, 1.00"
        );
    }

    #[test]
    fn outcome_texts() {
        let outcome = QuizOutcome {
            key: SessionKey(7),
            display_name: "Ada Lovelace".into(),
            score: 2,
            total: 3,
            finished_at: Utc::now(),
        };
        assert!(outcome.user_text().contains("2/3"));
        assert!(outcome.admin_text().contains("Ada Lovelace (ID: 7)"));
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut session = QuizSession::new(SessionKey(1));
        session.answers.insert(0, 2);
        let json = serde_json::to_string(&session).unwrap();
        let back: QuizSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
