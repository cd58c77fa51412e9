//! Error types for expression analysis and quiz sessions.
//!
//! Analysis failures are kept as tagged values all the way up to the
//! dispatcher, which folds them into a single user-facing message.

use thiserror::Error;

use crate::model::SessionKey;

/// Errors raised while turning user text into an expression tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The input contained nothing but whitespace.
    #[error("expression is empty")]
    Empty,

    /// A character outside the expression grammar.
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    /// A numeric literal that does not parse as a float.
    #[error("invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },

    /// A token in a place the grammar does not allow it.
    #[error("unexpected token '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },

    /// The input stopped in the middle of an expression.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// An identifier other than `x`, a known constant, or a known function.
    #[error("unknown name '{name}', only the variable x is supported")]
    UnknownName { name: String },

    /// A function name not followed by a parenthesised argument.
    #[error("function '{name}' must be followed by '(' and one argument")]
    MissingArgument { name: String },

    /// An opening parenthesis without its closing pair.
    #[error("unclosed '(' at position {position}")]
    UnclosedParen { position: usize },

    /// Parenthesis or operator nesting beyond what the parser accepts.
    #[error("expression is nested too deeply")]
    TooDeep,

    /// Token order rejected by the expression library.
    #[error("malformed expression: {0}")]
    Malformed(String),
}

/// Errors from the function-analysis pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The text is not a valid expression.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The function has no finite value anywhere on the sampled range.
    #[error("function is undefined on the whole range [{from}, {to}]")]
    Evaluation { from: f64, to: f64 },

    /// The analysis did not finish within the configured budget.
    #[error("analysis did not finish within {0}s")]
    Timeout(u64),

    /// Anything else (e.g. the worker running the analysis died).
    #[error("{0}")]
    Unknown(String),
}

impl AnalysisError {
    /// The single message shown to the user for any analysis failure.
    pub fn user_message(&self) -> String {
        format!("Ошибка: {self}")
    }
}

/// Errors from quiz navigation and answering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// The session points past the end of the question bank.
    #[error("question {index} is out of range, the quiz has {len} question(s)")]
    OutOfRange { index: usize, len: usize },

    /// The chosen option does not exist on the current question.
    #[error("option {option} does not exist, the question has {len} option(s)")]
    InvalidOption { option: usize, len: usize },

    /// No quiz is in progress for this session key.
    #[error("no quiz in progress for session {0}")]
    NoSession(SessionKey),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_carries_marker_and_detail() {
        let err = AnalysisError::from(ParseError::UnexpectedToken {
            found: "*".into(),
            position: 3,
        });
        let msg = err.user_message();
        assert!(msg.starts_with("Ошибка: "));
        assert!(msg.contains("unexpected token '*'"));
    }

    #[test]
    fn quiz_error_display() {
        let err = QuizError::OutOfRange { index: 0, len: 0 };
        assert_eq!(
            err.to_string(),
            "question 0 is out of range, the quiz has 0 question(s)"
        );
        assert!(QuizError::NoSession(SessionKey(42))
            .to_string()
            .contains("42"));
    }
}
