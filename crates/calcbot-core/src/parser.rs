//! TOML question bank parser.
//!
//! Loads quiz questions from TOML files and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::Question;

/// Intermediate TOML structure for question bank files.
#[derive(Debug, Deserialize)]
struct TomlQuestionBank {
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    text: String,
    options: Vec<String>,
    correct: usize,
}

/// Parse a question bank file.
pub fn parse_question_bank(path: &Path) -> Result<Vec<Question>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_question_bank_str(&content, path)
}

/// Parse a TOML string into questions (useful for testing).
///
/// A question whose `correct` index does not name one of its options is an
/// error, not a warning: it could never be answered correctly.
pub fn parse_question_bank_str(content: &str, source_path: &Path) -> Result<Vec<Question>> {
    let parsed: TomlQuestionBank = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    parsed
        .questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            if q.correct >= q.options.len() {
                anyhow::bail!(
                    "question {} in {}: correct = {} but there are only {} option(s)",
                    i + 1,
                    source_path.display(),
                    q.correct,
                    q.options.len()
                );
            }
            Ok(Question {
                text: q.text,
                options: q.options,
                correct: q.correct,
            })
        })
        .collect()
}

/// A warning from question bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Zero-based question index (if applicable).
    pub question_index: Option<usize>,
    /// Warning message.
    pub message: String,
}

/// Validate a question bank for common issues.
pub fn validate_question_bank(questions: &[Question]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if questions.is_empty() {
        warnings.push(ValidationWarning {
            question_index: None,
            message: "question bank is empty, the quiz cannot be started".into(),
        });
    }

    let mut seen_texts = HashSet::new();
    for (i, q) in questions.iter().enumerate() {
        let text = q.text.trim();

        if text.is_empty() {
            warnings.push(ValidationWarning {
                question_index: Some(i),
                message: "question text is empty".into(),
            });
        } else if !seen_texts.insert(text) {
            warnings.push(ValidationWarning {
                question_index: Some(i),
                message: format!("duplicate question: {text}"),
            });
        }

        if q.options.len() < 2 {
            warnings.push(ValidationWarning {
                question_index: Some(i),
                message: format!("only {} option(s), a choice needs at least 2", q.options.len()),
            });
        }

        let mut seen_options = HashSet::new();
        for option in &q.options {
            if option.trim().is_empty() {
                warnings.push(ValidationWarning {
                    question_index: Some(i),
                    message: "option label is empty".into(),
                });
            } else if !seen_options.insert(option.trim()) {
                warnings.push(ValidationWarning {
                    question_index: Some(i),
                    message: format!("duplicate option: {}", option.trim()),
                });
            }
        }
    }

    warnings
}

/// The question bank used when none is configured.
pub fn default_question_bank() -> Vec<Question> {
    let q = |text: &str, options: &[&str], correct: usize| Question {
        text: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct,
    };

    vec![
        q("Чему равна производная x**2?", &["2*x", "x", "x**3/3", "2"], 0),
        q("Чему равна производная sin(x)?", &["-cos(x)", "cos(x)", "sin(x)", "tan(x)"], 1),
        q(
            "Где находится критическая точка функции x**2 - 4*x + 4?",
            &["x = -2", "x = 0", "x = 2", "x = 4"],
            2,
        ),
        q("Чему равна производная константы?", &["1", "Сама константа", "0", "x"], 2),
        q("Чему равна производная exp(x)?", &["x*exp(x)", "exp(x)", "1", "log(x)"], 1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[[questions]]
text = "2 + 2 = ?"
options = ["3", "4", "5"]
correct = 1

[[questions]]
text = "d/dx x**2 = ?"
options = ["x", "2*x"]
correct = 1
"#;

    #[test]
    fn parse_valid_toml() {
        let questions = parse_question_bank_str(VALID_TOML, &PathBuf::from("q.toml")).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].options, vec!["3", "4", "5"]);
        assert_eq!(questions[1].correct, 1);
        assert!(validate_question_bank(&questions).is_empty());
    }

    #[test]
    fn reject_correct_out_of_range() {
        let toml = r#"
[[questions]]
text = "Broken"
options = ["a", "b"]
correct = 2
"#;
        let err = parse_question_bank_str(toml, &PathBuf::from("q.toml")).unwrap_err();
        assert!(err.to_string().contains("only 2 option(s)"));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_question_bank_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn missing_field_is_an_error() {
        let toml = r#"
[[questions]]
text = "No answer key"
options = ["a", "b"]
"#;
        assert!(parse_question_bank_str(toml, &PathBuf::from("q.toml")).is_err());
    }

    #[test]
    fn validate_common_issues() {
        let toml = r#"
[[questions]]
text = "Same"
options = ["only"]
correct = 0

[[questions]]
text = "Same"
options = ["a", "a"]
correct = 0

[[questions]]
text = "  "
options = ["a", ""]
correct = 0
"#;
        let questions = parse_question_bank_str(toml, &PathBuf::from("q.toml")).unwrap();
        let warnings = validate_question_bank(&questions);
        let has = |index: usize, needle: &str| {
            warnings
                .iter()
                .any(|w| w.question_index == Some(index) && w.message.contains(needle))
        };
        assert!(has(0, "only 1 option"));
        assert!(has(1, "duplicate question"));
        assert!(has(1, "duplicate option"));
        assert!(has(2, "text is empty"));
        assert!(has(2, "option label is empty"));
    }

    #[test]
    fn validate_empty_bank() {
        let questions = parse_question_bank_str("", &PathBuf::from("q.toml")).unwrap();
        let warnings = validate_question_bank(&questions);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].question_index.is_none());
    }

    #[test]
    fn default_bank_is_valid() {
        let questions = default_question_bank();
        assert!(!questions.is_empty());
        assert!(validate_question_bank(&questions).is_empty());
        assert!(questions.iter().all(|q| q.correct < q.options.len()));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.toml");
        std::fs::write(&path, VALID_TOML).unwrap();
        assert_eq!(parse_question_bank(&path).unwrap().len(), 2);
        assert!(parse_question_bank(&dir.path().join("missing.toml")).is_err());
    }
}
