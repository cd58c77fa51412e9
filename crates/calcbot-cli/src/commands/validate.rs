//! The `calcbot validate` command.

use std::path::PathBuf;

use anyhow::Result;

use calcbot_core::parser::{parse_question_bank, validate_question_bank};

pub fn execute(path: PathBuf) -> Result<()> {
    let questions = parse_question_bank(&path)?;
    println!(
        "Question bank: {} ({} questions)",
        path.display(),
        questions.len()
    );

    let warnings = validate_question_bank(&questions);
    for w in &warnings {
        let prefix = w
            .question_index
            .map(|i| format!("  [question {}]", i + 1))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("All questions valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
