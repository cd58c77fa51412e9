//! The `calcbot init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("calcbot.toml"), SAMPLE_CONFIG)?;
    write_if_missing(Path::new("questions.toml"), SAMPLE_QUESTIONS)?;

    println!("\nNext steps:");
    println!("  1. Put your bot token in calcbot.toml or export CALCBOT_TOKEN");
    println!("  2. Run: calcbot validate --questions questions.toml");
    println!("  3. Run: calcbot run");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# calcbot configuration

telegram_token = "${CALCBOT_TELEGRAM_TOKEN}"

# Chat that receives quiz results (optional).
# admin_chat_id = 123456789

questions_path = "questions.toml"

poll_timeout_secs = 30
poll_retry_delay_ms = 1000
analysis_timeout_secs = 10
plot_width = 800
plot_height = 600
"#;

const SAMPLE_QUESTIONS: &str = r#"[[questions]]
text = "Чему равна производная x**2?"
options = ["2*x", "x", "x**3/3", "2"]
correct = 0

[[questions]]
text = "Чему равна производная sin(x)?"
options = ["-cos(x)", "cos(x)", "sin(x)", "tan(x)"]
correct = 1

[[questions]]
text = "Где находится критическая точка функции x**2 - 4*x + 4?"
options = ["x = -2", "x = 0", "x = 2", "x = 4"]
correct = 2
"#;
