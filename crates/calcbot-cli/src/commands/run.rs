//! The `calcbot run` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use calcbot_bot::{Bot, BotSettings};
use calcbot_core::parser::{default_question_bank, parse_question_bank, validate_question_bank};
use calcbot_core::store::InMemoryQuizStore;
use calcbot_core::traits::{ChatGateway, ChatId};
use calcbot_core::QuizEngine;
use calcbot_render::PlotOptions;
use calcbot_telegram::config::{create_gateway, load_config_from, BotConfig};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    anyhow::ensure!(
        config.analysis_timeout_secs >= 1,
        "analysis_timeout_secs must be at least 1"
    );
    anyhow::ensure!(
        config.plot_width > 0 && config.plot_height > 0,
        "plot_width and plot_height must be positive"
    );

    let questions = match &config.questions_path {
        Some(path) => parse_question_bank(path)?,
        None => {
            info!("no questions_path configured, using the built-in question bank");
            default_question_bank()
        }
    };
    for w in validate_question_bank(&questions) {
        match w.question_index {
            Some(i) => warn!("question {}: {}", i + 1, w.message),
            None => warn!("{}", w.message),
        }
    }
    if config.admin_chat_id.is_none() {
        warn!("admin_chat_id is not set, quiz results will only be logged");
    }

    let gateway: Arc<dyn ChatGateway> = Arc::from(create_gateway(&config)?);
    let bot = Bot::new(
        gateway,
        Arc::new(InMemoryQuizStore::new()),
        QuizEngine::new(questions),
        settings_from(&config),
    );

    eprintln!(
        "calcbot v{} polling {} (Ctrl-C to stop)",
        env!("CARGO_PKG_VERSION"),
        config.api_base_url
    );
    bot.run(shutdown_signal()).await
}

fn settings_from(config: &BotConfig) -> BotSettings {
    BotSettings {
        admin_chat_id: config.admin_chat_id.map(ChatId),
        analysis_timeout: Duration::from_secs(config.analysis_timeout_secs),
        poll_retry_delay: Duration::from_millis(config.poll_retry_delay_ms),
        plot: PlotOptions {
            width: config.plot_width,
            height: config.plot_height,
        },
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
