//! calcbot-bot: event dispatcher and polling loop.
//!
//! [`Bot`] turns inbound chat events into engine calls and replies. It owns
//! no transport: everything goes through a [`ChatGateway`], so the same
//! dispatcher runs against Telegram or the mock gateway in tests.

pub mod messages;

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use calcbot_core::analysis::ExpressionEngine;
use calcbot_core::error::{AnalysisError, QuizError};
use calcbot_core::model::{AnalysisResult, ButtonAction, Command, QuizSession};
use calcbot_core::quiz::{AnswerOutcome, NavOutcome, QuizEngine};
use calcbot_core::traits::{ChatGateway, ChatId, EventKind, IncomingEvent, OutgoingMessage, QuizStore};
use calcbot_render::PlotOptions;

/// Runtime knobs for the dispatcher.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Chat that receives quiz results. Results are only logged when unset.
    pub admin_chat_id: Option<ChatId>,
    /// Upper bound on one function analysis.
    pub analysis_timeout: Duration,
    /// Pause after a failed poll.
    pub poll_retry_delay: Duration,
    pub plot: PlotOptions,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            admin_chat_id: None,
            analysis_timeout: Duration::from_secs(10),
            poll_retry_delay: Duration::from_secs(1),
            plot: PlotOptions::default(),
        }
    }
}

/// The chat bot: routes events to the analysis pipeline and the quiz.
pub struct Bot {
    gateway: Arc<dyn ChatGateway>,
    store: Arc<dyn QuizStore>,
    quiz: QuizEngine,
    engine: ExpressionEngine,
    settings: BotSettings,
    /// Chats whose next free-text message is a function to analyse.
    awaiting: Mutex<HashSet<ChatId>>,
}

impl Bot {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        store: Arc<dyn QuizStore>,
        quiz: QuizEngine,
        settings: BotSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            quiz,
            engine: ExpressionEngine::default(),
            settings,
            awaiting: Mutex::new(HashSet::new()),
        }
    }

    /// Replace the default analysis engine.
    pub fn with_engine(mut self, engine: ExpressionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Whether the next text message in `chat` will be analysed.
    pub fn is_awaiting_function(&self, chat: ChatId) -> bool {
        self.awaiting().contains(&chat)
    }

    fn awaiting(&self) -> MutexGuard<'_, HashSet<ChatId>> {
        self.awaiting.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Poll the gateway and handle events until `shutdown` resolves.
    ///
    /// A failing event is logged and skipped; a failing poll is retried
    /// after `poll_retry_delay`.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!(
            gateway = self.gateway.name(),
            questions = self.quiz.len(),
            "bot started"
        );
        tokio::pin!(shutdown);

        loop {
            let polled = tokio::select! {
                _ = &mut shutdown => break,
                polled = self.gateway.poll() => polled,
            };

            match polled {
                Ok(events) => {
                    for event in events {
                        let chat = event.chat_id;
                        if let Err(e) = self.handle(event).await {
                            error!(%chat, "failed to handle event: {e:#}");
                        }
                    }
                }
                Err(e) => {
                    error!("poll failed: {e:#}");
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.settings.poll_retry_delay) => {}
                    }
                }
            }
        }

        info!("bot stopped");
        Ok(())
    }

    /// Handle one inbound event.
    pub async fn handle(&self, event: IncomingEvent) -> Result<()> {
        let chat = event.chat_id;
        match &event.kind {
            EventKind::Command(command) => {
                debug!(%chat, ?command, "command");
                self.awaiting().remove(&chat);
                match command {
                    Command::Start | Command::Help => self.send(chat, messages::welcome()).await,
                }
            }
            EventKind::Button { callback_id, data } => {
                if let Err(e) = self.gateway.acknowledge(callback_id).await {
                    warn!(%chat, "failed to acknowledge button: {e:#}");
                }
                match event.kind.action() {
                    Some(action) => self.handle_action(&event, action).await,
                    None => {
                        warn!(%chat, data = %data, "ignoring unknown button");
                        Ok(())
                    }
                }
            }
            EventKind::Text(text) => {
                let awaiting = self.awaiting().remove(&chat);
                if awaiting {
                    self.analyze_function(chat, event.message_id, text.clone())
                        .await
                } else {
                    self.send(chat, OutgoingMessage::text(messages::TEXT_HINT))
                        .await
                }
            }
        }
    }

    async fn handle_action(&self, event: &IncomingEvent, action: ButtonAction) -> Result<()> {
        let chat = event.chat_id;
        debug!(%chat, %action, "button");
        match action {
            ButtonAction::EnterFunction => {
                self.awaiting().insert(chat);
                self.send(chat, OutgoingMessage::text(messages::FUNCTION_PROMPT))
                    .await
            }
            ButtonAction::ShowDocs => self.send(chat, messages::docs()).await,
            ButtonAction::BackToMenu => {
                self.awaiting().remove(&chat);
                self.send(chat, messages::welcome()).await
            }
            ButtonAction::StartTest => self.start_quiz(event).await,
            ButtonAction::Answer(option) => self.answer(event, option).await,
            ButtonAction::PrevQuestion => self.go_back(event).await,
        }
    }

    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> Result<()> {
        self.gateway
            .send_message(chat, &message)
            .await
            .with_context(|| format!("failed to send message to chat {chat}"))
    }

    // -----------------------------------------------------------------------
    // Function analysis
    // -----------------------------------------------------------------------

    async fn analyze_function(
        &self,
        chat: ChatId,
        reply_to: Option<i64>,
        input: String,
    ) -> Result<()> {
        let result = match self.run_analysis(input.clone()).await {
            Ok(result) => result,
            Err(e) => {
                warn!(%chat, input = %input, "analysis failed: {e}");
                let reply = OutgoingMessage::text(e.user_message()).reply_to(reply_to);
                return self.send(chat, reply).await;
            }
        };

        info!(
            %chat,
            function = %result.expression_label,
            critical_points = result.critical_points.len(),
            "function analysed"
        );
        self.send(chat, OutgoingMessage::text(result.summary()).reply_to(reply_to))
            .await?;

        match self.render_plot(result).await {
            Ok(png) => {
                if let Err(e) = self
                    .gateway
                    .send_image(chat, png, messages::PLOT_CAPTION)
                    .await
                {
                    error!(%chat, "failed to send plot: {e:#}");
                }
            }
            Err(e) => error!(%chat, "failed to render plot: {e:#}"),
        }

        self.send(chat, messages::follow_up()).await
    }

    /// Run the pipeline on a blocking thread, bounded by `analysis_timeout`.
    ///
    /// On timeout the blocking task is left to finish on its own; its result
    /// is dropped.
    async fn run_analysis(&self, input: String) -> Result<AnalysisResult, AnalysisError> {
        let engine = self.engine.clone();
        let task = tokio::task::spawn_blocking(move || engine.analyze(&input));

        match tokio::time::timeout(self.settings.analysis_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AnalysisError::Unknown(join_error.to_string())),
            Err(_) => Err(AnalysisError::Timeout(
                self.settings.analysis_timeout.as_secs(),
            )),
        }
    }

    async fn render_plot(&self, result: AnalysisResult) -> Result<Vec<u8>> {
        let options = self.settings.plot;
        let png = tokio::task::spawn_blocking(move || {
            calcbot_render::render_result(&result, &options)
        })
        .await
        .context("plot task failed")??;
        Ok(png)
    }

    // -----------------------------------------------------------------------
    // Quiz
    // -----------------------------------------------------------------------

    async fn start_quiz(&self, event: &IncomingEvent) -> Result<()> {
        let key = event.user.session_key();
        let session = match self.quiz.start(key) {
            Ok(session) => session,
            Err(e) => return self.quiz_error(event.chat_id, e).await,
        };
        info!(%key, "quiz started");
        self.ask(event.chat_id, session).await
    }

    async fn answer(&self, event: &IncomingEvent, option: usize) -> Result<()> {
        let chat = event.chat_id;
        let key = event.user.session_key();
        let Some(mut session) = self.store.get(key) else {
            return self.quiz_error(chat, QuizError::NoSession(key)).await;
        };

        match self.quiz.answer(&mut session, option) {
            Ok(AnswerOutcome::Next) => self.ask(chat, session).await,
            Ok(AnswerOutcome::Completed) => {
                self.store.remove(key);
                let outcome = self.quiz.finish(session, &event.user.display_name());
                info!(
                    %key,
                    score = outcome.score,
                    total = outcome.total,
                    "quiz completed"
                );
                self.send(chat, OutgoingMessage::text(outcome.user_text()))
                    .await?;
                match self.settings.admin_chat_id {
                    Some(admin) => {
                        self.send(admin, OutgoingMessage::text(outcome.admin_text()))
                            .await
                    }
                    None => {
                        warn!(%key, "no admin chat configured, result not forwarded");
                        Ok(())
                    }
                }
            }
            Err(e) => self.quiz_error(chat, e).await,
        }
    }

    async fn go_back(&self, event: &IncomingEvent) -> Result<()> {
        let chat = event.chat_id;
        let key = event.user.session_key();
        let Some(mut session) = self.store.get(key) else {
            return self.quiz_error(chat, QuizError::NoSession(key)).await;
        };

        match self.quiz.go_back(&mut session) {
            NavOutcome::Moved => self.ask(chat, session).await,
            NavOutcome::AtFirstQuestion => {
                self.send(chat, OutgoingMessage::text(messages::FIRST_QUESTION_NOTICE))
                    .await
            }
        }
    }

    /// Store `session` and send its current question.
    async fn ask(&self, chat: ChatId, session: QuizSession) -> Result<()> {
        let message = match self.quiz.current_question(&session) {
            Ok(question) => messages::question(session.index, question),
            Err(e) => return self.quiz_error(chat, e).await,
        };
        self.store.put(session.key, session);
        self.send(chat, message).await
    }

    async fn quiz_error(&self, chat: ChatId, err: QuizError) -> Result<()> {
        warn!(%chat, "quiz request rejected: {err}");
        self.send(chat, messages::quiz_error(&err)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = BotSettings::default();
        assert!(settings.admin_chat_id.is_none());
        assert_eq!(settings.analysis_timeout, Duration::from_secs(10));
        assert_eq!(settings.plot, PlotOptions::default());
    }
}
