//! Quiz state machine: start, answer, go back, finish.
//!
//! The engine owns the immutable question bank and mutates sessions handed
//! to it; where sessions live is up to the [`crate::traits::QuizStore`].

use chrono::Utc;
use tracing::debug;

use crate::error::QuizError;
use crate::model::{Question, QuizOutcome, QuizSession, SessionKey};

/// What happened after an answer was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// There is another question at the session's new index.
    Next,
    /// That was the last question.
    Completed,
}

/// Result of a "previous question" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// The session moved back one question.
    Moved,
    /// Already on the first question; nothing changed.
    AtFirstQuestion,
}

#[derive(Debug, Clone)]
pub struct QuizEngine {
    questions: Vec<Question>,
}

impl QuizEngine {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Fresh session positioned on the first question.
    pub fn start(&self, key: SessionKey) -> Result<QuizSession, QuizError> {
        if self.questions.is_empty() {
            return Err(QuizError::OutOfRange { index: 0, len: 0 });
        }
        debug!(%key, "quiz started");
        Ok(QuizSession::new(key))
    }

    pub fn current_question(&self, session: &QuizSession) -> Result<&Question, QuizError> {
        self.questions
            .get(session.index)
            .ok_or(QuizError::OutOfRange {
                index: session.index,
                len: self.questions.len(),
            })
    }

    /// Record `option` for the current question and move forward.
    ///
    /// Credit is tracked per question: answering a question again replaces
    /// the earlier answer, so the score never counts a question twice.
    pub fn answer(
        &self,
        session: &mut QuizSession,
        option: usize,
    ) -> Result<AnswerOutcome, QuizError> {
        let question = self.current_question(session)?;
        if option >= question.options.len() {
            return Err(QuizError::InvalidOption {
                option,
                len: question.options.len(),
            });
        }

        let index = session.index;
        if let Some(previous) = session.answers.insert(index, option) {
            if previous == question.correct {
                session.score = session.score.saturating_sub(1);
            }
        }
        if option == question.correct {
            session.score += 1;
        }
        session.index += 1;

        debug!(key = %session.key, index, option, score = session.score, "answer recorded");

        if self.is_complete(session) {
            Ok(AnswerOutcome::Completed)
        } else {
            Ok(AnswerOutcome::Next)
        }
    }

    /// Step back one question. The recorded answer stays until replaced.
    pub fn go_back(&self, session: &mut QuizSession) -> NavOutcome {
        if session.index == 0 {
            return NavOutcome::AtFirstQuestion;
        }
        session.index -= 1;
        NavOutcome::Moved
    }

    pub fn is_complete(&self, session: &QuizSession) -> bool {
        session.index >= self.questions.len()
    }

    /// Close out a session into its final result.
    pub fn finish(&self, session: QuizSession, display_name: &str) -> QuizOutcome {
        QuizOutcome {
            key: session.key,
            display_name: display_name.trim().to_string(),
            score: session.score,
            total: self.questions.len(),
            finished_at: Utc::now(),
        }
    }
}
