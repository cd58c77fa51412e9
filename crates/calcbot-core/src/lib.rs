//! calcbot-core: expression analysis, quiz state machine, and gateway traits.
//!
//! This crate holds everything the bot does that does not touch the network:
//! the function-analysis pipeline, the quiz engine and its session store, the
//! question-bank loader, and the trait the chat transport implements.

pub mod analysis;
pub mod error;
pub mod expr;
pub mod model;
pub mod parser;
pub mod quiz;
pub mod store;
pub mod traits;

pub use analysis::{AnalysisOptions, ExpressionEngine};
pub use error::{AnalysisError, ParseError, QuizError};
pub use quiz::QuizEngine;
pub use store::InMemoryQuizStore;
