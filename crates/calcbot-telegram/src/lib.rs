//! calcbot-telegram: Telegram gateway and bot configuration.
//!
//! Implements the `ChatGateway` trait over the Telegram Bot API, loads the
//! bot's TOML configuration, and provides a recording mock gateway for tests.

pub mod config;
pub mod error;
pub mod mock;
pub mod telegram;

pub use config::{create_gateway, load_config, load_config_from, BotConfig};
pub use error::GatewayError;
pub use mock::MockGateway;
pub use telegram::TelegramGateway;
