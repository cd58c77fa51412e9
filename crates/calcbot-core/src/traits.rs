//! Trait seams between the dispatcher and the outside world.
//!
//! `QuizStore` holds per-user quiz progress; `ChatGateway` is implemented by
//! the `calcbot-telegram` crate (and its mock).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ButtonAction, Command, QuizSession, SessionKey};

// ---------------------------------------------------------------------------
// Quiz session store
// ---------------------------------------------------------------------------

/// Storage for in-progress quiz sessions, keyed by user.
pub trait QuizStore: Send + Sync {
    /// A copy of the session for `key`, if one exists.
    fn get(&self, key: SessionKey) -> Option<QuizSession>;

    /// Insert or replace the session for `key`.
    fn put(&self, key: SessionKey, session: QuizSession);

    /// Remove and return the session for `key`.
    fn remove(&self, key: SessionKey) -> Option<QuizSession>;
}

// ---------------------------------------------------------------------------
// Chat gateway trait
// ---------------------------------------------------------------------------

/// A chat platform the bot talks through.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Human-readable gateway name (e.g. "telegram").
    fn name(&self) -> &str;

    /// Wait for the next batch of events. May return an empty batch.
    async fn poll(&self) -> anyhow::Result<Vec<IncomingEvent>>;

    /// Send a text message, optionally with an inline keyboard.
    async fn send_message(&self, chat: ChatId, message: &OutgoingMessage) -> anyhow::Result<()>;

    /// Send a PNG image with a caption.
    async fn send_image(&self, chat: ChatId, png: Vec<u8>, caption: &str) -> anyhow::Result<()>;

    /// Tell the platform a button press was handled.
    async fn acknowledge(&self, callback_id: &str) -> anyhow::Result<()>;
}

/// Chat identifier (Telegram chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user behind an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserInfo {
    /// "First Last", or just the first name.
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.trim().is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    /// Quiz progress is tracked per user, not per chat.
    pub fn session_key(&self) -> SessionKey {
        SessionKey(self.id)
    }
}

/// One inbound event from the chat platform.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingEvent {
    pub chat_id: ChatId,
    /// Message the event refers to (the text message, or the message that
    /// carried the pressed button).
    pub message_id: Option<i64>,
    pub user: UserInfo,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A slash command such as `/start`.
    Command(Command),
    /// An inline button press with its callback payload.
    Button { callback_id: String, data: String },
    /// Any other text message.
    Text(String),
}

impl EventKind {
    /// The parsed button action, if this is a press with a known payload.
    pub fn action(&self) -> Option<ButtonAction> {
        match self {
            EventKind::Button { data, .. } => data.parse().ok(),
            _ => None,
        }
    }
}

/// Markup used to interpret message text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
    Html,
}

/// A single inline button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    /// Callback payload sent back when pressed.
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: ButtonAction) -> Self {
        Self {
            label: label.into(),
            data: action.to_string(),
        }
    }
}

/// Inline keyboard, laid out row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// One button per row.
    pub fn column(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    /// All buttons in reading order.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// A text message to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    #[serde(default)]
    pub format: TextFormat,
    #[serde(default)]
    pub keyboard: Option<Keyboard>,
    /// Message id to reply to.
    #[serde(default)]
    pub reply_to: Option<i64>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Plain,
            keyboard: None,
            reply_to: None,
        }
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn reply_to(mut self, message_id: Option<i64>) -> Self {
        self.reply_to = message_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_joins_parts() {
        let mut user = UserInfo {
            id: 1,
            first_name: "Ada".into(),
            last_name: Some("Lovelace".into()),
        };
        assert_eq!(user.display_name(), "Ada Lovelace");
        user.last_name = None;
        assert_eq!(user.display_name(), "Ada");
        assert_eq!(user.session_key(), SessionKey(1));
    }

    #[test]
    fn button_events_parse_their_payload() {
        let kind = EventKind::Button {
            callback_id: "cb".into(),
            data: "answer_2".into(),
        };
        assert_eq!(kind.action(), Some(ButtonAction::Answer(2)));

        let unknown = EventKind::Button {
            callback_id: "cb".into(),
            data: "nope".into(),
        };
        assert_eq!(unknown.action(), None);
        assert_eq!(EventKind::Text("answer_1".into()).action(), None);
    }

    #[test]
    fn keyboard_layout() {
        let kb = Keyboard::column([
            Button::new("A", ButtonAction::ShowDocs),
            Button::new("B", ButtonAction::StartTest),
        ])
        .row(vec![])
        .row(vec![Button::new("C", ButtonAction::BackToMenu)]);
        assert_eq!(kb.rows.len(), 3);
        let data: Vec<&str> = kb.buttons().map(|b| b.data.as_str()).collect();
        assert_eq!(data, ["show_docs", "start_test", "back_to_menu"]);
    }

    #[test]
    fn message_builder() {
        let msg = OutgoingMessage::text("hi")
            .with_format(TextFormat::Html)
            .reply_to(Some(5));
        assert_eq!(msg.format, TextFormat::Html);
        assert_eq!(msg.reply_to, Some(5));
        assert!(msg.keyboard.is_none());
    }
}
