//! Mock gateway for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use calcbot_core::model::{ButtonAction, Command};
use calcbot_core::traits::{ChatGateway, ChatId, EventKind, IncomingEvent, OutgoingMessage, UserInfo};

/// Something the bot sent through the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message {
        chat: ChatId,
        message: OutgoingMessage,
    },
    Image {
        chat: ChatId,
        png: Vec<u8>,
        caption: String,
    },
}

/// A gateway that replays queued events and records everything sent.
///
/// When the queue is empty, `poll` waits briefly and returns no events, like
/// a long poll that timed out.
pub struct MockGateway {
    /// Batches returned by successive polls.
    events: Mutex<VecDeque<Vec<IncomingEvent>>>,
    sent: Mutex<Vec<Sent>>,
    acknowledged: Mutex<Vec<String>>,
    poll_count: AtomicU32,
    fail_images: AtomicBool,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            acknowledged: Mutex::new(Vec::new()),
            poll_count: AtomicU32::new(0),
            fail_images: AtomicBool::new(false),
        }
    }

    /// Queue a batch for a future `poll`.
    pub fn push_events(&self, batch: Vec<IncomingEvent>) {
        self.events.lock().unwrap().push_back(batch);
    }

    /// Make `send_image` fail from now on.
    pub fn fail_images(&self, fail: bool) {
        self.fail_images.store(fail, Ordering::Relaxed);
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Text messages sent to `chat`, in order.
    pub fn messages_to(&self, chat: ChatId) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Message { chat: c, message } if *c == chat => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Images sent to `chat` as `(png, caption)`.
    pub fn images_to(&self, chat: ChatId) -> Vec<(Vec<u8>, String)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Image {
                    chat: c,
                    png,
                    caption,
                } if *c == chat => Some((png.clone(), caption.clone())),
                _ => None,
            })
            .collect()
    }

    /// Callback ids acknowledged so far.
    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_count.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.acknowledged.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn poll(&self) -> anyhow::Result<Vec<IncomingEvent>> {
        self.poll_count.fetch_add(1, Ordering::Relaxed);
        let next = self.events.lock().unwrap().pop_front();
        match next {
            Some(batch) => Ok(batch),
            None => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn send_message(&self, chat: ChatId, message: &OutgoingMessage) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Message {
            chat,
            message: message.clone(),
        });
        Ok(())
    }

    async fn send_image(&self, chat: ChatId, png: Vec<u8>, caption: &str) -> anyhow::Result<()> {
        if self.fail_images.load(Ordering::Relaxed) {
            anyhow::bail!("mock image upload failure");
        }
        self.sent.lock().unwrap().push(Sent::Image {
            chat,
            png,
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> anyhow::Result<()> {
        self.acknowledged
            .lock()
            .unwrap()
            .push(callback_id.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Event builders
// ---------------------------------------------------------------------------

/// A user whose private chat id equals their user id.
pub fn user(id: i64, first_name: &str) -> UserInfo {
    UserInfo {
        id,
        first_name: first_name.to_string(),
        last_name: None,
    }
}

pub fn command_event(user: &UserInfo, command: Command) -> IncomingEvent {
    IncomingEvent {
        chat_id: ChatId(user.id),
        message_id: Some(1),
        user: user.clone(),
        kind: EventKind::Command(command),
    }
}

pub fn text_event(user: &UserInfo, text: &str) -> IncomingEvent {
    IncomingEvent {
        chat_id: ChatId(user.id),
        message_id: Some(2),
        user: user.clone(),
        kind: EventKind::Text(text.to_string()),
    }
}

pub fn button_event(user: &UserInfo, action: ButtonAction) -> IncomingEvent {
    raw_button_event(user, &action.to_string())
}

/// A button press with an arbitrary payload.
pub fn raw_button_event(user: &UserInfo, data: &str) -> IncomingEvent {
    IncomingEvent {
        chat_id: ChatId(user.id),
        message_id: Some(3),
        user: user.clone(),
        kind: EventKind::Button {
            callback_id: format!("cb-{data}"),
            data: data.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_batches_then_idles() {
        let gw = MockGateway::new();
        let ada = user(7, "Ada");
        gw.push_events(vec![command_event(&ada, Command::Start)]);

        assert_eq!(gw.poll().await.unwrap().len(), 1);
        assert!(gw.poll().await.unwrap().is_empty());
        assert_eq!(gw.poll_count(), 2);
    }

    #[tokio::test]
    async fn records_outbound_calls() {
        let gw = MockGateway::new();
        gw.send_message(ChatId(1), &OutgoingMessage::text("hi"))
            .await
            .unwrap();
        gw.send_image(ChatId(1), vec![1, 2], "cap").await.unwrap();
        gw.acknowledge("cb").await.unwrap();

        assert_eq!(gw.messages_to(ChatId(1)).len(), 1);
        assert!(gw.messages_to(ChatId(2)).is_empty());
        assert_eq!(gw.images_to(ChatId(1)), vec![(vec![1, 2], "cap".to_string())]);
        assert_eq!(gw.acknowledged(), vec!["cb"]);

        gw.fail_images(true);
        assert!(gw.send_image(ChatId(1), vec![], "x").await.is_err());
    }
}
