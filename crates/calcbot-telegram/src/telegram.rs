//! Telegram Bot API gateway.
//!
//! JSON requests for everything except `sendPhoto`, which is uploaded as
//! multipart form data. Updates are fetched by long polling.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use calcbot_core::model::Command;
use calcbot_core::traits::{
    ChatGateway, ChatId, EventKind, IncomingEvent, Keyboard, OutgoingMessage, TextFormat,
    UserInfo,
};

use crate::error::GatewayError;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
/// Slack on top of the long-poll timeout before the HTTP client gives up.
const REQUEST_SLACK_SECS: u64 = 10;
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Telegram Bot API gateway.
pub struct TelegramGateway {
    token: String,
    base_url: String,
    poll_timeout_secs: u64,
    /// Next `update_id` to ask for.
    offset: AtomicI64,
    client: reqwest::Client,
}

impl TelegramGateway {
    pub fn new(
        token: &str,
        base_url: Option<String>,
        poll_timeout_secs: u64,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + REQUEST_SLACK_SECS))
            .build()
            .map_err(|e| GatewayError::Network(e.without_url().to_string()))?;

        Ok(Self {
            token: token.to_string(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            poll_timeout_secs,
            offset: AtomicI64::new(0),
            client,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    fn request_timeout_secs(&self) -> u64 {
        self.poll_timeout_secs + REQUEST_SLACK_SECS
    }

    /// Call a Bot API method with a JSON body.
    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_response(response).await
    }

    async fn call_multipart<T: DeserializeOwned>(
        &self,
        method: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_response(response).await
    }

    // reqwest errors carry the request URL, which contains the token.
    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.request_timeout_secs())
        } else {
            GatewayError::Network(e.without_url().to_string())
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status().as_u16();
        let retry_after_header = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        let envelope = serde_json::from_str::<TgResponse<T>>(&body);

        if status == 401 {
            let description = envelope
                .ok()
                .and_then(|e| e.description)
                .unwrap_or(body);
            return Err(GatewayError::Unauthorized(description));
        }
        if status == 429 {
            let retry_after_secs = envelope
                .ok()
                .and_then(|e| e.parameters)
                .and_then(|p| p.retry_after)
                .or(retry_after_header)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(GatewayError::RateLimited { retry_after_secs });
        }

        match envelope {
            Ok(TgResponse {
                ok: true,
                result: Some(result),
                ..
            }) => Ok(result),
            Ok(TgResponse { ok: true, .. }) => Err(GatewayError::InvalidResponse(
                "ok response without a result".into(),
            )),
            Ok(TgResponse {
                error_code,
                description,
                ..
            }) => Err(GatewayError::Api {
                code: error_code.unwrap_or(i64::from(status)),
                description: description.unwrap_or_default(),
            }),
            Err(_) if status >= 400 => Err(GatewayError::Api {
                code: i64::from(status),
                description: body,
            }),
            Err(e) => Err(GatewayError::InvalidResponse(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TgResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    parameters: Option<TgResponseParameters>,
}

#[derive(Deserialize)]
struct TgResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

#[derive(Deserialize)]
struct TgUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<TgMessage>,
    #[serde(default)]
    callback_query: Option<TgCallbackQuery>,
}

#[derive(Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    #[serde(default)]
    from: Option<TgUser>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Deserialize)]
struct TgUser {
    id: i64,
    first_name: String,
    #[serde(default)]
    last_name: Option<String>,
}

impl From<TgUser> for UserInfo {
    fn from(u: TgUser) -> Self {
        UserInfo {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
        }
    }
}

#[derive(Deserialize)]
struct TgCallbackQuery {
    id: String,
    from: TgUser,
    #[serde(default)]
    message: Option<TgMessage>,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_parameters: Option<ReplyParameters>,
}

#[derive(Serialize)]
struct ReplyParameters {
    message_id: i64,
    allow_sending_without_reply: bool,
}

#[derive(Serialize)]
struct InlineKeyboardMarkup<'a> {
    inline_keyboard: Vec<Vec<InlineKeyboardButton<'a>>>,
}

#[derive(Serialize)]
struct InlineKeyboardButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

impl<'a> From<&'a Keyboard> for InlineKeyboardMarkup<'a> {
    fn from(kb: &'a Keyboard) -> Self {
        InlineKeyboardMarkup {
            inline_keyboard: kb
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| InlineKeyboardButton {
                            text: &b.label,
                            callback_data: &b.data,
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct AnswerCallbackQueryRequest<'a> {
    callback_query_id: &'a str,
}

fn parse_mode(format: TextFormat) -> Option<&'static str> {
    match format {
        TextFormat::Plain => None,
        TextFormat::Markdown => Some("Markdown"),
        TextFormat::Html => Some("HTML"),
    }
}

/// Turn one update into an event, or `None` for updates the bot ignores.
fn convert_update(update: TgUpdate) -> Option<IncomingEvent> {
    if let Some(query) = update.callback_query {
        let chat_id = query
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(query.from.id);
        return Some(IncomingEvent {
            chat_id: ChatId(chat_id),
            message_id: query.message.as_ref().map(|m| m.message_id),
            user: query.from.into(),
            kind: EventKind::Button {
                callback_id: query.id,
                data: query.data.unwrap_or_default(),
            },
        });
    }

    let message = update.message?;
    let Some(from) = message.from else {
        debug!(update_id = update.update_id, "skipping message without sender");
        return None;
    };
    let Some(text) = message.text else {
        debug!(update_id = update.update_id, "skipping non-text message");
        return None;
    };

    // Unknown slash commands fall through as plain text
    let command = text
        .starts_with('/')
        .then(|| text.split_whitespace().next().unwrap_or_default())
        .and_then(|word| word.parse::<Command>().ok());
    let kind = match command {
        Some(command) => EventKind::Command(command),
        None => EventKind::Text(text),
    };

    Some(IncomingEvent {
        chat_id: ChatId(message.chat.id),
        message_id: Some(message.message_id),
        user: from.into(),
        kind,
    })
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    fn name(&self) -> &str {
        "telegram"
    }

    #[instrument(skip(self))]
    async fn poll(&self) -> anyhow::Result<Vec<IncomingEvent>> {
        let request = GetUpdatesRequest {
            offset: self.offset.load(Ordering::Acquire),
            timeout: self.poll_timeout_secs,
            allowed_updates: ["message", "callback_query"],
        };
        let updates: Vec<TgUpdate> = self.call("getUpdates", &request).await?;

        if let Some(max_id) = updates.iter().map(|u| u.update_id).max() {
            self.offset.fetch_max(max_id + 1, Ordering::AcqRel);
        }
        let received = updates.len();
        let events: Vec<IncomingEvent> = updates.into_iter().filter_map(convert_update).collect();
        if received > 0 {
            debug!(received, events = events.len(), "polled updates");
        }
        Ok(events)
    }

    #[instrument(skip(self, message), fields(chat = %chat))]
    async fn send_message(&self, chat: ChatId, message: &OutgoingMessage) -> anyhow::Result<()> {
        let body = SendMessageRequest {
            chat_id: chat.0,
            text: &message.text,
            parse_mode: parse_mode(message.format),
            reply_markup: message.keyboard.as_ref().map(InlineKeyboardMarkup::from),
            reply_parameters: message.reply_to.map(|message_id| ReplyParameters {
                message_id,
                allow_sending_without_reply: true,
            }),
        };
        let _: serde_json::Value = self.call("sendMessage", &body).await?;
        Ok(())
    }

    #[instrument(skip(self, png), fields(chat = %chat, bytes = png.len()))]
    async fn send_image(&self, chat: ChatId, png: Vec<u8>, caption: &str) -> anyhow::Result<()> {
        let photo = reqwest::multipart::Part::bytes(png)
            .file_name("plot.png")
            .mime_str("image/png")
            .map_err(|e| GatewayError::InvalidResponse(e.without_url().to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat.0.to_string())
            .text("caption", caption.to_string())
            .part("photo", photo);

        let _: serde_json::Value = self.call_multipart("sendPhoto", form).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn acknowledge(&self, callback_id: &str) -> anyhow::Result<()> {
        let body = AnswerCallbackQueryRequest {
            callback_query_id: callback_id,
        };
        if let Err(e) = self.call::<_, bool>("answerCallbackQuery", &body).await {
            // Stale queries (older than a few minutes) cannot be answered
            warn!("failed to acknowledge callback: {e}");
            return Err(e.into());
        }
        Ok(())
    }
}
