//! End-to-end pipeline: the dispatcher driving the real Telegram gateway
//! against a mock Bot API server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use calcbot_bot::{Bot, BotSettings};
use calcbot_core::parser::default_question_bank;
use calcbot_core::store::InMemoryQuizStore;
use calcbot_core::traits::{ChatGateway, ChatId};
use calcbot_core::QuizEngine;
use calcbot_telegram::{create_gateway, BotConfig};

const TOKEN: &str = "42:e2e";
const ADMIN: i64 = -500;

fn api_path(method: &str) -> String {
    format!("/bot{TOKEN}/{method}")
}

fn from() -> Value {
    json!({ "id": 7, "first_name": "Ada", "last_name": "Lovelace" })
}

fn message(update_id: i64, message_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "chat": { "id": 7 },
            "from": from(),
            "text": text
        }
    })
}

fn button(update_id: i64, data: &str) -> Value {
    json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("q{update_id}"),
            "from": from(),
            "message": { "message_id": 100, "chat": { "id": 7 } },
            "data": data
        }
    })
}

fn updates(result: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
}

async fn mount_api(server: &MockServer, batches: Vec<Vec<Value>>) {
    let mut offset = 0;
    for batch in batches {
        let next = batch
            .iter()
            .filter_map(|u| u["update_id"].as_i64())
            .max()
            .map(|id| id + 1)
            .unwrap_or(offset);
        Mock::given(method("POST"))
            .and(path(api_path("getUpdates")))
            .and(body_partial_json(json!({ "offset": offset })))
            .respond_with(updates(batch))
            .mount(server)
            .await;
        offset = next;
    }
    Mock::given(method("POST"))
        .and(path(api_path("getUpdates")))
        .and(body_partial_json(json!({ "offset": offset })))
        .respond_with(updates(Vec::new()).set_delay(Duration::from_millis(50)))
        .mount(server)
        .await;

    let sent = json!({ "ok": true, "result": { "message_id": 1, "chat": { "id": 7 } } });
    for endpoint in ["sendMessage", "sendPhoto"] {
        Mock::given(method("POST"))
            .and(path(api_path(endpoint)))
            .respond_with(ResponseTemplate::new(200).set_body_json(sent.clone()))
            .mount(server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(api_path("answerCallbackQuery")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": true })))
        .mount(server)
        .await;
}

async fn run_bot(server: &MockServer, run_for: Duration) {
    let config = BotConfig {
        telegram_token: TOKEN.into(),
        api_base_url: server.uri(),
        poll_timeout_secs: 0,
        ..BotConfig::default()
    };
    let gateway: Arc<dyn ChatGateway> = Arc::from(create_gateway(&config).unwrap());
    let settings = BotSettings {
        admin_chat_id: Some(ChatId(ADMIN)),
        poll_retry_delay: Duration::from_millis(20),
        ..BotSettings::default()
    };
    let bot = Bot::new(
        gateway,
        Arc::new(InMemoryQuizStore::new()),
        QuizEngine::new(default_question_bank()),
        settings,
    );
    bot.run(tokio::time::sleep(run_for)).await.unwrap();
}

async fn requests_to(server: &MockServer, endpoint: &str) -> Vec<Request> {
    let wanted = api_path(endpoint);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == wanted)
        .collect()
}

async fn sent_texts(server: &MockServer) -> Vec<(i64, String)> {
    requests_to(server, "sendMessage")
        .await
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            (
                body["chat_id"].as_i64().unwrap(),
                body["text"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn e2e_function_analysis() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        vec![
            vec![message(1, 10, "/start"), button(2, "enter_function")],
            vec![message(3, 11, "x**2 - 4*x + 4")],
        ],
    )
    .await;

    run_bot(&server, Duration::from_secs(2)).await;

    let texts = sent_texts(&server).await;
    assert!(texts[0].1.contains("Математический Бот"));
    assert!(texts[1].1.starts_with("Введите вашу функцию"));
    assert_eq!(
        texts[2].1,
        "Производная функции: 2*x - 4\nКритические точки: 2.00"
    );
    assert_eq!(texts[3].1, "Выберите следующее действие:");

    let photos = requests_to(&server, "sendPhoto").await;
    assert_eq!(photos.len(), 1);
    let multipart = String::from_utf8_lossy(&photos[0].body);
    assert!(multipart.contains("filename=\"plot.png\""));
    assert!(photos[0]
        .body
        .windows(8)
        .any(|w| w == b"\x89PNG\r\n\x1a\n"));

    let acks = requests_to(&server, "answerCallbackQuery").await;
    assert_eq!(acks.len(), 1);
}

#[tokio::test]
async fn e2e_quiz_reports_to_admin() {
    let server = MockServer::start().await;
    let bank = default_question_bank();

    let mut batch = vec![button(1, "start_test")];
    for (i, question) in bank.iter().enumerate() {
        batch.push(button(i as i64 + 2, &format!("answer_{}", question.correct)));
    }
    mount_api(&server, vec![batch]).await;

    run_bot(&server, Duration::from_secs(2)).await;

    let texts = sent_texts(&server).await;
    let to_user: Vec<&str> = texts
        .iter()
        .filter(|(chat, _)| *chat == 7)
        .map(|(_, t)| t.as_str())
        .collect();
    assert_eq!(
        to_user.last().copied(),
        Some(format!("Тест завершен! Ваш счет: {0}/{0}", bank.len()).as_str())
    );

    let to_admin: Vec<&str> = texts
        .iter()
        .filter(|(chat, _)| *chat == ADMIN)
        .map(|(_, t)| t.as_str())
        .collect();
    assert_eq!(
        to_admin,
        vec![format!(
            "Пользователь Ada Lovelace (ID: 7) завершил тест с результатом {0}/{0}.",
            bank.len()
        )]
    );
}
