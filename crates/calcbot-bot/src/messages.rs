//! User-facing texts and keyboards.

use calcbot_core::error::QuizError;
use calcbot_core::model::{ButtonAction, Question};
use calcbot_core::traits::{Button, Keyboard, OutgoingMessage, TextFormat};

pub const PLOT_CAPTION: &str = "Ваш график:";

pub const FUNCTION_PROMPT: &str =
    "Введите вашу функцию в формате 'x**2 - 4*x + 4'. Используйте 'x' как переменную.";

pub const FIRST_QUESTION_NOTICE: &str = "Это первый вопрос, назад вернуться нельзя.";

pub const TEXT_HINT: &str =
    "Чтобы проанализировать функцию, откройте меню командой /start и нажмите «Ввести функцию».";

const WELCOME_TEXT: &str = "👋 Привет! Я 🤖 *Математический Бот* для анализа функций и проведения тестов.\n\n\
📈 Могу помочь найти *экстремумы* функций, показать их *графики* и проверить твои знания через тесты.\n\n\
Выбери одну из опций ниже для начала работы:";

const DOCS_TEXT: &str = "📘 <b>Команды бота и их функции:</b>\n\n\
- 🚀 <b>/start:</b> Запускает бота и показывает основное приветственное сообщение и меню. \
Используйте эту команду для начала работы с ботом.\n\n\
- ❓ <b>/help:</b> Показывает то же меню, что и /start.\n\n\
- 📖 <b>Ввести функцию:</b> Позволяет ввести математическую функцию для анализа. \
Пример: отправьте 'x**2 - 4*x + 4' для получения производной, критических точек и графика функции. \
Поддерживаются операции + - * / ** (или ^), константы pi и E и функции \
sin, cos, tan, asin, acos, atan, sinh, cosh, tanh, exp, log (ln), sqrt, abs.\n\n\
- 📖 <b>Тестирование:</b> Запускает серию вопросов с выбором ответов. \
Кнопка «Назад» возвращает к предыдущему вопросу, ответ на него можно изменить.\n\n\
- 📖 <b>Документация:</b> Эта страница.\n\n\
Используйте кнопки ниже для навигации по функциям или возврата в главное меню.";

const FOLLOW_UP_TEXT: &str = "Выберите следующее действие:";

/// Greeting with the main menu.
pub fn welcome() -> OutgoingMessage {
    OutgoingMessage::text(WELCOME_TEXT)
        .with_format(TextFormat::Markdown)
        .with_keyboard(Keyboard::column([
            Button::new("🔍 Ввести функцию", ButtonAction::EnterFunction),
            Button::new("📚 Документация", ButtonAction::ShowDocs),
            Button::new("📝 Пройти тест", ButtonAction::StartTest),
        ]))
}

/// Command reference with a way back to the menu.
pub fn docs() -> OutgoingMessage {
    OutgoingMessage::text(DOCS_TEXT)
        .with_format(TextFormat::Html)
        .with_keyboard(Keyboard::column([Button::new(
            "⬅️ Назад",
            ButtonAction::BackToMenu,
        )]))
}

/// Menu shown after an analysis.
pub fn follow_up() -> OutgoingMessage {
    OutgoingMessage::text(FOLLOW_UP_TEXT).with_keyboard(Keyboard::column([
        Button::new("🔄 Ввести новую функцию", ButtonAction::EnterFunction),
        Button::new("📗 Документация", ButtonAction::ShowDocs),
        Button::new("📙 Тестирование", ButtonAction::StartTest),
    ]))
}

/// A quiz question: options two per row, then navigation.
pub fn question(index: usize, question: &Question) -> OutgoingMessage {
    let options: Vec<Button> = question
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| Button::new(option.as_str(), ButtonAction::Answer(i)))
        .collect();

    let mut keyboard = Keyboard::default();
    for pair in options.chunks(2) {
        keyboard = keyboard.row(pair.to_vec());
    }
    if index > 0 {
        keyboard = keyboard.row(vec![Button::new("⬅️ Назад", ButtonAction::PrevQuestion)]);
    }
    keyboard = keyboard.row(vec![Button::new(
        "⬅️ Вернуться в меню",
        ButtonAction::BackToMenu,
    )]);

    OutgoingMessage::text(format!("Вопрос {}: {}", index + 1, question.text))
        .with_keyboard(keyboard)
}

/// What to tell the user when a quiz action cannot be carried out.
pub fn quiz_error(err: &QuizError) -> OutgoingMessage {
    let text = match err {
        QuizError::NoSession(_) => {
            "Тест не найден. Нажмите «Пройти тест» в меню /start, чтобы начать заново."
        }
        QuizError::OutOfRange { len: 0, .. } => "Вопросы для теста пока не добавлены.",
        QuizError::OutOfRange { .. } => {
            "Тест уже завершен. Нажмите «Пройти тест» в меню /start, чтобы пройти его снова."
        }
        QuizError::InvalidOption { .. } => "Такого варианта ответа нет.",
    };
    OutgoingMessage::text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcbot_core::model::SessionKey;

    fn data(msg: &OutgoingMessage) -> Vec<Vec<String>> {
        msg.keyboard
            .as_ref()
            .map(|kb| {
                kb.rows
                    .iter()
                    .map(|row| row.iter().map(|b| b.data.clone()).collect())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn q(options: &[&str]) -> Question {
        Question {
            text: "2 + 2?".into(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct: 0,
        }
    }

    #[test]
    fn welcome_menu() {
        let msg = welcome();
        assert_eq!(msg.format, TextFormat::Markdown);
        assert_eq!(
            data(&msg),
            vec![vec!["enter_function"], vec!["show_docs"], vec!["start_test"]]
        );
    }

    #[test]
    fn docs_page_leads_back() {
        let msg = docs();
        assert_eq!(msg.format, TextFormat::Html);
        assert_eq!(data(&msg), vec![vec!["back_to_menu"]]);
    }

    #[test]
    fn first_question_has_no_back_button() {
        let msg = question(0, &q(&["3", "4", "5"]));
        assert_eq!(msg.text, "Вопрос 1: 2 + 2?");
        assert_eq!(
            data(&msg),
            vec![
                vec!["answer_0", "answer_1"],
                vec!["answer_2"],
                vec!["back_to_menu"],
            ]
        );
    }

    #[test]
    fn later_questions_can_go_back() {
        let msg = question(2, &q(&["a", "b", "c", "d"]));
        assert!(msg.text.starts_with("Вопрос 3:"));
        assert_eq!(
            data(&msg),
            vec![
                vec!["answer_0", "answer_1"],
                vec!["answer_2", "answer_3"],
                vec!["prev_question"],
                vec!["back_to_menu"],
            ]
        );
    }

    #[test]
    fn quiz_error_texts() {
        assert!(quiz_error(&QuizError::NoSession(SessionKey(1)))
            .text
            .contains("начать заново"));
        assert!(quiz_error(&QuizError::OutOfRange { index: 0, len: 0 })
            .text
            .contains("не добавлены"));
    }
}
