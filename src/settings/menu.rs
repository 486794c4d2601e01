//! Menu texts, keyboards and callback data.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::buckets::{BucketConfig, RatingBucket};

const CB_MAIN: &str = "gpt_main";
const CB_SAVE: &str = "gpt_save";
const CB_STAR: &str = "gpt_star_";
const CB_TOGGLE: &str = "gpt_toggle_";

const SEPARATOR: &str = "➖➖➖➖➖➖➖➖";

pub const MAIN_MENU_TEXT: &str = "🤖 <b>Управление GPT-ответами на отзывы</b>

<b>📊 Статус ответов:</b>
• 🟢 <code>Включено</code> - Бот будет отвечать на отзывы
• 🔴 <code>Выключено</code> - Бот не будет отвечать

<b>⭐️ Настройка по звездам:</b>
• Выберите нужную звезду для настройки промпта
• Используйте кнопку ⚙️ для включения/выключения
• Настройки сохраняются автоматически

<b>⚙️ Общие настройки:</b>
• Настройка для всех звезд одновременно
• При включении \"Все звезды\" отдельные настройки отключаются

<b>⚠️ Важно:</b>
• Каждая звезда может иметь свой уникальный промпт
• Изменения вступают в силу сразу после сохранения

<b>💡 Подсказка:</b>
Нажмите на звезду для редактирования промпта или используйте ⚙️ для управления статусом.";

/// What an inline button asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Main,
    Edit(RatingBucket),
    Toggle(RatingBucket),
    Save,
}

impl MenuAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            CB_MAIN => Some(MenuAction::Main),
            CB_SAVE => Some(MenuAction::Save),
            _ => {
                if let Some(rest) = data.strip_prefix(CB_STAR) {
                    RatingBucket::from_suffix(rest).map(MenuAction::Edit)
                } else if let Some(rest) = data.strip_prefix(CB_TOGGLE) {
                    RatingBucket::from_suffix(rest).map(MenuAction::Toggle)
                } else {
                    None
                }
            }
        }
    }

    pub fn data(&self) -> String {
        match self {
            MenuAction::Main => CB_MAIN.to_string(),
            MenuAction::Save => CB_SAVE.to_string(),
            MenuAction::Edit(bucket) => format!("{CB_STAR}{}", bucket.suffix()),
            MenuAction::Toggle(bucket) => format!("{CB_TOGGLE}{}", bucket.suffix()),
        }
    }
}

fn button(text: impl Into<String>, action: MenuAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.into(), action.data())
}

pub fn status_emoji(enabled: bool) -> &'static str {
    if enabled { "🟢" } else { "🔴" }
}

/// "5 звезд" / "всех оценок", as used in prompt-editing messages.
pub fn prompt_label(bucket: RatingBucket) -> String {
    match bucket {
        RatingBucket::Star(n) => format!("{n} звезд"),
        RatingBucket::All => "всех оценок".to_string(),
    }
}

/// Callback answer after a toggle.
pub fn toggle_notice(bucket: RatingBucket, enabled: bool) -> String {
    let target = match bucket {
        RatingBucket::Star(n) => format!("{n} звезды"),
        RatingBucket::All => "всех звезд".to_string(),
    };
    let status = if enabled { "включены" } else { "выключены" };
    format!("✅ Ответы для {target} {status}!")
}

pub fn main_keyboard(config: &BucketConfig) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![button("⭐️ Настройка по звездам", MenuAction::Main)]];

    for bucket in RatingBucket::STARS {
        let RatingBucket::Star(n) = bucket else { continue };
        rows.push(vec![
            button(format!("{} {n} звезда", status_emoji(config.is_enabled(bucket))), MenuAction::Edit(bucket)),
            button("⚙️ Настройка", MenuAction::Toggle(bucket)),
        ]);
    }

    rows.push(vec![button(SEPARATOR, MenuAction::Main)]);
    rows.push(vec![button("⚙️ Общие настройки", MenuAction::Main)]);
    rows.push(vec![
        button(
            format!("{} Все звезды", status_emoji(config.is_enabled(RatingBucket::All))),
            MenuAction::Edit(RatingBucket::All),
        ),
        button("⚙️ Настройка", MenuAction::Toggle(RatingBucket::All)),
    ]);
    rows.push(vec![button(SEPARATOR, MenuAction::Main)]);
    rows.push(vec![button("🔙 Вернуться", MenuAction::Main)]);

    InlineKeyboardMarkup::new(rows)
}

pub fn edit_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("🔙 Назад", MenuAction::Main)],
        vec![button("💾 Сохранить текущий", MenuAction::Save)],
    ])
}

/// Escape text for Telegram's HTML parse mode.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            _ => result.push(c),
        }
    }
    result
}

pub fn edit_text(bucket: RatingBucket, current_prompt: &str) -> String {
    format!(
        "📝 Редактирование промпта для {}\n\n\
         Текущий промпт:\n<pre>{}</pre>\n\n\
         Отправьте новый промпт в чат или используйте кнопки ниже:\n\
         (/back - вернуться в меню)",
        prompt_label(bucket),
        html_escape(current_prompt)
    )
}
