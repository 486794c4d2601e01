//! Telegram settings menu: per-rating toggles and prompt editing.

pub mod menu;
pub mod session;
pub mod telegram;

pub use session::{EditSession, Sessions};
pub use telegram::{schema, Command, SettingsState};
