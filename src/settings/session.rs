//! Per-chat prompt editing sessions.

use std::collections::HashMap;
use teloxide::types::{ChatId, MessageId};
use tokio::sync::Mutex;

/// An operator's open menu and the bucket whose prompt they are replacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSession {
    pub message_id: MessageId,
    pub editing: crate::buckets::RatingBucket,
}

#[derive(Default)]
pub struct Sessions {
    inner: Mutex<HashMap<ChatId, EditSession>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or replace) the edit session for a chat.
    pub async fn begin(&self, chat_id: ChatId, session: EditSession) {
        self.inner.lock().await.insert(chat_id, session);
    }

    pub async fn get(&self, chat_id: ChatId) -> Option<EditSession> {
        self.inner.lock().await.get(&chat_id).copied()
    }

    /// Close the chat's session, returning it if one was open.
    pub async fn finish(&self, chat_id: ChatId) -> Option<EditSession> {
        self.inner.lock().await.remove(&chat_id)
    }
}

/// How a text message sent during an edit session is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptInput<'a> {
    Back,
    /// Any other command aborts the edit.
    Cancelled,
    NewPrompt(&'a str),
}

impl<'a> PromptInput<'a> {
    pub fn classify(text: &'a str) -> Self {
        if !text.starts_with('/') {
            return PromptInput::NewPrompt(text);
        }
        let command = text.split_whitespace().next().unwrap_or(text);
        // Commands in groups may carry the bot's name: /back@my_bot
        let command = command.split('@').next().unwrap_or(command);
        if command.eq_ignore_ascii_case("/back") {
            PromptInput::Back
        } else {
            PromptInput::Cancelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::RatingBucket;

    #[tokio::test]
    async fn test_sessions_are_per_chat() {
        let sessions = Sessions::new();
        let a = ChatId(1);
        let b = ChatId(2);

        sessions.begin(a, EditSession { message_id: MessageId(10), editing: RatingBucket::Star(5) }).await;
        sessions.begin(b, EditSession { message_id: MessageId(20), editing: RatingBucket::All }).await;

        assert_eq!(sessions.get(a).await.map(|s| s.editing), Some(RatingBucket::Star(5)));
        assert_eq!(sessions.get(b).await.map(|s| s.editing), Some(RatingBucket::All));

        let closed = sessions.finish(a).await.unwrap();
        assert_eq!(closed.message_id, MessageId(10));
        assert!(sessions.get(a).await.is_none());
        assert!(sessions.finish(a).await.is_none());
        assert!(sessions.get(b).await.is_some());
    }

    #[tokio::test]
    async fn test_begin_replaces_previous_session() {
        let sessions = Sessions::new();
        let chat = ChatId(7);
        sessions.begin(chat, EditSession { message_id: MessageId(1), editing: RatingBucket::Star(1) }).await;
        sessions.begin(chat, EditSession { message_id: MessageId(2), editing: RatingBucket::Star(2) }).await;
        assert_eq!(
            sessions.get(chat).await,
            Some(EditSession { message_id: MessageId(2), editing: RatingBucket::Star(2) })
        );
    }

    #[test]
    fn test_classify_input() {
        assert_eq!(PromptInput::classify("/back"), PromptInput::Back);
        assert_eq!(PromptInput::classify("/BACK"), PromptInput::Back);
        assert_eq!(PromptInput::classify("/back@reviews_bot"), PromptInput::Back);
        assert_eq!(PromptInput::classify("/start"), PromptInput::Cancelled);
        assert_eq!(PromptInput::classify("/backup"), PromptInput::Cancelled);
        assert_eq!(
            PromptInput::classify("Ответь коротко: {text}"),
            PromptInput::NewPrompt("Ответь коротко: {text}")
        );
    }
}
