//! One-shot messages carried across a redirect.
//!
//! Handlers push messages into the session before redirecting; the next
//! rendered page drains the queue and shows them once.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

/// Severity of a flash message, used as its CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A message queued for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

/// Queue a message for the next rendered page.
///
/// Session failures are logged and otherwise ignored; a lost flash message
/// never fails the request.
pub async fn push(session: &Session, level: Level, text: impl Into<String>) {
    let text = text.into();
    let mut messages: Vec<FlashMessage> = session
        .get(session_keys::FLASH_MESSAGES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    messages.push(FlashMessage { level, text });

    if let Err(e) = session.insert(session_keys::FLASH_MESSAGES, messages).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

pub async fn info(session: &Session, text: impl Into<String>) {
    push(session, Level::Info, text).await;
}

pub async fn success(session: &Session, text: impl Into<String>) {
    push(session, Level::Success, text).await;
}

pub async fn warning(session: &Session, text: impl Into<String>) {
    push(session, Level::Warning, text).await;
}

pub async fn error(session: &Session, text: impl Into<String>) {
    push(session, Level::Error, text).await;
}

/// Remove and return all queued messages.
pub async fn take(session: &Session) -> Vec<FlashMessage> {
    session
        .remove::<Vec<FlashMessage>>(session_keys::FLASH_MESSAGES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_messages_drain_once_in_order() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        info(&session, "first").await;
        error(&session, "second").await;

        let messages = take(&session).await;
        assert_eq!(
            messages,
            vec![
                FlashMessage {
                    level: Level::Info,
                    text: "first".to_string()
                },
                FlashMessage {
                    level: Level::Error,
                    text: "second".to_string()
                },
            ]
        );
        assert!(take(&session).await.is_empty());
    }

    #[test]
    fn test_level_css_class() {
        assert_eq!(Level::Warning.css_class(), "warning");
    }
}
