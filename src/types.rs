use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(u64);

impl MessageId {
    fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identifier the answer service attaches to an answered question.
/// Only used to correlate feedback with the answer it rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AnswerId(pub i64);

impl fmt::Display for AnswerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rating {
    #[default]
    None,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Arabic,
    English,
}

impl Language {
    pub fn from_is_arabic(is_arabic: bool) -> Self {
        if is_arabic {
            Language::Arabic
        } else {
            Language::English
        }
    }

    pub fn is_arabic(self) -> bool {
        matches!(self, Language::Arabic)
    }

    /// Two-letter code the answer service expects.
    pub fn code(self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::English => "en",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Language::Arabic => Language::English,
            Language::English => Language::Arabic,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    pub timestamp: String,
    pub answer_id: Option<AnswerId>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            sender,
            text: text.into(),
            timestamp: format_time(chrono::Local::now()),
            answer_id: None,
        }
    }

    pub fn with_answer_id(mut self, answer_id: Option<AnswerId>) -> Self {
        self.answer_id = answer_id;
        self
    }
}

pub fn format_time(now: chrono::DateTime<chrono::Local>) -> String {
    now.format("%H:%M").to_string()
}

pub fn format_date(now: chrono::DateTime<chrono::Local>) -> String {
    now.format("%a, %b %-d, %Y").to_string()
}
