//! Session Controller: owns the transcript, draft input, waiting flag and
//! feedback ratings of one chat.

use crate::gateway::{Answer, AnswerGateway, AskRequest, FeedbackRequest};
use crate::locale;
use crate::types::{Language, Message, MessageId, Rating, Sender, format_date};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Divider and greeting; never rateable.
const HEADER_LEN: usize = 2;

/// Shared by every controller so a ticket never matches a later chat.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a question is already waiting for an answer")]
    Busy,
    #[error("no message at position {0}")]
    NotFound(usize),
    #[error("message at position {0} cannot be rated")]
    NotRateable(usize),
    #[error("feedback is disabled")]
    FeedbackDisabled,
}

/// The answer task ended without producing an answer.
#[derive(Debug, Clone, thiserror::Error)]
#[error("answer task failed: {0}")]
pub struct AskFailed(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingAnswer,
}

/// Ticket for an in-flight question. Answers are only applied when the
/// ticket's generation still matches the session's.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAsk {
    pub generation: u64,
    pub question: String,
    pub language: Language,
    pub session_id: String,
    pub common: bool,
}

impl PendingAsk {
    pub fn request(&self) -> AskRequest {
        let mut request = AskRequest::new(self.question.clone(), self.language);
        request.session_id = Some(self.session_id.clone());
        request.is_common_question = self.common;
        request
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingOutcome {
    pub rating: Rating,
    pub confirmation: &'static str,
    /// Set only when the message carries an answer id and the rating is not cleared.
    pub forward: Option<FeedbackRequest>,
}

pub struct SessionController {
    transcript: Vec<Message>,
    input: String,
    state: SessionState,
    feedback: HashMap<MessageId, Rating>,
    language: Language,
    generation: u64,
    session_id: String,
    feedback_enabled: bool,
}

impl SessionController {
    pub fn new(language: Language, feedback_enabled: bool) -> Self {
        let mut session = Self {
            transcript: Vec::new(),
            input: String::new(),
            state: SessionState::Idle,
            feedback: HashMap::new(),
            language,
            generation: 0,
            session_id: String::new(),
            feedback_enabled,
        };
        session.reset(language);
        session
    }

    pub fn reset(&mut self, language: Language) {
        let now = chrono::Local::now();
        self.language = language;
        self.transcript = vec![
            Message::new(Sender::System, format_date(now)),
            Message::new(Sender::Bot, locale::greeting(language)),
        ];
        self.feedback.clear();
        self.input.clear();
        self.state = SessionState::Idle;
        self.generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        self.session_id = Uuid::new_v4().to_string();
        info!(generation = self.generation, language = language.code(), "chat reset");
    }

    /// Changes the language for messages created from now on.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_awaiting(&self) -> bool {
        self.state == SessionState::AwaitingAnswer
    }

    pub fn feedback_enabled(&self) -> bool {
        self.feedback_enabled
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn begin_send(&mut self, text: &str) -> Result<Option<PendingAsk>, SessionError> {
        self.begin(text, false)
    }

    /// Same as `begin_send` for a question picked from the common list.
    pub fn begin_common(&mut self, text: &str) -> Result<Option<PendingAsk>, SessionError> {
        self.begin(text, true)
    }

    fn begin(&mut self, text: &str, common: bool) -> Result<Option<PendingAsk>, SessionError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if self.is_awaiting() {
            return Err(SessionError::Busy);
        }
        self.transcript.push(Message::new(Sender::User, text));
        self.input.clear();
        self.state = SessionState::AwaitingAnswer;
        debug!(generation = self.generation, common, "question dispatched");
        Ok(Some(PendingAsk {
            generation: self.generation,
            question: text.to_string(),
            language: self.language,
            session_id: self.session_id.clone(),
            common,
        }))
    }

    /// Applies a settled answer. Returns false when the ticket is stale.
    pub fn complete(&mut self, ticket: &PendingAsk, outcome: Result<Answer, AskFailed>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding answer for a previous chat"
            );
            return false;
        }
        let message = match outcome {
            Ok(answer) => Message::new(Sender::Bot, answer.display_text)
                .with_answer_id(answer.answer_id),
            Err(err) => {
                warn!(error = %err, "question failed");
                Message::new(Sender::Bot, locale::processing_error(ticket.language))
            }
        };
        self.transcript.push(message);
        self.state = SessionState::Idle;
        true
    }

    /// Sends a question and waits for the answer in place.
    pub async fn send(
        &mut self,
        text: &str,
        gateway: &AnswerGateway,
    ) -> Result<bool, SessionError> {
        let Some(ticket) = self.begin_send(text)? else {
            return Ok(false);
        };
        let answer = gateway.ask_request(&ticket.request(), ticket.language).await;
        Ok(self.complete(&ticket, Ok(answer)))
    }

    pub fn rating_at(&self, index: usize) -> Rating {
        self.transcript
            .get(index)
            .and_then(|msg| self.feedback.get(&msg.id).copied())
            .unwrap_or_default()
    }

    pub fn is_rateable(&self, index: usize) -> bool {
        index >= HEADER_LEN
            && self
                .transcript
                .get(index)
                .is_some_and(|msg| msg.sender == Sender::Bot)
    }

    pub fn rate_message(
        &mut self,
        index: usize,
        rating: Rating,
    ) -> Result<RatingOutcome, SessionError> {
        if !self.feedback_enabled {
            return Err(SessionError::FeedbackDisabled);
        }
        let message = self
            .transcript
            .get(index)
            .ok_or(SessionError::NotFound(index))?;
        if !self.is_rateable(index) || rating == Rating::None {
            return Err(SessionError::NotRateable(index));
        }

        let current = self.feedback.get(&message.id).copied().unwrap_or_default();
        let next = if current == rating { Rating::None } else { rating };
        let (id, answer_id) = (message.id, message.answer_id);
        if next == Rating::None {
            self.feedback.remove(&id);
        } else {
            self.feedback.insert(id, next);
        }

        let forward = match (answer_id, next) {
            (Some(question_id), Rating::Up | Rating::Down) => Some(FeedbackRequest {
                question_id,
                is_good: next == Rating::Up,
            }),
            _ => None,
        };
        debug!(index, ?next, forwarded = forward.is_some(), "message rated");
        Ok(RatingOutcome {
            rating: next,
            confirmation: locale::rating_confirmation(self.language, next),
            forward,
        })
    }
}
