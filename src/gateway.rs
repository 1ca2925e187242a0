//! Answer Gateway: turns a question into a displayable answer by calling the
//! external answer service and applying the local confidence policy.

use crate::locale;
use crate::types::{AnswerId, Language};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Normalized confidence below this is treated as "no suitable answer".
pub const CONFIDENCE_THRESHOLD: f64 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to answer service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("answer service returned status {0}")]
    Status(u16),
    #[error("unexpected answer service response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_common_question: bool,
}

impl AskRequest {
    pub fn new(question: impl Into<String>, language: Language) -> Self {
        Self {
            question: question.into(),
            language: language.code().to_string(),
            session_id: None,
            is_common_question: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub answers: Option<Vec<String>>,
    #[serde(default)]
    pub confidence_scores: Option<Vec<f64>>,
    #[serde(default)]
    pub question_id: Option<AnswerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedbackRequest {
    pub question_id: AnswerId,
    pub is_good: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommonQuestion {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct CommonQuestionsResponse {
    #[serde(default)]
    questions: Vec<CommonQuestion>,
}

/// What the chat shows for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub display_text: String,
    pub answer_id: Option<AnswerId>,
}

impl Answer {
    fn fallback(text: &str) -> Self {
        Self {
            display_text: text.to_string(),
            answer_id: None,
        }
    }
}

#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, GatewayError>;
    async fn feedback(&self, request: &FeedbackRequest) -> Result<(), GatewayError>;
    async fn common_questions(
        &self,
        language: Language,
    ) -> Result<Vec<CommonQuestion>, GatewayError>;
}

pub struct HttpAnswerService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnswerService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), GatewayError> {
    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::Status(status.as_u16()));
    }
    Ok(())
}

#[async_trait]
impl AnswerService for HttpAnswerService {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, GatewayError> {
        let url = self.endpoint("ask");
        debug!(%url, language = %request.language, "posting question");
        let response = self.client.post(&url).json(request).send().await?;
        check_status(&response)?;
        response
            .json::<AskResponse>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn feedback(&self, request: &FeedbackRequest) -> Result<(), GatewayError> {
        let url = self.endpoint("feedback");
        debug!(%url, question_id = %request.question_id, is_good = request.is_good, "posting feedback");
        let response = self.client.post(&url).json(request).send().await?;
        check_status(&response)
    }

    async fn common_questions(
        &self,
        language: Language,
    ) -> Result<Vec<CommonQuestion>, GatewayError> {
        let url = self.endpoint("common-questions");
        let response = self
            .client
            .get(&url)
            .query(&[("language", language.code())])
            .send()
            .await?;
        check_status(&response)?;
        let body = response
            .json::<CommonQuestionsResponse>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(body.questions)
    }
}

/// Maps a raw score into `[0, 1]`. Scores above 1.0 are unnormalized logits.
pub fn normalize_confidence(score: f64) -> f64 {
    if score > 1.0 {
        1.0 / (1.0 + (-score).exp())
    } else {
        score
    }
}

pub fn is_confident(score: f64) -> bool {
    normalize_confidence(score) >= CONFIDENCE_THRESHOLD
}

#[derive(Debug, Clone, Copy)]
pub struct AnswerPolicy {
    pub confidence_filter: bool,
}

impl Default for AnswerPolicy {
    fn default() -> Self {
        Self {
            confidence_filter: true,
        }
    }
}

#[derive(Clone)]
pub struct AnswerGateway {
    service: Arc<dyn AnswerService>,
    policy: AnswerPolicy,
}

impl AnswerGateway {
    pub fn new(service: Arc<dyn AnswerService>, policy: AnswerPolicy) -> Self {
        Self { service, policy }
    }

    pub async fn ask(&self, question: &str, language: Language) -> Answer {
        self.ask_request(&AskRequest::new(question, language), language)
            .await
    }

    /// Never fails: every outcome becomes something the chat can show.
    #[instrument(skip_all, fields(language = %request.language))]
    pub async fn ask_request(&self, request: &AskRequest, language: Language) -> Answer {
        match self.service.ask(request).await {
            Ok(response) => self.interpret(response, language),
            Err(err) => {
                warn!(error = %err, "answer service unavailable");
                Answer::fallback(locale::connection_error(language))
            }
        }
    }

    pub fn interpret(&self, response: AskResponse, language: Language) -> Answer {
        let mut answers = response.answers.unwrap_or_default();
        if answers.is_empty() {
            debug!("answer service returned no answers");
            return Answer::fallback(locale::no_answer(language));
        }
        let top = answers.swap_remove(0);
        let top_score = response
            .confidence_scores
            .as_ref()
            .and_then(|scores| scores.first().copied());

        if let Some(score) = top_score.filter(|_| self.policy.confidence_filter) {
            if !is_confident(score) {
                debug!(
                    score,
                    confidence = normalize_confidence(score),
                    "top answer below confidence threshold"
                );
                return Answer::fallback(locale::no_answer(language));
            }
        }

        Answer {
            display_text: top,
            answer_id: response.question_id,
        }
    }

    pub async fn send_feedback(&self, request: &FeedbackRequest) -> Result<(), GatewayError> {
        self.service.feedback(request).await
    }

    pub async fn common_questions(
        &self,
        language: Language,
    ) -> Result<Vec<CommonQuestion>, GatewayError> {
        self.service.common_questions(language).await
    }
}



#[cfg(test)]
mod http_tests {
    use super::*;
    use axum::extract::{Json, Query, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::Router;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<Value>>>;

    async fn ask_handler(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
        seen.lock().unwrap().push(body);
        Json(json!({
            "answers": ["Art. 47: annual leave is 21 days."],
            "confidence_scores": [3.2],
            "question_id": 42,
            "status": "answered",
        }))
    }

    async fn feedback_handler(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
        seen.lock().unwrap().push(body);
        Json(json!({"message": "Feedback stored successfully"}))
    }

    async fn common_handler(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let text = if params.get("language").map(String::as_str) == Some("en") {
            "I want to submit a resignation"
        } else {
            "أريد تقديم استقالة"
        };
        Json(json!({"questions": [{"id": "resignation", "text": text}]}))
    }

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn service(base_url: &str) -> HttpAnswerService {
        HttpAnswerService::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn posts_question_and_decodes_answer() {
        let seen: Seen = Arc::default();
        let router = Router::new()
            .route("/ask", post(ask_handler))
            .with_state(seen.clone());
        let base = spawn_server(router).await;

        let mut request = AskRequest::new("How many leave days?", Language::English);
        request.session_id = Some("s-1".to_string());
        let response = service(&base).ask(&request).await.unwrap();

        assert_eq!(response.question_id, Some(AnswerId(42)));
        assert_eq!(response.confidence_scores, Some(vec![3.2]));
        let bodies = seen.lock().unwrap();
        assert_eq!(
            bodies[0],
            json!({"question": "How many leave days?", "language": "en", "session_id": "s-1"})
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let router = Router::new().route(
            "/ask",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = spawn_server(router).await;
        let err = service(&base)
            .ask(&AskRequest::new("q", Language::Arabic))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Status(500)));
    }

    #[tokio::test]
    async fn gateway_reports_unreachable_service() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gw = AnswerGateway::new(
            Arc::new(service(&format!("http://{addr}"))),
            AnswerPolicy::default(),
        );
        let answer = gw.ask("q", Language::Arabic).await;
        assert_eq!(answer.display_text, locale::connection_error(Language::Arabic));
        assert_eq!(answer.answer_id, None);
    }

    #[tokio::test]
    async fn posts_feedback() {
        let seen: Seen = Arc::default();
        let router = Router::new()
            .route("/feedback", post(feedback_handler))
            .with_state(seen.clone());
        let base = spawn_server(router).await;

        service(&base)
            .feedback(&FeedbackRequest {
                question_id: AnswerId(42),
                is_good: false,
            })
            .await
            .unwrap();
        assert_eq!(
            seen.lock().unwrap()[0],
            json!({"question_id": 42, "is_good": false})
        );
    }

    #[tokio::test]
    async fn fetches_common_questions_for_language() {
        let router = Router::new().route("/common-questions", get(common_handler));
        let base = spawn_server(router).await;

        let questions = service(&base)
            .common_questions(Language::English)
            .await
            .unwrap();
        assert_eq!(
            questions,
            vec![CommonQuestion {
                id: "resignation".to_string(),
                text: "I want to submit a resignation".to_string(),
            }]
        );
    }
}
