use crate::cli_adapter::{self, Command};
use crate::config::{Config, Theme};
use crate::gateway::{Answer, AnswerGateway, CommonQuestion, FeedbackRequest, GatewayError};
use crate::locale;
use crate::prefs::PreferenceStore;
use crate::session::{AskFailed, PendingAsk, SessionController, SessionError};
use crate::types::Language;
use crate::view;
use anyhow::{Context, Result};
use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

enum Screen {
    Home,
    Chat(SessionController),
}

enum Event {
    Answer(PendingAsk, Result<Answer, AskFailed>),
    CommonQuestions(Result<Vec<CommonQuestion>, GatewayError>),
}

pub struct Coordinator<W: Write> {
    config: Config,
    gateway: AnswerGateway,
    prefs: PreferenceStore,
    language: Language,
    theme: Theme,
    screen: Screen,
    common: Vec<CommonQuestion>,
    fetching_common: bool,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    out: W,
}

impl<W: Write> Coordinator<W> {
    pub fn new(
        config: Config,
        gateway: AnswerGateway,
        prefs: PreferenceStore,
        language: Language,
        out: W,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let theme = config.ui.theme;
        Self {
            config,
            gateway,
            prefs,
            language,
            theme,
            screen: Screen::Home,
            common: Vec::new(),
            fetching_common: false,
            events_tx,
            events_rx,
            out,
        }
    }

    /// Processes input lines until the user quits or input ends. Once input
    /// ends, an answer still in flight is waited for before returning.
    pub async fn run<S>(mut self, mut lines: S, start_in_chat: bool) -> Result<()>
    where
        S: Stream<Item = io::Result<String>> + Unpin,
    {
        if start_in_chat {
            self.open_chat()?;
        } else {
            self.show_home()?;
        }

        let mut input_open = true;
        loop {
            if !input_open && !self.has_pending() {
                break;
            }
            tokio::select! {
                maybe_line = lines.next(), if input_open => {
                    match maybe_line {
                        Some(line) => {
                            let line = line.context("failed to read input")?;
                            if !self.handle_line(&line)? {
                                break;
                            }
                        }
                        None => input_open = false,
                    }
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event)?;
                }
            }
        }
        info!("chat closed");
        Ok(())
    }

    fn has_pending(&self) -> bool {
        let awaiting = matches!(&self.screen, Screen::Chat(session) if session.is_awaiting());
        awaiting || self.fetching_common
    }

    /// Returns false when the user asked to quit.
    fn handle_line(&mut self, line: &str) -> Result<bool> {
        let command = match cli_adapter::parse_input(line) {
            Ok(command) => command,
            Err(err) => {
                debug!(error = %err, "unparseable input");
                self.notice(locale::unknown_command(self.language))?;
                return Ok(true);
            }
        };
        if command == Command::Quit {
            return Ok(false);
        }
        if matches!(self.screen, Screen::Home) {
            self.handle_home(command)?;
        } else {
            self.handle_chat(command)?;
        }
        Ok(true)
    }

    fn handle_home(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Ask(text) => {
                self.open_chat()?;
                if !text.trim().is_empty() {
                    self.ask(&text, false)?;
                }
            }
            Command::ToggleLanguage => {
                self.toggle_language();
                self.show_home()?;
            }
            Command::ToggleTheme => {
                self.theme = self.theme.toggled();
                self.show_home()?;
            }
            Command::Help => self.notice(locale::help(self.language))?,
            _ => self.show_home()?,
        }
        Ok(())
    }

    fn handle_chat(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Ask(text) => self.ask(&text, false)?,
            Command::NewChat => {
                if let Screen::Chat(session) = &mut self.screen {
                    session.reset(self.language);
                }
                self.show_chat()?;
            }
            Command::ToggleLanguage => {
                self.toggle_language();
                let reset = self.config.ui.reset_on_language_toggle;
                if let Screen::Chat(session) = &mut self.screen {
                    if reset {
                        session.reset(self.language);
                    } else {
                        session.set_language(self.language);
                    }
                }
                self.show_chat()?;
            }
            Command::ToggleTheme => {
                self.theme = self.theme.toggled();
                self.show_chat()?;
            }
            Command::Rate { index, rating } => {
                let Screen::Chat(session) = &mut self.screen else {
                    return Ok(());
                };
                match session.rate_message(index, rating) {
                    Ok(outcome) => {
                        if let Some(request) = outcome.forward {
                            self.forward_feedback(request);
                        }
                        self.notice(outcome.confirmation)?;
                    }
                    Err(err) => {
                        let text = match err {
                            SessionError::NotFound(_) => locale::not_found(self.language),
                            SessionError::FeedbackDisabled => {
                                locale::feedback_disabled(self.language)
                            }
                            SessionError::NotRateable(_) | SessionError::Busy => {
                                locale::not_rateable(self.language)
                            }
                        };
                        self.notice(text)?;
                    }
                }
            }
            Command::ListCommon => self.fetch_common(),
            Command::AskCommon(number) => {
                let picked = number
                    .checked_sub(1)
                    .and_then(|i| self.common.get(i))
                    .map(|q| q.text.clone());
                match picked {
                    Some(text) => self.ask(&text, true)?,
                    None => self.notice(locale::not_found(self.language))?,
                }
            }
            Command::Home => {
                self.show_home()?;
            }
            Command::Help => self.notice(locale::help(self.language))?,
            Command::Quit => {}
        }
        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Answer(ticket, outcome) => {
                let Screen::Chat(session) = &mut self.screen else {
                    debug!("answer arrived after leaving the chat");
                    return Ok(());
                };
                if session.complete(&ticket, outcome) {
                    self.render_last()?;
                    view::render_prompt(&mut self.out, self.language)?;
                }
            }
            Event::CommonQuestions(result) => {
                self.fetching_common = false;
                match result {
                    Ok(questions) => {
                        self.common = questions;
                        view::render_common_questions(&mut self.out, self.language, &self.common)?;
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to load common questions");
                        self.notice(locale::connection_error(self.language))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn ask(&mut self, text: &str, common: bool) -> Result<()> {
        let Screen::Chat(session) = &mut self.screen else {
            return Ok(());
        };
        let started = if common {
            session.begin_common(text)
        } else {
            session.begin_send(text)
        };
        match started {
            Ok(Some(ticket)) => {
                self.dispatch(ticket);
                self.render_last()?;
                view::render_searching(&mut self.out, self.language)?;
            }
            Ok(None) => {}
            Err(SessionError::Busy) => self.notice(locale::busy(self.language))?,
            Err(err) => warn!(error = %err, "could not send question"),
        }
        Ok(())
    }

    fn dispatch(&self, ticket: PendingAsk) {
        let gateway = self.gateway.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let request = ticket.request();
            let language = ticket.language;
            let task = tokio::spawn(async move { gateway.ask_request(&request, language).await });
            let outcome = task.await.map_err(|e| AskFailed(e.to_string()));
            let _ = tx.send(Event::Answer(ticket, outcome));
        });
    }

    fn forward_feedback(&self, request: FeedbackRequest) {
        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            if let Err(err) = gateway.send_feedback(&request).await {
                warn!(
                    error = %err,
                    question_id = %request.question_id,
                    "failed to deliver feedback"
                );
            }
        });
    }

    fn fetch_common(&mut self) {
        if self.fetching_common {
            return;
        }
        self.fetching_common = true;
        let gateway = self.gateway.clone();
        let tx = self.events_tx.clone();
        let language = self.language;
        tokio::spawn(async move {
            let result = gateway.common_questions(language).await;
            let _ = tx.send(Event::CommonQuestions(result));
        });
    }

    fn toggle_language(&mut self) {
        self.language = self.language.toggled();
        self.common.clear();
        if let Err(err) = self.prefs.save_is_arabic(self.language.is_arabic()) {
            warn!(error = %err, "failed to save language preference");
        }
        info!(language = self.language.code(), "language switched");
    }

    fn open_chat(&mut self) -> Result<()> {
        self.screen = Screen::Chat(SessionController::new(
            self.language,
            self.config.policy.feedback_enabled,
        ));
        self.show_chat()
    }

    fn show_home(&mut self) -> Result<()> {
        self.screen = Screen::Home;
        view::render_landing(&mut self.out, self.language, self.theme)?;
        Ok(())
    }

    fn show_chat(&mut self) -> Result<()> {
        let Screen::Chat(session) = &self.screen else {
            return Ok(());
        };
        view::render_header(&mut self.out, self.language)?;
        view::render_transcript(&mut self.out, session, self.theme)?;
        if !session.is_awaiting() {
            view::render_prompt(&mut self.out, self.language)?;
        }
        Ok(())
    }

    fn render_last(&mut self) -> Result<()> {
        let Screen::Chat(session) = &self.screen else {
            return Ok(());
        };
        let index = session.transcript().len() - 1;
        let rating = (session.feedback_enabled() && session.is_rateable(index))
            .then(|| session.rating_at(index));
        view::render_message(
            &mut self.out,
            index,
            &session.transcript()[index],
            rating,
            self.theme,
        )?;
        Ok(())
    }

    fn notice(&mut self, text: &str) -> Result<()> {
        view::render_notice(&mut self.out, text, self.theme)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{FakeService, Reply, response};
    use crate::gateway::AnswerPolicy;
    use crate::types::{AnswerId, Rating, Sender};
    use std::sync::Arc;

    struct Harness {
        coordinator: Coordinator<Vec<u8>>,
        service: Arc<FakeService>,
        _dir: tempfile::TempDir,
    }

    fn harness(service: FakeService, config: Config) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(service);
        let gateway = AnswerGateway::new(service.clone(), AnswerPolicy::default());
        let prefs = PreferenceStore::new(dir.path().join("prefs.json"));
        let coordinator = Coordinator::new(config, gateway, prefs, Language::English, Vec::new());
        Harness {
            coordinator,
            service,
            _dir: dir,
        }
    }

    fn session(coordinator: &Coordinator<Vec<u8>>) -> &SessionController {
        match &coordinator.screen {
            Screen::Chat(session) => session,
            Screen::Home => panic!("expected chat screen"),
        }
    }

    async fn settle(coordinator: &mut Coordinator<Vec<u8>>) {
        let event = coordinator.events_rx.recv().await.unwrap();
        coordinator.handle_event(event).unwrap();
    }

    fn output(coordinator: &Coordinator<Vec<u8>>) -> String {
        String::from_utf8_lossy(&coordinator.out).into_owned()
    }

    #[tokio::test]
    async fn question_round_trip_and_feedback_forwarding() {
        let mut h = harness(
            FakeService::replying(vec![Reply::Answer(response(
                &["Art. 1 ..."],
                Some(&[0.5]),
                Some(42),
            ))]),
            Config::default(),
        );
        let c = &mut h.coordinator;
        c.open_chat().unwrap();

        assert!(c.handle_line("What is a labor contract?").unwrap());
        assert!(session(c).is_awaiting());
        assert!(output(c).contains(locale::searching(Language::English)));

        settle(c).await;
        let transcript = session(c).transcript();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[3].sender, Sender::Bot);
        assert_eq!(transcript[3].answer_id, Some(AnswerId(42)));
        assert!(!session(c).is_awaiting());

        c.handle_line("/up 3").unwrap();
        assert_eq!(session(c).rating_at(3), Rating::Up);
        assert!(output(c).contains(locale::rating_confirmation(Language::English, Rating::Up)));

        // Feedback is fire-and-forget; give the spawned task a chance to run.
        for _ in 0..50 {
            if !h.service.feedback.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let sent = h.service.feedback.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![FeedbackRequest {
                question_id: AnswerId(42),
                is_good: true,
            }]
        );
    }

    #[tokio::test]
    async fn busy_session_rejects_second_question() {
        let mut h = harness(FakeService::replying(vec![Reply::Fail]), Config::default());
        let c = &mut h.coordinator;
        c.open_chat().unwrap();

        c.handle_line("first").unwrap();
        c.handle_line("second").unwrap();
        assert_eq!(session(c).transcript().len(), 3);
        assert!(output(c).contains(locale::busy(Language::English)));

        settle(c).await;
        assert_eq!(session(c).transcript().len(), 4);
        assert_eq!(
            session(c).transcript()[3].text,
            locale::connection_error(Language::English)
        );
        assert_eq!(h.service.asked.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn new_chat_discards_answer_in_flight() {
        let mut h = harness(
            FakeService::replying(vec![Reply::Answer(response(&["late"], None, Some(1)))]),
            Config::default(),
        );
        let c = &mut h.coordinator;
        c.open_chat().unwrap();

        c.handle_line("question").unwrap();
        c.handle_line("/new").unwrap();
        settle(c).await;

        assert_eq!(session(c).transcript().len(), 2);
        assert!(!session(c).is_awaiting());
    }

    #[tokio::test]
    async fn language_toggle_persists_and_optionally_resets() {
        let mut config = Config::default();
        config.ui.reset_on_language_toggle = true;
        let mut h = harness(
            FakeService::replying(vec![Reply::Answer(response(&["a"], None, None))]),
            config,
        );
        let c = &mut h.coordinator;
        c.open_chat().unwrap();
        c.handle_line("q").unwrap();
        settle(c).await;

        c.handle_line("/lang").unwrap();

        assert_eq!(c.language, Language::Arabic);
        assert_eq!(c.prefs.load_is_arabic(), Some(true));
        let transcript = session(c).transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].text, locale::greeting(Language::Arabic));
    }

    #[tokio::test]
    async fn language_toggle_without_reset_keeps_transcript() {
        let mut h = harness(
            FakeService::replying(vec![Reply::Answer(response(&["a"], None, None))]),
            Config::default(),
        );
        let c = &mut h.coordinator;
        c.open_chat().unwrap();
        c.handle_line("q").unwrap();
        settle(c).await;

        c.handle_line("/lang").unwrap();
        assert_eq!(session(c).transcript().len(), 4);
        assert_eq!(session(c).language(), Language::Arabic);
    }

    #[tokio::test]
    async fn home_screen_enter_opens_chat_and_quit_stops() {
        let mut h = harness(FakeService::default(), Config::default());
        let c = &mut h.coordinator;
        c.show_home().unwrap();

        assert!(c.handle_line("").unwrap());
        assert_eq!(session(c).transcript().len(), 2);

        c.handle_line("/home").unwrap();
        assert!(matches!(c.screen, Screen::Home));
        assert!(!c.handle_line("/quit").unwrap());
    }

    #[tokio::test]
    async fn run_waits_for_answer_after_input_ends() {
        let h = harness(
            FakeService::replying(vec![Reply::Answer(response(
                &["Art. 69: dismissal requires a serious fault."],
                Some(&[4.0]),
                Some(8),
            ))]),
            Config::default(),
        );
        let lines = tokio_stream::iter(vec![Ok::<_, io::Error>(
            "Can I be dismissed?".to_string(),
        )]);
        h.coordinator.run(lines, true).await.unwrap();

        let asked = h.service.asked.lock().unwrap();
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0].language, "en");
    }

    #[tokio::test]
    async fn answer_from_left_chat_does_not_reach_reopened_chat() {
        let mut h = harness(
            FakeService::replying(vec![
                Reply::Answer(response(&["late answer"], None, Some(1))),
                Reply::Answer(response(&["fresh answer"], None, Some(2))),
            ]),
            Config::default(),
        );
        let c = &mut h.coordinator;
        c.open_chat().unwrap();
        c.handle_line("old question").unwrap();

        c.handle_line("/home").unwrap();
        c.handle_line("").unwrap();
        assert_eq!(session(c).transcript().len(), 2);
        assert!(!session(c).is_awaiting());

        c.handle_line("new question").unwrap();
        settle(c).await;
        settle(c).await;

        let transcript = session(c).transcript();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[2].text, "new question");
        assert_eq!(transcript[3].sender, Sender::Bot);
        assert!(!session(c).is_awaiting());
    }

    #[tokio::test]
    async fn failed_feedback_keeps_local_rating() {
        let mut h = harness(
            FakeService::replying(vec![
                Reply::Answer(response(&["Art. 47 ..."], Some(&[0.9]), Some(7))),
                Reply::Answer(response(&["Art. 48 ..."], Some(&[0.9]), Some(8))),
            ])
            .failing_feedback(),
            Config::default(),
        );
        let c = &mut h.coordinator;
        c.open_chat().unwrap();
        c.handle_line("annual leave?").unwrap();
        settle(c).await;

        c.handle_line("/up 3").unwrap();
        for _ in 0..50 {
            if !h.service.feedback.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(h.service.feedback.lock().unwrap().len(), 1);
        assert_eq!(session(c).rating_at(3), Rating::Up);

        c.handle_line("sick leave?").unwrap();
        settle(c).await;
        assert_eq!(session(c).transcript().len(), 6);
        assert_eq!(session(c).rating_at(3), Rating::Up);
    }

    #[tokio::test]
    async fn common_question_is_asked_as_common() {
        let mut h = harness(
            FakeService::replying(vec![Reply::Answer(response(
                &["You have 21 days."],
                Some(&[0.8]),
                Some(3),
            ))])
            .with_common(&["How many vacation days do I have remaining?"]),
            Config::default(),
        );
        let c = &mut h.coordinator;
        c.open_chat().unwrap();

        c.handle_line("/faq").unwrap();
        settle(c).await;
        assert!(output(c).contains("1. How many vacation days do I have remaining?"));

        c.handle_line("/faq 2").unwrap();
        assert!(output(c).contains(locale::not_found(Language::English)));
        assert_eq!(session(c).transcript().len(), 2);

        c.handle_line("/faq 1").unwrap();
        settle(c).await;
        let asked = h.service.asked.lock().unwrap().clone();
        assert_eq!(asked.len(), 1);
        assert!(asked[0].is_common_question);
        assert!(asked[0].session_id.is_some());
        assert_eq!(session(c).transcript()[3].text, "You have 21 days.");
    }

    #[tokio::test]
    async fn language_toggle_clears_cached_common_questions() {
        let mut h = harness(
            FakeService::default().with_common(&["What is the notice period?"]),
            Config::default(),
        );
        let c = &mut h.coordinator;
        c.open_chat().unwrap();
        c.handle_line("/faq").unwrap();
        settle(c).await;
        assert_eq!(c.common.len(), 1);

        c.handle_line("/lang").unwrap();
        assert!(c.common.is_empty());
        c.handle_line("/faq 1").unwrap();
        assert!(output(c).contains(locale::not_found(Language::Arabic)));
        assert!(h.service.asked.lock().unwrap().is_empty());
    }
}
