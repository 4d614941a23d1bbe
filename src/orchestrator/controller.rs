//! Submission lifecycle controller.
//!
//! Owns the single-flight attempt state, dispatches predict requests and turns each
//! reply into at most one outcome plus a notice for presentation layers.

use crate::classifier::{classify_reply, ClassifierClient, RawReply, SubmissionError, GENERIC_FAILURE};
use crate::credentials::CredentialProvider;
use crate::model::{
    ClassificationOutcome, DetectionEvent, DraftMessage, Notice, PredictRequest, SubmissionStatus,
};
use anyhow::Result;
use rand::RngCore;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};

/// Commands emitted by UI layers to drive the controller.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Submit(DraftMessage),
    Quit,
}

/// One dispatched classification request.
#[derive(Debug, Clone)]
pub(crate) struct SubmissionAttempt {
    pub id: u64,
    pub payload: PredictRequest,
    pub dispatched_at: OffsetDateTime,
}

#[derive(Debug)]
enum AttemptState {
    Idle,
    InFlight(SubmissionAttempt),
}

pub(crate) type DispatchResult = std::result::Result<RawReply, reqwest::Error>;
pub(crate) type DispatchHandle = JoinHandle<DispatchResult>;

pub(crate) struct SubmissionController {
    client: ClassifierClient,
    credentials: Arc<dyn CredentialProvider>,
    event_tx: UnboundedSender<DetectionEvent>,
    state: AttemptState,
    attempts: u64,
}

/// Random outcome ID, also used as the history file name.
fn gen_outcome_id() -> String {
    let mut b = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut b);
    u64::from_le_bytes(b).to_string()
}

impl SubmissionController {
    pub fn new(
        client: ClassifierClient,
        credentials: Arc<dyn CredentialProvider>,
        event_tx: UnboundedSender<DetectionEvent>,
    ) -> Self {
        Self {
            client,
            credentials,
            event_tx,
            state: AttemptState::Idle,
            attempts: 0,
        }
    }

    pub fn status(&self) -> SubmissionStatus {
        match self.state {
            AttemptState::Idle => SubmissionStatus::Idle,
            AttemptState::InFlight(_) => SubmissionStatus::InFlight,
        }
    }

    fn emit(&self, ev: DetectionEvent) {
        let _ = self.event_tx.send(ev);
    }

    fn notify(&self, notice: Notice) {
        self.emit(DetectionEvent::Notice(notice));
    }

    /// Validate the draft and dispatch it. Returns `None` without touching the
    /// network when the draft is blank or another attempt is still in flight.
    pub fn begin(&mut self, draft: &DraftMessage) -> Option<DispatchHandle> {
        if let AttemptState::InFlight(current) = &self.state {
            tracing::debug!(attempt = current.id, "submit ignored; attempt already in flight");
            return None;
        }
        if draft.is_blank() {
            self.notify(Notice::error(SubmissionError::EmptyMessage.user_message()));
            return None;
        }

        self.attempts += 1;
        let attempt = SubmissionAttempt {
            id: self.attempts,
            payload: PredictRequest::from(draft),
            dispatched_at: OffsetDateTime::now_utc(),
        };
        let client = self.client.clone();
        let payload = attempt.payload.clone();
        let credentials = Arc::clone(&self.credentials);
        let handle = tokio::spawn(async move {
            // Providers may touch the filesystem; keep that off the async workers.
            let token = tokio::task::spawn_blocking(move || credentials.bearer_token())
                .await
                .unwrap_or_default();
            client.predict(&payload, token.as_deref()).await
        });

        tracing::info!(attempt = attempt.id, channel = %attempt.payload.channel, "submission dispatched");
        self.state = AttemptState::InFlight(attempt);
        self.emit(DetectionEvent::StatusChanged(SubmissionStatus::InFlight));
        Some(handle)
    }

    /// Resolve the in-flight attempt. The guard is released on every path.
    pub fn finish(
        &mut self,
        joined: std::result::Result<DispatchResult, JoinError>,
    ) -> Option<ClassificationOutcome> {
        let AttemptState::InFlight(attempt) = std::mem::replace(&mut self.state, AttemptState::Idle)
        else {
            tracing::warn!("finish called with no attempt in flight");
            return None;
        };

        let resolution = match joined {
            Ok(Ok(reply)) => classify_reply(&reply),
            Ok(Err(e)) => {
                tracing::warn!(attempt = attempt.id, error = %e, "predict request failed");
                Err(SubmissionError::Transport(GENERIC_FAILURE.into()))
            }
            Err(e) => {
                tracing::warn!(attempt = attempt.id, error = %e, "predict task did not complete");
                Err(SubmissionError::Transport(GENERIC_FAILURE.into()))
            }
        };

        let SubmissionAttempt { id, payload, dispatched_at } = attempt;
        let (outcome, notice) = match resolution {
            Ok(verdict) => (
                Some(ClassificationOutcome::Classified {
                    id: gen_outcome_id(),
                    message: payload.message,
                    channel: payload.channel,
                    is_spam: verdict.is_spam,
                    confidence: verdict.confidence,
                    language: verdict.language,
                    indicators: verdict.indicators,
                    timestamp: OffsetDateTime::now_utc(),
                }),
                Notice::success("Detection completed successfully"),
            ),
            Err(SubmissionError::LanguageUnsupported { language, reason }) => (
                Some(ClassificationOutcome::LanguageUnsupported {
                    id: gen_outcome_id(),
                    message: payload.message,
                    channel: payload.channel,
                    language,
                    reason: reason.clone(),
                    timestamp: OffsetDateTime::now_utc(),
                }),
                Notice::warning(reason),
            ),
            Err(e) => {
                tracing::warn!(attempt = id, error = %e, "submission failed");
                (None, Notice::error(e.user_message()))
            }
        };

        let elapsed = OffsetDateTime::now_utc() - dispatched_at;
        tracing::info!(
            attempt = id,
            elapsed_ms = elapsed.whole_milliseconds() as i64,
            produced_outcome = outcome.is_some(),
            "submission resolved"
        );

        if let Some(o) = outcome.as_ref() {
            self.emit(DetectionEvent::Outcome {
                outcome: Box::new(o.clone()),
            });
        }
        self.notify(notice);
        self.emit(DetectionEvent::StatusChanged(SubmissionStatus::Idle));
        outcome
    }

    /// Submit and wait for resolution in one call.
    pub async fn submit(&mut self, draft: &DraftMessage) -> Option<ClassificationOutcome> {
        let handle = self.begin(draft)?;
        let joined = handle.await;
        self.finish(joined)
    }
}

/// Serve UI commands until quit, keeping at most one attempt in flight.
pub(crate) async fn run_controller(
    mut controller: SubmissionController,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut in_flight: Option<DispatchHandle> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit(draft)) => {
                        if let Some(handle) = controller.begin(&draft) {
                            in_flight = Some(handle);
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        tracing::debug!(status = ?controller.status(), "controller stopping");
                        // Dropping a JoinHandle does not cancel the task; abort it explicitly.
                        if let Some(handle) = in_flight.take() {
                            handle.abort();
                        }
                        break;
                    }
                }
            }
            // Only poll the handle in place; taking it out before this branch wins would
            // lose the completion if the command branch is chosen instead.
            joined = async {
                match in_flight.as_mut() {
                    Some(handle) => handle.await,
                    None => futures::future::pending().await,
                }
            } => {
                in_flight = None;
                controller.finish(joined);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Anonymous, SessionTokenFile, StaticToken};
    use crate::model::{ChannelType, ClientConfig, NoticeLevel};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_controller(
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> (SubmissionController, mpsc::UnboundedReceiver<DetectionEvent>) {
        let client = ClassifierClient::new(&ClientConfig {
            base_url: base_url.to_string(),
            timeout,
            user_agent: "spam-check-cli/test".into(),
        })
        .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        (SubmissionController::new(client, credentials, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<DetectionEvent>) -> Vec<DetectionEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn outcomes(events: &[DetectionEvent]) -> Vec<ClassificationOutcome> {
        events
            .iter()
            .filter_map(|ev| match ev {
                DetectionEvent::Outcome { outcome } => Some((**outcome).clone()),
                _ => None,
            })
            .collect()
    }

    fn notices(events: &[DetectionEvent]) -> Vec<Notice> {
        events
            .iter()
            .filter_map(|ev| match ev {
                DetectionEvent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    async fn mount_reply(server: &MockServer, template: ResponseTemplate, expect: u64) {
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(template)
            .expect(expect)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn blank_draft_never_reaches_network() {
        let server = MockServer::start().await;
        mount_reply(&server, ResponseTemplate::new(200), 0).await;

        let (mut controller, mut rx) =
            test_controller(&server.uri(), Arc::new(Anonymous), Duration::from_secs(5));
        for content in ["", "   ", "\n\t"] {
            let draft = DraftMessage::new(content, ChannelType::Email);
            assert!(controller.submit(&draft).await.is_none());
        }

        let events = drain(&mut rx);
        assert!(outcomes(&events).is_empty());
        let notices = notices(&events);
        assert_eq!(notices.len(), 3);
        assert!(notices
            .iter()
            .all(|n| n.level == NoticeLevel::Error && n.text == "Please enter a message to check"));
        assert!(!events
            .iter()
            .any(|ev| matches!(ev, DetectionEvent::StatusChanged(_))));
        assert_eq!(controller.status(), SubmissionStatus::Idle);
    }

    #[tokio::test]
    async fn legitimate_email_is_classified() {
        let server = MockServer::start().await;
        mount_reply(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isSpam": false,
                "confidence": 0.02,
                "language": "en",
                "indicators": []
            })),
            1,
        )
        .await;

        let (mut controller, mut rx) =
            test_controller(&server.uri(), Arc::new(Anonymous), Duration::from_secs(5));
        let draft = DraftMessage::new("Hi, are we still meeting at 5?", ChannelType::Email);
        let outcome = controller.submit(&draft).await.unwrap();

        match &outcome {
            ClassificationOutcome::Classified {
                message,
                channel,
                is_spam,
                confidence,
                language,
                indicators,
                ..
            } => {
                assert_eq!(message, "Hi, are we still meeting at 5?");
                assert_eq!(*channel, ChannelType::Email);
                assert!(!is_spam);
                assert_eq!(*confidence, 0.02);
                assert_eq!(language, "en");
                assert!(indicators.is_empty());
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let events = drain(&mut rx);
        assert!(matches!(
            events.first(),
            Some(DetectionEvent::StatusChanged(SubmissionStatus::InFlight))
        ));
        assert!(matches!(
            events.last(),
            Some(DetectionEvent::StatusChanged(SubmissionStatus::Idle))
        ));
        assert_eq!(outcomes(&events), vec![outcome]);
        assert_eq!(
            notices(&events),
            vec![Notice::success("Detection completed successfully")]
        );
    }

    #[tokio::test]
    async fn spam_sms_carries_token_and_resolution_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(header("authorization", "Bearer session-xyz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "isSpam": true,
                        "confidence": 0.97,
                        "language": "en",
                        "indicators": ["urgency", "money_offer"]
                    }))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (mut controller, _rx) = test_controller(
            &server.uri(),
            Arc::new(StaticToken::new("session-xyz")),
            Duration::from_secs(5),
        );
        let dispatched = OffsetDateTime::now_utc();
        let outcome = controller
            .submit(&DraftMessage::new("WIN FREE CASH NOW!!!", ChannelType::Sms))
            .await
            .unwrap();

        assert_eq!(outcome.is_spam(), Some(true));
        assert!(outcome.timestamp() - dispatched >= time::Duration::milliseconds(250));
        match outcome {
            ClassificationOutcome::Classified {
                confidence,
                indicators,
                channel,
                ..
            } => {
                assert_eq!(confidence, 0.97);
                assert_eq!(indicators, vec!["urgency", "money_offer"]);
                assert_eq!(channel, ChannelType::Sms);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn session_token_is_read_at_dispatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(header("authorization", "Bearer fresh-login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isSpam": false,
                "confidence": 0.1,
                "language": "en",
                "indicators": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("session-token");
        let (mut controller, _rx) = test_controller(
            &server.uri(),
            Arc::new(SessionTokenFile::new(&token_path)),
            Duration::from_secs(5),
        );
        // Written after the controller exists, as a login would.
        std::fs::write(&token_path, "fresh-login\n").unwrap();

        let outcome = controller
            .submit(&DraftMessage::new("see you at 5", ChannelType::Email))
            .await;
        assert_eq!(outcome.and_then(|o| o.is_spam()), Some(false));
    }

    #[tokio::test]
    async fn unsupported_language_yields_dedicated_outcome() {
        let server = MockServer::start().await;
        mount_reply(
            &server,
            ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "Sorry, this language isn't supported yet",
                "language": "xx"
            })),
            1,
        )
        .await;

        let (mut controller, mut rx) =
            test_controller(&server.uri(), Arc::new(Anonymous), Duration::from_secs(5));
        let outcome = controller
            .submit(&DraftMessage::new("ⴰⵣⵓⵍ ⴼⵍⵍⴰⵡⵏ", ChannelType::Social))
            .await
            .unwrap();

        match &outcome {
            ClassificationOutcome::LanguageUnsupported {
                language, reason, ..
            } => {
                assert_eq!(language.as_deref(), Some("xx"));
                assert_eq!(reason, "Sorry, this language isn't supported yet");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(controller.status(), SubmissionStatus::Idle);

        let events = drain(&mut rx);
        let emitted = outcomes(&events);
        assert_eq!(emitted.len(), 1);
        assert!(emitted.iter().all(|o| o.is_spam().is_none()));
        assert_eq!(
            notices(&events),
            vec![Notice::warning("Sorry, this language isn't supported yet")]
        );
    }

    #[tokio::test]
    async fn payload_error_under_200_is_fatal_and_releases_guard() {
        let server = MockServer::start().await;
        mount_reply(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "Model is warming up"
            })),
            1,
        )
        .await;

        let (mut controller, mut rx) =
            test_controller(&server.uri(), Arc::new(Anonymous), Duration::from_secs(5));
        let outcome = controller
            .submit(&DraftMessage::new("hello there", ChannelType::Email))
            .await;

        assert!(outcome.is_none());
        assert_eq!(controller.status(), SubmissionStatus::Idle);
        let events = drain(&mut rx);
        assert!(outcomes(&events).is_empty());
        assert_eq!(notices(&events), vec![Notice::error(GENERIC_FAILURE)]);
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let server = MockServer::start().await;
        mount_reply(
            &server,
            ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "Token expired, please log in again"
            })),
            1,
        )
        .await;

        let (mut controller, mut rx) =
            test_controller(&server.uri(), Arc::new(Anonymous), Duration::from_secs(5));
        assert!(controller
            .submit(&DraftMessage::new("hello", ChannelType::Email))
            .await
            .is_none());
        assert_eq!(
            notices(&drain(&mut rx)),
            vec![Notice::error("Token expired, please log in again")]
        );
    }

    #[tokio::test]
    async fn timeout_is_fatal_and_next_submit_is_permitted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_reply(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isSpam": false,
                "confidence": 0.1,
                "language": "en",
                "indicators": []
            })),
            1,
        )
        .await;

        let (mut controller, mut rx) =
            test_controller(&server.uri(), Arc::new(Anonymous), Duration::from_millis(200));
        let draft = DraftMessage::new("are you there?", ChannelType::Email);

        assert!(controller.submit(&draft).await.is_none());
        assert_eq!(controller.status(), SubmissionStatus::Idle);
        let events = drain(&mut rx);
        assert!(outcomes(&events).is_empty());
        assert_eq!(notices(&events), vec![Notice::error(GENERIC_FAILURE)]);

        assert!(controller.submit(&draft).await.is_some());
    }

    #[tokio::test]
    async fn unreachable_service_is_fatal() {
        // Reserve a port, then close it so the connection is refused.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let uri = format!("http://127.0.0.1:{port}");
        let (mut controller, mut rx) =
            test_controller(&uri, Arc::new(Anonymous), Duration::from_secs(2));

        assert!(controller
            .submit(&DraftMessage::new("hello", ChannelType::Sms))
            .await
            .is_none());
        assert_eq!(controller.status(), SubmissionStatus::Idle);
        assert_eq!(notices(&drain(&mut rx)), vec![Notice::error(GENERIC_FAILURE)]);
    }

    #[tokio::test]
    async fn aborted_dispatch_still_releases_guard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let (mut controller, _rx) =
            test_controller(&server.uri(), Arc::new(Anonymous), Duration::from_secs(5));
        let handle = controller
            .begin(&DraftMessage::new("hello", ChannelType::Email))
            .unwrap();
        assert_eq!(controller.status(), SubmissionStatus::InFlight);
        assert!(controller
            .begin(&DraftMessage::new("again", ChannelType::Email))
            .is_none());

        handle.abort();
        let joined = handle.await;
        assert!(joined.is_err());
        assert!(controller.finish(joined).is_none());
        assert_eq!(controller.status(), SubmissionStatus::Idle);
    }

    #[tokio::test]
    async fn controller_loop_is_single_flight() {
        let server = MockServer::start().await;
        mount_reply(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "isSpam": true,
                    "confidence": 0.9,
                    "language": "en",
                    "indicators": ["urgency"]
                }))
                .set_delay(Duration::from_millis(300)),
            // One for the first burst, one for the submit after resolution.
            2,
        )
        .await;

        let (controller, mut rx) =
            test_controller(&server.uri(), Arc::new(Anonymous), Duration::from_secs(5));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let loop_handle = tokio::spawn(run_controller(controller, cmd_rx));

        let draft = DraftMessage::new("WIN FREE CASH NOW!!!", ChannelType::Sms);
        cmd_tx.send(UiCommand::Submit(draft.clone())).unwrap();
        cmd_tx.send(UiCommand::Submit(draft.clone())).unwrap();
        cmd_tx.send(UiCommand::Submit(draft.clone())).unwrap();

        let mut first_round = 0;
        while let Some(ev) = rx.recv().await {
            match ev {
                DetectionEvent::Outcome { .. } => first_round += 1,
                DetectionEvent::StatusChanged(SubmissionStatus::Idle) => break,
                _ => {}
            }
        }
        assert_eq!(first_round, 1);

        cmd_tx.send(UiCommand::Submit(draft)).unwrap();
        let mut second_round = 0;
        while let Some(ev) = rx.recv().await {
            match ev {
                DetectionEvent::Outcome { .. } => second_round += 1,
                DetectionEvent::StatusChanged(SubmissionStatus::Idle) => break,
                _ => {}
            }
        }
        assert_eq!(second_round, 1);

        cmd_tx.send(UiCommand::Quit).unwrap();
        loop_handle.await.unwrap().unwrap();
    }
}
