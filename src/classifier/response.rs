//! Maps raw classifier replies onto a verdict or a typed submission error.

use super::{RawReply, ReplyBody};
use reqwest::StatusCode;
use thiserror::Error;

/// Substring the service uses to flag text in a language it cannot score.
pub const UNSUPPORTED_LANGUAGE_MARKER: &str = "language isn't supported";

/// Notification text when the service gives nothing more specific.
pub const GENERIC_FAILURE: &str = "Error detecting spam. Please try again.";

pub const EMPTY_MESSAGE: &str = "Please enter a message to check";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    #[error("{}", EMPTY_MESSAGE)]
    EmptyMessage,
    #[error("{reason}")]
    LanguageUnsupported {
        language: Option<String>,
        reason: String,
    },
    /// The transport succeeded but the payload reports a failure.
    #[error("classification service reported an error: {0}")]
    ServiceLogic(String),
    #[error("{0}")]
    Transport(String),
}

impl SubmissionError {
    /// Fatal errors end the attempt without an outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SubmissionError::ServiceLogic(_) | SubmissionError::Transport(_)
        )
    }

    /// Text for the user-facing notification line.
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::ServiceLogic(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Successful verdict fields, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_spam: bool,
    pub confidence: f64,
    pub language: String,
    pub indicators: Vec<String>,
}

fn non_empty(s: Option<&String>) -> Option<&str> {
    s.map(String::as_str).filter(|s| !s.is_empty())
}

/// Priority: server `message`, then server `error`, then the generic fallback.
fn failure_message(body: Option<&ReplyBody>) -> String {
    body.and_then(|b| non_empty(b.message.as_ref()).or_else(|| non_empty(b.error.as_ref())))
        .unwrap_or(GENERIC_FAILURE)
        .to_string()
}

/// Classify a reply. A payload `error` field outranks a 2xx status; the
/// unsupported-language case needs both a 400 status and the marker text.
pub fn classify_reply(reply: &RawReply) -> Result<Verdict, SubmissionError> {
    let body = reply.body.as_ref();

    if !reply.status.is_success() {
        if reply.status == StatusCode::BAD_REQUEST {
            if let Some(b) = body {
                if let Some(reason) = non_empty(b.error.as_ref()) {
                    if reason.contains(UNSUPPORTED_LANGUAGE_MARKER) {
                        return Err(SubmissionError::LanguageUnsupported {
                            language: b.language.clone(),
                            reason: reason.to_string(),
                        });
                    }
                }
            }
        }
        return Err(SubmissionError::Transport(failure_message(body)));
    }

    let Some(b) = body else {
        return Err(SubmissionError::ServiceLogic(
            "reply body is not valid JSON".into(),
        ));
    };
    if let Some(err) = non_empty(b.error.as_ref()) {
        return Err(SubmissionError::ServiceLogic(err.to_string()));
    }
    let (Some(is_spam), Some(confidence)) = (b.is_spam, b.confidence) else {
        return Err(SubmissionError::ServiceLogic(
            "reply is missing isSpam or confidence".into(),
        ));
    };
    if !confidence.is_finite() {
        return Err(SubmissionError::ServiceLogic(format!(
            "confidence {confidence} is not a number"
        )));
    }
    if !(0.0..=1.0).contains(&confidence) {
        tracing::warn!(confidence, "confidence outside [0, 1]; clamping");
    }

    Ok(Verdict {
        is_spam,
        confidence: confidence.clamp(0.0, 1.0),
        language: b.language.clone().unwrap_or_default(),
        indicators: b.indicators.clone().unwrap_or_default(),
    })
}
