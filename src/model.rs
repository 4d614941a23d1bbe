use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// Connection settings for the classification service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

/// Medium the message was received on; passed to the classifier as context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    #[default]
    Email,
    Sms,
    Social,
}

impl ChannelType {
    /// Wire value used in the `type` field of a predict request.
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelType::Email => "email",
            ChannelType::Sms => "sms",
            ChannelType::Social => "social",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChannelType::Email => "Email",
            ChannelType::Sms => "SMS",
            ChannelType::Social => "Social Media",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ChannelType::Email => ChannelType::Sms,
            ChannelType::Sms => ChannelType::Social,
            ChannelType::Social => ChannelType::Email,
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The text a user is composing, as handed to the controller at submit time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftMessage {
    pub content: String,
    pub channel: ChannelType,
}

impl DraftMessage {
    pub fn new(content: impl Into<String>, channel: ChannelType) -> Self {
        Self {
            content: content.into(),
            channel,
        }
    }

    /// A draft is submittable only when it has non-whitespace content.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Body of `POST {base_url}/predict`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub message: String,
    #[serde(rename = "type")]
    pub channel: ChannelType,
}

impl From<&DraftMessage> for PredictRequest {
    fn from(draft: &DraftMessage) -> Self {
        Self {
            message: draft.content.clone(),
            channel: draft.channel,
        }
    }
}

/// Gate shared by the controller and every presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    InFlight,
}

impl SubmissionStatus {
    pub fn is_in_flight(self) -> bool {
        matches!(self, SubmissionStatus::InFlight)
    }
}

/// Normalized result of one resolved, non-fatal classification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationOutcome {
    Classified {
        id: String,
        message: String,
        channel: ChannelType,
        is_spam: bool,
        confidence: f64,
        language: String,
        #[serde(default)]
        indicators: Vec<String>,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    LanguageUnsupported {
        id: String,
        message: String,
        channel: ChannelType,
        language: Option<String>,
        reason: String,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
}

impl ClassificationOutcome {
    pub fn id(&self) -> &str {
        match self {
            ClassificationOutcome::Classified { id, .. }
            | ClassificationOutcome::LanguageUnsupported { id, .. } => id,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ClassificationOutcome::Classified { message, .. }
            | ClassificationOutcome::LanguageUnsupported { message, .. } => message,
        }
    }

    pub fn channel(&self) -> ChannelType {
        match self {
            ClassificationOutcome::Classified { channel, .. }
            | ClassificationOutcome::LanguageUnsupported { channel, .. } => *channel,
        }
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        match self {
            ClassificationOutcome::Classified { timestamp, .. }
            | ClassificationOutcome::LanguageUnsupported { timestamp, .. } => *timestamp,
        }
    }

    /// Spam verdict; `None` when the classifier could not judge the language.
    pub fn is_spam(&self) -> Option<bool> {
        match self {
            ClassificationOutcome::Classified { is_spam, .. } => Some(*is_spam),
            ClassificationOutcome::LanguageUnsupported { .. } => None,
        }
    }

    /// Short verdict label for list views.
    pub fn verdict_label(&self) -> &'static str {
        match self.is_spam() {
            Some(true) => "SPAM",
            Some(false) => "NOT SPAM",
            None => "UNSUPPORTED",
        }
    }

    /// RFC 3339 rendering of the resolution time.
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// User-facing notification, independent of the outcome sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Events emitted by the submission controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum DetectionEvent {
    StatusChanged(SubmissionStatus),
    Notice(Notice),
    Outcome {
        // Boxed to keep the event small next to the status/notice variants.
        outcome: Box<ClassificationOutcome>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_request_uses_wire_field_names() {
        let draft = DraftMessage::new("WIN FREE CASH NOW!!!", ChannelType::Sms);
        let body = serde_json::to_value(PredictRequest::from(&draft)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"message": "WIN FREE CASH NOW!!!", "type": "sms"})
        );
    }

    #[test]
    fn blank_drafts_are_detected_after_trimming() {
        assert!(DraftMessage::new("", ChannelType::Email).is_blank());
        assert!(DraftMessage::new(" \n\t ", ChannelType::Email).is_blank());
        assert!(!DraftMessage::new("  hi ", ChannelType::Email).is_blank());
    }

    #[test]
    fn channel_cycles_through_all_types() {
        let c = ChannelType::default();
        assert_eq!(c, ChannelType::Email);
        assert_eq!(c.next(), ChannelType::Sms);
        assert_eq!(c.next().next(), ChannelType::Social);
        assert_eq!(c.next().next().next(), ChannelType::Email);
    }

    #[test]
    fn outcome_json_is_tagged_and_reloadable() {
        let outcome = ClassificationOutcome::LanguageUnsupported {
            id: "42".into(),
            message: "你好".into(),
            channel: ChannelType::Social,
            language: Some("xx".into()),
            reason: "Sorry, this language isn't supported yet".into(),
            timestamp: time::macros::datetime!(2026-10-19 12:00:00 UTC),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "language_unsupported");
        assert_eq!(json["channel"], "social");
        assert_eq!(json["timestamp"], "2026-10-19T12:00:00Z");

        let back: ClassificationOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
        assert_eq!(back.is_spam(), None);
        assert_eq!(back.verdict_label(), "UNSUPPORTED");
    }
}
