//! Text summary builder for CLI output.
//!
//! Formats human-readable lines for an outcome in text mode.

use crate::model::ClassificationOutcome;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Shorten `s` to at most `max` characters, marking the cut with an ellipsis.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    let flat: String = s.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if flat.chars().count() <= max {
        return flat;
    }
    let mut out: String = flat.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub(crate) fn build_text_summary(outcome: &ClassificationOutcome) -> TextSummary {
    let mut lines = Vec::new();

    match outcome {
        ClassificationOutcome::Classified {
            is_spam,
            confidence,
            language,
            indicators,
            ..
        } => {
            lines.push(format!(
                "Verdict: {}",
                if *is_spam { "SPAM" } else { "NOT SPAM" }
            ));
            lines.push(format!("Confidence: {:.1}%", confidence * 100.0));
            if !language.is_empty() {
                lines.push(format!("Language: {language}"));
            }
            if indicators.is_empty() {
                lines.push("Indicators: none".to_string());
            } else {
                lines.push(format!("Indicators: {}", indicators.join(", ")));
            }
        }
        ClassificationOutcome::LanguageUnsupported {
            language, reason, ..
        } => {
            lines.push("Verdict: UNSUPPORTED LANGUAGE".to_string());
            lines.push(format!("Reason: {reason}"));
            if let Some(language) = language.as_deref() {
                lines.push(format!("Detected language: {language}"));
            }
        }
    }

    lines.push(format!("Channel: {}", outcome.channel().label()));
    lines.push(format!("Message: {}", truncate_chars(outcome.message(), 72)));
    lines.push(format!("Checked at: {}", outcome.timestamp_rfc3339()));

    TextSummary { lines }
}
