//! Post-outcome processing utilities.
//!
//! Handles auto-save, exports, and history refresh after an attempt produces an outcome.

use crate::model::ClassificationOutcome;
use crate::storage::{self, HistoryStore};
use std::path::{Path, PathBuf};

/// Result of post-outcome processing, ready for presentation layers.
pub(crate) struct ProcessedOutcome {
    pub export_messages: Vec<String>,
    pub history: Vec<ClassificationOutcome>,
    pub auto_saved_path: Option<PathBuf>,
}

/// Process an outcome: auto-save, export, and reload history.
///
/// `store` is `None` when auto-save is off; history is then left alone.
pub(crate) fn process_outcome(
    store: Option<&HistoryStore>,
    export_json: Option<&Path>,
    history_load: usize,
    outcome: &ClassificationOutcome,
) -> ProcessedOutcome {
    let auto_saved_path = store.and_then(|store| match store.save_outcome(outcome) {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "auto-save failed");
            None
        }
    });

    let mut export_messages = Vec::new();
    if let Some(export_path) = export_json {
        match storage::export_json(export_path, outcome) {
            Ok(_) => export_messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export JSON failed: {e:#}")),
        }
    }

    let history = match store {
        Some(store) if history_load > 0 => store.load_recent(history_load).unwrap_or_default(),
        _ => Vec::new(),
    };

    ProcessedOutcome {
        export_messages,
        history,
        auto_saved_path,
    }
}
