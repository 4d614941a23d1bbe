use crate::draft::InputStaging;
use crate::model::{ChannelType, ClassificationOutcome, Notice, SubmissionStatus};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Detect,
    History,
    Help,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Detect, Tab::History, Tab::Help];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Detect => "Detect",
            Tab::History => "History",
            Tab::Help => "Help",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Detect => 0,
            Tab::History => 1,
            Tab::Help => 2,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Tab::Detect => Tab::History,
            Tab::History => Tab::Help,
            Tab::Help => Tab::Detect,
        }
    }
}

pub struct UiState {
    pub tab: Tab,
    pub input: InputStaging,
    // Mirrors the controller; updated only from StatusChanged events.
    pub status: SubmissionStatus,
    pub notice: Option<Notice>,
    pub info: String,

    pub last_outcome: Option<ClassificationOutcome>,
    pub history: Vec<ClassificationOutcome>,
    pub history_selected: usize, // Index of selected history item (0 = most recent)
    pub history_scroll_offset: usize,
    pub history_limit: usize,
    // Rows the history pane can show; refreshed from the terminal size.
    pub history_page_rows: usize,

    pub auto_save: bool,
    pub clear_on_success: bool,
    pub base_url: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: Tab::Detect,
            input: InputStaging::new(ChannelType::default()),
            status: SubmissionStatus::Idle,
            notice: None,
            info: String::new(),
            last_outcome: None,
            history: Vec::new(),
            history_selected: 0,
            history_scroll_offset: 0,
            history_limit: 200,
            history_page_rows: 10,
            auto_save: true,
            clear_on_success: false,
            base_url: String::new(),
        }
    }
}

impl UiState {
    /// Whether a submit key press would be forwarded to the controller.
    pub fn can_submit(&self) -> bool {
        !self.status.is_in_flight() && !self.input.is_blank()
    }

    pub fn select_prev(&mut self) {
        if self.history_selected > 0 {
            self.history_selected -= 1;
            if self.history_selected < self.history_scroll_offset {
                self.history_scroll_offset = self.history_selected;
            }
        }
    }

    pub fn select_next(&mut self, visible_rows: usize) {
        if self.history_selected + 1 < self.history.len() {
            self.history_selected += 1;
            let visible_rows = visible_rows.max(1);
            if self.history_selected >= self.history_scroll_offset + visible_rows {
                self.history_scroll_offset = self.history_selected + 1 - visible_rows;
            }
        }
    }

    /// Record the history pane height and keep the selected row inside it.
    pub fn set_history_page_rows(&mut self, rows: usize) {
        let rows = rows.max(1);
        self.history_page_rows = rows;
        if self.history_selected >= self.history_scroll_offset + rows {
            self.history_scroll_offset = self.history_selected + 1 - rows;
        }
    }

    /// Keep selection and scroll inside the list after it shrank or was replaced.
    pub fn clamp_history_selection(&mut self) {
        if self.history.is_empty() {
            self.history_selected = 0;
            self.history_scroll_offset = 0;
            return;
        }
        if self.history_selected >= self.history.len() {
            self.history_selected = self.history.len() - 1;
        }
        if self.history_scroll_offset > self.history_selected {
            self.history_scroll_offset = self.history_selected;
        }
    }

    pub fn selected_history(&self) -> Option<&ClassificationOutcome> {
        self.history.get(self.history_selected)
    }
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str) -> ClassificationOutcome {
        ClassificationOutcome::Classified {
            id: id.into(),
            message: "m".into(),
            channel: ChannelType::Email,
            is_spam: false,
            confidence: 0.1,
            language: "en".into(),
            indicators: Vec::new(),
            timestamp: time::OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn selection_scrolls_with_cursor() {
        let mut state = UiState {
            history: (0..10).map(|i| outcome(&i.to_string())).collect(),
            ..Default::default()
        };
        for _ in 0..5 {
            state.select_next(3);
        }
        assert_eq!(state.history_selected, 5);
        assert_eq!(state.history_scroll_offset, 3);
        for _ in 0..20 {
            state.select_next(3);
        }
        assert_eq!(state.history_selected, 9);
        for _ in 0..9 {
            state.select_prev();
        }
        assert_eq!(state.history_selected, 0);
        assert_eq!(state.history_scroll_offset, 0);
    }

    #[test]
    fn resize_keeps_selection_on_screen() {
        let mut state = UiState {
            history: (0..30).map(|i| outcome(&i.to_string())).collect(),
            ..Default::default()
        };
        state.set_history_page_rows(20);
        for _ in 0..12 {
            state.select_next(state.history_page_rows);
        }
        assert_eq!(state.history_scroll_offset, 0);

        state.set_history_page_rows(5);
        assert_eq!(state.history_selected, 12);
        assert_eq!(state.history_scroll_offset, 8);
    }

    #[test]
    fn clamp_after_shrink() {
        let mut state = UiState {
            history: (0..3).map(|i| outcome(&i.to_string())).collect(),
            history_selected: 2,
            history_scroll_offset: 2,
            ..Default::default()
        };
        state.history.truncate(1);
        state.clamp_history_selection();
        assert_eq!(state.history_selected, 0);
        assert_eq!(state.history_scroll_offset, 0);

        state.history.clear();
        state.clamp_history_selection();
        assert!(state.selected_history().is_none());
    }

    #[test]
    fn submit_gate_reads_status_and_draft() {
        let mut state = UiState::default();
        assert!(!state.can_submit());
        state.input.set_content("hello");
        assert!(state.can_submit());
        state.status = SubmissionStatus::InFlight;
        assert!(!state.can_submit());
    }

    #[test]
    fn wrapped_kv_splits_long_values() {
        let mut out = Vec::new();
        push_wrapped_status_kv(&mut out, "Reason", &"x".repeat(30), 20);
        // usable 16, first line 16 - 8 = 8 chars, then 14 per line
        assert_eq!(out.len(), 3);
        push_wrapped_status_kv(&mut out, "Empty", "   ", 20);
        assert_eq!(out.len(), 3);
    }
}
