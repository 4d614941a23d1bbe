//! Input staging for the detection form.
//!
//! Holds the draft being composed. Character count and the auto-size row count are
//! derived from the content on demand, so they can never drift from it.

use crate::model::{ChannelType, DraftMessage};

/// Illustrative spam sample offered as a discoverability aid.
pub const EXAMPLE_MESSAGE: &str = "Congratulations! You've won a $1000 gift card! Click here now to claim your prize: http://claim-prize.com. Limited time offer!";

/// Minimum height of the input surface, in rows.
pub const MIN_DISPLAY_ROWS: u16 = 6;

#[derive(Debug, Clone)]
pub struct InputStaging {
    draft: DraftMessage,
    focused: bool,
}

impl Default for InputStaging {
    fn default() -> Self {
        Self::new(ChannelType::default())
    }
}

impl InputStaging {
    pub fn new(channel: ChannelType) -> Self {
        Self {
            draft: DraftMessage::new(String::new(), channel),
            focused: true,
        }
    }

    pub fn content(&self) -> &str {
        &self.draft.content
    }

    pub fn channel(&self) -> ChannelType {
        self.draft.channel
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_content(&mut self, text: impl Into<String>) {
        self.draft.content = text.into();
    }

    /// Reset the draft and hand focus back to the input surface.
    pub fn clear(&mut self) {
        self.draft.content.clear();
        self.focused = true;
    }

    pub fn load_example(&mut self) {
        self.set_content(EXAMPLE_MESSAGE);
    }

    pub fn set_channel(&mut self, channel: ChannelType) {
        self.draft.channel = channel;
    }

    pub fn cycle_channel(&mut self) {
        self.draft.channel = self.draft.channel.next();
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn insert_char(&mut self, c: char) {
        self.draft.content.push(c);
    }

    /// Append pasted text, normalizing CRLF line endings.
    pub fn insert_str(&mut self, s: &str) {
        self.draft.content.push_str(&s.replace("\r\n", "\n"));
    }

    pub fn newline(&mut self) {
        self.draft.content.push('\n');
    }

    pub fn backspace(&mut self) {
        self.draft.content.pop();
    }

    /// Number of characters (Unicode scalar values) in the draft.
    pub fn char_count(&self) -> usize {
        self.draft.content.chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.draft.is_blank()
    }

    /// Rows the draft occupies when wrapped at `width` columns.
    pub fn content_rows(&self, width: u16) -> u16 {
        let width = usize::from(width.max(1));
        let rows: usize = self
            .draft
            .content
            .split('\n')
            .map(|line| line.chars().count().div_ceil(width).max(1))
            .sum();
        u16::try_from(rows).unwrap_or(u16::MAX)
    }

    /// Height of the input surface: the wrapped draft, never below the minimum.
    pub fn display_rows(&self, width: u16) -> u16 {
        self.content_rows(width).max(MIN_DISPLAY_ROWS)
    }

    /// Copy of the draft as it stands right now.
    pub fn snapshot(&self) -> DraftMessage {
        self.draft.clone()
    }
}
