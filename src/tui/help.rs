use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(desc),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, base_url: &str) {
    let p = Paragraph::new(vec![
        Line::from("Global:"),
        key_line("Ctrl-C", 6, "Quit"),
        key_line("tab", 9, "Switch tabs"),
        key_line("F1", 10, "Show this help"),
        Line::from(""),
        Line::from("Detect tab (typing):"),
        key_line("Ctrl-S", 6, "Detect spam"),
        key_line("Ctrl-L", 6, "Clear message"),
        key_line("Ctrl-E", 6, "Insert example"),
        key_line("Ctrl-T", 6, "Cycle message type"),
        key_line("Esc", 9, "Leave the text box"),
        Line::from(""),
        Line::from("Detect tab (outside the text box):"),
        key_line("s", 11, "Detect spam"),
        key_line("c", 11, "Clear message"),
        key_line("x", 11, "Insert example"),
        key_line("t", 11, "Cycle message type"),
        key_line("a", 11, "Toggle auto-save"),
        key_line("i / enter", 3, "Edit message"),
        key_line("q", 11, "Quit"),
        Line::from(""),
        Line::from("History tab:"),
        key_line("↑/↓ or j/k", 2, "Navigate"),
        key_line("enter", 7, "Load message into the form"),
        key_line("e", 11, "Export selected as JSON"),
        key_line("d", 11, "Delete selected"),
        key_line("r", 11, "Refresh history"),
        Line::from(""),
        Line::from("Classification service:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(base_url.to_string(), Style::default().fg(Color::Cyan)),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
