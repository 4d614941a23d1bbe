mod help;
mod state;

use crate::cli::Cli;
use crate::metrics::HistoryStats;
use crate::model::{ClassificationOutcome, DetectionEvent, NoticeLevel, SubmissionStatus};
use crate::orchestrator::{self, UiCommand};
use crate::storage::{self, HistoryStore};
use crate::text_summary::truncate_chars;
use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{push_wrapped_status_kv, Tab, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const PLACEHOLDER: &str = "Enter your message here (Email, SMS, or Social Media)...";
// Rows taken by the tab bar and footer around the main pane.
const CHROME_ROWS: u16 = 5;

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<DetectionEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let controller = crate::cli::build_controller(&args, event_tx)?;
    let store = HistoryStore::default_location()?;

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, store, event_rx, cmd_tx));

    let res = orchestrator::run_controller(controller, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    store: HistoryStore,
    mut event_rx: UnboundedReceiver<DetectionEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        auto_save: args.auto_save,
        clear_on_success: args.clear_on_success,
        base_url: args.base_url.clone(),
        ..Default::default()
    };
    state.input.set_channel(args.channel);
    state.history = store.load_recent(state.history_limit).unwrap_or_default();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            match ev {
                DetectionEvent::Outcome { outcome } => {
                    handle_outcome(&args, &store, &mut state, *outcome);
                }
                other => apply_event(&mut state, other),
            }
        }

        if let Ok(size) = terminal.size() {
            state.set_history_page_rows(history_visible_rows(
                size.height.saturating_sub(CHROME_ROWS),
            ));
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(k)) => {
                    if k.kind != KeyEventKind::Press {
                        continue;
                    }
                    if handle_key(&mut state, k, &cmd_tx, &store) == KeyAction::Quit {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    // Redraw right away so typing feels immediate.
                    terminal.draw(|f| draw(f.area(), f, &state)).ok();
                    last_tick = Instant::now();
                }
                Ok(Event::Paste(text)) => {
                    if state.tab == Tab::Detect {
                        state.input.insert_str(&text);
                        state.input.focus();
                    }
                }
                _ => {}
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen).ok();
    res
}

fn apply_event(state: &mut UiState, ev: DetectionEvent) {
    match ev {
        DetectionEvent::StatusChanged(status) => {
            state.status = status;
        }
        DetectionEvent::Notice(notice) => {
            state.notice = Some(notice);
        }
        DetectionEvent::Outcome { outcome } => {
            state.last_outcome = Some(*outcome);
        }
    }
}

fn handle_outcome(
    args: &Cli,
    store: &HistoryStore,
    state: &mut UiState,
    outcome: ClassificationOutcome,
) {
    let processed = orchestrator::process_outcome(
        state.auto_save.then_some(store),
        args.export_json.as_deref(),
        state.history_limit,
        &outcome,
    );
    if processed.auto_saved_path.is_some() {
        state.history = processed.history;
    } else {
        state.history.insert(0, outcome.clone());
    }
    state.clamp_history_selection();

    let mut info = Vec::new();
    if let Some(p) = processed.auto_saved_path {
        info.push(format!("Saved: {}", p.display()));
    }
    info.extend(processed.export_messages);
    state.info = info.join(" | ");

    if state.clear_on_success && outcome.is_spam().is_some() {
        state.input.clear();
    }
    state.last_outcome = Some(outcome);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Continue,
    Quit,
}

fn request_submit(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) {
    if state.status.is_in_flight() {
        state.info = "Analysis already in progress…".into();
        return;
    }
    let _ = cmd_tx.send(UiCommand::Submit(state.input.snapshot()));
}

fn handle_key(
    state: &mut UiState,
    k: KeyEvent,
    cmd_tx: &UnboundedSender<UiCommand>,
    store: &HistoryStore,
) -> KeyAction {
    match (k.modifiers, k.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => return KeyAction::Quit,
        (_, KeyCode::Tab) => {
            state.tab = state.tab.next();
            return KeyAction::Continue;
        }
        (_, KeyCode::F(1)) => {
            state.tab = Tab::Help;
            return KeyAction::Continue;
        }
        _ => {}
    }

    match state.tab {
        Tab::Detect if state.input.is_focused() => handle_input_key(state, k, cmd_tx),
        Tab::Detect => handle_form_key(state, k, cmd_tx),
        Tab::History => handle_history_key(state, k, store),
        Tab::Help => match k.code {
            KeyCode::Char('q') => KeyAction::Quit,
            KeyCode::Esc => {
                state.tab = Tab::Detect;
                KeyAction::Continue
            }
            _ => KeyAction::Continue,
        },
    }
}

/// Keys while the text box has focus: everything printable is text.
fn handle_input_key(
    state: &mut UiState,
    k: KeyEvent,
    cmd_tx: &UnboundedSender<UiCommand>,
) -> KeyAction {
    match (k.modifiers, k.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('s')) => request_submit(state, cmd_tx),
        (KeyModifiers::CONTROL, KeyCode::Char('l')) => state.input.clear(),
        (KeyModifiers::CONTROL, KeyCode::Char('e')) => state.input.load_example(),
        (KeyModifiers::CONTROL, KeyCode::Char('t')) => state.input.cycle_channel(),
        (_, KeyCode::Esc) => state.input.blur(),
        (_, KeyCode::Enter) => state.input.newline(),
        (_, KeyCode::Backspace) => state.input.backspace(),
        (m, KeyCode::Char(c)) if !m.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            state.input.insert_char(c)
        }
        _ => {}
    }
    KeyAction::Continue
}

fn handle_form_key(
    state: &mut UiState,
    k: KeyEvent,
    cmd_tx: &UnboundedSender<UiCommand>,
) -> KeyAction {
    match k.code {
        KeyCode::Char('q') => return KeyAction::Quit,
        KeyCode::Char('s') => request_submit(state, cmd_tx),
        KeyCode::Char('c') => state.input.clear(),
        KeyCode::Char('x') => state.input.load_example(),
        KeyCode::Char('t') => state.input.cycle_channel(),
        KeyCode::Char('i') | KeyCode::Enter => state.input.focus(),
        KeyCode::Char('?') => state.tab = Tab::Help,
        KeyCode::Char('a') => {
            state.auto_save = !state.auto_save;
            state.info = if state.auto_save {
                "Auto-save enabled".into()
            } else {
                "Auto-save disabled".into()
            };
        }
        _ => {}
    }
    KeyAction::Continue
}

fn handle_history_key(state: &mut UiState, k: KeyEvent, store: &HistoryStore) -> KeyAction {
    match k.code {
        KeyCode::Char('q') => return KeyAction::Quit,
        KeyCode::Char('?') => state.tab = Tab::Help,
        KeyCode::Up | KeyCode::Char('k') => state.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => state.select_next(state.history_page_rows),
        KeyCode::Enter => {
            if let Some(o) = state.selected_history() {
                let (message, channel) = (o.message().to_string(), o.channel());
                state.input.set_content(message);
                state.input.set_channel(channel);
                state.input.focus();
                state.tab = Tab::Detect;
            }
        }
        KeyCode::Char('r') => match store.load_recent(state.history_limit) {
            Ok(history) => {
                let old_count = state.history.len();
                state.history = history;
                state.clamp_history_selection();
                let new_count = state.history.len();
                state.info = if new_count > old_count {
                    format!("Refreshed: {} new outcome(s)", new_count - old_count)
                } else if new_count < old_count {
                    format!("Refreshed: {} outcome(s) removed", old_count - new_count)
                } else {
                    "Refreshed".into()
                };
            }
            Err(e) => state.info = format!("Refresh failed: {e:#}"),
        },
        KeyCode::Char('e') => {
            if let Some(o) = state.selected_history() {
                let path = std::path::PathBuf::from(format!("spam-check-{}.json", o.id()));
                state.info = match storage::export_json(&path, o) {
                    Ok(()) => format!("Exported JSON: {}", path.display()),
                    Err(e) => format!("JSON export failed: {e:#}"),
                };
            }
        }
        KeyCode::Char('d') => {
            if let Some(o) = state.selected_history().cloned() {
                match store.delete_outcome(&o) {
                    Ok(()) => {
                        state.history.remove(state.history_selected);
                        state.clamp_history_selection();
                        state.info = "Deleted".into();
                    }
                    Err(e) => state.info = format!("Delete failed: {e:#}"),
                }
            }
        }
        _ => {}
    }
    KeyAction::Continue
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(2),
        ])
        .split(area);

    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .select(state.tab.index())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("spam-check"),
        )
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        Tab::Detect => draw_detect(chunks[1], f, state),
        Tab::History => draw_history(chunks[1], f, state),
        Tab::Help => help::draw_help(chunks[1], f, &state.base_url),
    }

    draw_footer(chunks[2], f, state);
}

fn notice_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    }
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = Vec::new();
    match state.notice.as_ref() {
        Some(n) => lines.push(Line::from(Span::styled(
            n.text.clone(),
            Style::default().fg(notice_color(n.level)),
        ))),
        None => lines.push(Line::from("")),
    }
    let hint = if state.info.is_empty() {
        "tab: switch  F1: help  Ctrl-C: quit".to_string()
    } else {
        state.info.clone()
    };
    lines.push(Line::from(Span::styled(
        hint,
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_detect(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let inner_width = area.width.saturating_sub(2);
    let wanted = state.input.display_rows(inner_width).saturating_add(2);
    let form_height = wanted.min(area.height.saturating_mul(3) / 5).max(3);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(form_height),
            Constraint::Length(1),
            Constraint::Min(4),
        ])
        .split(area);

    draw_form(chunks[0], f, state);
    draw_form_status(chunks[1], f, state);
    draw_result(chunks[2], f, state);
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let focused = state.input.is_focused();
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title("Message Analysis");

    let text: Vec<Line> = if state.input.content().is_empty() {
        vec![Line::from(Span::styled(
            PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let mut lines: Vec<Line> = state
            .input
            .content()
            .split('\n')
            .map(|l| Line::from(l.to_string()))
            .collect();
        if focused {
            if let Some(last) = lines.last_mut() {
                last.push_span(Span::styled("▏", Style::default().fg(Color::Cyan)));
            }
        }
        lines
    };

    // Keep the end of the draft (where typing happens) in view.
    let visible = area.height.saturating_sub(2);
    let total = state.input.content_rows(area.width.saturating_sub(2));
    let scroll = total.saturating_sub(visible.max(1));

    let p = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(p, area);
}

fn draw_form_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut spans = vec![
        Span::styled(
            format!(" {} characters", state.input.char_count()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  │  Type: "),
        Span::styled(
            state.input.channel().label(),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  │  "),
    ];
    match state.status {
        SubmissionStatus::InFlight => spans.push(Span::styled(
            "Analyzing…",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        SubmissionStatus::Idle if state.can_submit() => spans.push(Span::styled(
            "Detect Spam (Ctrl-S)",
            Style::default().fg(Color::Green),
        )),
        SubmissionStatus::Idle => spans.push(Span::styled(
            "Detect Spam",
            Style::default().fg(Color::DarkGray),
        )),
    }
    spans.push(Span::raw("  │  Auto-save: "));
    spans.push(Span::raw(if state.auto_save { "on" } else { "off" }));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_result(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title("Result");
    let Some(outcome) = state.last_outcome.as_ref() else {
        let p = Paragraph::new(Line::from(Span::styled(
            "No message analyzed yet.",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(p, area);
        return;
    };

    let inner = block.inner(area);
    f.render_widget(block, area);

    match outcome {
        ClassificationOutcome::Classified {
            is_spam,
            confidence,
            language,
            indicators,
            ..
        } => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Length(1),
                    Constraint::Min(1),
                ])
                .split(inner);

            let (label, color) = if *is_spam {
                ("SPAM DETECTED", Color::Red)
            } else {
                ("NOT SPAM", Color::Green)
            };
            f.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    label,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))),
                chunks[0],
            );

            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(color))
                .ratio(confidence.clamp(0.0, 1.0))
                .label(format!("Confidence {:.1}%", confidence * 100.0));
            f.render_widget(gauge, chunks[1]);

            let mut lines = Vec::new();
            let language = if language.is_empty() { "-" } else { language.as_str() };
            push_wrapped_status_kv(&mut lines, "Language", language, area.width);
            let indicators = if indicators.is_empty() {
                "none".to_string()
            } else {
                indicators.join(", ")
            };
            push_wrapped_status_kv(&mut lines, "Indicators", &indicators, area.width);
            push_outcome_footer(&mut lines, outcome, area.width);
            f.render_widget(Paragraph::new(lines), chunks[2]);
        }
        ClassificationOutcome::LanguageUnsupported {
            language, reason, ..
        } => {
            let mut lines = vec![Line::from(Span::styled(
                "LANGUAGE NOT SUPPORTED",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))];
            push_wrapped_status_kv(&mut lines, "Reason", reason, area.width);
            push_wrapped_status_kv(
                &mut lines,
                "Detected language",
                language.as_deref().unwrap_or("unknown"),
                area.width,
            );
            push_outcome_footer(&mut lines, outcome, area.width);
            f.render_widget(Paragraph::new(lines), inner);
        }
    }
}

fn push_outcome_footer(lines: &mut Vec<Line<'static>>, outcome: &ClassificationOutcome, width: u16) {
    push_wrapped_status_kv(lines, "Type", outcome.channel().label(), width);
    push_wrapped_status_kv(lines, "Checked at", &format_local(outcome), width);
}

/// Outcome time in the local offset when it can be determined, UTC otherwise.
fn format_local(outcome: &ClassificationOutcome) -> String {
    let offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    outcome
        .timestamp()
        .to_offset(offset)
        .format(time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| outcome.timestamp_rfc3339())
}

/// History rows that fit in a pane of `pane_height` (borders and the stats header excluded).
fn history_visible_rows(pane_height: u16) -> usize {
    usize::from(pane_height.saturating_sub(4))
}

fn history_header(stats: &HistoryStats) -> String {
    let mut header = format!(
        "{} checked │ {} spam │ {} not spam │ {} unsupported",
        stats.total, stats.spam, stats.not_spam, stats.unsupported
    );
    if let Some(ratio) = stats.spam_ratio() {
        header.push_str(&format!(" │ spam rate {:.0}%", ratio * 100.0));
    }
    if let (Some(mean), Some(median)) = (stats.mean_confidence, stats.median_confidence) {
        header.push_str(&format!(
            " │ confidence mean {:.1}% median {:.1}%",
            mean * 100.0,
            median * 100.0
        ));
    }
    header
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let header = history_header(&HistoryStats::from_outcomes(&state.history));
    let mut lines = vec![
        Line::from(Span::styled(header, Style::default().fg(Color::Gray))),
        Line::from(""),
    ];

    if state.history.is_empty() {
        lines.push(Line::from(Span::styled(
            "No saved outcomes yet.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let visible_rows = history_visible_rows(area.height);
    let message_width = (area.width as usize).saturating_sub(48).max(10);
    for (idx, o) in state
        .history
        .iter()
        .enumerate()
        .skip(state.history_scroll_offset)
        .take(visible_rows)
    {
        let verdict_color = match o.is_spam() {
            Some(true) => Color::Red,
            Some(false) => Color::Green,
            None => Color::Yellow,
        };
        let confidence = match o {
            ClassificationOutcome::Classified { confidence, .. } => {
                format!("{:>5.1}%", confidence * 100.0)
            }
            ClassificationOutcome::LanguageUnsupported { .. } => "    -".to_string(),
        };
        let row_style = if idx == state.history_selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(
            Line::from(vec![
                Span::raw(format!("{}  ", format_local(o))),
                Span::styled(
                    format!("{:<11}", o.verdict_label()),
                    Style::default().fg(verdict_color),
                ),
                Span::raw(format!(" {confidence}  {:<6} ", o.channel().as_str())),
                Span::raw(truncate_chars(o.message(), message_width)),
            ])
            .style(row_style),
        );
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("History"));
    f.render_widget(p, area);
}
