mod editor;
mod export;
mod help;
mod state;

use crate::ai::ResumeAi;
use crate::cli::{self, Cli};
use crate::credential::CredentialStore;
use crate::model::{StarField, Step, WorkflowEvent};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{detail_header, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels: at most two calls are ever in flight.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let ai = ResumeAi::new(&cli::build_config(&args))?;
    // Read any --resume input before the terminal switches to raw mode.
    let resume = args.resume.as_deref().map(cli::read_resume).transpose()?;
    let credentials = cli::credential_store(&args);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || {
        run_threaded(ui_args, credentials, resume, event_rx, cmd_tx)
    });

    let res = orchestrator::run_controller(ai, event_tx, cmd_rx).await;

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
    credentials: CredentialStore,
    resume: Option<String>,
    mut event_rx: UnboundedReceiver<WorkflowEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(args, credentials, resume);

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut dirty = true;

    let res = loop {
        // Drain completions without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
            dirty = true;
        }

        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
            dirty = true;
        }
        if dirty {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            dirty = false;
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            let command = match event::read() {
                Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => state.handle_key(k),
                Ok(Event::Paste(text)) => {
                    state.handle_paste(&text);
                    None
                }
                _ => None,
            };
            match command {
                Some(UiCommand::Quit) => {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
                Some(cmd) => {
                    if cmd_tx.send(cmd).is_err() {
                        break Err(anyhow::anyhow!("AI controller stopped"));
                    }
                }
                None => {}
            }
            dirty = true;
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let banner = state.banner();
    let banner_height = if banner.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(banner_height),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let mut titles: Vec<Line> = Step::ALL
        .iter()
        .map(|s| Line::from(format!("{}. {}", s.number(), s.title())))
        .collect();
    titles.push(Line::from("Help"));
    let selected = if state.show_help {
        Step::ALL.len()
    } else {
        state.workflow.step().number() - 1
    };
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL).title("star-resume"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    draw_credential_bar(chunks[1], f, state);

    if let Some(b) = banner {
        let color = b.severity.color();
        let p = Paragraph::new(b.text)
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            );
        f.render_widget(p, chunks[2]);
    }

    if state.show_help {
        help::draw_help(chunks[3], f);
    } else {
        match state.workflow.step() {
            Step::Input => draw_input(chunks[3], f, state),
            Step::Detail => draw_detail(chunks[3], f, state),
            Step::Result => draw_result(chunks[3], f, state),
        }
    }

    draw_footer(chunks[4], f, state);
}

fn spinner(state: &UiState) -> &'static str {
    SPINNER[state.tick % SPINNER.len()]
}

fn draw_credential_bar(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let key_style = Style::default().fg(Color::Cyan);
    let line = if let Some(pending) = &state.key_editor {
        let shown = if state.reveal_key {
            pending.buffer.clone()
        } else {
            "•".repeat(pending.buffer.chars().count())
        };
        Line::from(vec![
            Span::raw("New key: "),
            Span::styled(shown, key_style),
            Span::styled("█", Style::default().fg(Color::Gray)),
            Span::styled(
                "  Enter save · Esc cancel · F2 show",
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else if let Some(key) = state.credentials.get() {
        let shown = if state.reveal_key {
            key.expose().to_string()
        } else {
            key.masked()
        };
        Line::from(vec![
            Span::styled(shown, key_style),
            Span::styled(
                format!(
                    "  Ctrl-K change · auto-save {}",
                    if state.auto_save { "on" } else { "off" }
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else {
        Line::from(Span::styled(
            "No API key saved. Press Ctrl-K to add your Gemini API key.",
            Style::default().fg(Color::Yellow),
        ))
    };

    let p = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Gemini API key"),
    );
    f.render_widget(p, area);
}

fn draw_input(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let extracting = state.workflow.loading().extracting;
    let title = if extracting {
        format!("{} Extracting experience entries…", spinner(state))
    } else {
        "Paste your current resume (Ctrl-E to continue)".to_string()
    };

    let text = state.workflow.resume_text();
    let mut body = text.to_string();
    if !extracting {
        body.push('█');
    }
    let inner_width = area.width.saturating_sub(2);
    let inner_height = usize::from(area.height.saturating_sub(2));
    let content_height = editor::wrapped_height(&body, inner_width);
    // Keep the end of the text (where typing happens) in view.
    let scroll = content_height.saturating_sub(inner_height);

    let p = if text.is_empty() && !extracting {
        Paragraph::new(vec![
            Line::from(Span::styled("█", Style::default().fg(Color::Gray))),
            Line::from(Span::styled(
                "Paste your full resume here: name, contact info, summary, experience, education.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
    } else {
        Paragraph::new(body).scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
    };
    let p = p
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_detail(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(0)].as_ref())
        .split(area);

    let items: Vec<ListItem> = state
        .workflow
        .entries()
        .iter()
        .map(|e| {
            let (mark, color) = if e.is_complete() {
                ("✓", Color::Green)
            } else {
                ("·", Color::DarkGray)
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!("{mark} "), Style::default().fg(color)),
                    Span::raw(e.job_title.clone()),
                ]),
                Line::from(Span::styled(
                    format!("  {}", e.company),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Roles"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow));
    let mut list_state = ListState::default();
    list_state.select(Some(state.focus.entry));
    f.render_stateful_widget(list, cols[0], &mut list_state);

    let Some(entry) = state.focused_entry() else {
        return;
    };

    let header = detail_header(entry, cols[1].width);
    let header_height = u16::try_from(header.len().max(1))
        .unwrap_or(u16::MAX)
        .saturating_add(2);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(header_height),
                Constraint::Ratio(1, 4),
                Constraint::Ratio(1, 4),
                Constraint::Ratio(1, 4),
                Constraint::Ratio(1, 4),
            ]
            .as_ref(),
        )
        .split(cols[1]);

    let title = format!(
        "Role {} of {}",
        state.focus.entry + 1,
        state.workflow.entries().len()
    );
    f.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL).title(title)),
        rows[0],
    );

    for (field, rect) in StarField::ALL.iter().zip(rows.iter().skip(1)) {
        let focused = *field == state.focus.field;
        let value = entry.field(*field);
        let border = if focused {
            Style::default().fg(Color::Yellow)
        } else if value.trim().is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        let p = if value.is_empty() {
            let mut spans = Vec::new();
            if focused {
                spans.push(Span::styled("█", Style::default().fg(Color::Gray)));
            }
            spans.push(Span::styled(
                field.placeholder(),
                Style::default().fg(Color::DarkGray),
            ));
            Paragraph::new(Line::from(spans))
        } else {
            let mut body = value.to_string();
            if focused {
                body.push('█');
            }
            let inner_height = usize::from(rect.height.saturating_sub(2));
            let scroll = editor::wrapped_height(&body, rect.width.saturating_sub(2))
                .saturating_sub(inner_height);
            Paragraph::new(body).scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
        };
        let p = p.wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(field.label()),
        );
        f.render_widget(p, *rect);
    }
}

fn draw_result(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let (_, pending) = state.workflow.status();
    if pending {
        let p = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("{} Generating your optimized resume…", spinner(state)),
                Style::default().fg(Color::Cyan),
            )),
            Line::from(Span::styled(
                "This usually takes a few seconds.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title("Final Resume"));
        f.render_widget(p, area);
        return;
    }

    let title = match &state.last_saved_path {
        Some(p) => format!("Final Resume (saved to {})", p.display()),
        None => "Final Resume".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    state.result_viewport.set((inner.width, inner.height));
    let lines: Vec<Line> = editor::wrap_lines(state.workflow.output(), inner.width)
        .into_iter()
        .map(Line::from)
        .collect();
    // A resize can shrink the bound below the stored offset.
    let scroll = state.result_scroll.min(state.max_result_scroll());
    let p = Paragraph::new(lines).scroll((scroll, 0)).block(block);
    f.render_widget(p, area);
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let hints: &[(&str, &str)] = if state.key_editor.is_some() {
        &[("Enter", "save key"), ("Esc", "cancel")]
    } else if state.show_help {
        &[("Esc", "close help"), ("Ctrl-Q", "quit")]
    } else {
        match state.workflow.step() {
            Step::Input => &[("Ctrl-E", "extract"), ("F1", "help"), ("Ctrl-Q", "quit")],
            Step::Detail => &[
                ("Tab", "next field"),
                ("Ctrl-G", "generate"),
                ("Esc", "back"),
                ("F1", "help"),
            ],
            Step::Result => &[
                ("Ctrl-Y", "copy"),
                ("Ctrl-S", "save"),
                ("Ctrl-R", "start over"),
                ("F1", "help"),
            ],
        }
    };
    let mut spans = Vec::new();
    for (key, desc) in hints {
        spans.push(Span::styled(*key, Style::default().fg(Color::Magenta)));
        spans.push(Span::raw(format!(" {desc}  ")));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
