use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn keybind(key: &'static str, pad: usize, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad.saturating_sub(key.chars().count()))),
        Span::raw(desc),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    const PAD: usize = 14;
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        keybind("Ctrl-C/Ctrl-Q", PAD, "Quit"),
        keybind("F1", PAD, "Toggle this help (Esc closes)"),
        keybind("Ctrl-K", PAD, "Edit API key (Enter saves, Esc cancels)"),
        keybind("F2", PAD, "Show/hide the API key"),
        keybind("Ctrl-R", PAD, "Start over"),
        keybind("Ctrl-A", PAD, "Toggle auto-save of generated resumes"),
        keybind("Ctrl-W", PAD, "Delete last word while typing"),
        Line::from(""),
        Line::from("Step 1, Paste Resume:"),
        keybind("type/paste", PAD, "Edit resume text"),
        keybind("Ctrl-E", PAD, "Extract experience entries"),
        keybind("Esc", PAD, "Dismiss message"),
        Line::from(""),
        Line::from("Step 2, Add STAR Details:"),
        keybind("Tab/↓", PAD, "Next field"),
        keybind("Shift-Tab/↑", PAD, "Previous field"),
        keybind("PgDn/PgUp", PAD, "Next/previous role"),
        keybind("Ctrl-G", PAD, "Generate optimized resume"),
        keybind("Esc", PAD, "Back to resume text"),
        Line::from(""),
        Line::from("Step 3, Final Resume:"),
        keybind("↑/↓ PgUp/PgDn", PAD + 1, "Scroll"),
        keybind("Ctrl-Y", PAD, "Copy to clipboard"),
        keybind("Ctrl-S", PAD, "Save to a file in the current directory"),
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
