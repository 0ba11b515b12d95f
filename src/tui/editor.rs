//! Minimal append-only text editing for the resume and STAR fields.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Apply a key press to `buf`. Returns `true` if the text changed.
pub(crate) fn apply_key(buf: &mut String, key: &KeyEvent, multiline: bool) -> bool {
    let ctrl_or_alt = key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
    match key.code {
        KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            delete_word(buf)
        }
        KeyCode::Char(c) if !ctrl_or_alt => {
            buf.push(c);
            true
        }
        KeyCode::Enter if multiline => {
            buf.push('\n');
            true
        }
        KeyCode::Backspace => buf.pop().is_some(),
        _ => false,
    }
}

/// Append pasted text with line endings normalized.
pub(crate) fn insert_paste(buf: &mut String, text: &str, multiline: bool) {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    if multiline {
        buf.push_str(&normalized);
    } else {
        buf.extend(normalized.chars().filter(|c| *c != '\n'));
    }
}

fn delete_word(buf: &mut String) -> bool {
    let before = buf.len();
    let trimmed = buf.trim_end_matches(char::is_whitespace).len();
    buf.truncate(trimmed);
    let cut = buf
        .rfind(char::is_whitespace)
        .map(|i| i + buf[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    buf.truncate(cut);
    buf.len() != before
}

/// Rows `text` occupies when hard-wrapped at `width` columns.
pub(crate) fn wrapped_height(text: &str, width: u16) -> usize {
    let width = usize::from(width.max(1));
    text.split('\n')
        .map(|line| line.chars().count().div_ceil(width).max(1))
        .sum()
}

/// Word-wrap `text` into rows of at most `width` columns. Words longer than a
/// row are split; a break drops the spaces it lands on.
pub(crate) fn wrap_lines(text: &str, width: u16) -> Vec<String> {
    let width = usize::from(width.max(1));
    let mut rows = Vec::new();
    for line in text.split('\n') {
        let mut row = String::new();
        let mut row_width = 0;
        for word in line.split_inclusive(' ') {
            let visible = word.trim_end_matches(' ').chars().count();
            if row_width > 0 && row_width + visible > width {
                rows.push(row.trim_end_matches(' ').to_string());
                row.clear();
                row_width = 0;
            }
            for c in word.chars() {
                if row_width == width {
                    if c == ' ' {
                        continue;
                    }
                    rows.push(std::mem::take(&mut row));
                    row_width = 0;
                }
                row.push(c);
                row_width += 1;
            }
        }
        rows.push(row.trim_end_matches(' ').to_string());
    }
    rows
}
