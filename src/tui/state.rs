use super::{editor, export};
use crate::cli::Cli;
use crate::credential::CredentialStore;
use crate::model::{AiJob, ExperienceEntry, StarField, Step, WorkflowEvent};
use crate::orchestrator::{self, UiCommand};
use crate::workflow::{Completion, Rejection, Workflow, INCOMPLETE_MESSAGE};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use std::cell::Cell;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Success,
}

impl Severity {
    pub fn color(self) -> Color {
        match self {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
            Severity::Success => Color::Green,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub severity: Severity,
    pub text: String,
}

impl Banner {
    fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

/// Which STAR field of which entry receives typed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFocus {
    pub entry: usize,
    pub field: StarField,
}

impl Default for FieldFocus {
    fn default() -> Self {
        Self {
            entry: 0,
            field: StarField::Situation,
        }
    }
}

impl FieldFocus {
    fn next(self, entries: usize) -> Self {
        match self.field.next() {
            Some(field) => Self { field, ..self },
            None => Self {
                entry: (self.entry + 1) % entries.max(1),
                field: StarField::Situation,
            },
        }
    }

    fn prev(self, entries: usize) -> Self {
        match self.field.prev() {
            Some(field) => Self { field, ..self },
            None => Self {
                entry: (self.entry + entries.max(1) - 1) % entries.max(1),
                field: StarField::Result,
            },
        }
    }
}

/// In-progress edit of the API key.
#[derive(Debug, Default)]
pub struct KeyEditor {
    pub buffer: String,
}

pub struct UiState {
    pub args: Cli,
    pub workflow: Workflow,
    pub credentials: CredentialStore,
    pub show_help: bool,
    pub reveal_key: bool,
    pub key_editor: Option<KeyEditor>,
    pub focus: FieldFocus,
    pub result_scroll: u16,
    /// Inner (width, height) of the result pane from the last draw.
    pub result_viewport: Cell<(u16, u16)>,
    pub notice: Option<Banner>,
    pub auto_save: bool,
    pub last_saved_path: Option<PathBuf>,
    pub tick: usize,
}

impl UiState {
    pub fn new(args: Cli, credentials: CredentialStore, resume: Option<String>) -> Self {
        let mut workflow = Workflow::new();
        if let Some(text) = resume {
            workflow.set_resume_text(text);
        }
        let key_editor = credentials.get().is_none().then(KeyEditor::default);
        Self {
            auto_save: args.auto_save,
            args,
            workflow,
            credentials,
            show_help: false,
            reveal_key: false,
            key_editor,
            focus: FieldFocus::default(),
            result_scroll: 0,
            result_viewport: Cell::new((0, 0)),
            notice: None,
            last_saved_path: None,
            tick: 0,
        }
    }

    /// Banner to show: workflow error first, then the last UI notice, then
    /// the completeness hint on the detail step.
    pub fn banner(&self) -> Option<Banner> {
        if let Some(err) = self.workflow.last_error() {
            let severity = if err == INCOMPLETE_MESSAGE {
                Severity::Warning
            } else {
                Severity::Error
            };
            return Some(Banner::new(severity, err));
        }
        if let Some(notice) = &self.notice {
            return Some(notice.clone());
        }
        if self.workflow.step() == Step::Detail && !self.workflow.entries_complete() {
            return Some(Banner::new(
                Severity::Warning,
                "Fill in all four STAR fields for every role to generate the resume.",
            ));
        }
        None
    }

    pub fn focused_entry(&self) -> Option<&ExperienceEntry> {
        self.workflow.entries().get(self.focus.entry)
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> Option<UiCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            return Some(UiCommand::Quit);
        }

        if let Some(pending) = self.key_editor.as_mut() {
            match key.code {
                KeyCode::Esc => self.key_editor = None,
                KeyCode::Enter => self.commit_key(),
                KeyCode::F(2) => self.reveal_key = !self.reveal_key,
                _ => {
                    editor::apply_key(&mut pending.buffer, &key, false);
                }
            }
            return None;
        }

        if key.code == KeyCode::F(1) {
            self.show_help = !self.show_help;
            return None;
        }
        if self.show_help {
            if key.code == KeyCode::Esc {
                self.show_help = false;
            }
            return None;
        }

        match (ctrl, key.code) {
            (true, KeyCode::Char('k')) => {
                self.key_editor = Some(KeyEditor::default());
                return None;
            }
            (false, KeyCode::F(2)) => {
                self.reveal_key = !self.reveal_key;
                return None;
            }
            (true, KeyCode::Char('r')) => {
                self.workflow.reset();
                self.focus = FieldFocus::default();
                self.result_scroll = 0;
                self.notice = Some(Banner::new(Severity::Success, "Started over."));
                return None;
            }
            (true, KeyCode::Char('a')) => {
                self.auto_save = !self.auto_save;
                self.notice = Some(if self.auto_save {
                    Banner::new(Severity::Success, "Auto-save enabled")
                } else {
                    Banner::new(Severity::Warning, "Auto-save disabled")
                });
                return None;
            }
            _ => {}
        }

        match self.workflow.step() {
            Step::Input => self.handle_input_key(key),
            Step::Detail => self.handle_detail_key(key),
            Step::Result => {
                self.handle_result_key(key);
                None
            }
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        if let Some(pending) = self.key_editor.as_mut() {
            editor::insert_paste(&mut pending.buffer, text, false);
            return;
        }
        if self.show_help {
            return;
        }
        match self.workflow.step() {
            Step::Input if !self.workflow.loading().extracting => {
                if let Some(buf) = self.workflow.resume_text_mut() {
                    editor::insert_paste(buf, text, true);
                }
            }
            Step::Detail => {
                if let Some(buf) = self.focused_field_mut() {
                    editor::insert_paste(buf, text, true);
                }
            }
            _ => {}
        }
    }

    /// Apply a completion from the controller and run post-processing for a
    /// freshly generated resume.
    pub fn apply_event(&mut self, ev: WorkflowEvent) {
        let generated = matches!(ev, WorkflowEvent::Generated { .. });
        if self.workflow.apply(ev) == Completion::Stale {
            return;
        }
        self.notice = None;

        match self.workflow.step() {
            Step::Detail if !generated => {
                self.focus = FieldFocus::default();
            }
            Step::Result if generated => {
                self.result_scroll = 0;
                let processed = orchestrator::process_generation(
                    &self.args,
                    self.auto_save,
                    self.workflow.output(),
                );
                if let Some(path) = processed.auto_saved_path {
                    self.notice = Some(Banner::new(
                        Severity::Success,
                        format!("Saved: {}", path.display()),
                    ));
                }
                if !processed.export_messages.is_empty() {
                    let failed = processed
                        .export_messages
                        .iter()
                        .any(|m| m.contains("failed"));
                    let severity = if failed {
                        Severity::Warning
                    } else {
                        Severity::Success
                    };
                    self.notice = Some(Banner::new(severity, processed.export_messages.join(" · ")));
                }
            }
            _ => {}
        }
    }

    fn commit_key(&mut self) {
        let Some(pending) = self.key_editor.take() else {
            return;
        };
        self.credentials.save(&pending.buffer);
        self.notice = Some(match self.credentials.get() {
            Some(key) => Banner::new(Severity::Success, format!("API key saved ({})", key.masked())),
            None => Banner::new(Severity::Warning, "API key cleared"),
        });
    }

    fn notice_for(&mut self, rejection: &Rejection) {
        // Rejections that set the workflow error are already visible.
        if self.workflow.last_error().is_none() {
            self.notice = Some(Banner::new(Severity::Warning, rejection.to_string()));
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Option<UiCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('e') {
            self.notice = None;
            return match self.workflow.request_extraction(self.credentials.get()) {
                Ok(job) => Some(UiCommand::Run(AiJob::Extract(job))),
                Err(rejection) => {
                    debug!(%rejection, "extraction not started");
                    self.notice_for(&rejection);
                    None
                }
            };
        }
        if self.workflow.loading().extracting {
            return None;
        }
        if key.code == KeyCode::Esc {
            self.workflow.clear_error();
            self.notice = None;
            return None;
        }
        if let Some(buf) = self.workflow.resume_text_mut() {
            editor::apply_key(buf, &key, true);
        }
        None
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> Option<UiCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let entries = self.workflow.entries().len();
        match key.code {
            KeyCode::Char('g') if ctrl => {
                self.notice = None;
                return match self.workflow.request_generation(self.credentials.get()) {
                    Ok(job) => {
                        self.result_scroll = 0;
                        Some(UiCommand::Run(AiJob::Generate(job)))
                    }
                    Err(rejection) => {
                        debug!(%rejection, "generation not started");
                        self.notice_for(&rejection);
                        None
                    }
                };
            }
            KeyCode::Esc => {
                self.notice = None;
                self.workflow.back();
            }
            KeyCode::Tab | KeyCode::Down => self.focus = self.focus.next(entries),
            KeyCode::BackTab | KeyCode::Up => self.focus = self.focus.prev(entries),
            KeyCode::PageDown => {
                self.focus = FieldFocus {
                    entry: (self.focus.entry + 1) % entries.max(1),
                    field: StarField::Situation,
                }
            }
            KeyCode::PageUp => {
                self.focus = FieldFocus {
                    entry: (self.focus.entry + entries.max(1) - 1) % entries.max(1),
                    field: StarField::Situation,
                }
            }
            _ => {
                if let Some(buf) = self.focused_field_mut() {
                    editor::apply_key(buf, &key, true);
                }
            }
        }
        None
    }

    fn handle_result_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let max = self.max_result_scroll();
        match key.code {
            KeyCode::Up => self.result_scroll = self.result_scroll.saturating_sub(1),
            KeyCode::Down => self.result_scroll = self.result_scroll.saturating_add(1).min(max),
            KeyCode::PageUp => self.result_scroll = self.result_scroll.saturating_sub(10),
            KeyCode::PageDown => self.result_scroll = self.result_scroll.saturating_add(10).min(max),
            KeyCode::Home => self.result_scroll = 0,
            KeyCode::Char('y') if ctrl => self.copy_output(),
            KeyCode::Char('s') if ctrl => self.save_output(),
            _ => {}
        }
    }

    /// Furthest scroll that still fills the result pane.
    pub(crate) fn max_result_scroll(&self) -> u16 {
        let (width, height) = self.result_viewport.get();
        let rows = editor::wrap_lines(self.workflow.output(), width).len();
        u16::try_from(rows.saturating_sub(usize::from(height))).unwrap_or(u16::MAX)
    }

    fn ready_output(&mut self) -> Option<String> {
        if self.workflow.loading().generating || self.workflow.output().trim().is_empty() {
            self.notice = Some(Banner::new(Severity::Warning, "No generated resume yet."));
            return None;
        }
        Some(self.workflow.output().to_string())
    }

    fn copy_output(&mut self) {
        let Some(text) = self.ready_output() else {
            return;
        };
        self.notice = Some(match export::copy_to_clipboard(&text) {
            Ok(()) => Banner::new(Severity::Success, "✓ Copied resume to clipboard"),
            Err(e) => Banner::new(Severity::Error, format!("Clipboard copy failed: {e:#}")),
        });
    }

    fn save_output(&mut self) {
        let Some(text) = self.ready_output() else {
            return;
        };
        self.notice = Some(match export::save_resume_to_cwd(&text) {
            Ok(path) => {
                let msg = format!("Saved: {}", path.display());
                self.last_saved_path = Some(path);
                Banner::new(Severity::Success, msg)
            }
            Err(e) => Banner::new(Severity::Error, format!("Save failed: {e:#}")),
        });
    }

    fn focused_field_mut(&mut self) -> Option<&mut String> {
        let id = self.focused_entry()?.id;
        self.workflow.field_mut(id, self.focus.field)
    }
}

/// Role and company lines for the detail header, wrapped for a bordered
/// block `width` columns wide.
pub fn detail_header(entry: &ExperienceEntry, width: u16) -> Vec<Line<'static>> {
    let mut header = Vec::new();
    push_wrapped_status_kv(&mut header, "Role", &entry.job_title, width);
    push_wrapped_status_kv(&mut header, "Company", &entry.company, width);
    header
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
