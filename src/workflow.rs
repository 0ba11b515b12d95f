//! Resume workflow state machine.
//!
//! Owns step progression (Input → Detail → Result), the resume text, the
//! experience entries, the generated output and the last error. Requests hand
//! out jobs carrying a [`Ticket`]; completions are applied only while their
//! ticket is still the in-flight one, so a late result after a reset is
//! dropped instead of resurrecting stale data.

use crate::ai::AiError;
use crate::model::{
    ApiKey, ExperienceEntry, ExtractedEntry, ExtractionJob, GenerationJob, LoadingFlags, StarField,
    Step, Ticket, WorkflowEvent,
};
use thiserror::Error;
use tracing::{debug, info};

pub const BLANK_RESUME_MESSAGE: &str = "Please paste your resume before proceeding.";
pub const NO_ENTRIES_MESSAGE: &str = "Could not find any professional experiences to optimize. Please ensure your resume has a clear 'Experience' section.";
pub const INCOMPLETE_MESSAGE: &str =
    "Please fill out all STAR fields for each experience to proceed.";

/// Why a request did not produce a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("not available in the {0:?} step")]
    WrongStep(Step),
    #[error("extraction already in progress")]
    AlreadyExtracting,
    #[error("generation already in progress")]
    AlreadyGenerating,
    #[error("{}", AiError::Configuration)]
    MissingCredential,
    #[error("{}", BLANK_RESUME_MESSAGE)]
    BlankResume,
    #[error("{}", INCOMPLETE_MESSAGE)]
    IncompleteEntries,
}

/// What happened when a completion was offered to the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

#[derive(Debug, Default)]
pub struct Workflow {
    step: Step,
    resume_text: String,
    entries: Vec<ExperienceEntry>,
    output: String,
    last_error: Option<String>,
    extracting: Option<Ticket>,
    generating: Option<Ticket>,
    next_ticket: u64,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Combined `(step, pending)` view; pending means a call issued from
    /// this step has not completed yet.
    pub fn status(&self) -> (Step, bool) {
        let pending = match self.step {
            Step::Input => self.extracting.is_some(),
            Step::Detail => false,
            Step::Result => self.generating.is_some(),
        };
        (self.step, pending)
    }

    pub fn loading(&self) -> LoadingFlags {
        LoadingFlags {
            extracting: self.extracting.is_some(),
            generating: self.generating.is_some(),
        }
    }

    pub fn resume_text(&self) -> &str {
        &self.resume_text
    }

    pub fn entries(&self) -> &[ExperienceEntry] {
        &self.entries
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Every entry has all four narrative fields filled in.
    pub fn entries_complete(&self) -> bool {
        self.entries.iter().all(ExperienceEntry::is_complete)
    }

    /// Mutable access to the resume text; `None` once it is frozen.
    pub fn resume_text_mut(&mut self) -> Option<&mut String> {
        (self.step == Step::Input).then_some(&mut self.resume_text)
    }

    pub fn set_resume_text(&mut self, text: impl Into<String>) -> bool {
        match self.resume_text_mut() {
            Some(slot) => {
                *slot = text.into();
                true
            }
            None => false,
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    fn reject(&mut self, rejection: Rejection) -> Rejection {
        match rejection {
            Rejection::MissingCredential | Rejection::BlankResume | Rejection::IncompleteEntries => {
                self.last_error = Some(rejection.to_string());
            }
            _ => {}
        }
        debug!(%rejection, step = ?self.step, "request rejected");
        rejection
    }

    pub fn request_extraction(
        &mut self,
        credential: Option<&ApiKey>,
    ) -> Result<ExtractionJob, Rejection> {
        if self.step != Step::Input {
            return Err(self.reject(Rejection::WrongStep(self.step)));
        }
        if self.extracting.is_some() {
            return Err(self.reject(Rejection::AlreadyExtracting));
        }
        if self.resume_text.trim().is_empty() {
            return Err(self.reject(Rejection::BlankResume));
        }
        let Some(credential) = credential else {
            return Err(self.reject(Rejection::MissingCredential));
        };

        let ticket = self.issue_ticket();
        self.extracting = Some(ticket);
        self.last_error = None;
        info!(ticket = ticket.0, "extraction requested");
        Ok(ExtractionJob {
            ticket,
            resume_text: self.resume_text.clone(),
            credential: credential.clone(),
        })
    }

    pub fn complete_extraction(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<ExtractedEntry>, AiError>,
    ) -> Completion {
        if self.extracting != Some(ticket) {
            debug!(ticket = ticket.0, "dropping stale extraction result");
            return Completion::Stale;
        }
        self.extracting = None;

        match result {
            Ok(extracted) if extracted.is_empty() => {
                self.last_error = Some(NO_ENTRIES_MESSAGE.to_string());
            }
            Ok(extracted) => {
                self.entries = extracted
                    .into_iter()
                    .zip(0u32..)
                    .map(|(e, id)| ExperienceEntry::from_extracted(id, e))
                    .collect();
                self.step = Step::Detail;
                info!(count = self.entries.len(), "entries ready for details");
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
            }
        }
        Completion::Applied
    }

    /// Replace one narrative field of one entry. Returns `false` if there is
    /// no such entry or the workflow is not in the detail step.
    pub fn update_field(&mut self, id: u32, field: StarField, value: impl Into<String>) -> bool {
        if self.step != Step::Detail {
            return false;
        }
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                *entry.field_mut(field) = value.into();
                true
            }
            None => false,
        }
    }

    /// Mutable access to one field, for in-place editing.
    pub fn field_mut(&mut self, id: u32, field: StarField) -> Option<&mut String> {
        if self.step != Step::Detail {
            return None;
        }
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| e.field_mut(field))
    }

    pub fn request_generation(
        &mut self,
        credential: Option<&ApiKey>,
    ) -> Result<GenerationJob, Rejection> {
        if self.step != Step::Detail {
            return Err(self.reject(Rejection::WrongStep(self.step)));
        }
        if self.generating.is_some() {
            return Err(self.reject(Rejection::AlreadyGenerating));
        }
        let Some(credential) = credential else {
            return Err(self.reject(Rejection::MissingCredential));
        };
        if !self.entries_complete() {
            return Err(self.reject(Rejection::IncompleteEntries));
        }

        let ticket = self.issue_ticket();
        self.generating = Some(ticket);
        self.last_error = None;
        self.step = Step::Result;
        info!(ticket = ticket.0, entries = self.entries.len(), "generation requested");
        Ok(GenerationJob {
            ticket,
            resume_text: self.resume_text.clone(),
            entries: self.entries.clone(),
            credential: credential.clone(),
        })
    }

    pub fn complete_generation(
        &mut self,
        ticket: Ticket,
        result: Result<String, AiError>,
    ) -> Completion {
        if self.generating != Some(ticket) {
            debug!(ticket = ticket.0, "dropping stale generation result");
            return Completion::Stale;
        }
        self.generating = None;

        match result {
            Ok(text) => {
                self.output = text;
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                self.step = Step::Detail;
            }
        }
        Completion::Applied
    }

    /// Route a completion event to the matching handler.
    pub fn apply(&mut self, event: WorkflowEvent) -> Completion {
        match event {
            WorkflowEvent::Extracted { ticket, result } => self.complete_extraction(ticket, result),
            WorkflowEvent::Generated { ticket, result } => self.complete_generation(ticket, result),
        }
    }

    /// Detail → Input.
    pub fn back(&mut self) -> bool {
        if self.step != Step::Detail {
            return false;
        }
        self.last_error = None;
        self.step = Step::Input;
        true
    }

    /// Return to the initial state. In-flight calls are forgotten; their
    /// results will be dropped as stale.
    pub fn reset(&mut self) {
        let next_ticket = self.next_ticket;
        *self = Self {
            next_ticket,
            ..Self::default()
        };
        info!("workflow reset");
    }
}
