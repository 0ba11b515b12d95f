use crate::ai::AiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Provider settings resolved from CLI flags and environment. Reported
/// alongside `--json` results so a run records how it was produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    pub base_url: String,
    pub model: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub user_agent: String,
}

/// User-supplied API credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, returning `None` if it is blank after trimming.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked form for display, keeping the last four characters.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        let tail_len = chars.len().min(4);
        let tail: String = chars[chars.len() - tail_len..].iter().collect();
        format!("{}{}", "•".repeat(chars.len().saturating_sub(tail_len).min(16)), tail)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    #[default]
    Input,
    Detail,
    Result,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Input, Step::Detail, Step::Result];

    pub fn number(self) -> usize {
        match self {
            Step::Input => 1,
            Step::Detail => 2,
            Step::Result => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Input => "Paste Resume",
            Step::Detail => "Add STAR Details",
            Step::Result => "Final Resume",
        }
    }
}

/// One of the four STAR narrative fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StarField {
    Situation,
    Task,
    Action,
    Result,
}

impl StarField {
    pub const ALL: [StarField; 4] = [
        StarField::Situation,
        StarField::Task,
        StarField::Action,
        StarField::Result,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StarField::Situation => "Situation",
            StarField::Task => "Task",
            StarField::Action => "Action",
            StarField::Result => "Result",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            StarField::Situation => "Describe the context or challenge.",
            StarField::Task => "What was your goal or responsibility?",
            StarField::Action => "What specific actions did you take?",
            StarField::Result => "What were the quantifiable outcomes?",
        }
    }

    pub fn next(self) -> Option<StarField> {
        match self {
            StarField::Situation => Some(StarField::Task),
            StarField::Task => Some(StarField::Action),
            StarField::Action => Some(StarField::Result),
            StarField::Result => None,
        }
    }

    pub fn prev(self) -> Option<StarField> {
        match self {
            StarField::Situation => None,
            StarField::Task => Some(StarField::Situation),
            StarField::Action => Some(StarField::Task),
            StarField::Result => Some(StarField::Action),
        }
    }
}

/// A job entry as returned by the extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEntry {
    pub job_title: String,
    pub company: String,
}

/// A job entry plus the STAR details the user writes for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub id: u32,
    pub job_title: String,
    pub company: String,
    #[serde(default)]
    pub situation: String,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub result: String,
}

impl ExperienceEntry {
    pub fn from_extracted(id: u32, extracted: ExtractedEntry) -> Self {
        Self {
            id,
            job_title: extracted.job_title,
            company: extracted.company,
            situation: String::new(),
            task: String::new(),
            action: String::new(),
            result: String::new(),
        }
    }

    pub fn field(&self, field: StarField) -> &str {
        match field {
            StarField::Situation => &self.situation,
            StarField::Task => &self.task,
            StarField::Action => &self.action,
            StarField::Result => &self.result,
        }
    }

    pub fn field_mut(&mut self, field: StarField) -> &mut String {
        match field {
            StarField::Situation => &mut self.situation,
            StarField::Task => &mut self.task,
            StarField::Action => &mut self.action,
            StarField::Result => &mut self.result,
        }
    }

    /// All four narrative fields hold non-blank text.
    pub fn is_complete(&self) -> bool {
        StarField::ALL
            .iter()
            .all(|f| !self.field(*f).trim().is_empty())
    }
}

/// Independent loading flags for the two external calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub extracting: bool,
    pub generating: bool,
}

/// Identifies one issued external call; completions carrying an outdated
/// ticket are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(pub(crate) u64);

#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub ticket: Ticket,
    pub resume_text: String,
    pub credential: ApiKey,
}

#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub ticket: Ticket,
    pub resume_text: String,
    pub entries: Vec<ExperienceEntry>,
    pub credential: ApiKey,
}

/// Work handed from the workflow to the orchestrator.
#[derive(Debug, Clone)]
pub enum AiJob {
    Extract(ExtractionJob),
    Generate(GenerationJob),
}

/// Completion events sent from the orchestrator back to the UI thread.
#[derive(Debug)]
pub enum WorkflowEvent {
    Extracted {
        ticket: Ticket,
        result: Result<Vec<ExtractedEntry>, AiError>,
    },
    Generated {
        ticket: Ticket,
        result: Result<String, AiError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_rejects_blank_and_trims() {
        assert!(ApiKey::new("   ").is_none());
        let key = ApiKey::new("  abc123  ").unwrap();
        assert_eq!(key.expose(), "abc123");
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("super-secret").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert!(key.masked().ends_with("cret"));
        assert!(!key.masked().contains("super"));
    }

    #[test]
    fn entry_completeness_requires_all_fields() {
        let mut entry = ExperienceEntry::from_extracted(
            0,
            ExtractedEntry {
                job_title: "Engineer".into(),
                company: "Acme".into(),
            },
        );
        assert!(!entry.is_complete());
        for f in StarField::ALL {
            *entry.field_mut(f) = "text".into();
        }
        assert!(entry.is_complete());
        *entry.field_mut(StarField::Action) = "  \n ".into();
        assert!(!entry.is_complete());
    }

    #[test]
    fn entry_serializes_camel_case() {
        let entry = ExperienceEntry::from_extracted(
            3,
            ExtractedEntry {
                job_title: "Engineer".into(),
                company: "Acme".into(),
            },
        );
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["jobTitle"], "Engineer");
        assert_eq!(v["id"], 3);
        assert_eq!(v["situation"], "");
    }
}
