//! Post-generation processing.
//!
//! Handles auto-save and the `--output` export once a resume is generated.

use crate::cli::Cli;
use crate::storage;
use std::path::PathBuf;

/// Result of post-generation processing, ready for presentation layers.
#[derive(Debug, Default)]
pub(crate) struct ProcessedOutput {
    pub export_messages: Vec<String>,
    pub auto_saved_path: Option<PathBuf>,
}

/// Auto-save and export a generated resume. Failures become messages.
pub(crate) fn process_generation(args: &Cli, auto_save: bool, text: &str) -> ProcessedOutput {
    let mut out = ProcessedOutput::default();
    if text.trim().is_empty() {
        return out;
    }

    if auto_save {
        match storage::save_resume(text) {
            Ok(path) => out.auto_saved_path = Some(path),
            Err(e) => out.export_messages.push(format!("Auto-save failed: {e:#}")),
        }
    }

    if let Some(path) = args.output.as_deref() {
        match storage::export_text(path, text) {
            Ok(()) => out
                .export_messages
                .push(format!("Exported resume: {}", path.display())),
            Err(e) => out.export_messages.push(format!("Export failed: {e:#}")),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_exports_to_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("final.txt");
        let args = Cli::try_parse_from([
            "star-resume",
            "--output",
            target.to_str().unwrap(),
        ])
        .unwrap();

        let processed = process_generation(&args, false, "JOHN DOE");
        assert!(processed.auto_saved_path.is_none());
        assert_eq!(processed.export_messages.len(), 1);
        assert!(processed.export_messages[0].starts_with("Exported resume"));
        assert_eq!(std::fs::read_to_string(target).unwrap(), "JOHN DOE\n");
    }

    #[test]
    fn test_blank_output_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("final.txt");
        let args = Cli::try_parse_from([
            "star-resume",
            "--output",
            target.to_str().unwrap(),
        ])
        .unwrap();

        let processed = process_generation(&args, true, "  \n");
        assert!(processed.export_messages.is_empty());
        assert!(processed.auto_saved_path.is_none());
        assert!(!target.exists());
    }
}
