use crate::ai::ResumeAi;
use crate::credential::CredentialStore;
use crate::model::{AiConfig, AiJob, ApiKey, StarField};
use crate::orchestrator;
use crate::workflow::Workflow;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
#[derive(Debug)]
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "star-resume",
    version,
    about = "Rewrite your resume around STAR stories with Gemini"
)]
pub struct Cli {
    /// Gemini API key for this session (not persisted)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Save an API key for future sessions and exit
    #[arg(long, value_name = "KEY")]
    pub save_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "STAR_RESUME_MODEL", default_value = "gemini-2.5-flash")]
    pub model: String,

    /// Base URL of the Gemini REST API
    #[arg(
        long,
        env = "STAR_RESUME_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub base_url: String,

    /// Per-request timeout
    #[arg(long, default_value = "120s")]
    pub timeout: humantime::Duration,

    /// Resume text file, or `-` for stdin
    #[arg(long, value_name = "PATH")]
    pub resume: Option<PathBuf>,

    /// JSON array of STAR details keyed by entry id (see --json output)
    #[arg(long, value_name = "PATH")]
    pub star: Option<PathBuf>,

    /// Print JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print plain text and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Also write the generated resume to this file
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Use --auto-save true or --auto-save false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_save: bool,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        self.save_key.is_none() && !self.json && !self.text
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if let Some(key) = args.save_key.as_deref() {
        return save_key(key);
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args).await;
        }
    }

    run_headless(args).await
}

/// Build an `AiConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> AiConfig {
    AiConfig {
        base_url: args.base_url.trim_end_matches('/').to_string(),
        model: args.model.clone(),
        timeout: Duration::from(args.timeout),
        user_agent: format!("star-resume/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Stored credential, overridden for this session by `--api-key`.
pub(crate) fn credential_store(args: &Cli) -> CredentialStore {
    let mut store = CredentialStore::open_default();
    if let Some(key) = args.api_key.as_deref().and_then(ApiKey::new) {
        store.set_session_override(key);
    }
    store
}

fn save_key(raw: &str) -> Result<()> {
    let key = ApiKey::new(raw).context("API key must not be empty")?;
    let mut store = CredentialStore::open_default();
    store.save(key.expose());
    match crate::storage::credential_path() {
        Some(path) => eprintln!("Saved API key {} to {}", key.masked(), path.display()),
        None => eprintln!("Saved API key {} for this session only", key.masked()),
    }
    Ok(())
}

/// Read resume text from a file, or stdin for `-`.
pub(crate) fn read_resume(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("read resume from stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("read resume {}", path.display()))
}

/// One element of the `--star` file. Extra keys (job title, company) are
/// ignored so the `--json` template can be filled in and passed back.
#[derive(Debug, Deserialize)]
struct StarInput {
    id: u32,
    #[serde(default)]
    situation: String,
    #[serde(default)]
    task: String,
    #[serde(default)]
    action: String,
    #[serde(default)]
    result: String,
}

fn load_star_file(path: &Path) -> Result<Vec<StarInput>> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse STAR details in {}", path.display()))
}

fn apply_star_inputs(workflow: &mut Workflow, inputs: Vec<StarInput>) -> Result<()> {
    for input in inputs {
        let values = [
            (StarField::Situation, input.situation),
            (StarField::Task, input.task),
            (StarField::Action, input.action),
            (StarField::Result, input.result),
        ];
        for (field, value) in values {
            if !workflow.update_field(input.id, field, value) {
                anyhow::bail!(
                    "STAR details reference entry {} but the resume has {} entries",
                    input.id,
                    workflow.entries().len()
                );
            }
        }
    }
    Ok(())
}

async fn run_headless(args: Cli) -> Result<()> {
    let resume_path = args
        .resume
        .as_deref()
        .context("--resume PATH is required with --text or --json")?;
    let resume = read_resume(resume_path)?;
    let store = credential_store(&args);
    let ai = ResumeAi::new(&build_config(&args))?;

    let (out_tx, out_handle) = spawn_output_writer();
    let result = headless_steps(&args, resume, &store, &ai, &out_tx).await;
    drop(out_tx);
    let _ = out_handle.await;
    result
}

/// Drive the workflow through extraction and, given `--star`, generation.
async fn headless_steps(
    args: &Cli,
    resume: String,
    store: &CredentialStore,
    ai: &ResumeAi,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let star = args.star.as_deref().map(load_star_file).transpose()?;

    let mut workflow = Workflow::new();
    workflow.set_resume_text(resume);

    let job = workflow.request_extraction(store.get())?;
    let _ = out.send(OutputLine::Stderr("Extracting experience entries...".into()));
    workflow.apply(orchestrator::execute(ai, AiJob::Extract(job)).await);
    if let Some(err) = workflow.last_error() {
        anyhow::bail!("{err}");
    }

    let Some(star) = star else {
        if args.json {
            let out_json = serde_json::to_string_pretty(workflow.entries())?;
            let _ = out.send(OutputLine::Stdout(out_json));
        } else {
            for entry in workflow.entries() {
                let _ = out.send(OutputLine::Stdout(format!(
                    "[{}] {} at {}",
                    entry.id, entry.job_title, entry.company
                )));
            }
            let _ = out.send(OutputLine::Stderr(
                "Fill in situation/task/action/result per entry and pass them with --star".into(),
            ));
        }
        return Ok(());
    };

    apply_star_inputs(&mut workflow, star)?;
    let job = workflow.request_generation(store.get())?;
    let _ = out.send(OutputLine::Stderr("Generating optimized resume...".into()));
    workflow.apply(orchestrator::execute(ai, AiJob::Generate(job)).await);
    if let Some(err) = workflow.last_error() {
        anyhow::bail!("{err}");
    }

    if args.json {
        let out_json = serde_json::to_string_pretty(&serde_json::json!({
            "settings": build_config(args),
            "entries": workflow.entries(),
            "optimizedResume": workflow.output(),
        }))?;
        let _ = out.send(OutputLine::Stdout(out_json));
    } else {
        let _ = out.send(OutputLine::Stdout(workflow.output().to_string()));
    }

    let processed = orchestrator::process_generation(args, args.auto_save, workflow.output());
    for msg in processed.export_messages {
        let _ = out.send(OutputLine::Stderr(msg));
    }
    if let Some(p) = processed.auto_saved_path {
        let _ = out.send(OutputLine::Stderr(format!("Saved: {}", p.display())));
    }
    Ok(())
}
