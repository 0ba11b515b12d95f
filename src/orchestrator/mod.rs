//! Application-level orchestration.
//!
//! This module executes the AI jobs the workflow hands out and post-processes
//! generated resumes (auto-save, export). UI/CLI layers call into this module
//! to keep the workflow free of I/O.

mod controller;
mod post_process;

pub(crate) use controller::{execute, run_controller, UiCommand};
pub(crate) use post_process::process_generation;
