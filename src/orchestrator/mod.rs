//! Application-level orchestration utilities.
//!
//! This module owns the submission lifecycle (validate/dispatch/resolve) and post-outcome
//! processing such as auto-save, exports, and history refresh. UI/CLI layers call into
//! this module to keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, SubmissionController, UiCommand};
pub(crate) use post_process::process_outcome;
