//! Per-run outcome accounting.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Which part of a row's processing produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Validate,
    Lookup,
    Mapping,
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Success {
    /// Row label (organization or grant name).
    pub label: String,
    /// Platform id of the created/updated record; `None` in dry runs or when not returned.
    pub id: Option<String>,
    pub step: Step,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub label: String,
    pub step: Step,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skip {
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub job: &'static str,
    pub dry_run: bool,
    pub succeeded: Vec<Success>,
    pub failed: Vec<Failure>,
    pub skipped: Vec<Skip>,
}

impl RunReport {
    pub fn new(job: &'static str, dry_run: bool) -> Self {
        Self {
            job,
            dry_run,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn success(&mut self, label: impl Into<String>, step: Step, id: Option<String>) {
        let label = label.into();
        tracing::info!(job = self.job, ?step, "ok: {label}");
        self.succeeded.push(Success { label, id, step });
    }

    pub fn failure(&mut self, label: impl Into<String>, step: Step, message: impl Into<String>) {
        let (label, message) = (label.into(), message.into());
        tracing::error!(job = self.job, ?step, "failed: {label}: {message}");
        self.failed.push(Failure {
            label,
            step,
            message,
        });
    }

    pub fn skip(&mut self, label: impl Into<String>, reason: impl Into<String>) {
        let (label, reason) = (label.into(), reason.into());
        tracing::info!(job = self.job, "skipped: {label}: {reason}");
        self.skipped.push(Skip { label, reason });
    }

    /// Successes recorded at `step`.
    pub fn count(&self, step: Step) -> usize {
        self.succeeded.iter().filter(|s| s.step == step).count()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            job = self.job,
            dry_run = self.dry_run,
            succeeded = self.succeeded.len(),
            failed = self.failed.len(),
            skipped = self.skipped.len(),
            "processing complete"
        );
        for f in &self.failed {
            tracing::info!(job = self.job, "failure: {} ({:?}): {}", f.label, f.step, f.message);
        }
    }

    /// Write the full report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(
            f,
            "{}{}: {} succeeded, {} failed, {} skipped",
            self.job,
            mode,
            self.succeeded.len(),
            self.failed.len(),
            self.skipped.len()
        )?;
        for s in &self.failed {
            writeln!(f, "  FAILED  {:<40} {:?}: {}", s.label, s.step, s.message)?;
        }
        for s in &self.skipped {
            writeln!(f, "  SKIPPED {:<40} {}", s.label, s.reason)?;
        }
        Ok(())
    }
}
