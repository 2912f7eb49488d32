//! # Process Adapters
//!
//! Runs the scoring scripts as child processes with captured output and a
//! hard deadline. The child is killed if the deadline passes.

use crate::domain::candidate::Candidate;
use crate::domain::errors::ScorerError;
use crate::domain::output::{parse_categories, parse_recommendation, OutputFormat};
use crate::ports::{Classifier, Scorer};
use async_trait::async_trait;
use mb_01_record_store::MatchPreferences;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// How to launch one external computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Executable, e.g. `python`.
    pub program: String,
    /// Leading arguments, e.g. the script path.
    pub args: Vec<String>,
    /// Deadline for one run.
    pub timeout_ms: u64,
    /// stdout format.
    pub output_format: OutputFormat,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: Vec::new(),
            timeout_ms: 60_000,
            output_format: OutputFormat::Json,
        }
    }
}

impl ProcessConfig {
    /// `python <script>` with the given deadline.
    pub fn script(interpreter: &str, script: &str, timeout: Duration) -> Self {
        Self {
            program: interpreter.to_string(),
            args: vec![script.to_string()],
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            output_format: OutputFormat::Json,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Launches one configured program.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    config: ProcessConfig,
}

impl ProcessRunner {
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Run to completion with `extra_args` appended.
    ///
    /// # Errors
    ///
    /// - `ScorerError::Spawn` - the program could not be started
    /// - `ScorerError::Timeout` - the deadline passed; the child was killed
    /// - `ScorerError::Failed` - non-zero exit or death by signal
    pub async fn run(&self, extra_args: &[String]) -> Result<ProcessOutput, ScorerError> {
        let started = Instant::now();
        let deadline = self.config.timeout();

        let child = Command::new(&self.config.program)
            .args(&self.config.args)
            .args(extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScorerError::Spawn {
                program: self.config.program.clone(),
                message: e.to_string(),
            })?;

        let output = match timeout(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ScorerError::failed(None, &e.to_string())),
            Err(_) => {
                warn!(
                    program = %self.config.program,
                    timeout_ms = self.config.timeout_ms,
                    "Process missed its deadline, killed"
                );
                return Err(ScorerError::Timeout { timeout: deadline });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let elapsed = started.elapsed();

        if !output.status.success() {
            warn!(
                program = %self.config.program,
                exit_code = ?output.status.code(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Process failed"
            );
            return Err(ScorerError::failed(output.status.code(), &stderr));
        }

        debug!(
            program = %self.config.program,
            elapsed_ms = elapsed.as_millis() as u64,
            stdout_bytes = stdout.len(),
            "Process finished"
        );
        Ok(ProcessOutput {
            stdout,
            stderr,
            elapsed,
        })
    }
}

/// `Scorer` backed by the ranking script. The script takes no arguments and
/// reads the store file directly.
#[derive(Debug, Clone)]
pub struct ProcessScorer {
    runner: ProcessRunner,
}

impl ProcessScorer {
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            runner: ProcessRunner::new(config),
        }
    }
}

#[async_trait]
impl Scorer for ProcessScorer {
    #[instrument(skip_all, fields(matcher = %preferences.matcher_uuid))]
    async fn recommend(&self, preferences: &MatchPreferences) -> Result<Candidate, ScorerError> {
        let output = self.runner.run(&[]).await?;
        parse_recommendation(&output.stdout, self.runner.config().output_format)
    }
}

/// `Classifier` backed by the category script:
/// `<program> <args> --uuid <subject> --subcategory <label>...`.
#[derive(Debug, Clone)]
pub struct ProcessClassifier {
    runner: ProcessRunner,
}

impl ProcessClassifier {
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            runner: ProcessRunner::new(config),
        }
    }

    fn arguments(subject: &str, labels: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(labels.len() + 3);
        args.push("--uuid".to_string());
        args.push(subject.to_string());
        args.push("--subcategory".to_string());
        args.extend(labels.iter().cloned());
        args
    }
}

#[async_trait]
impl Classifier for ProcessClassifier {
    #[instrument(skip_all, fields(subject = subject, labels = labels.len()))]
    async fn classify(&self, subject: &str, labels: &[String]) -> Result<Vec<String>, ScorerError> {
        let output = self.runner.run(&Self::arguments(subject, labels)).await?;
        parse_categories(&output.stdout, self.runner.config().output_format)
    }
}
