//! Completion capability backed by an external command.
//!
//! The prompt is piped to the command's stdin and its stdout is taken as the
//! completion. The whole exchange is bounded by the configured timeout, and
//! the child is killed when the bound is hit.

use std::process::Stdio;
use std::time::Duration;

use campaign_core::CompletionConfig;
use campaign_insights::{CompletionError, CompletionProvider};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Handle;
use tracing::debug;

const STDERR_EXCERPT: usize = 200;

pub struct CommandCompletion {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    runtime: Handle,
}

impl CommandCompletion {
    pub fn new(program: String, args: Vec<String>, timeout: Duration, runtime: Handle) -> Self {
        Self {
            program,
            args,
            timeout,
            runtime,
        }
    }

    /// `None` when no command is configured.
    pub fn from_config(config: &CompletionConfig, runtime: Handle) -> Option<Self> {
        let program = config.command.as_deref()?.trim();
        if program.is_empty() {
            return None;
        }
        Some(Self::new(
            program.to_string(),
            config.args.clone(),
            config.timeout(),
            runtime,
        ))
    }

    async fn exchange(&self, prompt: &str) -> Result<String, CompletionError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CompletionError::Transport(format!("failed to start {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CompletionError::Transport("child stdin unavailable".to_string()))?;
        let input = prompt.as_bytes().to_vec();
        // Feed stdin concurrently so a chatty child cannot block on a full stdout pipe.
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CompletionError::Transport(format!("{} failed: {e}", self.program)))?;
        match writer.await {
            Ok(Err(e)) => debug!(error = %e, "Completion command closed stdin early"),
            Err(e) => debug!(error = %e, "Stdin writer task failed"),
            Ok(Ok(())) => {}
        }

        if !output.status.success() {
            return Err(classify_failure(&self.program, output.status.code(), &output.stderr));
        }
        String::from_utf8(output.stdout).map_err(|e| {
            CompletionError::Transport(format!("{} wrote non UTF-8 output: {e}", self.program))
        })
    }
}

impl CompletionProvider for CommandCompletion {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.runtime.block_on(async {
            tokio::time::timeout(self.timeout, self.exchange(prompt))
                .await
                .unwrap_or(Err(CompletionError::Timeout(self.timeout)))
        })
    }

    fn name(&self) -> &str {
        &self.program
    }
}

fn classify_failure(program: &str, code: Option<i32>, stderr: &[u8]) -> CompletionError {
    let stderr = String::from_utf8_lossy(stderr);
    let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
    let lowered = excerpt.to_ascii_lowercase();
    let status = code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"));
    let message = format!("{program} exited with {status}: {excerpt}");

    if ["quota", "rate limit", "429"].iter().any(|hint| lowered.contains(hint)) {
        CompletionError::Quota(message)
    } else {
        CompletionError::Transport(message)
    }
}
