//! Filtering collaborators: markup in, prose plus an offset map out.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::FilterError;
use crate::offset_map::OffsetMap;

/// Output of one filtering call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    pub text: String,
    pub map: OffsetMap,
}

/// Turns a markup document into checkable prose.
#[async_trait]
pub trait Filter: Send + Sync {
    /// Filters `text`, returning the prose and its correspondence table.
    async fn filter(&self, text: &str) -> Result<Filtered, FilterError>;
}

/// Passes text through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFilter;

#[async_trait]
impl Filter for PlainFilter {
    async fn filter(&self, text: &str) -> Result<Filtered, FilterError> {
        Ok(Filtered {
            text: text.to_string(),
            map: OffsetMap::identity(text.len() as u32),
        })
    }
}

/// Runs an external filter program.
///
/// The document is written to the program's stdin. The program answers on
/// stdout with `{"text": "...", "charmap": [..]}` where `charmap[i]` is the
/// original character index of filtered character `i`.
#[derive(Debug, Clone)]
pub struct CommandFilter {
    program: String,
    args: Vec<String>,
}

#[derive(Deserialize)]
struct CommandOutput {
    text: String,
    charmap: Vec<u32>,
}

impl CommandFilter {
    /// Creates a filter that runs `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Filter for CommandFilter {
    async fn filter(&self, text: &str) -> Result<Filtered, FilterError> {
        debug!("Running filter: {} {:?}", self.program, self.args);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("filter stdin unavailable"))?;
        let input = text.to_string();
        let writer = tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(FilterError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        // A filter may exit without draining its input.
        match writer.await.map_err(std::io::Error::other)? {
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!("Filter closed stdin early: {}", e);
            }
            result => result?,
        }

        let parsed: CommandOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| FilterError::InvalidOutput(e.to_string()))?;
        let map = OffsetMap::from_charmap(&parsed.text, text, &parsed.charmap)?;

        Ok(Filtered {
            text: parsed.text,
            map,
        })
    }
}
