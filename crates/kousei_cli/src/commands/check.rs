//! Check command implementation

use std::fs;
use std::path::Path;

use miette::{IntoDiagnostic, Result, miette};
use tracing::info;

use kousei_core::{CancellationToken, RunOutcome, ServerConfig, Snapshot, Url};

use crate::cli::OutputFormat;
use crate::output::output_diagnostics;
use crate::utils::create_tokio_runtime;

/// Runs one analysis over `file`. Returns whether anything was found.
pub fn run_check(config: &ServerConfig, file: &Path, format: OutputFormat) -> Result<bool> {
    let text = fs::read_to_string(file)
        .map_err(|e| miette!("Failed to read {}: {}", file.display(), e))?;

    let absolute = fs::canonicalize(file).into_diagnostic()?;
    let uri = Url::from_file_path(&absolute)
        .map_err(|_| miette!("Cannot build a URI for {}", absolute.display()))?;

    let pipeline = config.pipeline().into_diagnostic()?;
    let snapshot = Snapshot::new(uri, 0, text.as_str());

    info!("Checking {} ({})", file.display(), config.language);
    let outcome = create_tokio_runtime()?
        .block_on(pipeline.run(&snapshot, &CancellationToken::new()))
        .into_diagnostic()?;

    let diagnostics = match outcome {
        RunOutcome::Finished(diagnostics) => diagnostics,
        RunOutcome::Cancelled => return Err(miette!("Check was cancelled")),
    };

    output_diagnostics(file, &text, &diagnostics, format)
}
