//! JSON output formatter

use std::path::Path;

use kousei_core::Diagnostic;
use miette::{IntoDiagnostic, Result};

use super::line_col;

pub fn output_json(path: &Path, text: &str, diagnostics: &[Diagnostic]) -> Result<()> {
    let diagnostics: Vec<_> = diagnostics
        .iter()
        .map(|diag| {
            let (line, column) = line_col(text, diag.span.start as usize);
            serde_json::json!({
                "line": line,
                "column": column,
                "diagnostic": diag,
            })
        })
        .collect();
    let output = serde_json::json!({
        "path": path.display().to_string(),
        "diagnostics": diagnostics,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).into_diagnostic()?
    );
    Ok(())
}
