//! Output formatting module

mod json;
mod text;

use std::path::Path;

use kousei_core::Diagnostic;
use miette::Result;

use crate::cli::OutputFormat;

pub fn output_diagnostics(
    path: &Path,
    text: &str,
    diagnostics: &[Diagnostic],
    format: OutputFormat,
) -> Result<bool> {
    match format {
        OutputFormat::Json => json::output_json(path, text, diagnostics)?,
        OutputFormat::Text => text::output_text(path, text, diagnostics),
    }

    Ok(!diagnostics.is_empty())
}

/// 1-based line and column (in characters) of a byte offset.
pub(crate) fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let mut end = offset.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let before = &text[..end];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let col = before[line_start..].chars().count() + 1;
    (line, col)
}
