//! Text output formatter

use std::path::Path;

use kousei_core::{Diagnostic, Severity};

use super::line_col;

pub fn output_text(path: &Path, text: &str, diagnostics: &[Diagnostic]) {
    if !diagnostics.is_empty() {
        println!("\n{}:", path.display());
    }

    for diag in diagnostics {
        let severity = match diag.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        let (line, col) = line_col(text, diag.span.start as usize);
        let message = diag.message.lines().collect::<Vec<_>>().join(" ");
        println!(
            "  {}:{} {} {} [{}]",
            line, col, severity, message, diag.rule_id
        );
    }

    println!();
    println!(
        "Checked {}, found {} issues",
        path.display(),
        diagnostics.len()
    );
}
