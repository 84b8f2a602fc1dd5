//! LSP type conversion utilities.

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

use kousei_core::{Diagnostic as KouseiDiagnostic, Replacement, Severity as KouseiSeverity};

/// `source` field of every diagnostic this server publishes.
pub const SOURCE: &str = "kousei";

/// Payload carried in `Diagnostic::data` for code actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticData {
    pub matched: String,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    #[serde(default)]
    pub approximate: bool,
}

/// Converts a kousei diagnostic to an LSP diagnostic.
pub fn to_lsp_diagnostic(diag: &KouseiDiagnostic, text: &str) -> Option<Diagnostic> {
    let range = offset_to_range(diag.span.start as usize, diag.span.end as usize, text)?;

    let severity = match diag.severity {
        KouseiSeverity::Error => DiagnosticSeverity::ERROR,
        KouseiSeverity::Warning => DiagnosticSeverity::WARNING,
        KouseiSeverity::Info => DiagnosticSeverity::INFORMATION,
    };

    let data = DiagnosticData {
        matched: diag.matched.clone(),
        replacements: diag.replacements.clone(),
        approximate: diag.approximate,
    };

    Some(Diagnostic {
        range,
        severity: Some(severity),
        code: Some(NumberOrString::String(diag.rule_id.clone())),
        source: Some(SOURCE.to_string()),
        message: diag.message.clone(),
        data: serde_json::to_value(data).ok(),
        ..Default::default()
    })
}

/// Converts byte offsets to an LSP range.
pub fn offset_to_range(start: usize, end: usize, text: &str) -> Option<Range> {
    let start_pos = offset_to_position(start, text)?;
    let end_pos = offset_to_position(end, text)?;
    Some(Range::new(start_pos, end_pos))
}

/// Converts a byte offset to an LSP position.
pub fn offset_to_position(offset: usize, text: &str) -> Option<Position> {
    if offset > text.len() {
        return None;
    }

    let mut line = 0u32;
    let mut col = 0u32;
    let mut current_offset = 0;

    for ch in text.chars() {
        if current_offset >= offset {
            break;
        }

        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += ch.len_utf16() as u32;
        }

        current_offset += ch.len_utf8();
    }

    Some(Position::new(line, col))
}

/// Converts an LSP position to a byte offset.
///
/// A character past the end of its line clamps to the line end. Returns
/// `None` when the line does not exist.
pub fn position_to_offset(position: Position, text: &str) -> Option<usize> {
    let mut line_start = 0;
    for _ in 0..position.line {
        line_start += text[line_start..].find('\n')? + 1;
    }

    let line = &text[line_start..];
    let line_end = line.find('\n').unwrap_or(line.len());

    let mut units = 0u32;
    for (byte, ch) in line[..line_end].char_indices() {
        if units >= position.character {
            return Some(line_start + byte);
        }
        units += ch.len_utf16() as u32;
    }

    Some(line_start + line_end)
}

/// Helper to compare Positions (p1 <= p2)
pub fn positions_le(p1: Position, p2: Position) -> bool {
    p1.line < p2.line || (p1.line == p2.line && p1.character <= p2.character)
}
