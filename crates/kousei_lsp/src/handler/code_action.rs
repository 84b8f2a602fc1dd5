//! Code action handler offering checker replacements as quick fixes.

use std::collections::HashMap;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tracing::debug;

use kousei_core::MAX_REPLACEMENTS;

use crate::conversion::{DiagnosticData, SOURCE, position_to_offset, positions_le};
use crate::store::DocumentStore;

/// Upper bound on the actions returned for one request.
const MAX_ACTIONS: usize = 10;

/// Handles the `textDocument/codeAction` request.
///
/// Returns one quick fix per suggested replacement of every kousei
/// diagnostic in the request context, as long as the text under the
/// diagnostic still reads what the checker flagged.
pub fn handle_code_action(
    store: &DocumentStore,
    params: CodeActionParams,
) -> Result<Option<CodeActionResponse>> {
    let uri = &params.text_document.uri;
    debug!("Code action request: {}", uri);

    if let Some(only) = &params.context.only
        && !only.contains(&CodeActionKind::QUICKFIX)
    {
        return Ok(None);
    }

    let Ok(document) = store.get(uri) else {
        return Ok(None);
    };

    let mut actions = Vec::new();
    for diagnostic in &params.context.diagnostics {
        if !positions_le(diagnostic.range.start, params.range.end)
            || !positions_le(params.range.start, diagnostic.range.end)
        {
            continue;
        }
        add_quickfix_actions(
            diagnostic,
            &document.text,
            uri,
            document.version,
            &mut actions,
        );
    }

    Ok(Some(actions))
}

fn add_quickfix_actions(
    diagnostic: &Diagnostic,
    text: &str,
    uri: &Url,
    version: i32,
    actions: &mut Vec<CodeActionOrCommand>,
) {
    if diagnostic.source.as_deref() != Some(SOURCE) {
        return;
    }
    let Some(data) = diagnostic
        .data
        .clone()
        .and_then(|value| serde_json::from_value::<DiagnosticData>(value).ok())
    else {
        return;
    };

    let (Some(start), Some(end)) = (
        position_to_offset(diagnostic.range.start, text),
        position_to_offset(diagnostic.range.end, text),
    ) else {
        return;
    };
    if text.get(start..end) != Some(data.matched.as_str()) {
        debug!(
            "Skipping fixes for {:?}: text changed since the diagnostic was published",
            data.matched
        );
        return;
    }

    for replacement in data.replacements.iter().take(MAX_REPLACEMENTS) {
        if actions.len() >= MAX_ACTIONS {
            return;
        }
        let edit = TextDocumentEdit {
            text_document: OptionalVersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: Some(version),
            },
            edits: vec![OneOf::Left(TextEdit {
                range: diagnostic.range,
                new_text: replacement.value.clone(),
            })],
        };

        let action = CodeAction {
            title: format!("Replace with '{}'", replacement.title()),
            kind: Some(CodeActionKind::QUICKFIX),
            diagnostics: Some(vec![diagnostic.clone()]),
            edit: Some(WorkspaceEdit {
                document_changes: Some(DocumentChanges::Edits(vec![edit])),
                ..Default::default()
            }),
            is_preferred: Some(actions.is_empty()),
            ..Default::default()
        };
        actions.push(CodeActionOrCommand::CodeAction(action));
    }
}
