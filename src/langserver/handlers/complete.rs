//! textDocument/completion

use crate::error::LangError;
use crate::langserver::service::RequestContext;
use crate::models::lsp::{CompletionList, CompletionParams};
use crate::services::converters;

/// Completion does not wait for the core schema; typing must never stall
pub async fn completion(
    ctx: &RequestContext,
    params: CompletionParams,
) -> Result<CompletionList, LangError> {
    let position = params.text_document_position;
    let uri = &position.text_document.uri;
    tracing::debug!(
        "Finding block at {}:{}:{}",
        uri,
        position.position.line,
        position.position.character
    );

    let doc = ctx.store.get_document(uri).await?;
    let dir = doc.dir();

    if !ctx.finder.is_core_schema_loaded(dir).await? {
        return Err(LangError::schema_not_ready(dir.display()));
    }

    let decoder = ctx
        .finder
        .decoder_for_dir(dir)
        .await
        .map_err(|source| LangError::NoCompatibleDecoder {
            dir: dir.to_path_buf(),
            source,
        })?;

    let pos = converters::file_position(&doc, position.position)?;
    let (candidates, diagnostics) = decoder.candidates_at(&doc.filename(), pos);
    if !diagnostics.is_empty() {
        return Err(LangError::Diagnostics(diagnostics));
    }

    tracing::debug!("{} candidates for {}", candidates.len(), uri);
    Ok(converters::completion_list(
        Some(candidates),
        &ctx.capabilities,
    ))
}
