//! Full-text document synchronization

use crate::error::LangError;
use crate::langserver::service::Service;
use crate::models::lsp::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
};
use crate::services::DocumentStore;

pub async fn did_open(service: &Service, params: DidOpenTextDocumentParams) -> Result<(), LangError> {
    let doc = params.text_document;
    service.store().open(&doc.uri, doc.text, doc.version).await
}

/// Only full-content changes are advertised, so the last change wins
pub async fn did_change(
    service: &Service,
    params: DidChangeTextDocumentParams,
) -> Result<(), LangError> {
    let Some(change) = params.content_changes.into_iter().last() else {
        return Ok(());
    };
    let doc = params.text_document;
    service.store().update(&doc.uri, change.text, doc.version).await
}

pub async fn did_close(service: &Service, params: DidCloseTextDocumentParams) -> Result<(), LangError> {
    service.store().close(&params.text_document.uri).await
}
