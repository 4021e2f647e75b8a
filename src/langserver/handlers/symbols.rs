//! textDocument/documentSymbol

use crate::error::LangError;
use crate::langserver::service::RequestContext;
use crate::models::lsp::{DocumentSymbolParams, SymbolInformation};
use crate::services::converters;

/// Editors send this right after didOpen, often while the core schema is
/// still loading, and do not retry. It waits for the schema instead of
/// failing straight away.
pub async fn document_symbol(
    ctx: &RequestContext,
    params: DocumentSymbolParams,
) -> Result<Vec<SymbolInformation>, LangError> {
    let uri = params.text_document.uri;
    let doc = ctx.store.get_document(&uri).await?;
    let dir = doc.dir();

    ctx.waiter
        .wait_for(|| ctx.finder.is_core_schema_loaded(dir), dir.display())
        .await?;

    let decoder = ctx
        .finder
        .decoder_for_dir(dir)
        .await
        .map_err(|source| LangError::NoCompatibleDecoder {
            dir: dir.to_path_buf(),
            source,
        })?;

    let symbols = decoder.symbols().map_err(LangError::Diagnostics)?;
    tracing::debug!("{} symbols for {}", symbols.len(), uri);

    Ok(symbols
        .iter()
        .map(|symbol| converters::symbol_information(symbol, &uri))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use tokio_util::sync::CancellationToken;

    use crate::infra::wait::WaitConfig;
    use crate::langserver::service::Service;
    use crate::langserver::testing::{MockDecoder, MockFinder};
    use crate::models::lang::{Diagnostic, HclRange, Pos, Symbol, SymbolKind};
    use crate::models::lsp::{ClientCapabilities, LspSymbolKind, TextDocumentIdentifier};
    use crate::services::{DocumentStore, InMemoryDocumentStore};

    const URI: &str = "file:///work/app/main.tf";

    fn wait_config() -> WaitConfig {
        WaitConfig {
            interval: Duration::from_millis(20),
            max_attempts: 5,
        }
    }

    async fn context(finder: MockFinder) -> (RequestContext, Arc<MockFinder>) {
        context_with(finder, wait_config()).await
    }

    async fn context_with(finder: MockFinder, wait: WaitConfig) -> (RequestContext, Arc<MockFinder>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.open(URI, String::new(), 1).await.unwrap();
        let finder = Arc::new(finder);
        let service = Service::new(store, finder.clone(), wait);
        service.initialize(ClientCapabilities::default()).unwrap();
        (service.context(CancellationToken::new()).unwrap(), finder)
    }

    fn params() -> DocumentSymbolParams {
        DocumentSymbolParams {
            text_document: TextDocumentIdentifier::new(URI),
        }
    }

    fn symbols() -> Vec<Symbol> {
        let range = HclRange::new("variables.tf", Pos::new(1, 1, 0), Pos::new(3, 2, 30));
        vec![
            Symbol::new("variable region", SymbolKind::Block, range.clone()),
            Symbol::new("region", SymbolKind::Attribute, range),
        ]
    }

    #[tokio::test]
    async fn test_waits_for_schema_then_returns_symbols() {
        let interval = Duration::from_millis(100);
        let finder = MockFinder::ready_on_poll(3).with_decoder(MockDecoder::with_symbols(symbols()));
        let (ctx, finder) = context_with(
            finder,
            WaitConfig {
                interval,
                max_attempts: 5,
            },
        )
        .await;

        let started = Instant::now();
        let result = document_symbol(&ctx, params()).await.unwrap();
        let elapsed = started.elapsed();

        // two sleeps between three polls, and no third sleep
        assert!(elapsed >= interval * 2, "returned after {elapsed:?}");
        assert!(elapsed < interval * 3, "returned after {elapsed:?}");
        assert_eq!(finder.polls(), 3);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].kind, LspSymbolKind::Class);
        assert_eq!(result[1].kind, LspSymbolKind::Field);
        assert!(result.iter().all(|s| s.location.uri == URI));
    }

    #[tokio::test]
    async fn test_gives_up_after_bound() {
        let (ctx, finder) = context(MockFinder::never_ready()).await;
        let err = document_symbol(&ctx, params()).await.unwrap_err();

        assert!(matches!(err, LangError::SchemaNotReady { .. }));
        assert!(err.to_string().ends_with("/work/app"));
        assert_eq!(finder.polls(), 5);
    }

    #[tokio::test]
    async fn test_decoder_diagnostics_fail_request() {
        let mut decoder = MockDecoder::with_symbols(symbols());
        decoder.diagnostics.push(Diagnostic::error("Unclosed configuration block"));
        let (ctx, _) = context(MockFinder::ready().with_decoder(decoder)).await;

        let err = document_symbol(&ctx, params()).await.unwrap_err();
        assert!(matches!(err, LangError::Diagnostics(_)));
    }
}
