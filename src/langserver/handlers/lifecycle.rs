//! initialize / initialized / shutdown

use crate::error::LangError;
use crate::langserver::service::Service;
use crate::models::lsp::{
    CompletionOptions, InitializeParams, InitializeResult, ServerCapabilities, ServerInfo,
    TextDocumentSyncKind,
};

pub fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: TextDocumentSyncKind::Full,
        completion_provider: CompletionOptions {
            resolve_provider: Some(false),
        },
        document_symbol_provider: true,
    }
}

pub fn initialize(service: &Service, params: InitializeParams) -> Result<InitializeResult, LangError> {
    match &params.client_info {
        Some(client) => tracing::info!(
            "Initializing for {} {}",
            client.name,
            client.version.as_deref().unwrap_or("")
        ),
        None => tracing::info!("Initializing"),
    }

    service.initialize(params.capabilities)?;

    Ok(InitializeResult {
        capabilities: server_capabilities(),
        server_info: Some(ServerInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    })
}

pub fn initialized(service: &Service) {
    if service.is_initialized() {
        tracing::info!("Client initialized");
    } else {
        tracing::warn!("initialized received before initialize");
    }
}

pub fn shutdown(service: &Service) {
    tracing::info!("Shutdown requested");
    service.begin_shutdown();
}
