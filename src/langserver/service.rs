//! Per-connection service state

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::error::LangError;
use crate::infra::wait::{WaitConfig, Waiter};
use crate::models::lsp::ClientCapabilities;
use crate::services::{CoreSchema, DecoderFinder, DocumentStore, InMemoryDocumentStore, SchemaDecoderFinder};

/// Dependencies handed to a request handler
///
/// Built per request from the connection's [`Service`]; the capability
/// snapshot is the one negotiated at `initialize`.
#[derive(Clone)]
pub struct RequestContext {
    pub store: Arc<dyn DocumentStore>,
    pub finder: Arc<dyn DecoderFinder>,
    pub capabilities: Arc<ClientCapabilities>,
    pub waiter: Waiter,
}

/// Handler state for one client connection
pub struct Service {
    store: Arc<dyn DocumentStore>,
    finder: Arc<dyn DecoderFinder>,
    wait: WaitConfig,
    capabilities: OnceLock<Arc<ClientCapabilities>>,
    shutting_down: AtomicBool,
}

impl Service {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        finder: Arc<dyn DecoderFinder>,
        wait: WaitConfig,
    ) -> Self {
        Self {
            store,
            finder,
            wait,
            capabilities: OnceLock::new(),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Record the client's capabilities; only the first call succeeds
    pub fn initialize(&self, capabilities: ClientCapabilities) -> Result<(), LangError> {
        self.capabilities
            .set(Arc::new(capabilities))
            .map_err(|_| LangError::InvalidRequest("server already initialized".to_string()))
    }

    pub fn is_initialized(&self) -> bool {
        self.capabilities.get().is_some()
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Dependencies for one request, cancelled through `cancel`
    pub fn context(&self, cancel: CancellationToken) -> Result<RequestContext, LangError> {
        let capabilities = self.capabilities.get().ok_or_else(|| {
            tracing::error!("Request context requested before initialize");
            LangError::NotInitialized
        })?;

        Ok(RequestContext {
            store: Arc::clone(&self.store),
            finder: Arc::clone(&self.finder),
            capabilities: Arc::clone(capabilities),
            waiter: Waiter::new(self.wait, cancel),
        })
    }
}

/// Creates a fresh [`Service`] for every accepted connection
pub trait ServiceFactory: Send + Sync + 'static {
    fn create(&self) -> Service;
}

impl<F> ServiceFactory for F
where
    F: Fn() -> Service + Send + Sync + 'static,
{
    fn create(&self) -> Service {
        self()
    }
}

/// Factory for the built-in decoder: each connection gets its own document
/// store, all of them share `schema`
pub fn schema_service_factory(schema: Arc<CoreSchema>, wait: WaitConfig) -> impl ServiceFactory {
    move || {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let finder = Arc::new(SchemaDecoderFinder::new(
            Arc::clone(&store),
            Arc::clone(&schema),
        ));
        Service::new(store, finder, wait)
    }
}
