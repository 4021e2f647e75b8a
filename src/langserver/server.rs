//! Language server entry points: stdio or a TCP listener

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use super::connection::serve_connection;
use super::service::ServiceFactory;
use crate::error::ServerError;

const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 64;

pub struct LangServer {
    factory: Arc<dyn ServiceFactory>,
    cancel: CancellationToken,
    max_concurrent_requests: usize,
}

impl LangServer {
    pub fn new(factory: impl ServiceFactory, cancel: CancellationToken) -> Self {
        Self {
            factory: Arc::new(factory),
            cancel,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    pub fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit.max(1);
        self
    }

    /// Serve a single client over the given streams until it exits
    pub async fn start_and_wait<R, W>(&self, reader: R, writer: W) -> Result<(), ServerError>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let service = Arc::new(self.factory.create());
        let result = serve_connection(
            reader,
            writer,
            service,
            self.max_concurrent_requests,
            self.cancel.clone(),
        )
        .instrument(tracing::info_span!("connection", transport = "stdio"))
        .await;

        if let Err(e) = &result {
            tracing::error!("Connection loop failed: {}", e);
        }
        result
    }

    /// Bind `address` and serve every accepted connection until cancelled
    pub async fn start_tcp(&self, address: &str) -> Result<(), ServerError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.to_string(),
                source,
            })?;

        match listener.local_addr() {
            Ok(addr) => tracing::info!("Listening on {}", addr),
            Err(_) => tracing::info!("Listening on {}", address),
        }

        self.serve_listener(listener).await
    }

    /// Accept loop over an already bound listener
    ///
    /// Each connection gets its own service, so documents opened by one
    /// client are never visible to another.
    pub async fn serve_listener(&self, listener: TcpListener) -> Result<(), ServerError> {
        let connections = TaskTracker::new();
        let next_id = AtomicU64::new(1);

        loop {
            let accepted = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
                accepted = listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    continue;
                }
            };

            let id = next_id.fetch_add(1, Ordering::Relaxed);
            let service = Arc::new(self.factory.create());
            let cancel = self.cancel.child_token();
            let limit = self.max_concurrent_requests;
            let span = tracing::info_span!("connection", id, %peer);

            connections.spawn(
                async move {
                    tracing::info!("Client connected");
                    let (reader, writer) = stream.into_split();
                    match serve_connection(reader, writer, service, limit, cancel).await {
                        Ok(()) => tracing::info!("Client disconnected"),
                        Err(e) if e.is_disconnect() => tracing::info!("Client disconnected"),
                        Err(e) => tracing::warn!("Connection error: {}", e),
                    }
                }
                .instrument(span),
            );
        }

        drop(listener);
        connections.close();
        connections.wait().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use tokio::net::TcpStream;

    use crate::infra::protocol::methods;
    use crate::infra::wait::WaitConfig;
    use crate::langserver::service::schema_service_factory;
    use crate::langserver::testing::TestClient;
    use crate::models::lsp::{CompletionList, SymbolInformation};
    use crate::services::{CoreSchema, Schema};

    fn server(cancel: CancellationToken) -> LangServer {
        let schema = Arc::new(CoreSchema::loaded(Schema::core().unwrap()));
        LangServer::new(schema_service_factory(schema, WaitConfig::default()), cancel)
    }

    async fn connect(
        addr: std::net::SocketAddr,
    ) -> TestClient<tokio::net::tcp::OwnedReadHalf, tokio::net::tcp::OwnedWriteHalf> {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        TestClient::new(reader, writer)
    }

    fn names(response: crate::infra::protocol::Response) -> Vec<String> {
        let symbols: Vec<SymbolInformation> =
            serde_json::from_value(response.into_result().unwrap()).unwrap();
        symbols.into_iter().map(|s| s.name).collect()
    }

    #[tokio::test]
    async fn test_connections_are_isolated() {
        let cancel = CancellationToken::new();
        let server = Arc::new(server(cancel.clone()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.serve_listener(listener).await }
        });

        let uri = "file:///work/main.tf";
        let mut a = connect(addr).await;
        let mut b = connect(addr).await;
        a.initialize(false).await;
        b.initialize(false).await;

        a.open(uri, "variable \"a\" {\n}\n").await;
        b.open(uri, "output \"b\" {\n  value = 1\n}\n").await;

        assert_eq!(names(a.document_symbol(1, uri).await), vec!["variable a"]);
        assert_eq!(names(b.document_symbol(1, uri).await), vec!["output b"]);

        a.notify(methods::EXIT, json!(null)).await;
        b.notify(methods::EXIT, json!(null)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), accept)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    fn labels(response: crate::infra::protocol::Response) -> Vec<String> {
        let list: CompletionList = serde_json::from_value(response.into_result().unwrap()).unwrap();
        list.items.into_iter().map(|item| item.label).collect()
    }

    #[tokio::test]
    async fn test_simultaneous_completions_on_two_connections() {
        let cancel = CancellationToken::new();
        let server = Arc::new(server(cancel.clone()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.serve_listener(listener).await }
        });

        let mut a = connect(addr).await;
        let mut b = connect(addr).await;
        a.initialize(false).await;
        b.initialize(false).await;

        let uri_a = "file:///work/compute/main.tf";
        let uri_b = "file:///work/inputs/variables.tf";
        a.open(uri_a, "resource \"aws_instance\" \"web\" {\n  \n}\n").await;
        b.open(uri_b, "variable \"region\" {\n  \n}\n").await;

        let (from_a, from_b) = tokio::join!(a.completion(1, uri_a, 1, 2), b.completion(1, uri_b, 1, 2));
        let from_a = labels(from_a);
        let from_b = labels(from_b);

        assert!(from_a.contains(&"count".to_string()));
        assert!(!from_a.contains(&"sensitive".to_string()));
        assert!(from_b.contains(&"sensitive".to_string()));
        assert!(!from_b.contains(&"count".to_string()));

        // each connection only knows its own document
        let missing = a.completion(2, uri_b, 1, 2).await;
        assert_eq!(
            missing.into_result().unwrap_err().code,
            crate::infra::protocol::error_codes::INVALID_PARAMS
        );

        a.notify(methods::EXIT, json!(null)).await;
        b.notify(methods::EXIT, json!(null)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), accept)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_stops_accept_loop() {
        let cancel = CancellationToken::new();
        let server = server(cancel.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), server.serve_listener(listener))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_names_address() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();

        let server = server(CancellationToken::new());
        let err = server.start_tcp(&address).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { address: ref a, .. } if *a == address));
    }

    #[tokio::test]
    async fn test_stdio_session_ends_on_exit() {
        let server = server(CancellationToken::new());
        let (client, server_side) = tokio::io::duplex(16 * 1024);
        let (server_read, server_write) = tokio::io::split(server_side);
        let (client_read, client_write) = tokio::io::split(client);
        let mut client = TestClient::new(client_read, client_write);

        let session = async {
            let init = client.initialize(true).await;
            assert!(init.is_success());
            let response = client.request(1, methods::SHUTDOWN, json!(null)).await;
            assert!(response.into_result().unwrap().is_null());
            client.notify(methods::EXIT, json!(null)).await;
        };

        let (result, ()) = tokio::join!(server.start_and_wait(server_read, server_write), session);
        result.unwrap();
    }
}
