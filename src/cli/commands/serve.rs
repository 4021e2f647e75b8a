//! Serve command implementation

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::config;
use crate::infra::wait::WaitConfig;
use crate::langserver::{LangServer, schema_service_factory};
use crate::models::config::ServerConfig;
use crate::services::CoreSchema;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen on 127.0.0.1:PORT instead of stdio
    #[arg(long, conflicts_with = "address")]
    pub port: Option<u16>,

    /// Listen on ADDR (host:port) instead of stdio
    #[arg(long, value_name = "ADDR")]
    pub address: Option<String>,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Core schema file (TOML); the embedded schema is used by default
    #[arg(long, value_name = "PATH")]
    pub schema: Option<PathBuf>,
}

impl ServeArgs {
    /// Command-line flags take precedence over the file
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.server.address = Some(format!("127.0.0.1:{port}"));
        } else if let Some(address) = &self.address {
            config.server.address = Some(address.clone());
        }
        if let Some(schema) = &self.schema {
            config.schema.path = Some(schema.clone());
        }
    }
}

pub async fn execute(args: ServeArgs, cancel: CancellationToken) -> Result<()> {
    let mut config = config::load(args.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    args.apply(&mut config);

    let schema = Arc::new(CoreSchema::new());
    let loading = schema.spawn_loading(config.schema.path.clone());

    let factory = schema_service_factory(schema, WaitConfig::from(&config.readiness));
    let server = LangServer::new(factory, cancel)
        .with_max_concurrent_requests(config.server.max_concurrent_requests);

    let result = match &config.server.address {
        Some(address) => server.start_tcp(address).await,
        None => {
            tracing::info!("Serving on stdio");
            server
                .start_and_wait(tokio::io::stdin(), tokio::io::stdout())
                .await
        }
    };

    loading.abort();
    result.context("Language server failed")?;
    tracing::info!("Server stopped");
    Ok(())
}
