//! Open document storage
//!
//! Documents are kept in memory with full-text synchronization. Handlers
//! resolve request URIs through [`DocumentStore`]; the shipped decoder reads
//! every open document of a directory from it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::LangError;
use crate::models::lsp::uri_to_path;

/// One open text document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub uri: String,
    pub path: PathBuf,
    pub text: String,
    pub version: i32,
}

impl Document {
    pub fn new(uri: impl Into<String>, text: impl Into<String>, version: i32) -> Result<Self, LangError> {
        let uri = uri.into();
        let path = uri_to_path(&uri)
            .ok_or_else(|| LangError::InvalidParams(format!("unsupported document URI: {uri}")))?;
        Ok(Self {
            uri,
            path,
            text: text.into(),
            version,
        })
    }

    /// Directory that owns the document; decoders are resolved per directory
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }

    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, uri: &str) -> Result<Arc<Document>, LangError>;

    async fn open(&self, uri: &str, text: String, version: i32) -> Result<(), LangError>;

    async fn update(&self, uri: &str, text: String, version: i32) -> Result<(), LangError>;

    async fn close(&self, uri: &str) -> Result<(), LangError>;

    /// All open documents whose parent directory is `dir`, ordered by filename
    async fn documents_in(&self, dir: &Path) -> Vec<Arc<Document>>;
}

#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Arc<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, uri: &str) -> Result<Arc<Document>, LangError> {
        self.documents
            .read()
            .await
            .get(uri)
            .cloned()
            .ok_or_else(|| LangError::DocumentNotFound(uri.to_string()))
    }

    async fn open(&self, uri: &str, text: String, version: i32) -> Result<(), LangError> {
        let document = Document::new(uri, text, version)?;
        tracing::debug!("Opened {} (version {})", uri, version);
        self.documents
            .write()
            .await
            .insert(uri.to_string(), Arc::new(document));
        Ok(())
    }

    async fn update(&self, uri: &str, text: String, version: i32) -> Result<(), LangError> {
        let mut documents = self.documents.write().await;
        let Some(current) = documents.get_mut(uri) else {
            return Err(LangError::DocumentNotFound(uri.to_string()));
        };

        if version < current.version {
            tracing::debug!(
                "Ignoring stale change for {} (version {} < {})",
                uri,
                version,
                current.version
            );
            return Ok(());
        }

        *current = Arc::new(Document {
            uri: current.uri.clone(),
            path: current.path.clone(),
            text,
            version,
        });
        Ok(())
    }

    async fn close(&self, uri: &str) -> Result<(), LangError> {
        match self.documents.write().await.remove(uri) {
            Some(_) => {
                tracing::debug!("Closed {}", uri);
                Ok(())
            }
            None => Err(LangError::DocumentNotFound(uri.to_string())),
        }
    }

    async fn documents_in(&self, dir: &Path) -> Vec<Arc<Document>> {
        let mut docs: Vec<_> = self
            .documents
            .read()
            .await
            .values()
            .filter(|doc| doc.dir() == dir)
            .cloned()
            .collect();
        docs.sort_by(|a, b| a.path.cmp(&b.path));
        docs
    }
}
