//! Decoder interfaces
//!
//! The language server only talks to the analysis engine through these two
//! traits. Implementations are shared across connections and must be safe
//! for concurrent use.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DecoderError, LangError};
use crate::models::lang::{Candidates, Diagnostics, Pos, Symbol};

/// Answers completion and symbol queries for one directory
pub trait Decoder: Send + Sync {
    /// Candidates for `pos` in `filename`, plus any diagnostics found while
    /// parsing
    fn candidates_at(&self, filename: &str, pos: Pos) -> (Candidates, Diagnostics);

    /// Flat list of symbols across the directory
    fn symbols(&self) -> Result<Vec<Symbol>, Diagnostics>;
}

/// Locates the decoder responsible for a directory
#[async_trait]
pub trait DecoderFinder: Send + Sync {
    async fn is_core_schema_loaded(&self, dir: &Path) -> Result<bool, LangError>;

    async fn decoder_for_dir(&self, dir: &Path) -> Result<Arc<dyn Decoder>, DecoderError>;
}
