//! Data models for schemals
//!
//! Engine-native analysis types (`lang`), protocol-native types (`lsp`)
//! and configuration.

pub mod config;
pub mod lang;
pub mod lsp;

// Re-export commonly used types
pub use config::ServerConfig;
pub use lang::{
    Candidate, CandidateKind, Candidates, Diagnostic, Diagnostics, HclRange, MarkupContent,
    MarkupKind, Pos, Symbol, SymbolKind,
};
pub use lsp::{
    ClientCapabilities, CompletionItem, CompletionItemKind, CompletionList, InsertTextFormat,
    LspSymbolKind, Position, Range, SymbolInformation,
};
