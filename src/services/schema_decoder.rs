//! Built-in schema decoder
//!
//! A line-oriented scanner over the open documents of one directory. It
//! understands enough of the block syntax to offer block, attribute and
//! label completions from a [`Schema`] and to list top-level symbols. It is
//! not a full parser: expressions are skipped, and a block header must fit
//! on one line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::decoder::{Decoder, DecoderFinder};
use super::documents::{Document, DocumentStore};
use super::schema::{BlockSchema, Schema};
use crate::error::{DecoderError, LangError};
use crate::models::lang::{
    Candidate, CandidateKind, Candidates, Diagnostic, Diagnostics, HclRange, MarkupContent, Pos,
    Symbol, SymbolKind, TextEdit,
};

static BLOCK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*)([A-Za-z_][\w-]*)((?:\s+(?:"[^"]*"|[A-Za-z_][\w-]*))*)\s*\{\s*(\})?\s*$"#)
        .expect("block header pattern must compile")
});

static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|([A-Za-z_][\w-]*)"#).expect("label pattern must compile")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)([A-Za-z_][\w-]*)\s*=([^=].*)?$").expect("attribute pattern must compile")
});

/// Cursor inside an unterminated label string: `resource "aws_ins|`
static LABEL_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*([A-Za-z_][\w-]*)((?:\s+"[^"]*")*)\s+"([^"]*)$"#)
        .expect("label context pattern must compile")
});

/// Cursor at the start of a statement, possibly after a partial name
static NAME_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][\w-]*)?$").expect("name context pattern must compile")
});

// ============================================================================
// Scanner
// ============================================================================

#[derive(Debug, Clone)]
enum Frame {
    Block {
        type_name: String,
        labels: Vec<String>,
        start: Pos,
    },
    /// Object value of an attribute (`tags = {`)
    Value { start: Pos },
}

#[derive(Debug, Default)]
struct Outline {
    frames: Vec<Frame>,
    symbols: Vec<Symbol>,
    diagnostics: Diagnostics,
}

/// Columns count UTF-16 code units, the unit editors address lines in
fn pos_in_line(line_no: u32, line: &str, line_start: usize, byte_idx: usize) -> Pos {
    let column = line[..byte_idx].encode_utf16().count() as u32 + 1;
    Pos::new(line_no, column, line_start + byte_idx)
}

/// Scan `text` line by line, stopping before `stop_line` when given
///
/// Unclosed blocks are only reported when the whole text was scanned.
fn scan(filename: &str, text: &str, stop_line: Option<u32>) -> Outline {
    let mut outline = Outline::default();
    let mut heredoc: Option<String> = None;
    let mut in_comment = false;
    let mut offset = 0;

    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        let line_no = idx as u32 + 1;
        let line_start = offset;
        offset += raw.len();

        if stop_line.is_some_and(|stop| line_no >= stop) {
            return outline;
        }

        let line = raw.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim();

        if let Some(terminator) = &heredoc {
            if trimmed == terminator.as_str() {
                heredoc = None;
            }
            continue;
        }
        if in_comment {
            in_comment = !trimmed.contains("*/");
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
            continue;
        }
        if trimmed.starts_with("/*") {
            in_comment = !trimmed.contains("*/");
            continue;
        }

        let top_level = outline.frames.is_empty();

        if let Some(caps) = BLOCK_HEADER.captures(line) {
            let indent = caps.get(1).map_or(0, |m| m.end());
            let start = pos_in_line(line_no, line, line_start, indent);
            let type_name = caps[2].to_string();
            let labels: Vec<String> = LABEL
                .captures_iter(caps.get(3).map_or("", |m| m.as_str()))
                .filter_map(|l| l.get(1).or_else(|| l.get(2)))
                .map(|m| m.as_str().to_string())
                .collect();

            if caps.get(4).is_some() {
                if top_level {
                    let end = pos_in_line(line_no, line, line_start, line.trim_end().len());
                    outline
                        .symbols
                        .push(block_symbol(&type_name, &labels, filename, start, end));
                }
            } else {
                outline.frames.push(Frame::Block {
                    type_name,
                    labels,
                    start,
                });
            }
            continue;
        }

        if trimmed.starts_with('}') {
            let brace = line.len() - line.trim_start().len();
            match outline.frames.pop() {
                Some(Frame::Block {
                    type_name,
                    labels,
                    start,
                }) if outline.frames.is_empty() => {
                    let end = pos_in_line(line_no, line, line_start, brace + 1);
                    outline
                        .symbols
                        .push(block_symbol(&type_name, &labels, filename, start, end));
                }
                Some(_) => {}
                None => {
                    let at = pos_in_line(line_no, line, line_start, brace);
                    let end = pos_in_line(line_no, line, line_start, brace + 1);
                    outline.diagnostics.push(
                        Diagnostic::error("Unexpected closing brace")
                            .with_detail("no block is open at this point")
                            .with_subject(HclRange::new(filename, at, end)),
                    );
                }
            }
            continue;
        }

        if let Some(caps) = ATTRIBUTE.captures(line) {
            let indent = caps.get(1).map_or(0, |m| m.end());
            let value = caps.get(3).map_or("", |m| m.as_str()).trim();

            if top_level {
                let start = pos_in_line(line_no, line, line_start, indent);
                let end = pos_in_line(line_no, line, line_start, line.trim_end().len());
                outline.symbols.push(Symbol::new(
                    &caps[2],
                    SymbolKind::Attribute,
                    HclRange::new(filename, start, end),
                ));
            }

            if let Some(marker) = value.strip_prefix("<<") {
                let terminator = marker.trim_start_matches('-').trim();
                if !terminator.is_empty() {
                    heredoc = Some(terminator.to_string());
                }
            } else if value.ends_with('{') {
                let start = pos_in_line(line_no, line, line_start, indent);
                outline.frames.push(Frame::Value { start });
            }
        }
    }

    if stop_line.is_none() {
        for frame in &outline.frames {
            let (summary, detail, start) = match frame {
                Frame::Block {
                    type_name, start, ..
                } => (
                    "Unclosed configuration block",
                    format!("the {type_name} block opened here is never closed"),
                    *start,
                ),
                Frame::Value { start } => (
                    "Unclosed object",
                    "the object value opened here is never closed".to_string(),
                    *start,
                ),
            };
            outline.diagnostics.push(
                Diagnostic::error(summary)
                    .with_detail(detail)
                    .with_subject(HclRange::new(filename, start, start)),
            );
        }
    }

    outline
}

fn block_symbol(type_name: &str, labels: &[String], filename: &str, start: Pos, end: Pos) -> Symbol {
    let name = std::iter::once(type_name)
        .chain(labels.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    Symbol::new(name, SymbolKind::Block, HclRange::new(filename, start, end))
}

// ============================================================================
// Decoder
// ============================================================================

/// Decoder over a snapshot of one directory's open documents
pub struct SchemaDecoder {
    schema: Arc<Schema>,
    files: Vec<Arc<Document>>,
}

impl SchemaDecoder {
    pub fn new(schema: Arc<Schema>, files: Vec<Arc<Document>>) -> Self {
        Self { schema, files }
    }

    fn file(&self, filename: &str) -> Option<&Document> {
        self.files
            .iter()
            .find(|doc| doc.filename() == filename)
            .map(Arc::as_ref)
    }

    fn name_candidates(
        &self,
        attributes: Option<&BlockSchema>,
        blocks: &BTreeMap<String, BlockSchema>,
        partial: &str,
        range: &HclRange,
    ) -> Vec<Candidate> {
        let mut list = Vec::new();

        if let Some(parent) = attributes {
            for (name, attr) in &parent.attributes {
                if !name.starts_with(partial) {
                    continue;
                }
                list.push(Candidate {
                    label: name.clone(),
                    kind: CandidateKind::Attribute,
                    detail: attr.detail(),
                    description: description(&attr.description),
                    text_edit: TextEdit {
                        range: range.clone(),
                        new_text: name.clone(),
                        snippet: format!("{name} = ${{1}}"),
                    },
                });
            }
        }

        for (name, block) in blocks {
            if !name.starts_with(partial) {
                continue;
            }
            list.push(Candidate {
                label: name.clone(),
                kind: CandidateKind::Block,
                detail: "Block".to_string(),
                description: description(&block.description),
                text_edit: TextEdit {
                    range: range.clone(),
                    new_text: name.clone(),
                    snippet: block_snippet(name, block),
                },
            });
        }

        list
    }
}

fn description(value: &str) -> MarkupContent {
    if value.is_empty() {
        MarkupContent::plain("")
    } else {
        MarkupContent::markdown(value)
    }
}

fn block_snippet(name: &str, block: &BlockSchema) -> String {
    let mut snippet = name.to_string();
    let mut stop = 1;
    for label in &block.labels {
        snippet.push_str(&format!(" \"${{{stop}:{}}}\"", label.name));
        stop += 1;
    }
    snippet.push_str(&format!(" {{\n  ${{{stop}}}\n}}"));
    snippet
}

/// Start of a `partial` word that ends at `pos`
fn word_start(pos: Pos, partial: &str) -> Pos {
    Pos::new(
        pos.line,
        pos.column
            .saturating_sub(partial.encode_utf16().count() as u32)
            .max(1),
        pos.byte.saturating_sub(partial.len()),
    )
}

impl Decoder for SchemaDecoder {
    fn candidates_at(&self, filename: &str, pos: Pos) -> (Candidates, Diagnostics) {
        let Some(doc) = self.file(filename) else {
            let diag = Diagnostic::error("File not found")
                .with_detail(format!("{filename} is not open in this directory"));
            return (Candidates::default(), diag.into());
        };

        let Some(before) = doc.text.get(..pos.byte) else {
            let diag = Diagnostic::error("Position outside file")
                .with_detail(format!("byte {} is not inside {}", pos.byte, filename));
            return (Candidates::default(), diag.into());
        };
        let prefix = &before[before.rfind('\n').map_or(0, |i| i + 1)..];

        // diagnostics cover the text above the cursor line only
        let context = scan(filename, &doc.text, Some(pos.line));
        if !context.diagnostics.is_empty() {
            return (Candidates::default(), context.diagnostics);
        }

        let mut path = Vec::new();
        for frame in &context.frames {
            match frame {
                Frame::Block { type_name, .. } => path.push(type_name.as_str()),
                Frame::Value { .. } => return (Candidates::default(), Diagnostics::new()),
            }
        }

        let (parent, children) = if path.is_empty() {
            (None, &self.schema.blocks)
        } else {
            match self.schema.block(path.as_slice()) {
                Some(block) => (Some(block), &block.blocks),
                None => return (Candidates::default(), Diagnostics::new()),
            }
        };

        if let Some(caps) = LABEL_CONTEXT.captures(prefix) {
            let index = LABEL.find_iter(&caps[2]).count();
            let partial = &caps[3];
            let range = HclRange::new(filename, word_start(pos, partial), pos);

            let list = children
                .get(&caps[1])
                .and_then(|block| block.labels.get(index))
                .map(|label| {
                    label
                        .values
                        .iter()
                        .filter(|value| value.starts_with(partial))
                        .map(|value| Candidate {
                            label: value.clone(),
                            kind: CandidateKind::Label,
                            detail: label.name.clone(),
                            description: MarkupContent::default(),
                            text_edit: TextEdit {
                                range: range.clone(),
                                new_text: value.clone(),
                                snippet: value.clone(),
                            },
                        })
                        .collect()
                })
                .unwrap_or_default();
            return (Candidates::complete(list), Diagnostics::new());
        }

        if let Some(caps) = NAME_CONTEXT.captures(prefix) {
            let partial = caps.get(1).map_or("", |m| m.as_str());
            let range = HclRange::new(filename, word_start(pos, partial), pos);
            let list = self.name_candidates(parent, children, partial, &range);
            return (Candidates::complete(list), Diagnostics::new());
        }

        (Candidates::default(), Diagnostics::new())
    }

    fn symbols(&self) -> Result<Vec<Symbol>, Diagnostics> {
        let mut symbols = Vec::new();
        let mut diagnostics = Diagnostics::new();

        for doc in &self.files {
            let outline = scan(&doc.filename(), &doc.text, None);
            symbols.extend(outline.symbols);
            for diag in outline.diagnostics.0 {
                diagnostics.push(diag);
            }
        }

        if diagnostics.is_empty() {
            Ok(symbols)
        } else {
            Err(diagnostics)
        }
    }
}

// ============================================================================
// Finder
// ============================================================================

#[derive(Debug, Clone)]
enum LoadState {
    Loading,
    Loaded(Arc<Schema>),
    Failed(String),
}

/// Process-wide core schema, loaded once in the background and shared by
/// every connection's finder
#[derive(Debug)]
pub struct CoreSchema {
    state: watch::Sender<LoadState>,
}

impl Default for CoreSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreSchema {
    /// Schema that is still loading
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(LoadState::Loading),
        }
    }

    pub fn loaded(schema: Schema) -> Self {
        let core = Self::new();
        core.set_loaded(schema);
        core
    }

    pub fn set_loaded(&self, schema: Schema) {
        self.state.send_replace(LoadState::Loaded(Arc::new(schema)));
    }

    pub fn set_failed(&self, message: impl Into<String>) {
        self.state.send_replace(LoadState::Failed(message.into()));
    }

    fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    /// Load the schema in the background, from `source` or the embedded
    /// default
    pub fn spawn_loading(self: &Arc<Self>, source: Option<PathBuf>) -> JoinHandle<()> {
        let core = Arc::clone(self);
        tokio::spawn(async move {
            let result = match &source {
                Some(path) => Schema::load(path).await,
                None => Schema::core(),
            };
            match result {
                Ok(schema) => {
                    tracing::info!("Core schema loaded ({} blocks)", schema.blocks.len());
                    core.set_loaded(schema);
                }
                Err(e) => {
                    tracing::error!("Core schema failed to load: {}", e);
                    core.set_failed(e.to_string());
                }
            }
        })
    }
}

/// Hands out [`SchemaDecoder`]s for one connection's documents once the
/// core schema has been loaded
pub struct SchemaDecoderFinder {
    store: Arc<dyn DocumentStore>,
    schema: Arc<CoreSchema>,
}

impl SchemaDecoderFinder {
    pub fn new(store: Arc<dyn DocumentStore>, schema: Arc<CoreSchema>) -> Self {
        Self { store, schema }
    }
}

#[async_trait]
impl DecoderFinder for SchemaDecoderFinder {
    async fn is_core_schema_loaded(&self, _dir: &Path) -> Result<bool, LangError> {
        match self.schema.state() {
            LoadState::Loading => Ok(false),
            LoadState::Loaded(_) => Ok(true),
            LoadState::Failed(message) => Err(LangError::Internal(format!(
                "core schema failed to load: {message}"
            ))),
        }
    }

    async fn decoder_for_dir(&self, dir: &Path) -> Result<Arc<dyn Decoder>, DecoderError> {
        let schema = match self.schema.state() {
            LoadState::Loading => return Err(DecoderError::SchemaNotLoaded),
            LoadState::Failed(message) => return Err(DecoderError::SchemaFailed(message)),
            LoadState::Loaded(schema) => schema,
        };

        let files = self.store.documents_in(dir).await;
        if files.is_empty() {
            return Err(DecoderError::NoDocuments(dir.to_path_buf()));
        }
        Ok(Arc::new(SchemaDecoder::new(schema, files)))
    }
}
