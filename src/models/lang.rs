//! Engine-native analysis types
//!
//! Candidates, symbols and positions as the decoder produces them.
//! Positions here are 1-based (line, column) with a 0-based byte offset;
//! protocol conversion lives in `services::converters`.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Positions
// ============================================================================

/// Position inside a file (1-indexed line and column, 0-indexed byte)
///
/// `column` counts UTF-16 code units so it converts to a protocol
/// character offset without looking at the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
    pub byte: usize,
}

impl Pos {
    pub fn new(line: u32, column: u32, byte: usize) -> Self {
        Self { line, column, byte }
    }
}

impl Default for Pos {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            byte: 0,
        }
    }
}

/// Source range within a named file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HclRange {
    pub filename: String,
    pub start: Pos,
    pub end: Pos,
}

impl HclRange {
    pub fn new(filename: impl Into<String>, start: Pos, end: Pos) -> Self {
        Self {
            filename: filename.into(),
            start,
            end,
        }
    }
}

// ============================================================================
// Completion Candidates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CandidateKind {
    #[default]
    Unknown,
    Attribute,
    Block,
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkupKind {
    #[default]
    PlainText,
    Markdown,
}

/// Human-readable description attached to a candidate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarkupContent {
    pub kind: MarkupKind,
    pub value: String,
}

impl MarkupContent {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            kind: MarkupKind::PlainText,
            value: value.into(),
        }
    }

    pub fn markdown(value: impl Into<String>) -> Self {
        Self {
            kind: MarkupKind::Markdown,
            value: value.into(),
        }
    }
}

/// Replacement proposed by a candidate, in literal and snippet form
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: HclRange,
    pub new_text: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    pub kind: CandidateKind,
    pub detail: String,
    pub description: MarkupContent,
    pub text_edit: TextEdit,
}

/// Ordered batch of candidates for one cursor position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidates {
    pub list: Vec<Candidate>,
    pub is_complete: bool,
}

impl Candidates {
    pub fn complete(list: Vec<Candidate>) -> Self {
        Self {
            list,
            is_complete: true,
        }
    }

    pub fn incomplete(list: Vec<Candidate>) -> Self {
        Self {
            list,
            is_complete: false,
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl Default for Candidates {
    fn default() -> Self {
        Self::complete(Vec::new())
    }
}

// ============================================================================
// Symbols
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SymbolKind {
    #[default]
    Unknown,
    Block,
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub range: HclRange,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, range: HclRange) -> Self {
        Self {
            name: name.into(),
            kind,
            range,
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(default)]
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<HclRange>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: String::new(),
            subject: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_subject(mut self, subject: HclRange) -> Self {
        self.subject = Some(subject);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(subject) = &self.subject {
            write!(
                f,
                "{}:{},{}: ",
                subject.filename, subject.start.line, subject.start.column
            )?;
        }
        write!(f, "{}", self.summary)?;
        if !self.detail.is_empty() {
            write!(f, "; {}", self.detail)?;
        }
        Ok(())
    }
}

/// Analysis diagnostics reported alongside decoder output
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join(", "))
    }
}

impl std::error::Error for Diagnostics {}
