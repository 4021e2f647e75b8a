//! Conversion between engine-native and protocol types
//!
//! Engine positions are 1-based with a byte offset; protocol positions are
//! 0-based with the character counted in UTF-16 code units.

use crate::error::LangError;
use crate::infra::mdplain;
use crate::models::lang::{
    Candidate, CandidateKind, Candidates, HclRange, MarkupKind, Pos, Symbol, SymbolKind,
};
use crate::models::lsp::{
    self, ClientCapabilities, CompletionItem, CompletionItemKind, CompletionList,
    InsertTextFormat, LspLocation, LspSymbolKind, Position, Range, SymbolInformation,
};
use crate::services::documents::Document;

// ============================================================================
// Completion
// ============================================================================

pub fn completion_list(candidates: Option<Candidates>, caps: &ClientCapabilities) -> CompletionList {
    let Some(candidates) = candidates else {
        return CompletionList::default();
    };

    let snippet_support = caps.snippet_support();
    CompletionList {
        is_incomplete: !candidates.is_complete,
        items: candidates
            .list
            .iter()
            .map(|c| completion_item(c, snippet_support))
            .collect(),
    }
}

pub fn completion_item(candidate: &Candidate, snippet_support: bool) -> CompletionItem {
    let (text_edit, insert_text_format) = text_edit(&candidate.text_edit, snippet_support);

    let documentation = match candidate.description.kind {
        MarkupKind::Markdown => mdplain::clean(&candidate.description.value),
        MarkupKind::PlainText => candidate.description.value.clone(),
    };

    CompletionItem {
        label: candidate.label.clone(),
        kind: completion_item_kind(candidate.kind),
        detail: non_empty(candidate.detail.clone()),
        documentation: non_empty(documentation),
        insert_text_format,
        text_edit: Some(text_edit),
    }
}

/// `None` leaves the kind to the client's default
pub fn completion_item_kind(kind: CandidateKind) -> Option<CompletionItemKind> {
    match kind {
        CandidateKind::Attribute => Some(CompletionItemKind::Field),
        CandidateKind::Block => Some(CompletionItemKind::Class),
        CandidateKind::Label => Some(CompletionItemKind::Constant),
        CandidateKind::Unknown => None,
    }
}

/// Pick the snippet or the literal payload depending on client support
pub fn text_edit(
    edit: &crate::models::lang::TextEdit,
    snippet_support: bool,
) -> (lsp::TextEdit, InsertTextFormat) {
    let range = lsp_range(&edit.range);
    if snippet_support {
        (
            lsp::TextEdit {
                range,
                new_text: edit.snippet.clone(),
            },
            InsertTextFormat::Snippet,
        )
    } else {
        (
            lsp::TextEdit {
                range,
                new_text: edit.new_text.clone(),
            },
            InsertTextFormat::PlainText,
        )
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

// ============================================================================
// Symbols
// ============================================================================

pub fn symbol_kind(kind: SymbolKind) -> LspSymbolKind {
    match kind {
        SymbolKind::Block => LspSymbolKind::Class,
        SymbolKind::Attribute => LspSymbolKind::Field,
        SymbolKind::Unknown => LspSymbolKind::Null,
    }
}

/// The location always points at `uri`, the document the request named
pub fn symbol_information(symbol: &Symbol, uri: &str) -> SymbolInformation {
    SymbolInformation {
        name: symbol.name.clone(),
        kind: symbol_kind(symbol.kind),
        location: LspLocation {
            uri: uri.to_string(),
            range: lsp_range(&symbol.range),
        },
    }
}

// ============================================================================
// Positions
// ============================================================================

pub fn lsp_position(pos: Pos) -> Position {
    Position::new(pos.line.saturating_sub(1), pos.column.saturating_sub(1))
}

pub fn lsp_range(range: &HclRange) -> Range {
    Range::new(lsp_position(range.start), lsp_position(range.end))
}

/// Engine position of a protocol position inside `doc`
///
/// Fails when the line does not exist or the character lies past the end of
/// the line or inside a surrogate pair.
pub fn file_position(doc: &Document, position: Position) -> Result<Pos, LangError> {
    let invalid = |reason: &str| {
        LangError::invalid_position(position.line, position.character, reason.to_string())
    };

    let mut line_start = 0;
    let mut lines = doc.text.split('\n');
    for _ in 0..position.line {
        let line = lines.next().ok_or_else(|| invalid("line is past end of document"))?;
        line_start += line.len() + 1;
    }
    let line = lines
        .next()
        .ok_or_else(|| invalid("line is past end of document"))?;
    let line = line.strip_suffix('\r').unwrap_or(line);

    let mut units = 0u32;
    let mut byte = 0usize;
    for ch in line.chars() {
        if units >= position.character {
            break;
        }
        units += ch.len_utf16() as u32;
        byte += ch.len_utf8();
    }

    if units < position.character {
        return Err(invalid("character is past end of line"));
    }
    if units > position.character {
        return Err(invalid("character is inside a surrogate pair"));
    }

    Ok(Pos::new(
        position.line + 1,
        position.character + 1,
        line_start + byte,
    ))
}
