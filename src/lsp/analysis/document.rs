//! Per-document state and position helpers

use tower_lsp::lsp_types::{Position, Url};

use super::language::LanguageKind;

/// State for a single open document
#[derive(Debug, Clone)]
pub struct DocumentState {
    /// Document URI
    pub uri: Url,
    /// Document version (incremented on each change)
    pub version: i32,
    /// Full source text
    pub source: String,
    /// Language the document is written in
    pub language: LanguageKind,
}

impl DocumentState {
    pub fn new(uri: Url, version: i32, source: String, language: LanguageKind) -> Self {
        Self {
            uri,
            version,
            source,
            language,
        }
    }

    /// Update the document with new content
    pub fn update(&mut self, version: i32, source: String) {
        self.version = version;
        self.source = source;
    }

    /// Everything from the start of the buffer up to the cursor.
    pub fn text_before(&self, pos: Position) -> &str {
        let offset = lsp_position_to_byte_offset(&self.source, pos);
        &self.source[..offset]
    }
}

/// Convert LSP position (line, character as UTF-16 code units) to byte offset.
///
/// Positions past the last line clamp to the end of the source; positions past
/// the end of a line clamp to the end of that line.
pub fn lsp_position_to_byte_offset(source: &str, pos: Position) -> usize {
    let mut offset = 0;
    for (line_num, line) in source.split_inclusive('\n').enumerate() {
        if line_num == pos.line as usize {
            // LSP uses UTF-16 code units for character position
            return offset + utf16_offset_to_byte_offset(trim_line_ending(line), pos.character as usize);
        }
        offset += line.len();
    }
    source.len()
}

/// Text of one line without its line terminator. Missing lines are empty.
pub fn line_text(source: &str, line: u32) -> &str {
    source
        .split_inclusive('\n')
        .nth(line as usize)
        .map(trim_line_ending)
        .unwrap_or("")
}

/// Split the cursor's line into the text before and after the cursor.
pub fn split_line_at(source: &str, pos: Position) -> (&str, &str) {
    let line = line_text(source, pos.line);
    let byte = utf16_offset_to_byte_offset(line, pos.character as usize);
    line.split_at(byte)
}

/// Convert UTF-16 offset to byte offset within a line
pub fn utf16_offset_to_byte_offset(line: &str, utf16_offset: usize) -> usize {
    let mut utf16_count = 0;
    for (byte_idx, ch) in line.char_indices() {
        if utf16_count >= utf16_offset {
            return byte_idx;
        }
        utf16_count += ch.len_utf16();
    }
    line.len()
}

/// Convert byte offset to UTF-16 offset within a line
pub fn byte_offset_to_utf16_offset(line: &str, byte_offset: usize) -> usize {
    line[..byte_offset.min(line.len())]
        .chars()
        .map(|c| c.len_utf16())
        .sum()
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
