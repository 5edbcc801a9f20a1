//! Turning byte offsets into positions a human can find in the source.

use std::fmt::Display;

use crate::scanner::Span;

/// 1-based line and column of the byte `offset` in `source`. Columns count
/// characters, not bytes. Offsets past the end clamp to the end.
pub fn line_and_column(source: &str, offset: usize) -> (usize, usize) {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }

    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// `[line L, column C] Error: message`, positioned at the start of `span`.
pub fn render(source: &str, span: Span, message: impl Display) -> String {
    let (line, column) = line_and_column(source, span.start);
    format!("[line {line}, column {column}] Error: {message}")
}
