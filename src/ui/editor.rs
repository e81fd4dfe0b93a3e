//! Cursor arithmetic over a document's text
//!
//! The cursor is a byte offset that always sits on a char boundary. Lines
//! and columns are zero-based; columns count chars.

/// Byte offset of the start of every line.
pub fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
    starts
}

/// Line and column of `offset`.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let starts = line_starts(text);
    let line = starts.partition_point(|&s| s <= offset) - 1;
    let column = text[starts[line]..offset].chars().count();
    (line, column)
}

/// Byte offset of `column` on `line`, clamped to the end of that line.
pub fn offset_at(text: &str, line: usize, column: usize) -> usize {
    let starts = line_starts(text);
    let Some(&start) = starts.get(line) else {
        return text.len();
    };
    let end = text[start..].find('\n').map_or(text.len(), |i| start + i);
    text[start..end]
        .char_indices()
        .nth(column)
        .map_or(end, |(i, _)| start + i)
}

pub fn prev_boundary(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())]
        .char_indices()
        .next_back()
        .map_or(0, |(i, _)| i)
}

pub fn next_boundary(text: &str, offset: usize) -> usize {
    text[offset.min(text.len())..]
        .chars()
        .next()
        .map_or(text.len(), |c| offset + c.len_utf8())
}

pub fn move_vertical(text: &str, offset: usize, down: bool) -> usize {
    let (line, column) = line_col(text, offset);
    let lines = line_starts(text).len();
    match (down, line) {
        (false, 0) => 0,
        (false, line) => offset_at(text, line - 1, column),
        (true, line) if line + 1 >= lines => text.len(),
        (true, line) => offset_at(text, line + 1, column),
    }
}
