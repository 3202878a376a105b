//! Finding the identifier prefix that sits immediately left of the cursor.
//!
//! Positions are 1-based and byte-oriented: column 1 means "before the first
//! byte of the line". The partial identifier serves two purposes: the engine
//! is queried at its start rather than at the cursor, and the client is told
//! how many bytes to overwrite when it inserts a proposal.

/// Identifier run ending at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partial {
    /// The identifier prefix (always ASCII)
    pub text: String,
    /// Byte offset of the first character of the run
    pub start: usize,
}

/// Bytes that can appear in an identifier.
pub fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Byte offset of a 1-based (line, column) position.
///
/// Returns `None` if the buffer runs out of lines first, if either coordinate
/// is below 1, or if the column points past the end of the buffer.
pub fn cursor_offset(buffer: &[u8], line: i32, column: i32) -> Option<usize> {
    if line < 1 || column < 1 {
        return None;
    }

    let mut line_start = 0;
    for _ in 1..line {
        let newline = buffer[line_start..].iter().position(|&b| b == b'\n')?;
        line_start += newline + 1;
    }

    let cursor = line_start + usize::try_from(column - 1).ok()?;
    (cursor <= buffer.len()).then_some(cursor)
}

/// Extract the partial identifier at a 1-based (line, column) cursor.
///
/// Returns `None` when the byte before the cursor is not an identifier
/// character, or when the position does not exist in the buffer.
pub fn extract_partial(buffer: &[u8], line: i32, column: i32) -> Option<Partial> {
    let cursor = cursor_offset(buffer, line, column)?;
    let start = buffer[..cursor].iter().rposition(|&b| !is_ident_byte(b)).map_or(0, |i| i + 1);
    if start == cursor {
        return None;
    }

    let text = std::str::from_utf8(&buffer[start..cursor]).ok()?.to_owned();
    Some(Partial { text, start })
}
