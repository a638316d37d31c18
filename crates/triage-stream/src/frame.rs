use crate::utf8::Utf8Decoder;

/// Prefix that marks a protocol payload line. The space is part of it.
pub const DATA_PREFIX: &str = "data: ";

/// Classification of one terminated SSE line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// `:`-prefixed keep-alive or comment.
    Comment,
    /// Empty or whitespace-only frame separator.
    Blank,
    /// Anything without the `data: ` prefix (`event:`, `id:`, stray text).
    Other,
    /// Trimmed payload following `data: `.
    Data(&'a str),
}

/// Classify a single line (terminator and trailing `\r` already removed).
pub fn classify_line(line: &str) -> Line<'_> {
    if line.starts_with(':') {
        return Line::Comment;
    }
    if line.trim().is_empty() {
        return Line::Blank;
    }
    match line.strip_prefix(DATA_PREFIX) {
        Some(payload) => Line::Data(payload.trim()),
        None => Line::Other,
    }
}

/// Text after `data: ` with only leading whitespace removed, or the whole
/// line when the prefix is absent. Held partials keep their trailing
/// whitespace, which may belong inside a JSON string.
pub fn data_field(line: &str) -> &str {
    line.strip_prefix(DATA_PREFIX)
        .map(str::trim_start)
        .unwrap_or(line)
}

/// Splits an incoming byte stream into terminated lines.
///
/// After every line has been drained, the buffer holds only an unterminated
/// fragment (possibly empty). Unterminated text is never yielded.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    utf8: Utf8Decoder,
    buffer: String,
    /// Offset of the first undrained byte in `buffer`.
    cursor: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
        let text = self.utf8.decode(chunk);
        self.buffer.push_str(&text);
    }

    /// Next `\n`-terminated line with its terminator and one trailing `\r`
    /// stripped, or `None` when only an unterminated fragment remains.
    pub fn next_line(&mut self) -> Option<String> {
        let rest = &self.buffer[self.cursor..];
        let end = rest.find('\n')?;
        let line = rest[..end].strip_suffix('\r').unwrap_or(&rest[..end]);
        let line = line.to_string();
        self.cursor += end + 1;
        Some(line)
    }

    /// The unterminated fragment currently buffered.
    pub fn remainder(&self) -> &str {
        &self.buffer[self.cursor..]
    }

    /// Discard the unterminated fragment (and any carried partial code
    /// point), returning the number of non-blank bytes dropped.
    pub fn discard_remainder(&mut self) -> usize {
        let dropped = if self.remainder().trim().is_empty() {
            0
        } else {
            self.remainder().len()
        };
        self.buffer.clear();
        self.cursor = 0;
        dropped + self.utf8.reset()
    }
}
