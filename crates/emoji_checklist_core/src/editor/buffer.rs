//! Editor buffer contract and in-memory implementation.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Position inside an editor buffer. `ch` is a byte offset into the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EditorPosition {
    pub line: usize,
    pub ch: usize,
}

impl EditorPosition {
    pub fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

/// Host editor surface used for reconciliation.
///
/// Implementations must apply `replace_range` as one undoable edit.
pub trait EditorBuffer {
    /// Number of lines currently in the buffer.
    fn line_count(&self) -> usize;
    /// Current text of one line, without its line terminator.
    fn get_line(&self, index: usize) -> Option<String>;
    /// Replaces the text between `from` and `to` with `text`.
    fn replace_range(
        &mut self,
        from: EditorPosition,
        to: EditorPosition,
        text: &str,
    ) -> Result<(), BufferError>;
}

/// Buffer edit errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    LineOutOfRange { line: usize, line_count: usize },
    ColumnOutOfRange { line: usize, ch: usize },
    MultiLineRange,
    ReadOnly,
}

impl Display for BufferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LineOutOfRange { line, line_count } => {
                write!(f, "line {line} is out of range (buffer has {line_count} lines)")
            }
            Self::ColumnOutOfRange { line, ch } => {
                write!(f, "column {ch} is not a valid offset on line {line}")
            }
            Self::MultiLineRange => write!(f, "multi-line ranges are not supported"),
            Self::ReadOnly => write!(f, "buffer is read-only"),
        }
    }
}

impl Error for BufferError {}

/// One applied edit, recorded for undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEdit {
    pub line: usize,
    pub before: String,
    pub after: String,
}

/// Line-oriented in-memory buffer with a linear undo history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    lines: Vec<String>,
    history: Vec<BufferEdit>,
    read_only: bool,
}

impl LineBuffer {
    /// Splits `text` on `\n`; `to_text()` restores it exactly.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            history: Vec::new(),
            read_only: false,
        }
    }

    /// Returns a copy that rejects every edit.
    pub fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Applied edits, oldest first.
    pub fn history(&self) -> &[BufferEdit] {
        &self.history
    }

    /// Inserts a line, shifting later lines down. Not recorded in history.
    pub fn insert_line(&mut self, index: usize, text: impl Into<String>) {
        let index = index.min(self.lines.len());
        self.lines.insert(index, text.into());
    }

    /// Reverts the most recent edit. Returns `false` when history is empty.
    pub fn undo(&mut self) -> bool {
        let Some(edit) = self.history.pop() else {
            return false;
        };
        if let Some(line) = self.lines.get_mut(edit.line) {
            *line = edit.before;
        }
        true
    }
}

impl EditorBuffer for LineBuffer {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn get_line(&self, index: usize) -> Option<String> {
        self.lines.get(index).cloned()
    }

    fn replace_range(
        &mut self,
        from: EditorPosition,
        to: EditorPosition,
        text: &str,
    ) -> Result<(), BufferError> {
        if self.read_only {
            return Err(BufferError::ReadOnly);
        }
        if from.line != to.line {
            return Err(BufferError::MultiLineRange);
        }
        let line_count = self.lines.len();
        let Some(current) = self.lines.get_mut(from.line) else {
            return Err(BufferError::LineOutOfRange {
                line: from.line,
                line_count,
            });
        };
        for ch in [from.ch, to.ch] {
            if ch > current.len() || !current.is_char_boundary(ch) {
                return Err(BufferError::ColumnOutOfRange { line: from.line, ch });
            }
        }
        if from.ch > to.ch {
            return Err(BufferError::ColumnOutOfRange {
                line: from.line,
                ch: from.ch,
            });
        }

        let before = current.clone();
        current.replace_range(from.ch..to.ch, text);
        let after = current.clone();
        self.history.push(BufferEdit {
            line: from.line,
            before,
            after,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BufferError, EditorBuffer, EditorPosition, LineBuffer};

    #[test]
    fn text_round_trips_through_lines() {
        let source = "# title\n- [ ] one\n\n- [x] two\n";
        let buffer = LineBuffer::from_text(source);
        assert_eq!(buffer.line_count(), 5);
        assert_eq!(buffer.to_text(), source);
    }

    #[test]
    fn replace_range_records_one_undoable_edit() {
        let mut buffer = LineBuffer::from_text("[ ] task");
        buffer
            .replace_range(EditorPosition::new(0, 0), EditorPosition::new(0, 0), "⭕ ")
            .expect("insert at line start");
        assert_eq!(buffer.get_line(0).as_deref(), Some("⭕ [ ] task"));
        assert_eq!(buffer.history().len(), 1);

        assert!(buffer.undo());
        assert_eq!(buffer.to_text(), "[ ] task");
        assert!(!buffer.undo());
    }

    #[test]
    fn replace_range_rejects_invalid_positions() {
        let mut buffer = LineBuffer::from_text("⭕ x");
        let err = buffer
            .replace_range(EditorPosition::new(3, 0), EditorPosition::new(3, 0), "")
            .expect_err("line out of range");
        assert!(matches!(err, BufferError::LineOutOfRange { line: 3, .. }));

        let err = buffer
            .replace_range(EditorPosition::new(0, 1), EditorPosition::new(0, 2), "")
            .expect_err("offset inside a multi-byte char");
        assert!(matches!(err, BufferError::ColumnOutOfRange { .. }));

        let err = buffer
            .replace_range(EditorPosition::new(0, 0), EditorPosition::new(1, 0), "")
            .expect_err("multi-line range");
        assert_eq!(err, BufferError::MultiLineRange);
    }

    #[test]
    fn read_only_buffer_rejects_edits() {
        let mut buffer = LineBuffer::from_text("[ ] task").into_read_only();
        let err = buffer
            .replace_range(EditorPosition::new(0, 0), EditorPosition::new(0, 0), "x")
            .expect_err("read-only");
        assert_eq!(err, BufferError::ReadOnly);
    }
}
