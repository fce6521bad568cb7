//! Source locations and the debug-span bookkeeping the lexer threads through
//! every token (§3 "Source Location", §4.2 "Location tracking").

use std::rc::Rc;

/// Index of a source file (or synthesized string) in the compilation's file
/// table.
pub type FileIndex = u32;

/// A single point in the source, plus an optional overlay pointing back at a
/// preprocessed origin when the token's text was spliced in from elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: FileIndex,
    pub byte_offset: u32,
    pub line: u32,
    pub column: u32,
    pub original: Option<OriginalLocation>,
}

/// The "original source" overlay: (file, line, column) of the un-preprocessed
/// origin of a spliced token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalLocation {
    pub file: FileIndex,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn synthetic() -> Self {
        SourceLocation {
            file: 0,
            byte_offset: 0,
            line: 0,
            column: 0,
            original: None,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file {}, line {}", self.file, self.line)
    }
}

/// One entry in a file table: the display name and whether it (or the block
/// that included it) was marked `System_file`.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub system_file: bool,
}

/// The compilation-wide table of included files, indexed by [`FileIndex`].
#[derive(Debug, Default)]
pub struct FileTable {
    files: Vec<FileEntry>,
}

impl FileTable {
    pub fn new() -> Self {
        FileTable { files: Vec::new() }
    }

    pub fn add(&mut self, name: impl Into<String>, system_file: bool) -> FileIndex {
        self.files.push(FileEntry {
            name: name.into(),
            system_file,
        });
        (self.files.len() - 1) as FileIndex
    }

    pub fn get(&self, index: FileIndex) -> &FileEntry {
        &self.files[index as usize]
    }

    pub fn is_system_file(&self, index: FileIndex) -> bool {
        self.files[index as usize].system_file
    }
}

/// One contiguous run of source attributed to a single file, used by
/// debug-information consumers (§4.2, §6 "debugging-information file").
///
/// The source's C implementation extends this list "whenever the current
/// file changes" and keeps each segment alive via a reference count so a
/// parser's bracketed span (see [`SpanCursor`]) can pin a segment across
/// interleaved tokens. Rust's `Rc` gives us that refcount directly.
#[derive(Debug, Clone)]
pub struct DebugSegment {
    pub file: FileIndex,
    pub start_line: u32,
}

#[derive(Debug, Default)]
pub struct DebugSegments {
    segments: Vec<Rc<DebugSegment>>,
}

impl DebugSegments {
    pub fn new() -> Self {
        DebugSegments {
            segments: Vec::new(),
        }
    }

    /// Extend the list because the current file changed.
    pub fn push(&mut self, file: FileIndex, start_line: u32) -> Rc<DebugSegment> {
        let segment = Rc::new(DebugSegment { file, start_line });
        self.segments.push(Rc::clone(&segment));
        segment
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// A cursor opened by [`DebugSegments::begin`]-equivalent call sites; pins the
/// current segment alive until [`SpanCursor::end`] is called, mirroring the
/// source's ref-counted `begin()`/`end()` pair.
#[derive(Debug, Clone)]
pub struct SpanCursor {
    start: SourceLocation,
    pinned_segment: Option<Rc<DebugSegment>>,
}

impl SpanCursor {
    pub fn new(start: SourceLocation, pinned_segment: Option<Rc<DebugSegment>>) -> Self {
        SpanCursor {
            start,
            pinned_segment,
        }
    }

    /// Close the span, producing a `(start, end)` location range. Zero-byte
    /// spans that straddle an inclusion boundary are folded forward to the
    /// first byte of the included file, per §4.2.
    pub fn end(self, mut end: SourceLocation) -> LocationRange {
        if end.file != self.start.file && end.byte_offset == 0 {
            end.byte_offset = self.start.byte_offset;
        }
        LocationRange {
            start: self.start,
            end,
        }
    }
}

/// A closed span produced by [`SpanCursor::end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRange {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_cursor_folds_zero_byte_cross_file_spans_forward() {
        let start = SourceLocation {
            file: 0,
            byte_offset: 40,
            line: 3,
            column: 1,
            original: None,
        };
        let cursor = SpanCursor::new(start, None);
        let end = SourceLocation {
            file: 1,
            byte_offset: 0,
            line: 1,
            column: 1,
            original: None,
        };
        let range = cursor.end(end);
        assert_eq!(range.end.byte_offset, 40);
    }
}
