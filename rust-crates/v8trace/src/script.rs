// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Scripts observed in a trace and their source line maps.

use crate::uri::FileUri;
use crate::TextOffset;
use std::fmt;

/// Engine-assigned script identity.
pub type ScriptId = u32;

/// Zero-based (line, column) position within a source file.
///
/// Columns count bytes within the line. Ordering is lexicographic, so
/// positions compare the way a reader scans a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Zero-based line index.
    pub line: u32,
    /// Zero-based byte column within the line.
    pub column: u32,
}

impl Position {
    /// Construct a position from its components.
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Formats one-based, the way engines and editors print positions.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// One script the engine compiled, as registered by a `script` record.
#[derive(Debug)]
pub struct Script {
    id: ScriptId,
    uri: FileUri,
    source: Option<String>,
    line_map: Option<LineMap>,
}

impl Script {
    /// Register a script without source text.
    pub fn new(id: ScriptId, uri: FileUri) -> Self {
        Self {
            id,
            uri,
            source: None,
            line_map: None,
        }
    }

    /// The engine-assigned script id.
    pub fn id(&self) -> ScriptId {
        self.id
    }

    /// The file this script was compiled from.
    pub fn uri(&self) -> &FileUri {
        &self.uri
    }

    /// The script source text, if the trace carried it.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Attach source text, building the line map.
    pub fn set_source(&mut self, source: String) {
        self.line_map = Some(LineMap::new(&source));
        self.source = Some(source);
    }

    /// The line map, available once source text was attached.
    pub fn line_map(&self) -> Option<&LineMap> {
        self.line_map.as_ref()
    }
}

/// Monotonic index of line-start offsets for one script.
///
/// Translates byte offsets into (line, column) positions via binary search.
/// Built once when the script source arrives and never mutated.
#[derive(Debug)]
pub struct LineMap {
    /// Offsets at which each line starts. The first entry is always 0.
    line_starts: Vec<TextOffset>,
    len: TextOffset,
}

impl LineMap {
    /// Scan `text` for line breaks (`\n`, `\r\n` and lone `\r`).
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];

        for (i, &b) in bytes.iter().enumerate() {
            match b {
                b'\n' => line_starts.push(i as TextOffset + 1),
                // A \r followed by \n is one break, counted at the \n.
                b'\r' if bytes.get(i + 1) != Some(&b'\n') => {
                    line_starts.push(i as TextOffset + 1)
                }
                _ => {}
            }
        }

        Self {
            line_starts,
            len: bytes.len() as TextOffset,
        }
    }

    /// Number of lines in the script.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Translate a byte offset into its (line, column) position.
    ///
    /// Offsets past the end of the text clamp to the final position.
    pub fn position_at(&self, offset: TextOffset) -> Position {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        Position::new(line as u32, offset - self.line_starts[line])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_breaks() {
        let map = LineMap::new("ab\ncd\r\nef\rgh");
        assert_eq!(map.line_count(), 4);
        assert_eq!(map.position_at(0), Position::new(0, 0));
        assert_eq!(map.position_at(2), Position::new(0, 2));
        assert_eq!(map.position_at(3), Position::new(1, 0));
        assert_eq!(map.position_at(5), Position::new(1, 2));
        assert_eq!(map.position_at(7), Position::new(2, 0));
        assert_eq!(map.position_at(10), Position::new(3, 0));
        assert_eq!(map.position_at(11), Position::new(3, 1));
    }

    #[test]
    fn clamps_past_end() {
        let map = LineMap::new("ab\ncd");
        assert_eq!(map.position_at(5), Position::new(1, 2));
        assert_eq!(map.position_at(5000), Position::new(1, 2));
    }

    #[test]
    fn empty_text() {
        let map = LineMap::new("");
        assert_eq!(map.line_count(), 1);
        assert_eq!(map.position_at(0), Position::new(0, 0));
        assert_eq!(map.position_at(7), Position::new(0, 0));
    }

    #[test]
    fn position_ordering() {
        assert!(Position::new(1, 9) < Position::new(2, 0));
        assert!(Position::new(2, 3) < Position::new(2, 4));
        assert_eq!(Position::new(4, 2).to_string(), "5:3");
    }

    #[test]
    fn script_source() {
        let mut script = Script::new(7, FileUri::new("/src/app.js"));
        assert!(script.line_map().is_none());

        script.set_source("a\nb".to_owned());
        assert_eq!(script.source(), Some("a\nb"));
        assert_eq!(script.line_map().unwrap().position_at(2), Position::new(1, 0));
    }
}
