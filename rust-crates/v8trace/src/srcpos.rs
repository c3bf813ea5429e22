// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Resolution of raw engine source positions into displayable ones.

use crate::script::{Position, Script};
use crate::uri::FileUri;
use std::fmt;

/// Raw script offset meaning "no source position".
pub const NO_SCRIPT_OFFSET: i64 = -1;

/// A (file, position) pair: the source-location key of the whole model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilePosition {
    /// Canonical identity of the file.
    pub uri: FileUri,
    /// Position within the file.
    pub position: Position,
}

impl FilePosition {
    /// Construct a file position.
    pub fn new(uri: FileUri, position: Position) -> Self {
        Self { uri, position }
    }
}

impl fmt::Display for FilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uri, self.position)
    }
}

/// Resolve a raw source position into the best displayable position.
///
/// `script_offset` is the engine-internal byte offset into the script's
/// source ([`NO_SCRIPT_OFFSET`] when the code object has none, e.g. for
/// builtins), `declared` the file location parsed from the owning
/// function's name.
///
/// Policy, in order:
/// 1. A script with source text is available, the offset is real and the
///    function declares a file location: translate the offset through the
///    script's line map.
/// 2. The function declares a file location: use its position verbatim,
///    the declaration site being the best remaining approximation.
/// 3. Nothing resolvable; the caller shows the entry without a position.
pub fn resolve_position(
    script: Option<&Script>,
    script_offset: i64,
    declared: Option<&FilePosition>,
) -> Option<Position> {
    if let (Some(script), Some(_)) = (script, declared) {
        if script_offset >= 0 {
            if let Some(line_map) = script.line_map() {
                return Some(line_map.position_at(script_offset as u32));
            }
        }
    }

    declared.map(|d| d.position)
}
