// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-file entry bundles and their lazily built range indices.

use crate::entry::{DeoptEntry, FunctionEntry, IcEntry};
use crate::finder::RangeFinder;
use crate::script::Position;
use std::ops;

/// Everything recorded for one file, populated during ingestion and
/// immutable afterwards.
#[derive(Debug, Default)]
pub struct FileEntry {
    /// Functions declared in the file.
    pub functions: Vec<FunctionEntry>,
    /// Inline-cache sites in the file.
    pub ics: Vec<IcEntry>,
    /// Deoptimization sites in the file.
    pub deopts: Vec<DeoptEntry>,
}

impl FileEntry {
    /// Whether nothing at all was recorded for the file.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.ics.is_empty() && self.deopts.is_empty()
    }
}

/// The three range finders for one file, built from its [`FileEntry`] on
/// first position query and cached by the owning log file.
///
/// Finder hits index into the corresponding `FileEntry` vector. Functions
/// are indexed by body extent when one is known; IC and deopt sites are
/// point events and indexed as one-column ranges so that a query exactly at
/// the site still hits them.
#[derive(Debug)]
pub struct FileIndex {
    functions: RangeFinder<Position>,
    ics: RangeFinder<Position>,
    deopts: RangeFinder<Position>,
}

impl FileIndex {
    /// Build the index for one file.
    pub fn new(entry: &FileEntry) -> Self {
        Self {
            functions: RangeFinder::new(entry.functions.iter().map(|f| {
                match f.extent.clone() {
                    Some(extent) => widen(extent),
                    None => point(f.file_position.position),
                }
            })),
            ics: RangeFinder::new(entry.ics.iter().map(|e| point(e.file_position.position))),
            deopts: RangeFinder::new(entry.deopts.iter().map(|e| point(e.file_position.position))),
        }
    }

    /// Finder over function body extents.
    pub fn functions(&self) -> &RangeFinder<Position> {
        &self.functions
    }

    /// Finder over inline-cache sites.
    pub fn ics(&self) -> &RangeFinder<Position> {
        &self.ics
    }

    /// Finder over deoptimization sites.
    pub fn deopts(&self) -> &RangeFinder<Position> {
        &self.deopts
    }
}

/// One-column range representing a point event.
fn point(at: Position) -> ops::Range<Position> {
    at..Position::new(at.line, at.column + 1)
}

/// Ensures a range is findable: zero-width extents collapse to their start
/// point.
fn widen(extent: ops::Range<Position>) -> ops::Range<Position> {
    if extent.end <= extent.start {
        point(extent.start)
    } else {
        extent
    }
}
