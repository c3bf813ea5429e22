// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Decoded trace entries, one per source location.
//!
//! Every entry belongs to exactly one [`FilePosition`]. Repeated events at
//! the same location (a function compiled in several tiers, an IC firing
//! many times) accumulate as updates on the one entry.

use crate::records::{FunctionName, IcOperation, IcState};
use crate::script::Position;
use crate::srcpos::FilePosition;
use crate::tags::v8::{CodeKind, DeoptKind, LogEventTag};
use std::ops;

/// A function observed in code-creation events.
#[derive(Debug)]
pub struct FunctionEntry {
    /// The function's parsed name.
    pub name: FunctionName,
    /// Resolved declaration site; the entry's location-map key.
    pub file_position: FilePosition,
    /// Body extent in position space, when the script source was available.
    pub extent: Option<ops::Range<Position>>,
    /// Code-creation timeline, in trace order.
    pub updates: Vec<FunctionUpdate>,
}

impl FunctionEntry {
    /// Kind of the most recent code object for this function.
    pub fn latest_kind(&self) -> Option<CodeKind> {
        self.updates.last().map(|u| u.kind)
    }

    /// Whether the function ever reached an optimizing tier.
    pub fn was_optimized(&self) -> bool {
        self.updates.iter().any(|u| u.kind.is_optimized())
    }
}

/// One code-creation event for a function.
#[derive(Debug, Clone, Copy)]
pub struct FunctionUpdate {
    /// Trace timestamp in microseconds.
    pub timestamp: u64,
    /// Decoded event tag.
    pub tag: LogEventTag,
    /// Decoded kind of the created code object.
    pub kind: CodeKind,
}

/// An inline-cache site.
#[derive(Debug)]
pub struct IcEntry {
    /// Function containing the site.
    pub name: FunctionName,
    /// Resolved site position; the entry's location-map key.
    pub file_position: FilePosition,
    /// State transitions observed at this site, in trace order.
    pub updates: Vec<IcUpdate>,
}

impl IcEntry {
    /// Worst (most generic) state this site ever reached.
    pub fn worst_state(&self) -> Option<IcState> {
        self.updates.iter().map(|u| u.new_state).max_by_key(|s| *s as u32)
    }
}

/// One inline-cache state transition.
#[derive(Debug, Clone)]
pub struct IcUpdate {
    /// Trace timestamp in microseconds.
    pub timestamp: u64,
    /// Which inline cache fired.
    pub op: IcOperation,
    /// State before the transition.
    pub old_state: IcState,
    /// State after the transition.
    pub new_state: IcState,
    /// Address of the receiver's map.
    pub map: u64,
    /// Property key the cache dispatches on.
    pub key: String,
    /// Reason the slow path was taken, if it was.
    pub slow_reason: Option<String>,
}

/// A deoptimization site.
#[derive(Debug)]
pub struct DeoptEntry {
    /// Function that deoptimized.
    pub name: FunctionName,
    /// Resolved site position; the entry's location-map key.
    pub file_position: FilePosition,
    /// Deoptimizations observed at this site, in trace order.
    pub updates: Vec<DeoptUpdate>,
}

/// One deoptimization event.
#[derive(Debug, Clone)]
pub struct DeoptUpdate {
    /// Trace timestamp in microseconds.
    pub timestamp: u64,
    /// Decoded deopt kind.
    pub kind: DeoptKind,
    /// Engine-reported reason text.
    pub reason: String,
}

/// Discriminates the three entry kinds.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Function,
    Ic,
    Deopt,
}

/// Borrowed any-kind view of an entry, as returned by position queries.
#[derive(Debug, Clone, Copy)]
pub enum EntryRef<'a> {
    /// A function entry.
    Function(&'a FunctionEntry),
    /// An inline-cache entry.
    Ic(&'a IcEntry),
    /// A deoptimization entry.
    Deopt(&'a DeoptEntry),
}

impl<'a> EntryRef<'a> {
    /// The entry's kind.
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryRef::Function(_) => EntryKind::Function,
            EntryRef::Ic(_) => EntryKind::Ic,
            EntryRef::Deopt(_) => EntryKind::Deopt,
        }
    }

    /// The entry's source location.
    pub fn file_position(&self) -> &'a FilePosition {
        match self {
            EntryRef::Function(e) => &e.file_position,
            EntryRef::Ic(e) => &e.file_position,
            EntryRef::Deopt(e) => &e.file_position,
        }
    }

    /// The name of the function the entry belongs to.
    pub fn function_name(&self) -> &'a FunctionName {
        match self {
            EntryRef::Function(e) => &e.name,
            EntryRef::Ic(e) => &e.name,
            EntryRef::Deopt(e) => &e.name,
        }
    }
}
