// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Typed event records handed in by the wire-level tokenizer.
//!
//! The tokenizer splits the trace text into records and pre-parses the
//! payload fields that are stable across schema versions (names, offsets,
//! addresses). Versioned integer tag codes are carried raw and decoded by
//! [`crate::tags`] during ingestion.

use crate::script::ScriptId;
use crate::srcpos::FilePosition;
use crate::TextOffset;
use std::ops;

/// One record of the tokenized trace.
#[derive(Debug, Clone, PartialEq)]
pub enum EventRecord {
    /// Registration of a compiled script.
    Script {
        /// Engine-assigned script id.
        id: ScriptId,
        /// File the script was compiled from, as spelled in the trace.
        uri: String,
    },

    /// Source text of a previously registered script.
    ScriptSource {
        /// Engine-assigned script id.
        id: ScriptId,
        /// The script source text.
        source: String,
    },

    /// Creation of a code object (compilation, optimization, …).
    CodeCreation(CodeCreation),

    /// An inline-cache state transition.
    IcTransition(IcTransition),

    /// A deoptimization event.
    Deopt(Deopt),

    /// Creation of an object shape.
    MapCreate {
        /// Address of the map.
        address: u64,
        /// Trace timestamp in microseconds.
        timestamp: u64,
    },

    /// A transition between object shapes.
    MapTransition(MapTransition),

    /// A sampling-profiler tick.
    Tick(Tick),

    /// A heap usage sample.
    HeapSample {
        /// Trace timestamp in microseconds.
        timestamp: u64,
        /// Bytes in use.
        used: u64,
        /// Bytes committed.
        capacity: u64,
    },
}

/// Payload of a `code-creation` record.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeCreation {
    /// Trace timestamp in microseconds.
    pub timestamp: u64,
    /// Raw [`crate::tags::v8::LogEventTag`] code.
    pub tag: i32,
    /// Raw [`crate::tags::v8::CodeKind`] code.
    pub kind: i32,
    /// Parsed function name.
    pub name: FunctionName,
    /// Script the code belongs to, when it has one.
    pub script: Option<ScriptId>,
    /// Byte offset of the function within its script, or
    /// [`crate::srcpos::NO_SCRIPT_OFFSET`].
    pub script_offset: i64,
    /// Byte range of the function body within its script, when known.
    pub extent: Option<ops::Range<TextOffset>>,
}

impl From<CodeCreation> for EventRecord {
    fn from(x: CodeCreation) -> Self {
        Self::CodeCreation(x)
    }
}

/// Payload of an inline-cache event record.
#[derive(Debug, Clone, PartialEq)]
pub struct IcTransition {
    /// Trace timestamp in microseconds.
    pub timestamp: u64,
    /// Which inline cache fired.
    pub op: IcOperation,
    /// Function containing the cache site.
    pub name: FunctionName,
    /// Script containing the cache site.
    pub script: Option<ScriptId>,
    /// Byte offset of the cache site within its script.
    pub script_offset: i64,
    /// State code before the transition.
    pub old_state: char,
    /// State code after the transition.
    pub new_state: char,
    /// Address of the receiver's map.
    pub map: u64,
    /// Property key the cache dispatches on.
    pub key: String,
    /// Reason the slow path was taken, if it was.
    pub slow_reason: Option<String>,
}

impl From<IcTransition> for EventRecord {
    fn from(x: IcTransition) -> Self {
        Self::IcTransition(x)
    }
}

/// Payload of a `code-deopt` record.
#[derive(Debug, Clone, PartialEq)]
pub struct Deopt {
    /// Trace timestamp in microseconds.
    pub timestamp: u64,
    /// Raw [`crate::tags::v8::DeoptKind`] code.
    pub kind: i32,
    /// Function that deoptimized.
    pub name: FunctionName,
    /// Script containing the deopt site.
    pub script: Option<ScriptId>,
    /// Byte offset of the deopt site within its script.
    pub script_offset: i64,
    /// Engine-reported reason text.
    pub reason: String,
}

impl From<Deopt> for EventRecord {
    fn from(x: Deopt) -> Self {
        Self::Deopt(x)
    }
}

/// Payload of a `map` transition record.
#[derive(Debug, Clone, PartialEq)]
pub struct MapTransition {
    /// Trace timestamp in microseconds.
    pub timestamp: u64,
    /// Address of the source map.
    pub from: u64,
    /// Address of the target map.
    pub to: u64,
    /// Transition kind as spelled in the trace (`Transition`, `Normalize`, …).
    pub kind: String,
    /// Property name the transition introduces, if any.
    pub name: String,
    /// Engine-reported reason text.
    pub reason: String,
}

impl From<MapTransition> for EventRecord {
    fn from(x: MapTransition) -> Self {
        Self::MapTransition(x)
    }
}

/// Payload of a profiler `tick` record.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Trace timestamp in microseconds.
    pub timestamp: u64,
    /// Raw [`crate::tags::v8::VmState`] code.
    pub vm_state: i32,
    /// Sampled return-address stack, innermost first.
    pub stack: Vec<u64>,
}

impl From<Tick> for EventRecord {
    fn from(x: Tick) -> Self {
        Self::Tick(x)
    }
}

/// A function name as spelled in code-creation records.
///
/// The tokenizer splits names like `~foo /src/app.js:12:34` into the
/// display name and the declared file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionName {
    /// Display name; may be empty for anonymous functions.
    pub name: String,
    /// Declared location, absent for builtins and native code.
    pub file_position: Option<FilePosition>,
}

impl FunctionName {
    /// A name without a declared location.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_position: None,
        }
    }

    /// A name carrying its declared location.
    pub fn at(name: impl Into<String>, file_position: FilePosition) -> Self {
        Self {
            name: name.into(),
            file_position: Some(file_position),
        }
    }
}

/// Which inline cache an IC event refers to.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IcOperation {
    LoadIc,
    LoadGlobalIc,
    KeyedLoadIc,
    StoreIc,
    StoreGlobalIc,
    KeyedStoreIc,
    StoreInArrayLiteralIc,
}

/// State of an inline cache, decoded from the one-character codes in IC
/// event records. Stable across schema versions.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IcState {
    NoFeedback,
    Uninitialized,
    Premonomorphic,
    Monomorphic,
    RecomputeHandler,
    Polymorphic,
    Megamorphic,
    Generic,
}

impl IcState {
    /// Decode a state character; `None` for unknown codes.
    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'X' => IcState::NoFeedback,
            '0' => IcState::Uninitialized,
            '.' => IcState::Premonomorphic,
            '1' => IcState::Monomorphic,
            '^' => IcState::RecomputeHandler,
            'P' => IcState::Polymorphic,
            'N' => IcState::Megamorphic,
            'G' => IcState::Generic,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ic_state_codes() {
        assert_eq!(IcState::from_code('0'), Some(IcState::Uninitialized));
        assert_eq!(IcState::from_code('1'), Some(IcState::Monomorphic));
        assert_eq!(IcState::from_code('P'), Some(IcState::Polymorphic));
        assert_eq!(IcState::from_code('N'), Some(IcState::Megamorphic));
        assert_eq!(IcState::from_code('?'), None);
    }
}
