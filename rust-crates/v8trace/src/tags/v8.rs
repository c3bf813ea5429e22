// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Built-in tag tables for the V8 trace format.
//!
//! Code values mirror the `LOG_EVENTS_LIST`/`TAGS_LIST`, `CodeKind`,
//! `DeoptimizeKind` and `StateTag` enums of the respective V8 revisions.
//! Layouts are keyed by the version that changed them; the wildcard layout
//! covers everything older.

use super::{Tag, TagTable};
use crate::version::{EngineVersion, VersionRule};
use std::sync::OnceLock;

const fn v(major: u16, minor: u16) -> EngineVersion {
    EngineVersion::new(major, minor, 0)
}

/// Code-creation event and tag codes embedded in `code-creation` records.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogEventTag {
    CodeCreation,
    CodeDisableOpt,
    CodeMove,
    CodeDelete,
    CodeMovingGc,
    SharedFuncMove,
    SnapshotCodeName,
    Tick,
    Builtin,
    Callback,
    Eval,
    Function,
    Handler,
    BytecodeHandler,
    LazyCompile,
    RegExp,
    Script,
    Stub,
    NativeFunction,
    NativeLazyCompile,
    NativeScript,
}

impl Tag for LogEventTag {
    fn name(self) -> &'static str {
        match self {
            LogEventTag::CodeCreation => "code-creation",
            LogEventTag::CodeDisableOpt => "code-disable-optimization",
            LogEventTag::CodeMove => "code-move",
            LogEventTag::CodeDelete => "code-delete",
            LogEventTag::CodeMovingGc => "code-moving-gc",
            LogEventTag::SharedFuncMove => "sfi-move",
            LogEventTag::SnapshotCodeName => "snapshot-code-name",
            LogEventTag::Tick => "tick",
            LogEventTag::Builtin => "Builtin",
            LogEventTag::Callback => "Callback",
            LogEventTag::Eval => "Eval",
            LogEventTag::Function => "Function",
            LogEventTag::Handler => "Handler",
            LogEventTag::BytecodeHandler => "BytecodeHandler",
            LogEventTag::LazyCompile => "LazyCompile",
            LogEventTag::RegExp => "RegExp",
            LogEventTag::Script => "Script",
            LogEventTag::Stub => "Stub",
            // The "native" variants display like their regular counterparts.
            LogEventTag::NativeFunction => "Function",
            LogEventTag::NativeLazyCompile => "LazyCompile",
            LogEventTag::NativeScript => "Script",
        }
    }
}

/// The shared code-creation event/tag table.
///
/// Stable across all supported revisions, hence a single wildcard layout.
pub fn log_event_tags() -> &'static TagTable<LogEventTag> {
    static TABLE: OnceLock<TagTable<LogEventTag>> = OnceLock::new();
    TABLE.get_or_init(|| {
        TagTable::new(
            "LogEventTag",
            [(
                VersionRule::any(),
                vec![
                    (0, LogEventTag::CodeCreation),
                    (1, LogEventTag::CodeDisableOpt),
                    (2, LogEventTag::CodeMove),
                    (3, LogEventTag::CodeDelete),
                    (4, LogEventTag::CodeMovingGc),
                    (5, LogEventTag::SharedFuncMove),
                    (6, LogEventTag::SnapshotCodeName),
                    (7, LogEventTag::Tick),
                    (8, LogEventTag::Builtin),
                    (9, LogEventTag::Callback),
                    (10, LogEventTag::Eval),
                    (11, LogEventTag::Function),
                    (12, LogEventTag::Handler),
                    (13, LogEventTag::BytecodeHandler),
                    (14, LogEventTag::LazyCompile),
                    (15, LogEventTag::RegExp),
                    (16, LogEventTag::Script),
                    (17, LogEventTag::Stub),
                    (18, LogEventTag::NativeFunction),
                    (19, LogEventTag::NativeLazyCompile),
                    (20, LogEventTag::NativeScript),
                ],
            )],
        )
        .expect("built-in LogEventTag table is well-formed")
    })
}

/// The kind of a created code object.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeKind {
    BytecodeHandler,
    ForTesting,
    Builtin,
    RegExp,
    WasmFunction,
    WasmToCapiFunction,
    WasmToJsFunction,
    JsToWasmFunction,
    JsToJsFunction,
    CWasmEntry,
    InterpretedFunction,
    NativeContextIndependent,
    Turboprop,
    Baseline,
    Turbofan,
}

impl Tag for CodeKind {
    fn name(self) -> &'static str {
        match self {
            CodeKind::BytecodeHandler => "BYTECODE_HANDLER",
            CodeKind::ForTesting => "FOR_TESTING",
            CodeKind::Builtin => "BUILTIN",
            CodeKind::RegExp => "REGEXP",
            CodeKind::WasmFunction => "WASM_FUNCTION",
            CodeKind::WasmToCapiFunction => "WASM_TO_CAPI_FUNCTION",
            CodeKind::WasmToJsFunction => "WASM_TO_JS_FUNCTION",
            CodeKind::JsToWasmFunction => "JS_TO_WASM_FUNCTION",
            CodeKind::JsToJsFunction => "JS_TO_JS_FUNCTION",
            CodeKind::CWasmEntry => "C_WASM_ENTRY",
            CodeKind::InterpretedFunction => "INTERPRETED_FUNCTION",
            CodeKind::NativeContextIndependent => "NATIVE_CONTEXT_INDEPENDENT",
            CodeKind::Turboprop => "TURBOPROP",
            CodeKind::Baseline => "BASELINE",
            CodeKind::Turbofan => "TURBOFAN",
        }
    }
}

/// Whether code of this kind was produced by an optimizing tier.
impl CodeKind {
    /// True for the optimizing compiler tiers.
    pub fn is_optimized(self) -> bool {
        matches!(
            self,
            CodeKind::NativeContextIndependent | CodeKind::Turboprop | CodeKind::Turbofan
        )
    }
}

/// The versioned code-kind table.
///
/// 8.7 introduced NCI and Turboprop behind the interpreted tier; 9.1
/// replaced NCI with the baseline (Sparkplug) tier. Both shifts renumber
/// the optimizing tiers.
pub fn code_kinds() -> &'static TagTable<CodeKind> {
    static TABLE: OnceLock<TagTable<CodeKind>> = OnceLock::new();

    // Kinds 0..=10 are identical in every layout.
    fn common() -> Vec<(i32, CodeKind)> {
        vec![
            (0, CodeKind::BytecodeHandler),
            (1, CodeKind::ForTesting),
            (2, CodeKind::Builtin),
            (3, CodeKind::RegExp),
            (4, CodeKind::WasmFunction),
            (5, CodeKind::WasmToCapiFunction),
            (6, CodeKind::WasmToJsFunction),
            (7, CodeKind::JsToWasmFunction),
            (8, CodeKind::JsToJsFunction),
            (9, CodeKind::CWasmEntry),
            (10, CodeKind::InterpretedFunction),
        ]
    }

    TABLE.get_or_init(|| {
        let mut wildcard = common();
        wildcard.push((11, CodeKind::Turbofan));

        let mut with_nci = common();
        with_nci.extend([
            (11, CodeKind::NativeContextIndependent),
            (12, CodeKind::Turboprop),
            (13, CodeKind::Turbofan),
        ]);

        let mut with_baseline = common();
        with_baseline.extend([
            (11, CodeKind::Baseline),
            (12, CodeKind::Turboprop),
            (13, CodeKind::Turbofan),
        ]);

        TagTable::new(
            "CodeKind",
            [
                (VersionRule::any(), wildcard),
                (VersionRule::between(v(8, 7), v(9, 1)), with_nci),
                (VersionRule::since(v(9, 1)), with_baseline),
            ],
        )
        .expect("built-in CodeKind table is well-formed")
    })
}

/// The kind of a deoptimization.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeoptKind {
    Eager,
    Soft,
    Bailout,
    Lazy,
}

impl Tag for DeoptKind {
    fn name(self) -> &'static str {
        match self {
            DeoptKind::Eager => "eager",
            DeoptKind::Soft => "soft",
            DeoptKind::Bailout => "bailout",
            DeoptKind::Lazy => "lazy",
        }
    }
}

/// The versioned deopt-kind table.
///
/// 9.4 split bailouts out of the eager kind; 9.7 folded soft and bailout
/// deopts back into eager, leaving only eager and lazy.
pub fn deopt_kinds() -> &'static TagTable<DeoptKind> {
    static TABLE: OnceLock<TagTable<DeoptKind>> = OnceLock::new();
    TABLE.get_or_init(|| {
        TagTable::new(
            "DeoptKind",
            [
                (
                    VersionRule::any(),
                    vec![(0, DeoptKind::Eager), (1, DeoptKind::Soft), (2, DeoptKind::Lazy)],
                ),
                (
                    VersionRule::between(v(9, 4), v(9, 7)),
                    vec![
                        (0, DeoptKind::Eager),
                        (1, DeoptKind::Soft),
                        (2, DeoptKind::Bailout),
                        (3, DeoptKind::Lazy),
                    ],
                ),
                (
                    VersionRule::since(v(9, 7)),
                    vec![(0, DeoptKind::Eager), (1, DeoptKind::Lazy)],
                ),
            ],
        )
        .expect("built-in DeoptKind table is well-formed")
    })
}

/// VM state recorded with each profiler tick.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmState {
    Js,
    Gc,
    Parser,
    BytecodeCompiler,
    Compiler,
    Other,
    External,
    AtomicsWait,
    Idle,
}

impl Tag for VmState {
    fn name(self) -> &'static str {
        match self {
            VmState::Js => "JS",
            VmState::Gc => "GC",
            VmState::Parser => "PARSER",
            VmState::BytecodeCompiler => "BYTECODE_COMPILER",
            VmState::Compiler => "COMPILER",
            VmState::Other => "OTHER",
            VmState::External => "EXTERNAL",
            VmState::AtomicsWait => "ATOMICS_WAIT",
            VmState::Idle => "IDLE",
        }
    }
}

/// The versioned VM-state table.
///
/// 7.6 split the parser and bytecode compiler out of the compiler state and
/// added the atomics-wait state.
pub fn vm_states() -> &'static TagTable<VmState> {
    static TABLE: OnceLock<TagTable<VmState>> = OnceLock::new();
    TABLE.get_or_init(|| {
        TagTable::new(
            "VmState",
            [
                (
                    VersionRule::any(),
                    vec![
                        (0, VmState::Js),
                        (1, VmState::Gc),
                        (2, VmState::Compiler),
                        (3, VmState::Other),
                        (4, VmState::External),
                        (5, VmState::Idle),
                    ],
                ),
                (
                    VersionRule::since(v(7, 6)),
                    vec![
                        (0, VmState::Js),
                        (1, VmState::Gc),
                        (2, VmState::Parser),
                        (3, VmState::BytecodeCompiler),
                        (4, VmState::Compiler),
                        (5, VmState::Other),
                        (6, VmState::External),
                        (7, VmState::AtomicsWait),
                        (8, VmState::Idle),
                    ],
                ),
            ],
        )
        .expect("built-in VmState table is well-formed")
    })
}
