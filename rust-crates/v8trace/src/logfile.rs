// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The aggregate model of one loaded trace.
//!
//! A [`LogFile`] is built in a single ingestion pass and immutable from the
//! perspective of its readers. The only internal mutation afterwards are
//! two idempotent lazy caches (the per-file range indices and the common
//! base directory), so a shared instance can serve concurrent queries.
//! Replacing a trace discards the whole aggregate; there is no incremental
//! update.

use crate::entry::{DeoptEntry, EntryRef, FunctionEntry, IcEntry};
use crate::fileentry::{FileEntry, FileIndex};
use crate::ingest::{self, DecodePolicy, LogFileBuilder};
use crate::mapentry::{MapEntry, MapId};
use crate::memory::MemoryOverview;
use crate::profile::Profile;
use crate::records::{EventRecord, FunctionName};
use crate::script::{Position, Script, ScriptId};
use crate::srcpos::FilePosition;
use crate::uri::{self, FileUri};
use crate::version::EngineVersion;
use fallible_iterator::FallibleIterator;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Per-kind entry indices recorded at one source location.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct EntrySlots {
    pub(crate) function: Option<u32>,
    pub(crate) ic: Option<u32>,
    pub(crate) deopt: Option<u32>,
}

/// The queryable, cross-referenced model of one trace.
pub struct LogFile {
    version: EngineVersion,
    scripts: HashMap<ScriptId, Script>,
    files: HashMap<FileUri, FileEntry>,
    locations: HashMap<FilePosition, EntrySlots>,
    maps: HashMap<MapId, MapEntry>,
    profile: Profile,
    memory: MemoryOverview,
    source_paths: HashSet<FileUri>,
    generated_paths: HashSet<FileUri>,

    /// Lazily built per-file indices, populated at most once per file.
    file_indices: Mutex<HashMap<FileUri, Arc<FileIndex>>>,
    /// Lazily computed common base. The unset cell distinguishes "not yet
    /// computed" from the computed-but-absent `Some(None)` state.
    common_base: OnceLock<Option<FileUri>>,
}

impl LogFile {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        version: EngineVersion,
        scripts: HashMap<ScriptId, Script>,
        files: HashMap<FileUri, FileEntry>,
        locations: HashMap<FilePosition, EntrySlots>,
        maps: HashMap<MapId, MapEntry>,
        profile: Profile,
        memory: MemoryOverview,
        source_paths: HashSet<FileUri>,
        generated_paths: HashSet<FileUri>,
    ) -> Self {
        Self {
            version,
            scripts,
            files,
            locations,
            maps,
            profile,
            memory,
            source_paths,
            generated_paths,
            file_indices: Mutex::new(HashMap::new()),
            common_base: OnceLock::new(),
        }
    }

    /// Build a model by draining a tokenized record stream.
    pub fn from_records<R>(
        version: EngineVersion,
        policy: DecodePolicy,
        mut records: R,
    ) -> ingest::Result<Self>
    where
        R: FallibleIterator<Item = EventRecord, Error = ingest::Error>,
    {
        let mut builder = LogFileBuilder::with_policy(version, policy);
        while let Some(record) = records.next()? {
            builder.push(record)?;
        }
        Ok(builder.finish())
    }

    /// Version of the engine that produced the trace.
    pub fn version(&self) -> EngineVersion {
        self.version
    }

    /// Scripts registered by the trace, keyed by engine script id.
    pub fn scripts(&self) -> &HashMap<ScriptId, Script> {
        &self.scripts
    }

    /// Per-file entry bundles, keyed by canonical file identity.
    pub fn files(&self) -> &HashMap<FileUri, FileEntry> {
        &self.files
    }

    /// Object shapes observed in the trace.
    pub fn maps(&self) -> &HashMap<MapId, MapEntry> {
        &self.maps
    }

    /// Sampling-profiler data.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Heap usage overview.
    pub fn memory(&self) -> &MemoryOverview {
        &self.memory
    }

    /// Files classified as user source files.
    pub fn source_paths(&self) -> &HashSet<FileUri> {
        &self.source_paths
    }

    /// Files classified as generated (engine-internal, eval, …).
    pub fn generated_paths(&self) -> &HashSet<FileUri> {
        &self.generated_paths
    }

    /// The function entry recorded exactly at the given location.
    pub fn find_function_entry(&self, at: &FilePosition) -> Option<&FunctionEntry> {
        let index = self.locations.get(at)?.function?;
        self.files.get(&at.uri)?.functions.get(index as usize)
    }

    /// The function entry for a parsed function name, via its declared
    /// location. `None` when the name carries no location.
    pub fn find_function_entry_by_name(&self, name: &FunctionName) -> Option<&FunctionEntry> {
        self.find_function_entry(name.file_position.as_ref()?)
    }

    /// The inline-cache entry recorded exactly at the given location.
    pub fn find_ic_entry(&self, at: &FilePosition) -> Option<&IcEntry> {
        let index = self.locations.get(at)?.ic?;
        self.files.get(&at.uri)?.ics.get(index as usize)
    }

    /// The deoptimization entry recorded exactly at the given location.
    pub fn find_deopt_entry(&self, at: &FilePosition) -> Option<&DeoptEntry> {
        let index = self.locations.get(at)?.deopt?;
        self.files.get(&at.uri)?.deopts.get(index as usize)
    }

    /// The lazily built range index for a file.
    ///
    /// Returns the cached instance on every call after the first. `None`
    /// for files without any recorded entries; querying those is a normal
    /// case, not an error.
    pub fn file_index(&self, file: &FileUri) -> Option<Arc<FileIndex>> {
        let mut cache = self
            .file_indices
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(index) = cache.get(file) {
            return Some(Arc::clone(index));
        }

        let entry = self.files.get(file)?;
        let index = Arc::new(FileIndex::new(entry));
        cache.insert(file.clone(), Arc::clone(&index));
        Some(index)
    }

    /// Every entry whose source range contains the given position.
    ///
    /// The primary "what is happening on this line" query: functions first
    /// (innermost enclosing first), then inline caches, then deopts. Safe
    /// for arbitrary files and positions; untraced files yield an empty
    /// result.
    pub fn find_entries_containing_position(
        &self,
        file: &FileUri,
        position: Position,
    ) -> Vec<EntryRef<'_>> {
        let Some(index) = self.file_index(file) else {
            return Vec::new();
        };
        let Some(entry) = self.files.get(file) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for i in index.functions().find(position) {
            if let Some(e) = entry.functions.get(i as usize) {
                out.push(EntryRef::Function(e));
            }
        }
        for i in index.ics().find(position) {
            if let Some(e) = entry.ics.get(i as usize) {
                out.push(EntryRef::Ic(e));
            }
        }
        for i in index.deopts().find(position) {
            if let Some(e) = entry.deopts.get(i as usize) {
                out.push(EntryRef::Deopt(e));
            }
        }
        out
    }

    /// Longest directory prefix shared by all source files.
    ///
    /// Computed on first call and cached, including the "no common base
    /// exists" outcome.
    pub fn common_base_directory(&self) -> Option<&FileUri> {
        self.common_base
            .get_or_init(|| uri::common_base_directory(self.source_paths.iter()))
            .as_ref()
    }

    /// The file's path relative to the common base directory.
    ///
    /// `None` for generated files, when no common base exists, or (with
    /// `ignore_if_basename`) when the fragment is just the file's name and
    /// callers would rather show the bare basename.
    pub fn relative_path_fragment(
        &self,
        file: &FileUri,
        ignore_if_basename: bool,
    ) -> Option<String> {
        if !self.source_paths.contains(file) {
            return None;
        }

        let base = self.common_base_directory()?;
        let fragment = uri::relative_fragment(base, file)?;

        if ignore_if_basename && fragment == file.basename() {
            return None;
        }

        Some(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use crate::records::{CodeCreation, Deopt, IcOperation, IcTransition};
    use crate::srcpos::NO_SCRIPT_OFFSET;
    use crate::tags::v8::DeoptKind;

    const APP_SOURCE: &str = "function outer() {\n  function inner() {\n    return data.x;\n  }\n  return inner();\n}\n";

    fn version() -> EngineVersion {
        "9.4.146".parse().unwrap()
    }

    fn app_js() -> FileUri {
        FileUri::new("file:///proj/src/app.js")
    }

    fn helper_js() -> FileUri {
        FileUri::new("file:///proj/lib/helper.js")
    }

    fn root_js() -> FileUri {
        FileUri::new("file:///proj/root.js")
    }

    fn at(uri: FileUri, line: u32, column: u32) -> FilePosition {
        FilePosition::new(uri, Position::new(line, column))
    }

    fn sample_records() -> Vec<EventRecord> {
        vec![
            EventRecord::Script {
                id: 1,
                uri: "file:///proj/src/app.js".to_owned(),
            },
            EventRecord::ScriptSource {
                id: 1,
                source: APP_SOURCE.to_owned(),
            },
            EventRecord::Script {
                id: 2,
                uri: "node:internal/util".to_owned(),
            },
            EventRecord::Script {
                id: 3,
                uri: "file:///proj/lib/helper.js".to_owned(),
            },
            EventRecord::Script {
                id: 4,
                uri: "file:///proj/root.js".to_owned(),
            },
            // `outer` covers the whole script, `inner` nests inside it.
            CodeCreation {
                timestamp: 10,
                tag: 14,  // LazyCompile
                kind: 10, // INTERPRETED_FUNCTION
                name: FunctionName::at("outer", at(app_js(), 0, 0)),
                script: Some(1),
                script_offset: 0,
                extent: Some(0..82),
            }
            .into(),
            CodeCreation {
                timestamp: 20,
                tag: 14,
                kind: 10,
                name: FunctionName::at("inner", at(app_js(), 1, 2)),
                script: Some(1),
                script_offset: 21,
                extent: Some(21..62),
            }
            .into(),
            // A helper without script source falls back to its declaration.
            CodeCreation {
                timestamp: 30,
                tag: 14,
                kind: 10,
                name: FunctionName::at("help", at(helper_js(), 4, 0)),
                script: Some(3),
                script_offset: 77,
                extent: None,
            }
            .into(),
            // IC on the `data.x` load inside `inner`.
            IcTransition {
                timestamp: 40,
                op: IcOperation::LoadIc,
                name: FunctionName::at("inner", at(app_js(), 1, 2)),
                script: Some(1),
                script_offset: 56,
                old_state: '0',
                new_state: '1',
                map: 0xdead,
                key: "x".to_owned(),
                slow_reason: None,
            }
            .into(),
            // Deopt on the `data` reference inside `inner`.
            Deopt {
                timestamp: 50,
                kind: 2, // bailout in the 9.4 layout
                name: FunctionName::at("inner", at(app_js(), 1, 2)),
                script: Some(1),
                script_offset: 51,
                reason: "wrong call target".to_owned(),
            }
            .into(),
        ]
    }

    fn load(records: Vec<EventRecord>) -> LogFile {
        LogFile::from_records(
            version(),
            DecodePolicy::Strict,
            fallible_iterator::convert(records.into_iter().map(Ok)),
        )
        .expect("trace should load")
    }

    #[test]
    fn exact_location_lookups() {
        let log = load(sample_records());

        let outer = log.find_function_entry(&at(app_js(), 0, 0)).unwrap();
        assert_eq!(outer.name.name, "outer");
        assert_eq!(outer.extent.clone().unwrap().end, Position::new(5, 1));

        let inner = log.find_function_entry(&at(app_js(), 1, 2)).unwrap();
        assert_eq!(inner.name.name, "inner");

        let ic = log.find_ic_entry(&at(app_js(), 2, 16)).unwrap();
        assert_eq!(ic.updates[0].key, "x");

        let deopt = log.find_deopt_entry(&at(app_js(), 2, 11)).unwrap();
        assert_eq!(deopt.updates[0].kind, DeoptKind::Bailout);

        // Most locations have no entry of a given kind.
        assert!(log.find_function_entry(&at(app_js(), 2, 16)).is_none());
        assert!(log.find_ic_entry(&at(app_js(), 0, 0)).is_none());
        assert!(log.find_deopt_entry(&at(helper_js(), 4, 0)).is_none());
    }

    #[test]
    fn lookup_by_function_name() {
        let log = load(sample_records());

        let name = FunctionName::at("inner", at(app_js(), 1, 2));
        assert_eq!(
            log.find_function_entry_by_name(&name).unwrap().name.name,
            "inner"
        );

        let nameless = FunctionName::unresolved("Builtin:ArrayPush");
        assert!(log.find_function_entry_by_name(&nameless).is_none());
    }

    #[test]
    fn declaration_fallback_without_source() {
        let log = load(sample_records());

        let help = log.find_function_entry(&at(helper_js(), 4, 0)).unwrap();
        assert_eq!(help.name.name, "help");
        assert!(help.extent.is_none());
    }

    #[test]
    fn entries_containing_position() {
        let log = load(sample_records());

        // On the `data.x` load: both functions (innermost first), then the IC.
        let hits = log.find_entries_containing_position(&app_js(), Position::new(2, 16));
        let kinds: Vec<_> = hits.iter().map(EntryRef::kind).collect();
        assert_eq!(
            kinds,
            [EntryKind::Function, EntryKind::Function, EntryKind::Ic]
        );
        assert_eq!(hits[0].function_name().name, "inner");
        assert_eq!(hits[1].function_name().name, "outer");

        // On the `data` reference: functions plus the deopt site.
        let hits = log.find_entries_containing_position(&app_js(), Position::new(2, 11));
        let kinds: Vec<_> = hits.iter().map(EntryRef::kind).collect();
        assert_eq!(
            kinds,
            [EntryKind::Function, EntryKind::Function, EntryKind::Deopt]
        );

        // Outside `inner` only `outer` remains.
        let hits = log.find_entries_containing_position(&app_js(), Position::new(4, 4));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].function_name().name, "outer");

        // Past the end of the script nothing matches.
        assert!(log
            .find_entries_containing_position(&app_js(), Position::new(50, 0))
            .is_empty());
    }

    #[test]
    fn untraced_files_yield_empty() {
        let log = load(sample_records());

        let unknown = FileUri::new("file:///proj/src/untraced.js");
        assert!(log
            .find_entries_containing_position(&unknown, Position::new(0, 0))
            .is_empty());
        assert!(log.file_index(&unknown).is_none());

        // Registered as a script, but nothing was recorded in it.
        assert!(log
            .find_entries_containing_position(&root_js(), Position::new(0, 0))
            .is_empty());
    }

    #[test]
    fn file_index_is_cached() {
        let log = load(sample_records());

        let first = log.file_index(&app_js()).unwrap();
        let second = log.file_index(&app_js()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn common_base_and_fragments() {
        let log = load(sample_records());

        assert_eq!(log.common_base_directory().unwrap().path(), "/proj");

        assert_eq!(
            log.relative_path_fragment(&app_js(), false).unwrap(),
            "src/app.js"
        );
        assert_eq!(
            log.relative_path_fragment(&app_js(), true).unwrap(),
            "src/app.js"
        );

        // Directly in the base directory: fragment equals the basename.
        assert_eq!(
            log.relative_path_fragment(&root_js(), false).unwrap(),
            "root.js"
        );
        assert!(log.relative_path_fragment(&root_js(), true).is_none());

        // Generated files never get a fragment.
        let internal = FileUri::new("node:internal/util");
        assert!(log.generated_paths().contains(&internal));
        assert!(log.relative_path_fragment(&internal, false).is_none());
    }

    #[test]
    fn no_common_base() {
        let log = load(vec![
            EventRecord::Script {
                id: 1,
                uri: "/a/x.js".to_owned(),
            },
            EventRecord::Script {
                id: 2,
                uri: "/c/y.js".to_owned(),
            },
        ]);

        // Cached as "computed, absent": repeated calls agree.
        assert!(log.common_base_directory().is_none());
        assert!(log.common_base_directory().is_none());
        assert!(log
            .relative_path_fragment(&FileUri::new("/a/x.js"), false)
            .is_none());
    }

    #[test]
    fn path_classification() {
        let log = load(sample_records());

        assert!(log.source_paths().contains(&app_js()));
        assert!(log.source_paths().contains(&helper_js()));
        assert!(!log.source_paths().contains(&FileUri::new("node:internal/util")));
        assert!(log.generated_paths().contains(&FileUri::new("node:internal/util")));
    }

    #[test]
    fn record_stream_errors_propagate() {
        let records: Vec<ingest::Result<EventRecord>> = vec![Err(ingest::Error::Source(
            "truncated trace".into(),
        ))];
        let result = LogFile::from_records(
            version(),
            DecodePolicy::Strict,
            fallible_iterator::convert(records.into_iter()),
        );
        assert!(matches!(result, Err(ingest::Error::Source(_))));
    }
}
