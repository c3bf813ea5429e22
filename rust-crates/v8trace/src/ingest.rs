// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Single-pass construction of the log-file model from a record stream.
//!
//! All mutation happens here, before the [`LogFile`] is handed to any
//! reader. Decode failures are structural trace-format violations; whether
//! they abort the load or merely drop the offending record is the caller's
//! choice via [`DecodePolicy`]. Lookup misses during later queries are
//! never errors.

use crate::entry::{
    DeoptEntry, DeoptUpdate, FunctionEntry, FunctionUpdate, IcEntry, IcUpdate,
};
use crate::fileentry::FileEntry;
use crate::logfile::{EntrySlots, LogFile};
use crate::mapentry::{MapEdge, MapEntry, MapId};
use crate::memory::{HeapSnapshot, MemoryOverview};
use crate::profile::{Profile, TickSample};
use crate::records::{
    CodeCreation, Deopt, EventRecord, FunctionName, IcState, IcTransition, MapTransition, Tick,
};
use crate::script::{Script, ScriptId};
use crate::srcpos::{resolve_position, FilePosition};
use crate::tags::{self, v8};
use crate::uri::FileUri;
use crate::version::EngineVersion;
use log::debug;
use std::collections::{HashMap, HashSet};

/// Result type shorthand.
pub type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Errors that can occur while ingesting a record stream.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A versioned tag code or name did not decode for the trace's version.
    #[error("tag decoding: {0}")]
    Tag(#[from] tags::Error),

    /// A record referenced a script id no `script` record registered.
    #[error("record references unregistered script id {0}")]
    UnknownScript(ScriptId),

    /// An IC record carried an unknown state character.
    #[error("`{0}` is not a known inline cache state code")]
    UnknownIcState(char),

    /// Error reported by the record producer.
    #[error(transparent)]
    Source(crate::AnyError),
}

/// What to do with records that fail to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Abort the load on the first decode failure.
    #[default]
    Strict,
    /// Drop the offending record and continue, logging it.
    Lenient,
}

/// Accumulates decoded records and produces the finished [`LogFile`].
pub struct LogFileBuilder {
    version: EngineVersion,
    policy: DecodePolicy,
    scripts: HashMap<ScriptId, Script>,
    files: HashMap<FileUri, FileEntry>,
    locations: HashMap<FilePosition, EntrySlots>,
    maps: HashMap<MapId, MapEntry>,
    profile: Profile,
    memory: MemoryOverview,
    source_paths: HashSet<FileUri>,
    generated_paths: HashSet<FileUri>,
}

impl LogFileBuilder {
    /// Create a strict builder for a trace of the given version.
    pub fn new(version: EngineVersion) -> Self {
        Self::with_policy(version, DecodePolicy::default())
    }

    /// Create a builder with an explicit decode policy.
    pub fn with_policy(version: EngineVersion, policy: DecodePolicy) -> Self {
        Self {
            version,
            policy,
            scripts: HashMap::new(),
            files: HashMap::new(),
            locations: HashMap::new(),
            maps: HashMap::new(),
            profile: Profile::default(),
            memory: MemoryOverview::default(),
            source_paths: HashSet::new(),
            generated_paths: HashSet::new(),
        }
    }

    /// Ingest one record.
    pub fn push(&mut self, record: EventRecord) -> Result {
        match record {
            EventRecord::Script { id, uri } => {
                let uri = FileUri::new(&uri);
                self.classify(&uri);
                self.scripts.insert(id, Script::new(id, uri));
                Ok(())
            }
            EventRecord::ScriptSource { id, source } => self.on_script_source(id, source),
            EventRecord::CodeCreation(rec) => self.on_code_creation(rec),
            EventRecord::IcTransition(rec) => self.on_ic_transition(rec),
            EventRecord::Deopt(rec) => self.on_deopt(rec),
            EventRecord::MapCreate { address, timestamp } => {
                self.maps.entry(address).or_default().created = Some(timestamp);
                Ok(())
            }
            EventRecord::MapTransition(rec) => {
                self.on_map_transition(rec);
                Ok(())
            }
            EventRecord::Tick(rec) => self.on_tick(rec),
            EventRecord::HeapSample {
                timestamp,
                used,
                capacity,
            } => {
                self.memory.record(HeapSnapshot {
                    timestamp,
                    used,
                    capacity,
                });
                Ok(())
            }
        }
    }

    /// Finish ingestion and hand over the immutable model.
    pub fn finish(self) -> LogFile {
        LogFile::new(
            self.version,
            self.scripts,
            self.files,
            self.locations,
            self.maps,
            self.profile,
            self.memory,
            self.source_paths,
            self.generated_paths,
        )
    }

    fn on_script_source(&mut self, id: ScriptId, source: String) -> Result {
        match self.scripts.get_mut(&id) {
            Some(script) => {
                script.set_source(source);
                Ok(())
            }
            None if self.policy == DecodePolicy::Strict => Err(Error::UnknownScript(id)),
            None => {
                debug!("dropping source for unregistered script {id}");
                Ok(())
            }
        }
    }

    fn on_code_creation(&mut self, rec: CodeCreation) -> Result {
        let Some(tag) = self.decoded(v8::log_event_tags().decode(rec.tag, self.version))? else {
            return Ok(());
        };
        let Some(kind) = self.decoded(v8::code_kinds().decode(rec.kind, self.version))? else {
            return Ok(());
        };

        // Builtins, stubs and native code carry no declared location and
        // cannot appear in a source-indexed model.
        let Some(declared) = rec.name.file_position.clone() else {
            debug!("code-creation for `{}` has no source location", rec.name.name);
            return Ok(());
        };

        let script = self.script(rec.script)?;
        let Some(position) = resolve_position(script, rec.script_offset, Some(&declared)) else {
            return Ok(());
        };
        let extent = match (script.and_then(Script::line_map), rec.extent.clone()) {
            (Some(line_map), Some(extent)) => {
                Some(line_map.position_at(extent.start)..line_map.position_at(extent.end))
            }
            _ => None,
        };

        let at = FilePosition::new(declared.uri.clone(), position);
        self.classify(&at.uri);

        let update = FunctionUpdate {
            timestamp: rec.timestamp,
            tag,
            kind,
        };

        match self.locations.get(&at).and_then(|slots| slots.function) {
            Some(index) => {
                if let Some(entry) = self
                    .files
                    .get_mut(&at.uri)
                    .and_then(|f| f.functions.get_mut(index as usize))
                {
                    entry.updates.push(update);
                    if entry.extent.is_none() {
                        entry.extent = extent;
                    }
                }
            }
            None => {
                let file = self.files.entry(at.uri.clone()).or_default();
                let index = file.functions.len() as u32;
                file.functions.push(FunctionEntry {
                    name: rec.name,
                    file_position: at.clone(),
                    extent,
                    updates: vec![update],
                });
                self.locations.entry(at).or_default().function = Some(index);
            }
        }

        Ok(())
    }

    fn on_ic_transition(&mut self, rec: IcTransition) -> Result {
        let Some(old_state) = self.ic_state(rec.old_state)? else {
            return Ok(());
        };
        let Some(new_state) = self.ic_state(rec.new_state)? else {
            return Ok(());
        };

        let Some((at, name)) = self.resolve_site(&rec.name, rec.script, rec.script_offset)? else {
            return Ok(());
        };

        let update = IcUpdate {
            timestamp: rec.timestamp,
            op: rec.op,
            old_state,
            new_state,
            map: rec.map,
            key: rec.key,
            slow_reason: rec.slow_reason,
        };

        match self.locations.get(&at).and_then(|slots| slots.ic) {
            Some(index) => {
                if let Some(entry) = self
                    .files
                    .get_mut(&at.uri)
                    .and_then(|f| f.ics.get_mut(index as usize))
                {
                    entry.updates.push(update);
                }
            }
            None => {
                let file = self.files.entry(at.uri.clone()).or_default();
                let index = file.ics.len() as u32;
                file.ics.push(IcEntry {
                    name,
                    file_position: at.clone(),
                    updates: vec![update],
                });
                self.locations.entry(at).or_default().ic = Some(index);
            }
        }

        Ok(())
    }

    fn on_deopt(&mut self, rec: Deopt) -> Result {
        let Some(kind) = self.decoded(v8::deopt_kinds().decode(rec.kind, self.version))? else {
            return Ok(());
        };

        let Some((at, name)) = self.resolve_site(&rec.name, rec.script, rec.script_offset)? else {
            return Ok(());
        };

        let update = DeoptUpdate {
            timestamp: rec.timestamp,
            kind,
            reason: rec.reason,
        };

        match self.locations.get(&at).and_then(|slots| slots.deopt) {
            Some(index) => {
                if let Some(entry) = self
                    .files
                    .get_mut(&at.uri)
                    .and_then(|f| f.deopts.get_mut(index as usize))
                {
                    entry.updates.push(update);
                }
            }
            None => {
                let file = self.files.entry(at.uri.clone()).or_default();
                let index = file.deopts.len() as u32;
                file.deopts.push(DeoptEntry {
                    name,
                    file_position: at.clone(),
                    updates: vec![update],
                });
                self.locations.entry(at).or_default().deopt = Some(index);
            }
        }

        Ok(())
    }

    fn on_map_transition(&mut self, rec: MapTransition) {
        self.maps.entry(rec.from).or_default().edges.push(MapEdge {
            timestamp: rec.timestamp,
            to: rec.to,
            kind: rec.kind,
            name: rec.name,
            reason: rec.reason,
        });
        self.maps.entry(rec.to).or_default();
    }

    fn on_tick(&mut self, rec: Tick) -> Result {
        let Some(vm_state) = self.decoded(v8::vm_states().decode(rec.vm_state, self.version))?
        else {
            return Ok(());
        };

        self.profile.record(TickSample {
            timestamp: rec.timestamp,
            vm_state,
            stack: rec.stack,
        });

        Ok(())
    }

    /// Resolves an IC/deopt site to its location key and owning name.
    ///
    /// Returns `None` (after logging) for sites that cannot be placed in
    /// source, which mirrors how locationless code objects are handled.
    fn resolve_site(
        &self,
        name: &FunctionName,
        script: Option<ScriptId>,
        script_offset: i64,
    ) -> Result<Option<(FilePosition, FunctionName)>> {
        let Some(declared) = name.file_position.clone() else {
            debug!("event in `{}` has no source location", name.name);
            return Ok(None);
        };

        let script = self.script(script)?;
        let Some(position) = resolve_position(script, script_offset, Some(&declared)) else {
            return Ok(None);
        };

        Ok(Some((
            FilePosition::new(declared.uri, position),
            name.clone(),
        )))
    }

    /// Applies the decode policy to a tag-table result.
    fn decoded<T>(&self, decoded: tags::Result<T>) -> Result<Option<T>> {
        match decoded {
            Ok(tag) => Ok(Some(tag)),
            Err(err) if self.policy == DecodePolicy::Strict => Err(err.into()),
            Err(err) => {
                debug!("dropping record: {err}");
                Ok(None)
            }
        }
    }

    /// Applies the decode policy to an IC state character.
    fn ic_state(&self, code: char) -> Result<Option<IcState>> {
        match IcState::from_code(code) {
            Some(state) => Ok(Some(state)),
            None if self.policy == DecodePolicy::Strict => Err(Error::UnknownIcState(code)),
            None => {
                debug!("dropping record: `{code}` is not a known inline cache state code");
                Ok(None)
            }
        }
    }

    /// Looks up a referenced script, subject to the decode policy.
    fn script(&self, id: Option<ScriptId>) -> Result<Option<&Script>> {
        let Some(id) = id else {
            return Ok(None);
        };

        match self.scripts.get(&id) {
            Some(script) => Ok(Some(script)),
            None if self.policy == DecodePolicy::Strict => Err(Error::UnknownScript(id)),
            None => {
                debug!("record references unregistered script {id}");
                Ok(None)
            }
        }
    }

    fn classify(&mut self, uri: &FileUri) {
        let set = if uri.is_file_path() {
            &mut self.source_paths
        } else {
            &mut self.generated_paths
        };

        if !set.contains(uri) {
            set.insert(uri.clone());
        }
    }
}
