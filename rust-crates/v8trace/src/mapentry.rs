// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Object-shape ("map") transition storage.
//!
//! The transition-graph analysis itself lives downstream; the model only
//! stores what the trace reported, keyed by map address.

/// Address identifying an object shape within one trace.
pub type MapId = u64;

/// One object shape and its outgoing transitions.
#[derive(Debug, Default)]
pub struct MapEntry {
    /// Creation timestamp, when a `map-create` record was seen.
    pub created: Option<u64>,
    /// Outgoing transitions, in trace order.
    pub edges: Vec<MapEdge>,
}

/// One transition between object shapes.
#[derive(Debug, Clone)]
pub struct MapEdge {
    /// Trace timestamp in microseconds.
    pub timestamp: u64,
    /// Target map of the transition.
    pub to: MapId,
    /// Transition kind as spelled in the trace.
    pub kind: String,
    /// Property name the transition introduces, if any.
    pub name: String,
    /// Engine-reported reason text.
    pub reason: String,
}
