// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Sampling-profiler tick storage.
//!
//! Call-tree construction from the sampled stacks is a downstream concern;
//! the model stores the decoded samples and per-state totals.

use crate::tags::v8::VmState;
use std::collections::HashMap;

/// One decoded profiler tick.
#[derive(Debug, Clone)]
pub struct TickSample {
    /// Trace timestamp in microseconds.
    pub timestamp: u64,
    /// VM state at the time of the sample.
    pub vm_state: VmState,
    /// Sampled return-address stack, innermost first.
    pub stack: Vec<u64>,
}

/// All profiler samples of one trace.
#[derive(Debug, Default)]
pub struct Profile {
    samples: Vec<TickSample>,
    state_counts: HashMap<VmState, u64>,
}

impl Profile {
    pub(crate) fn record(&mut self, sample: TickSample) {
        *self.state_counts.entry(sample.vm_state).or_default() += 1;
        self.samples.push(sample);
    }

    /// All samples, in trace order.
    pub fn samples(&self) -> &[TickSample] {
        &self.samples
    }

    /// Total number of samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples taken in the given VM state.
    pub fn samples_in_state(&self, state: VmState) -> u64 {
        self.state_counts.get(&state).copied().unwrap_or(0)
    }
}
