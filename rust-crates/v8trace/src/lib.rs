// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod entry;
pub mod fileentry;
pub mod finder;
pub mod ingest;
pub mod logfile;
pub mod mapentry;
pub mod memory;
pub mod profile;
pub mod records;
pub mod script;
pub mod srcpos;
pub mod tags;
pub mod uri;
pub mod version;

/// Type-erased error type.
///
/// Used to carry errors across the ingestion boundary where the record
/// producer's error type is not known to this crate and no consumer cares
/// about differentiating its variants.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// Byte offset into a script's source text.
pub type TextOffset = u32;
