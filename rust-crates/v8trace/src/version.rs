// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Engine schema versions and the version ranges attached to tag tables.

use std::fmt;
use std::str::FromStr;

/// Version of the engine that produced a trace.
///
/// Ordered so that tag tables can be selected by comparing against the
/// version ranges they were declared for. The version is determined once
/// when a trace is loaded and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EngineVersion {
    /// Major version (V8 milestone).
    pub major: u16,
    /// Minor version.
    pub minor: u16,
    /// Build / patch component.
    pub patch: u16,
}

impl EngineVersion {
    /// Smallest representable version. Matches every `until` bound.
    pub const MIN: EngineVersion = EngineVersion::new(0, 0, 0);

    /// Largest representable version.
    ///
    /// Used as the default when a trace does not declare its producer
    /// version, selecting the most recent tag layouts.
    pub const MAX: EngineVersion = EngineVersion::new(u16::MAX, u16::MAX, u16::MAX);

    /// Construct a version from its components.
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Error indicating that a version string could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("`{0}` is not a valid engine version")]
pub struct ParseVersionError(String);

/// Parse versions as reported by V8.
///
/// Accepts two, three or four dot-separated components (`9.4`, `9.4.146`,
/// `9.4.146.24`); components past the third carry no schema information and
/// are ignored.
impl FromStr for EngineVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let mut component = |required: bool| -> Result<u16, ParseVersionError> {
            match parts.next() {
                Some(text) => text.parse().map_err(|_| ParseVersionError(s.to_owned())),
                None if required => Err(ParseVersionError(s.to_owned())),
                None => Ok(0),
            }
        };

        let major = component(true)?;
        let minor = component(true)?;
        let patch = component(false)?;

        Ok(Self::new(major, minor, patch))
    }
}

/// Version range that one tag-table layout applies to.
///
/// Either the wildcard (applies to every version) or a half-open interval
/// `[since, until)` where either bound may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRule {
    since: Option<EngineVersion>,
    until: Option<EngineVersion>,
}

impl VersionRule {
    /// The wildcard rule: matches every version.
    pub const fn any() -> Self {
        Self {
            since: None,
            until: None,
        }
    }

    /// Matches every version starting at `since` (inclusive).
    pub const fn since(since: EngineVersion) -> Self {
        Self {
            since: Some(since),
            until: None,
        }
    }

    /// Matches versions in `[since, until)`.
    pub const fn between(since: EngineVersion, until: EngineVersion) -> Self {
        Self {
            since: Some(since),
            until: Some(until),
        }
    }

    /// Whether this is the wildcard rule.
    pub fn is_wildcard(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    /// Whether the rule applies to the given version.
    pub fn matches(&self, version: EngineVersion) -> bool {
        if let Some(since) = self.since {
            if version < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if version >= until {
                return false;
            }
        }
        true
    }
}
