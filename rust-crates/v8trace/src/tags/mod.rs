// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Schema-version-aware decoding of integer tag codes.
//!
//! Trace events embed integer codes whose meaning changed across engine
//! revisions. A [`TagTable`] declares one code layout per version range and
//! answers decode/encode/parse requests for a concrete version, replacing
//! scattered per-version conditionals at the call sites. Tables are built
//! once, never mutated, and safe to share across any number of decode calls
//! and trace loads.

pub mod v8;

use crate::version::{EngineVersion, VersionRule};
use std::fmt;

/// Result type shorthand.
pub type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Errors that can occur when constructing or querying a tag table.
///
/// Unknown codes and names are trace-format violations whose handling is
/// the caller's policy; duplicate codes are table-configuration bugs and
/// reported at construction time.
#[non_exhaustive]
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("duplicate code {code} in `{table}` tag table")]
    DuplicateCode { table: &'static str, code: i32 },

    #[error("code {code} is not a known `{table}` tag in version {version}")]
    UnknownCode {
        table: &'static str,
        code: i32,
        version: EngineVersion,
    },

    #[error("`{name}` is not a known `{table}` tag in version {version}")]
    UnknownName {
        table: &'static str,
        name: String,
        version: EngineVersion,
    },
}

/// A symbolic tag decoded from an integer trace code.
pub trait Tag: Copy + Eq + fmt::Debug + 'static {
    /// Stable display name of the tag.
    ///
    /// Names need not be unique: engines alias distinct codes to the same
    /// user-visible name (e.g. the regular and the "native" function tags
    /// both display as `Function`).
    fn name(self) -> &'static str;
}

/// One code layout together with the version range it applies to.
struct Layout<K> {
    rule: VersionRule,
    entries: Vec<(i32, K)>,
}

/// Versioned mapping between integer tag codes and symbolic tags.
///
/// Declared as a list of `(rule, entries)` layouts. For a given version the
/// applicable layout is the **last** declared non-wildcard rule matching
/// that version, falling back to the wildcard rule; later declarations thus
/// override earlier ones on overlapping ranges.
pub struct TagTable<K> {
    name: &'static str,
    layouts: Vec<Layout<K>>,
}

impl<K: Tag> TagTable<K> {
    /// Build a table from layout declarations.
    ///
    /// Fails if any single layout maps one code twice; such a declaration is
    /// a table-configuration bug, not a trace error.
    pub fn new(
        name: &'static str,
        layouts: impl IntoIterator<Item = (VersionRule, Vec<(i32, K)>)>,
    ) -> Result<Self> {
        let layouts: Vec<_> = layouts
            .into_iter()
            .map(|(rule, entries)| Layout { rule, entries })
            .collect();

        for layout in &layouts {
            for (i, &(code, _)) in layout.entries.iter().enumerate() {
                if layout.entries[..i].iter().any(|&(other, _)| other == code) {
                    return Err(Error::DuplicateCode { table: name, code });
                }
            }
        }

        Ok(Self { name, layouts })
    }

    /// Name of the table, used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Selects the layout applicable to `version`.
    fn layout_for(&self, version: EngineVersion) -> Option<&Layout<K>> {
        self.layouts
            .iter()
            .rev()
            .find(|l| !l.rule.is_wildcard() && l.rule.matches(version))
            .or_else(|| self.layouts.iter().rev().find(|l| l.rule.is_wildcard()))
    }

    /// Decode an integer code into its symbolic tag for the given version.
    pub fn decode(&self, code: i32, version: EngineVersion) -> Result<K> {
        self.layout_for(version)
            .and_then(|l| l.entries.iter().find(|&&(c, _)| c == code))
            .map(|&(_, tag)| tag)
            .ok_or(Error::UnknownCode {
                table: self.name,
                code,
                version,
            })
    }

    /// Encode a symbolic tag back into its integer code for the given version.
    pub fn encode(&self, tag: K, version: EngineVersion) -> Result<i32> {
        self.layout_for(version)
            .and_then(|l| l.entries.iter().find(|&&(_, t)| t == tag))
            .map(|&(code, _)| code)
            .ok_or_else(|| Error::UnknownName {
                table: self.name,
                name: tag.name().to_owned(),
                version,
            })
    }

    /// Resolve a tag name into its symbolic tag for the given version.
    ///
    /// Aliased names resolve to the first entry carrying the name, which is
    /// by convention the canonical one.
    pub fn parse(&self, text: &str, version: EngineVersion) -> Result<K> {
        self.layout_for(version)
            .and_then(|l| l.entries.iter().find(|&&(_, t)| t.name() == text))
            .map(|&(_, tag)| tag)
            .ok_or_else(|| Error::UnknownName {
                table: self.name,
                name: text.to_owned(),
                version,
            })
    }
}

impl<K> fmt::Debug for TagTable<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagTable({}, {} layouts)", self.name, self.layouts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Fruit {
        Apple,
        Pear,
        Quince,
    }

    impl Tag for Fruit {
        fn name(self) -> &'static str {
            match self {
                Fruit::Apple => "apple",
                Fruit::Pear => "pear",
                // Aliased on purpose: decodes distinctly, displays the same.
                Fruit::Quince => "pear",
            }
        }
    }

    fn v(major: u16, minor: u16) -> EngineVersion {
        EngineVersion::new(major, minor, 0)
    }

    fn table() -> TagTable<Fruit> {
        TagTable::new(
            "Fruit",
            [
                (
                    VersionRule::any(),
                    vec![(0, Fruit::Apple), (1, Fruit::Pear)],
                ),
                (
                    VersionRule::since(v(2, 0)),
                    vec![(0, Fruit::Pear), (1, Fruit::Apple), (2, Fruit::Quince)],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn decode_selects_layout() {
        let table = table();
        assert_eq!(table.decode(0, v(1, 0)).unwrap(), Fruit::Apple);
        assert_eq!(table.decode(0, v(2, 0)).unwrap(), Fruit::Pear);
        assert_eq!(table.decode(2, v(3, 5)).unwrap(), Fruit::Quince);
    }

    #[test]
    fn unknown_code_in_other_range() {
        let table = table();
        // Code 2 only exists in the >=2.0 layout.
        assert!(matches!(
            table.decode(2, v(1, 9)),
            Err(Error::UnknownCode { code: 2, .. })
        ));
    }

    #[test]
    fn round_trip() {
        let table = table();
        for version in [v(1, 0), v(2, 0), EngineVersion::MAX] {
            for code in 0..3 {
                let Ok(tag) = table.decode(code, version) else {
                    continue;
                };
                assert_eq!(table.encode(tag, version).unwrap(), code);
            }
        }
    }

    #[test]
    fn encode_unknown_in_range() {
        let table = table();
        assert!(matches!(
            table.encode(Fruit::Quince, v(1, 0)),
            Err(Error::UnknownName { .. })
        ));
    }

    #[test]
    fn parse_resolves_first_alias() {
        let table = table();
        assert_eq!(table.parse("pear", v(2, 0)).unwrap(), Fruit::Pear);
        assert_eq!(table.parse("apple", v(1, 0)).unwrap(), Fruit::Apple);
        assert!(matches!(
            table.parse("mango", v(1, 0)),
            Err(Error::UnknownName { .. })
        ));
    }

    #[test]
    fn later_declaration_overrides() {
        let table = TagTable::new(
            "Fruit",
            [
                (VersionRule::since(v(1, 0)), vec![(0, Fruit::Apple)]),
                (VersionRule::since(v(1, 0)), vec![(0, Fruit::Pear)]),
            ],
        )
        .unwrap();
        assert_eq!(table.decode(0, v(1, 0)).unwrap(), Fruit::Pear);
    }

    #[test]
    fn duplicate_code_fails_fast() {
        let result = TagTable::new(
            "Fruit",
            [(
                VersionRule::any(),
                vec![(0, Fruit::Apple), (0, Fruit::Pear)],
            )],
        );
        assert!(matches!(
            result,
            Err(Error::DuplicateCode { code: 0, .. })
        ));
    }
}
