// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Canonical file identities and path arithmetic for display.
//!
//! Traces reference source files both as plain paths and as URIs
//! (`file:///…`, `node:internal/…`). [`FileUri`] normalizes either form at
//! construction so that instances compare and hash canonically and can be
//! used as map keys throughout the model.

use std::fmt;

/// Canonical identity of a file observed in a trace.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileUri {
    /// Lower-cased URI scheme, absent for plain paths.
    scheme: Option<String>,
    /// Normalized path: forward slashes only, no duplicate or trailing
    /// slashes.
    path: String,
}

impl FileUri {
    /// Parse and normalize a file reference.
    pub fn new(text: &str) -> Self {
        let text = text.replace('\\', "/");

        let (scheme, rest) = match split_scheme(&text) {
            Some((scheme, rest)) => (Some(scheme.to_ascii_lowercase()), rest),
            None => (None, text.as_str()),
        };

        // Strip the authority marker; `file:///a/b` keeps its rooted path.
        let rest = rest.strip_prefix("//").map_or(rest, |r| {
            if r.starts_with('/') {
                r
            } else {
                rest
            }
        });

        Self {
            scheme,
            path: normalize_path(rest),
        }
    }

    /// The URI scheme, if the reference had one.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// The normalized path component.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final path segment.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Whether this identity denotes an on-disk file.
    ///
    /// Plain paths and `file:` URIs are file paths; engine-internal schemes
    /// (`node:`, `eval:`, …) are not.
    pub fn is_file_path(&self) -> bool {
        matches!(self.scheme(), None | Some("file"))
    }

    /// Path segments, including the empty root segment of absolute paths.
    fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/')
    }

    /// Segments of the containing directory (all but the last).
    fn dir_segments(&self) -> Vec<&str> {
        let mut segments: Vec<_> = self.segments().collect();
        segments.pop();
        segments
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Some(scheme) if self.path.starts_with('/') => {
                write!(f, "{}://{}", scheme, self.path)
            }
            Some(scheme) => write!(f, "{}:{}", scheme, self.path),
            None => f.write_str(&self.path),
        }
    }
}

impl fmt::Debug for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileUri({})", self)
    }
}

/// Splits a `scheme:` prefix off a reference.
///
/// Single-letter prefixes are Windows drive letters, not schemes.
fn split_scheme(text: &str) -> Option<(&str, &str)> {
    let colon = text.find(':')?;
    let scheme = &text[..colon];

    let mut chars = scheme.chars();
    let first_is_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    if scheme.len() >= 2 && first_is_alpha && rest_ok {
        Some((scheme, &text[colon + 1..]))
    } else {
        None
    }
}

fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;

    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }

    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }

    out
}

/// Longest directory prefix shared by every given file.
///
/// Returns `None` when the set is empty, the files disagree on scheme, or
/// the shared prefix holds no real directory segment (files that share only
/// the filesystem root have no useful common base).
pub fn common_base_directory<'a>(
    uris: impl IntoIterator<Item = &'a FileUri>,
) -> Option<FileUri> {
    let mut iter = uris.into_iter();
    let first = iter.next()?;
    let mut base = first.dir_segments();

    for uri in iter {
        if uri.scheme() != first.scheme() {
            return None;
        }

        let dirs = uri.dir_segments();
        let shared = base
            .iter()
            .zip(&dirs)
            .take_while(|(a, b)| a == b)
            .count();
        base.truncate(shared);
    }

    if base.iter().all(|s| s.is_empty()) {
        return None;
    }

    Some(FileUri {
        scheme: first.scheme.clone(),
        path: base.join("/"),
    })
}

/// Path of `file` relative to the directory `base`, without a leading `./`.
///
/// Returns `None` when `file` is not located under `base`.
pub fn relative_fragment(base: &FileUri, file: &FileUri) -> Option<String> {
    if base.scheme() != file.scheme() {
        return None;
    }

    let mut fragment = file
        .path
        .strip_prefix(&base.path)
        .and_then(|rest| rest.strip_prefix('/'))?;

    while let Some(rest) = fragment.strip_prefix("./") {
        fragment = rest;
    }

    if fragment.is_empty() {
        None
    } else {
        Some(fragment.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let uri = FileUri::new("file:///home/user/app.js");
        assert_eq!(uri.scheme(), Some("file"));
        assert_eq!(uri.path(), "/home/user/app.js");
        assert_eq!(uri.basename(), "app.js");
        assert_eq!(uri.to_string(), "file:///home/user/app.js");
        assert!(uri.is_file_path());

        let uri = FileUri::new("node:internal/bootstrap/loaders");
        assert_eq!(uri.scheme(), Some("node"));
        assert_eq!(uri.path(), "internal/bootstrap/loaders");
        assert_eq!(uri.to_string(), "node:internal/bootstrap/loaders");
        assert!(!uri.is_file_path());

        let uri = FileUri::new("/home/user/app.js");
        assert_eq!(uri.scheme(), None);
        assert!(uri.is_file_path());
    }

    #[test]
    fn normalization() {
        assert_eq!(FileUri::new("C:\\src\\app.js"), FileUri::new("C:/src/app.js"));
        assert_eq!(FileUri::new("/a//b///c.js").path(), "/a/b/c.js");
        assert_eq!(FileUri::new("FILE:///a/b.js").scheme(), Some("file"));
        assert_eq!(FileUri::new("/a/b/").path(), "/a/b");
    }

    #[test]
    fn drive_letters_are_not_schemes() {
        let uri = FileUri::new("c:/src/app.js");
        assert_eq!(uri.scheme(), None);
        assert_eq!(uri.path(), "c:/src/app.js");
    }

    #[test]
    fn common_base() {
        let a = FileUri::new("/a/b/x.js");
        let b = FileUri::new("/a/b/c/y.js");
        let base = common_base_directory([&a, &b]).unwrap();
        assert_eq!(base.path(), "/a/b");

        // Sharing only the root is not a usable base.
        let c = FileUri::new("/c/y.js");
        assert!(common_base_directory([&a, &c]).is_none());

        // Different drives.
        let d = FileUri::new("c:/x.js");
        let e = FileUri::new("d:/y.js");
        assert!(common_base_directory([&d, &e]).is_none());

        // Different schemes.
        let f = FileUri::new("node:internal/x.js");
        assert!(common_base_directory([&a, &f]).is_none());

        assert!(common_base_directory([]).is_none());

        let only = common_base_directory([&b]).unwrap();
        assert_eq!(only.path(), "/a/b/c");
    }

    #[test]
    fn relative_fragments() {
        let base = FileUri::new("/a/b");
        assert_eq!(
            relative_fragment(&base, &FileUri::new("/a/b/c/y.js")).unwrap(),
            "c/y.js"
        );
        assert_eq!(
            relative_fragment(&base, &FileUri::new("/a/b/x.js")).unwrap(),
            "x.js"
        );

        // Not under the base; prefix match must respect segment boundaries.
        assert!(relative_fragment(&base, &FileUri::new("/a/bc/x.js")).is_none());
        assert!(relative_fragment(&base, &FileUri::new("/elsewhere/x.js")).is_none());
    }
}
