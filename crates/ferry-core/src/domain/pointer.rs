//! Object pointers and the location split rule.
//!
//! A fully qualified location looks like `<scheme>://<root>/<key>`.
//! The namespace is everything up to (not including) the first `/` after `://`,
//! the identifier is the rest. Keys are kept byte-for-byte.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const SCHEME_SEPARATOR: &str = "://";

/// Errors produced when a location string cannot be split into a pointer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location is empty")]
    Empty,

    #[error("location '{0}' has no scheme (expected <scheme>://<root>/<key>)")]
    MissingScheme(String),

    #[error("location '{0}' has no storage root")]
    MissingRoot(String),

    #[error("location '{0}' has no object key")]
    MissingKey(String),
}

/// Identifies one object inside one storage namespace.
///
/// Construction re-splits `namespace/identifier` with the location split rule,
/// so every pointer naming the same location is equal:
/// `("mem://bucket/", "one/two")`, `("mem://bucket", "/one/two")` and
/// `("mem://bucket/one", "two")` all become `("mem://bucket", "one/two")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectPointer {
    storage_namespace: String,
    identifier: String,
}

impl ObjectPointer {
    pub fn new(storage_namespace: impl Into<String>, identifier: impl Into<String>) -> Self {
        let storage_namespace = storage_namespace.into();
        let identifier = identifier.into();
        let storage_namespace = storage_namespace.trim_end_matches('/');
        let identifier = identifier.trim_start_matches('/');

        // Unsplittable halves (no scheme, empty key) are kept as given.
        Self::parse(&format!("{storage_namespace}/{identifier}")).unwrap_or_else(|_| Self {
            storage_namespace: storage_namespace.to_string(),
            identifier: identifier.to_string(),
        })
    }

    /// Split a fully qualified location into `(namespace, identifier)`.
    pub fn parse(location: &str) -> Result<Self, LocationError> {
        if location.is_empty() {
            return Err(LocationError::Empty);
        }

        let Some((scheme, rest)) = location.split_once(SCHEME_SEPARATOR) else {
            return Err(LocationError::MissingScheme(location.to_string()));
        };
        if scheme.is_empty() {
            return Err(LocationError::MissingScheme(location.to_string()));
        }

        let (root, key) = rest.split_once('/').unwrap_or((rest, ""));
        if root.is_empty() {
            return Err(LocationError::MissingRoot(location.to_string()));
        }
        if key.is_empty() {
            return Err(LocationError::MissingKey(location.to_string()));
        }

        Ok(Self {
            storage_namespace: format!("{scheme}{SCHEME_SEPARATOR}{root}"),
            identifier: key.to_string(),
        })
    }

    pub fn storage_namespace(&self) -> &str {
        &self.storage_namespace
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Scheme part of the namespace (`mem`, `s3`, `local`, ...).
    pub fn scheme(&self) -> &str {
        self.storage_namespace
            .split_once(SCHEME_SEPARATOR)
            .map(|(scheme, _)| scheme)
            .unwrap_or("")
    }

    /// Root part of the namespace (bucket name, container, ...).
    pub fn root(&self) -> &str {
        self.storage_namespace
            .split_once(SCHEME_SEPARATOR)
            .map(|(_, root)| root)
            .unwrap_or(&self.storage_namespace)
    }

    /// Inverse of [`ObjectPointer::parse`].
    pub fn location(&self) -> String {
        format!("{}/{}", self.storage_namespace, self.identifier)
    }

    /// Parent prefix of the identifier, without trailing `/` (empty at the root).
    pub fn prefix(&self) -> &str {
        self.identifier
            .rsplit_once('/')
            .map(|(prefix, _)| prefix)
            .unwrap_or("")
    }

    /// A sibling object named `name` in the same prefix.
    pub fn sibling(&self, name: &str) -> Self {
        let prefix = self.prefix();
        let identifier = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        Self {
            storage_namespace: self.storage_namespace.clone(),
            identifier,
        }
    }
}

impl fmt::Display for ObjectPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.storage_namespace, self.identifier)
    }
}

impl TryFrom<String> for ObjectPointer {
    type Error = LocationError;

    fn try_from(location: String) -> Result<Self, Self::Error> {
        Self::parse(&location)
    }
}

impl From<ObjectPointer> for String {
    fn from(pointer: ObjectPointer) -> Self {
        pointer.location()
    }
}

impl FromStr for ObjectPointer {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("mem://lakeFS-bucket/one/two", "mem://lakeFS-bucket", "one/two")]
    #[case("s3://bucket/a", "s3://bucket", "a")]
    #[case("local://root/dir/with space/file.parquet", "local://root", "dir/with space/file.parquet")]
    #[case("mem://b/a//b", "mem://b", "a//b")]
    fn parse_splits_on_first_slash_after_scheme(
        #[case] location: &str,
        #[case] namespace: &str,
        #[case] identifier: &str,
    ) {
        let pointer = ObjectPointer::parse(location).unwrap();
        assert_eq!(pointer.storage_namespace(), namespace);
        assert_eq!(pointer.identifier(), identifier);
        assert_eq!(pointer.location(), location);
    }

    #[rstest]
    #[case("", LocationError::Empty)]
    #[case("bucket/key", LocationError::MissingScheme("bucket/key".into()))]
    #[case("://bucket/key", LocationError::MissingScheme("://bucket/key".into()))]
    #[case("mem:///key", LocationError::MissingRoot("mem:///key".into()))]
    #[case("mem://bucket", LocationError::MissingKey("mem://bucket".into()))]
    #[case("mem://bucket/", LocationError::MissingKey("mem://bucket/".into()))]
    fn parse_rejects_malformed_locations(#[case] location: &str, #[case] expected: LocationError) {
        assert_eq!(ObjectPointer::parse(location).unwrap_err(), expected);
    }

    #[test]
    fn new_normalizes_separators() {
        let a = ObjectPointer::new("mem://external-bucket/", "one/two");
        let b = ObjectPointer::new("mem://external-bucket", "/one/two");
        let c = ObjectPointer::parse("mem://external-bucket/one/two").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[rstest]
    #[case("mem://lakeFS-bucket/repo1/", "one/two")]
    #[case("mem://lakeFS-bucket/repo1", "/one/two")]
    #[case("mem://lakeFS-bucket/", "repo1/one/two")]
    #[case("mem://lakeFS-bucket/repo1/one", "two")]
    fn new_resplits_namespaces_with_a_path(#[case] namespace: &str, #[case] identifier: &str) {
        let pointer = ObjectPointer::new(namespace, identifier);
        assert_eq!(pointer.storage_namespace(), "mem://lakeFS-bucket");
        assert_eq!(pointer.identifier(), "repo1/one/two");
        assert_eq!(
            pointer,
            ObjectPointer::parse("mem://lakeFS-bucket/repo1/one/two").unwrap()
        );
    }

    #[test]
    fn serde_goes_through_the_location() {
        let pointer = ObjectPointer::new("mem://bucket/repo", "a/b");
        let json = serde_json::to_string(&pointer).unwrap();
        assert_eq!(json, r#""mem://bucket/repo/a/b""#);
        assert_eq!(serde_json::from_str::<ObjectPointer>(&json).unwrap(), pointer);
        assert!(serde_json::from_str::<ObjectPointer>(r#""bucket/key""#).is_err());
    }

    #[test]
    fn scheme_root_and_prefix() {
        let p = ObjectPointer::parse("s3://bucket/a/b/c.parquet").unwrap();
        assert_eq!(p.scheme(), "s3");
        assert_eq!(p.root(), "bucket");
        assert_eq!(p.prefix(), "a/b");
        assert_eq!(p.sibling("_SUCCESS").location(), "s3://bucket/a/b/_SUCCESS");

        let top = ObjectPointer::parse("s3://bucket/c.parquet").unwrap();
        assert_eq!(top.prefix(), "");
        assert_eq!(top.sibling("_SUCCESS").location(), "s3://bucket/_SUCCESS");
    }
}
