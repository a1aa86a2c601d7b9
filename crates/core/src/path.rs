//! Path parsing and normalization
//!
//! Object keys travel between components as [`ObjectPath`], which never
//! carries a leading or trailing separator. User input arrives as
//! `alias/bucket/key` and is parsed into a [`RemotePath`].

use std::fmt;

use crate::error::{Error, Result};

/// Key separator used by the store's virtual directory namespace
pub const SEPARATOR: char = '/';

/// A normalized object key: no leading or trailing separators
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Create a path, trimming separators from both ends
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim_matches(SEPARATOR).to_string())
    }

    /// The empty path, i.e. the bucket root
    pub fn root() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a child name, keeping the result normalized
    pub fn join(&self, child: &str) -> Self {
        let child = child.trim_matches(SEPARATOR);
        if self.0.is_empty() {
            Self(child.to_string())
        } else if child.is_empty() {
            self.clone()
        } else {
            Self(format!("{}{SEPARATOR}{child}", self.0))
        }
    }

    /// Last path component
    pub fn file_name(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or_default()
    }

    /// The key as a listing prefix (`dir/`), empty for the root
    pub fn as_prefix(&self) -> String {
        if self.0.is_empty() {
            String::new()
        } else {
            format!("{}{SEPARATOR}", self.0)
        }
    }

    /// Whether this path equals `ancestor` or sits below it
    pub fn is_within(&self, ancestor: &ObjectPath) -> bool {
        self == ancestor || self.0.starts_with(&ancestor.as_prefix())
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ObjectPath {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// A bucket plus a normalized key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: ObjectPath,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<ObjectPath>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Location of a child entry under this one, in the same bucket
    pub fn join(&self, child: &str) -> Self {
        Self {
            bucket: self.bucket.clone(),
            key: self.key.join(child),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// A parsed command-line path pointing to an S3 location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Alias name
    pub alias: String,
    /// Bucket name
    pub bucket: String,
    /// Object key or prefix
    pub key: ObjectPath,
}

impl RemotePath {
    /// Create a new RemotePath
    pub fn new(
        alias: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<ObjectPath>,
    ) -> Self {
        Self {
            alias: alias.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// The store location this path refers to
    pub fn location(&self) -> ObjectLocation {
        ObjectLocation {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
        }
    }

    /// Get the full path as a string (alias/bucket/key)
    pub fn to_full_path(&self) -> String {
        if self.key.is_root() {
            format!("{}/{}", self.alias, self.bucket)
        } else {
            format!("{}/{}/{}", self.alias, self.bucket, self.key)
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_full_path())
    }
}

/// Parse `alias/bucket[/key]` into a RemotePath
///
/// Local filesystem paths are rejected; only server-side moves are supported.
pub fn parse_path(path: &str) -> Result<RemotePath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    if path.starts_with('/') || path.starts_with("./") || path.starts_with("../") {
        return Err(Error::InvalidPath(format!(
            "'{path}' is a local path. Use format: alias/bucket[/key]"
        )));
    }

    let parts: Vec<&str> = path.splitn(3, SEPARATOR).collect();
    let (alias, bucket, key) = match parts.as_slice() {
        [alias, bucket] => (*alias, *bucket, ""),
        [alias, bucket, key] => (*alias, *bucket, *key),
        _ => {
            return Err(Error::InvalidPath(format!(
                "Path '{path}' is incomplete. Use format: alias/bucket[/key]"
            )));
        }
    };

    if !is_valid_alias_name(alias) {
        return Err(Error::InvalidPath(format!("Invalid alias name: '{alias}'")));
    }

    if bucket.is_empty() {
        return Err(Error::InvalidPath("Bucket name cannot be empty".into()));
    }

    Ok(RemotePath::new(alias, bucket, key))
}

/// Check if a string is a valid alias name
pub fn is_valid_alias_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
