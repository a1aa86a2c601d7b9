//! ObjectStore trait definition
//!
//! This trait is the relocation engine's only boundary to the storage
//! service. Authentication, request signing, listing pagination and retries
//! all live behind it.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::path::ObjectLocation;

/// Metadata for an object or a listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    /// Key for lookups, name relative to the prefix for listing entries
    pub name: String,

    /// Size in bytes (zero for directories)
    pub size: u64,

    /// Whether this entry is a prefix or its marker
    pub is_dir: bool,

    /// ETag reported by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a file
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            is_dir: false,
            etag: None,
            last_modified: None,
        }
    }

    /// Create a new ObjectInfo for a directory/prefix
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            is_dir: true,
            etag: None,
            last_modified: None,
        }
    }
}

/// A byte range `[start, end)` of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// HTTP range header value; the header's end offset is inclusive
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end.saturating_sub(1))
    }
}

/// A completed part of a multipart copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartResult {
    pub part_number: i32,
    pub etag: String,
}

/// Trait for S3-compatible storage operations used by the relocator
///
/// This trait is implemented by the S3 adapter and can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Look up a single object; `Error::NotFound` when no object has this key
    async fn head_object(&self, location: &ObjectLocation) -> Result<ObjectInfo>;

    /// List a prefix: the prefix marker first, then its immediate children
    ///
    /// Child names are relative to the prefix. Empty when nothing lives
    /// under the prefix.
    async fn list_objects(&self, prefix: &ObjectLocation) -> Result<Vec<ObjectInfo>>;

    /// Delete a single object
    async fn delete_object(&self, location: &ObjectLocation) -> Result<()>;

    /// Server-side copy in one call
    async fn copy_object(&self, src: &ObjectLocation, dst: &ObjectLocation) -> Result<()>;

    /// Start a multipart upload at `dst`, returning its upload id
    async fn create_multipart_upload(&self, dst: &ObjectLocation) -> Result<String>;

    /// Copy one byte range of `src` as a part, returning the part's ETag
    async fn upload_part_copy(
        &self,
        src: &ObjectLocation,
        dst: &ObjectLocation,
        range: ByteRange,
        upload_id: &str,
        part_number: i32,
    ) -> Result<String>;

    /// Finalize a multipart upload; `parts` are in ascending part order
    async fn complete_multipart_upload(
        &self,
        dst: &ObjectLocation,
        upload_id: &str,
        parts: Vec<PartResult>,
    ) -> Result<()>;

    /// Release server-side state of an unfinished multipart upload
    async fn abort_multipart_upload(&self, dst: &ObjectLocation, upload_id: &str) -> Result<()>;
}
