//! Relocation of objects and prefixes
//!
//! A move is copy-then-delete. A source that is not an object is treated as
//! a prefix and its children are moved one at a time, depth first, stopping
//! at the first failure. The source of an object is only deleted after its
//! copy is confirmed.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::multipart::{CopyPlan, copy_in_parts};
use crate::path::{ObjectLocation, ObjectPath};
use crate::resolve::{Resolution, resolve};
use crate::traits::{ObjectInfo, ObjectStore};

/// Switches recognized by a move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveOptions {
    /// Fail instead of falling back to prefix expansion when the source
    /// is not an object
    pub file_only: bool,
}

/// A single move request, paths already normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub source: ObjectPath,
    pub dest_bucket: String,
    pub dest: ObjectPath,
    pub options: MoveOptions,
}

impl MoveRequest {
    pub fn new(
        source: impl Into<ObjectPath>,
        dest_bucket: impl Into<String>,
        dest: impl Into<ObjectPath>,
        options: MoveOptions,
    ) -> Self {
        Self {
            source: source.into(),
            dest_bucket: dest_bucket.into(),
            dest: dest.into(),
            options,
        }
    }
}

/// Totals for a finished move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MoveSummary {
    pub objects: u64,
    pub bytes: u64,
}

impl MoveSummary {
    fn add(&mut self, other: MoveSummary) {
        self.objects += other.objects;
        self.bytes += other.bytes;
    }
}

/// One object that reached its destination and left its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedObject {
    pub source: ObjectLocation,
    pub destination: ObjectLocation,
    pub size: u64,
}

/// Callback invoked after each object is moved
pub type MoveObserver = Arc<dyn Fn(&MovedObject) + Send + Sync>;

/// Moves objects and prefixes out of one source bucket
pub struct Relocator {
    store: Arc<dyn ObjectStore>,
    source_bucket: String,
    transfer: TransferConfig,
    observer: Option<MoveObserver>,
}

impl Relocator {
    /// Create a relocator for `source_bucket`, validating the transfer settings
    pub fn new(
        store: Arc<dyn ObjectStore>,
        source_bucket: impl Into<String>,
        transfer: TransferConfig,
    ) -> Result<Self> {
        transfer.validate()?;
        Ok(Self {
            store,
            source_bucket: source_bucket.into(),
            transfer,
            observer: None,
        })
    }

    /// Register a callback for each moved object
    pub fn on_moved(mut self, observer: MoveObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn transfer(&self) -> &TransferConfig {
        &self.transfer
    }

    /// Move `source` to `dest_bucket/dest`
    pub async fn move_path(
        &self,
        source: &str,
        dest_bucket: &str,
        dest: &str,
        options: &MoveOptions,
        cancel: &CancellationToken,
    ) -> Result<MoveSummary> {
        let request = MoveRequest::new(source, dest_bucket, dest, *options);
        self.execute(&request, cancel).await
    }

    /// Run a move request to completion or first failure
    pub async fn execute(
        &self,
        request: &MoveRequest,
        cancel: &CancellationToken,
    ) -> Result<MoveSummary> {
        let source = ObjectLocation::new(self.source_bucket.clone(), request.source.clone());
        let destination = ObjectLocation::new(request.dest_bucket.clone(), request.dest.clone());
        // Copying onto itself and then deleting would lose the source.
        if source.bucket == destination.bucket && destination.key.is_within(&source.key) {
            return Err(Error::InvalidOperation(format!(
                "cannot move {source} into itself ({destination})"
            )));
        }
        self.relocate(source, destination, request.options, cancel).await
    }

    // Boxed because prefixes recurse into this for every child.
    fn relocate<'a>(
        &'a self,
        source: ObjectLocation,
        destination: ObjectLocation,
        options: MoveOptions,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<MoveSummary>> {
        async move {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match resolve(self.store.as_ref(), &source).await? {
                Resolution::Object(info) => {
                    self.move_object(&info, source, destination, cancel).await
                }
                Resolution::Prefix if options.file_only => Err(Error::InvalidOperation(
                    format!("{source}: not found (file-only move does not expand prefixes)"),
                )),
                Resolution::Prefix => {
                    self.expand_directory(&source, &destination, options, cancel)
                        .await
                }
            }
        }
        .boxed()
    }

    /// Move every child of a prefix, stopping at the first failure
    async fn expand_directory(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
        options: MoveOptions,
        cancel: &CancellationToken,
    ) -> Result<MoveSummary> {
        let listing = self.store.list_objects(source).await?;
        if listing.is_empty() {
            return Err(Error::NotFound(format!("{source}: not found")));
        }

        tracing::debug!(%source, children = listing.len() - 1, "expanding prefix");

        let mut summary = MoveSummary::default();
        // The first entry is the prefix marker itself.
        for child in listing.iter().skip(1) {
            let child_source = source.join(&child.name);
            let child_destination = destination.join(&child.name);

            match self
                .relocate(child_source.clone(), child_destination, options, cancel)
                .await
            {
                Ok(moved) => summary.add(moved),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    return Err(Error::ChildMoveFailed {
                        child: child_source.to_string(),
                        cause: Box::new(e),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Copy one object, then delete its source
    async fn move_object(
        &self,
        info: &ObjectInfo,
        source: ObjectLocation,
        destination: ObjectLocation,
        cancel: &CancellationToken,
    ) -> Result<MoveSummary> {
        let plan = CopyPlan {
            source,
            destination,
            total_size: info.size,
        };

        if let Err(e) = self.copy(&plan, cancel).await {
            return Err(match e {
                Error::Cancelled => Error::Cancelled,
                cause => Error::CopyFailed {
                    from: plan.source.to_string(),
                    to: plan.destination.to_string(),
                    cause: Box::new(cause),
                },
            });
        }

        // The copy is done: finish the delete even if cancellation arrived
        // meanwhile, so the object does not end up in both places.
        if let Err(cause) = self.delete_source(&plan.source).await {
            return Err(Error::DeleteFailed {
                from: plan.source.to_string(),
                to: plan.destination.to_string(),
                cause: Box::new(cause),
            });
        }

        tracing::info!(
            source = %plan.source,
            destination = %plan.destination,
            size = plan.total_size,
            "moved"
        );

        if let Some(observer) = &self.observer {
            observer(&MovedObject {
                source: plan.source,
                destination: plan.destination,
                size: plan.total_size,
            });
        }

        Ok(MoveSummary {
            objects: 1,
            bytes: info.size,
        })
    }

    /// Pick single-call or chunked copy by size
    async fn copy(&self, plan: &CopyPlan, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Zero-length objects always take the single-call path.
        if plan.total_size > 0 && plan.total_size >= self.transfer.multipart_threshold {
            tracing::debug!(
                source = %plan.source,
                size = plan.total_size,
                part_size = self.transfer.part_size,
                "copying in parts"
            );
            copy_in_parts(
                self.store.as_ref(),
                plan,
                self.transfer.part_size,
                self.transfer.concurrency,
                cancel,
            )
            .await
        } else {
            self.store.copy_object(&plan.source, &plan.destination).await
        }
    }

    async fn delete_source(&self, source: &ObjectLocation) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.store.delete_object(source).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.transfer.delete_attempts => {
                    tracing::warn!(%source, attempt, "delete failed, retrying: {e}");
                    tokio::time::sleep(Duration::from_millis(self.transfer.delete_backoff_ms))
                        .await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
