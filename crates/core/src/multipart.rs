//! Chunked server-side copy
//!
//! Objects too large for a single copy call are split into contiguous byte
//! ranges and copied as parts of a multipart upload. Parts run with bounded
//! concurrency; their ETags land in a slot table indexed by part number so
//! completion always lists them in ascending order.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::path::ObjectLocation;
use crate::traits::{ByteRange, ObjectStore, PartResult};

/// Default part size: 64 MiB
pub const DEFAULT_PART_SIZE: u64 = 64 * 1024 * 1024;

/// Minimum part size accepted by S3 for every part but the last: 5 MiB
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: u64 = 10_000;

/// Largest source a single copy call accepts; at or above it we copy in parts
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 5 * 1024 * 1024 * 1024;

/// Default number of part copies in flight
pub const DEFAULT_CONCURRENCY: usize = 4;

/// A single concrete object to copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    pub source: ObjectLocation,
    pub destination: ObjectLocation,
    pub total_size: u64,
}

/// One planned part: 1-based number plus its byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    pub part_number: i32,
    pub range: ByteRange,
}

/// Part size to use for an object, grown when the configured size would
/// need more than [`MAX_PARTS`] parts
pub fn effective_part_size(total_size: u64, part_size: u64) -> u64 {
    let part_size = part_size.clamp(1, MAX_PART_SIZE);
    if total_size.div_ceil(part_size) <= MAX_PARTS {
        part_size
    } else {
        total_size.div_ceil(MAX_PARTS).min(MAX_PART_SIZE)
    }
}

/// Number of parts needed for an object
pub fn calculate_parts(total_size: u64, part_size: u64) -> u64 {
    total_size.div_ceil(part_size)
}

/// Partition `[0, total_size)` into contiguous ranges of `part_size` bytes
///
/// The last part takes the remainder. A zero-length object yields no parts.
pub fn plan_parts(total_size: u64, part_size: u64) -> Vec<PartPlan> {
    let part_size = part_size.max(1);
    (0..calculate_parts(total_size, part_size))
        .map(|index| {
            let start = index * part_size;
            PartPlan {
                part_number: (index + 1) as i32,
                range: ByteRange {
                    start,
                    end: (start + part_size).min(total_size),
                },
            }
        })
        .collect()
}

/// An open multipart upload and the parts recorded against it
///
/// `complete` and `abort` both consume the session.
#[derive(Debug)]
pub struct MultipartSession {
    upload_id: String,
    destination: ObjectLocation,
    parts: Vec<Option<String>>,
}

impl MultipartSession {
    pub fn new(upload_id: String, destination: ObjectLocation, part_count: usize) -> Self {
        Self {
            upload_id,
            destination,
            parts: vec![None; part_count],
        }
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Record the ETag returned for a part
    pub fn record(&mut self, part_number: i32, etag: String) -> Result<()> {
        let planned = self.parts.len();
        let slot = usize::try_from(part_number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| self.parts.get_mut(index))
            .ok_or_else(|| {
                Error::General(format!(
                    "part number {part_number} is outside the planned 1..={planned}"
                ))
            })?;
        *slot = Some(etag);
        Ok(())
    }

    /// Whether every planned part has an ETag
    pub fn is_complete(&self) -> bool {
        self.parts.iter().all(Option::is_some)
    }

    /// Recorded parts in ascending part order, or an error naming the
    /// first part that is still missing
    pub fn completed_parts(&self) -> Result<Vec<PartResult>> {
        self.parts
            .iter()
            .enumerate()
            .map(|(index, etag)| {
                let part_number = (index + 1) as i32;
                etag.clone()
                    .map(|etag| PartResult { part_number, etag })
                    .ok_or_else(|| Error::General(format!("part {part_number} has no ETag")))
            })
            .collect()
    }

    /// Finalize the upload; only attempted once every part is recorded
    ///
    /// If completion is not possible the upload is aborted instead.
    pub async fn complete(self, store: &dyn ObjectStore) -> Result<()> {
        let parts = match self.completed_parts() {
            Ok(parts) => parts,
            Err(e) => {
                self.abort(store).await;
                return Err(e);
            }
        };

        let result = store
            .complete_multipart_upload(&self.destination, &self.upload_id, parts)
            .await;
        if let Err(e) = result {
            self.abort(store).await;
            return Err(e);
        }
        Ok(())
    }

    /// Release server-side state; failures are logged, not returned
    pub async fn abort(self, store: &dyn ObjectStore) {
        tracing::debug!(
            upload_id = %self.upload_id,
            destination = %self.destination,
            "aborting multipart copy"
        );
        if let Err(e) = store
            .abort_multipart_upload(&self.destination, &self.upload_id)
            .await
        {
            tracing::warn!(
                upload_id = %self.upload_id,
                destination = %self.destination,
                "failed to abort multipart upload: {e}"
            );
        }
    }
}

/// Copy an object part by part, aborting the upload on any failure
pub async fn copy_in_parts(
    store: &dyn ObjectStore,
    plan: &CopyPlan,
    part_size: u64,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let part_size = effective_part_size(plan.total_size, part_size);
    let parts = plan_parts(plan.total_size, part_size);
    if part_size < MIN_PART_SIZE && parts.len() > 1 {
        tracing::warn!(
            part_size,
            "part size is below the {MIN_PART_SIZE} byte minimum most stores enforce"
        );
    }

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let upload_id = store.create_multipart_upload(&plan.destination).await?;
    tracing::debug!(
        source = %plan.source,
        destination = %plan.destination,
        upload_id = %upload_id,
        parts = parts.len(),
        "started multipart copy"
    );

    let mut session = MultipartSession::new(upload_id, plan.destination.clone(), parts.len());

    if let Err(e) = copy_parts(store, plan, &parts, &mut session, concurrency, cancel).await {
        session.abort(store).await;
        return Err(e);
    }

    // Every part landed, but finalizing is new work.
    if cancel.is_cancelled() {
        session.abort(store).await;
        return Err(Error::Cancelled);
    }

    session.complete(store).await
}

/// Run every part copy and record results into the session
///
/// After the first failure no new part starts; parts already in flight are
/// drained and their results dropped.
async fn copy_parts(
    store: &dyn ObjectStore,
    plan: &CopyPlan,
    parts: &[PartPlan],
    session: &mut MultipartSession,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let stop = cancel.child_token();
    let upload_id = session.upload_id().to_string();

    let stop_ref = &stop;
    let upload_id_ref = upload_id.as_str();
    let mut results = futures::stream::iter(parts.iter().copied())
        .map(move |part| async move {
            if stop_ref.is_cancelled() {
                return (part.part_number, Err(Error::Cancelled));
            }
            let result = store
                .upload_part_copy(
                    &plan.source,
                    &plan.destination,
                    part.range,
                    upload_id_ref,
                    part.part_number,
                )
                .await;
            (part.part_number, result)
        })
        .buffer_unordered(concurrency.max(1));

    let mut first_error: Option<Error> = None;
    while let Some((part_number, result)) = results.next().await {
        match result {
            Ok(etag) if first_error.is_none() => {
                tracing::debug!(part_number, "part copied");
                session.record(part_number, etag)?;
            }
            Ok(_) => {}
            Err(e) => {
                if first_error.is_none() {
                    stop.cancel();
                    first_error = Some(match e {
                        Error::Cancelled => Error::Cancelled,
                        cause => Error::PartFailed {
                            part_number,
                            cause: Box::new(cause),
                        },
                    });
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None if !session.is_complete() => Err(Error::General(
            "multipart copy finished with missing parts".into(),
        )),
        None => Ok(()),
    }
}
