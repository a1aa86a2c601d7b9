//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from mv-core.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use mv_core::{
    Alias, ByteRange, Error, ObjectInfo, ObjectLocation, ObjectStore, PartResult, Result,
};

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from an alias configuration
    pub async fn new(alias: Alias) -> Result<Self> {
        let retry = alias.retry_config();
        let timeout = alias.timeout_config();

        let credentials = aws_credential_types::Credentials::new(
            alias.access_key.clone(),
            alias.secret_key.clone(),
            None, // session token
            None, // expiry
            "s3mv-static-credentials",
        );

        let retry_config = aws_smithy_types::retry::RetryConfig::standard()
            .with_max_attempts(retry.max_attempts.max(1))
            .with_initial_backoff(Duration::from_millis(retry.initial_backoff_ms))
            .with_max_backoff(Duration::from_millis(retry.max_backoff_ms));

        let timeout_config = aws_smithy_types::timeout::TimeoutConfig::builder()
            .connect_timeout(Duration::from_millis(timeout.connect_ms))
            .read_timeout(Duration::from_millis(timeout.read_ms))
            .build();

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(alias.region.clone()))
            .endpoint_url(&alias.endpoint)
            .retry_config(retry_config)
            .timeout_config(timeout_config)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(alias.path_style())
            .build();

        tracing::debug!(
            alias = %alias.name,
            endpoint = %alias.endpoint,
            path_style = alias.path_style(),
            "created S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

/// Map an SDK failure onto the error taxonomy, naming `target` in NotFound
fn map_sdk_error<E, R>(err: SdkError<E, R>, target: &dyn Display) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().unwrap_or_default().to_string();
    let detail = DisplayErrorContext(&err).to_string();
    classify(&code, &detail, target)
}

/// Classify by error code; the rendered text is only consulted when there is no code
fn classify(code: &str, detail: &str, target: &dyn Display) -> Error {
    let is = |needle: &str| {
        if code.is_empty() {
            detail.contains(needle)
        } else {
            code == needle
        }
    };

    if is("NotFound") || is("NoSuchKey") || is("NoSuchBucket") || is("NoSuchUpload") {
        Error::NotFound(target.to_string())
    } else if is("AccessDenied") || is("Forbidden") || is("InvalidAccessKeyId") {
        Error::Auth(detail.to_string())
    } else {
        Error::Network(detail.to_string())
    }
}

/// Unreserved characters and the key separator pass through unescaped
const COPY_SOURCE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// URL-encoded `bucket/key` form expected by the CopySource headers
fn copy_source(src: &ObjectLocation) -> String {
    format!(
        "{}/{}",
        src.bucket,
        utf8_percent_encode(src.key.as_str(), COPY_SOURCE_ENCODE_SET)
    )
}

/// Assembles ListObjectsV2 pages into the relocator's listing shape:
/// the prefix marker first, then children sorted by key.
struct ListingBuilder {
    list_prefix: String,
    marker_name: String,
    marker_object: bool,
    // (sort key, entry): directories sort as `name/`, like the keys under them
    entries: Vec<(String, ObjectInfo)>,
}

impl ListingBuilder {
    fn new(prefix: &ObjectLocation) -> Self {
        Self {
            list_prefix: prefix.key.as_prefix(),
            marker_name: prefix.key.file_name().to_string(),
            marker_object: false,
            entries: Vec::new(),
        }
    }

    fn add_common_prefix(&mut self, common: &str) {
        let Some(rest) = common.strip_prefix(self.list_prefix.as_str()) else {
            return;
        };
        let name = rest.trim_end_matches('/');
        if !name.is_empty() {
            self.entries.push((rest.to_string(), ObjectInfo::dir(name)));
        }
    }

    /// Add an object whose `name` is its full key
    fn add_object(&mut self, mut info: ObjectInfo) {
        let Some(rest) = info.name.strip_prefix(self.list_prefix.as_str()) else {
            return;
        };
        // The `prefix/` marker object some tools create stands in for the
        // synthesized marker rather than appearing as a child.
        if rest.is_empty() {
            self.marker_object = true;
            return;
        }
        info.name = rest.to_string();
        self.entries.push((info.name.clone(), info));
    }

    /// Empty only when the prefix has neither children nor a marker object
    fn finish(mut self) -> Vec<ObjectInfo> {
        if self.entries.is_empty() && !self.marker_object {
            return Vec::new();
        }

        self.entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut listing = Vec::with_capacity(self.entries.len() + 1);
        listing.push(ObjectInfo::dir(self.marker_name));
        listing.extend(self.entries.into_iter().map(|(_, info)| info));
        listing
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn head_object(&self, location: &ObjectLocation) -> Result<ObjectInfo> {
        // The bucket root is never an object.
        if location.key.is_root() {
            return Err(Error::NotFound(location.to_string()));
        }

        let response = self
            .inner
            .head_object()
            .bucket(&location.bucket)
            .key(location.key.as_str())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, location))?;

        let size = response.content_length().unwrap_or(0).max(0) as u64;
        let mut info = ObjectInfo::file(location.key.as_str(), size);

        if let Some(modified) = response.last_modified() {
            info.last_modified = jiff::Timestamp::from_second(modified.secs()).ok();
        }

        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }

        Ok(info)
    }

    async fn list_objects(&self, prefix: &ObjectLocation) -> Result<Vec<ObjectInfo>> {
        let mut builder = ListingBuilder::new(prefix);
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .inner
                .list_objects_v2()
                .bucket(&prefix.bucket)
                .delimiter("/");

            if !builder.list_prefix.is_empty() {
                request = request.prefix(&builder.list_prefix);
            }

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| map_sdk_error(e, prefix))?;

            for common in response.common_prefixes() {
                if let Some(p) = common.prefix() {
                    builder.add_common_prefix(p);
                }
            }

            for object in response.contents() {
                let size = object.size().unwrap_or(0).max(0) as u64;
                let mut info = ObjectInfo::file(object.key().unwrap_or_default(), size);
                if let Some(modified) = object.last_modified() {
                    info.last_modified = jiff::Timestamp::from_second(modified.secs()).ok();
                }
                if let Some(etag) = object.e_tag() {
                    info.etag = Some(etag.trim_matches('"').to_string());
                }
                builder.add_object(info);
            }

            continuation_token = match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => Some(token.to_string()),
                _ => None,
            };
            if continuation_token.is_none() {
                break;
            }
        }

        let listing = builder.finish();
        tracing::debug!(%prefix, entries = listing.len(), "listed prefix");
        Ok(listing)
    }

    async fn delete_object(&self, location: &ObjectLocation) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&location.bucket)
            .key(location.key.as_str())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, location))?;

        Ok(())
    }

    async fn copy_object(&self, src: &ObjectLocation, dst: &ObjectLocation) -> Result<()> {
        self.inner
            .copy_object()
            .copy_source(copy_source(src))
            .bucket(&dst.bucket)
            .key(dst.key.as_str())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, src))?;

        Ok(())
    }

    async fn create_multipart_upload(&self, dst: &ObjectLocation) -> Result<String> {
        let response = self
            .inner
            .create_multipart_upload()
            .bucket(&dst.bucket)
            .key(dst.key.as_str())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, dst))?;

        response
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::General(format!("{dst}: no upload id in response")))
    }

    async fn upload_part_copy(
        &self,
        src: &ObjectLocation,
        dst: &ObjectLocation,
        range: ByteRange,
        upload_id: &str,
        part_number: i32,
    ) -> Result<String> {
        let response = self
            .inner
            .upload_part_copy()
            .copy_source(copy_source(src))
            .copy_source_range(range.header_value())
            .bucket(&dst.bucket)
            .key(dst.key.as_str())
            .upload_id(upload_id)
            .part_number(part_number)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, src))?;

        response
            .copy_part_result()
            .and_then(|result| result.e_tag())
            .map(str::to_string)
            .ok_or_else(|| Error::General(format!("{dst}: part {part_number} returned no ETag")))
    }

    async fn complete_multipart_upload(
        &self,
        dst: &ObjectLocation,
        upload_id: &str,
        parts: Vec<PartResult>,
    ) -> Result<()> {
        let completed: Vec<CompletedPart> = parts
            .into_iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.etag)
                    .build()
            })
            .collect();

        self.inner
            .complete_multipart_upload()
            .bucket(&dst.bucket)
            .key(dst.key.as_str())
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| map_sdk_error(e, dst))?;

        Ok(())
    }

    async fn abort_multipart_upload(&self, dst: &ObjectLocation, upload_id: &str) -> Result<()> {
        self.inner
            .abort_multipart_upload()
            .bucket(&dst.bucket)
            .key(dst.key.as_str())
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, dst))?;

        Ok(())
    }
}
