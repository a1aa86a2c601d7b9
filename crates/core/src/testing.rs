//! In-memory ObjectStore for relocation tests

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::path::{ObjectLocation, SEPARATOR};
use crate::traits::{ByteRange, ObjectInfo, ObjectStore, PartResult};

/// A store call, recorded in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Head(String),
    List(String),
    Delete(String),
    Copy { from: String, to: String },
    Initiate(String),
    CopyPart { part_number: i32, range: ByteRange },
    PartDone(i32),
    Complete(Vec<i32>),
    Abort(String),
}

struct Upload {
    destination: ObjectLocation,
    parts: HashMap<i32, (String, Vec<u8>)>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(String, String), Vec<u8>>,
    uploads: HashMap<String, Upload>,
    next_upload: u32,
    calls: Vec<Call>,
    failing_copies: HashSet<String>,
    failing_deletes: HashMap<String, u32>,
    failing_heads: HashSet<String>,
    failing_parts: HashSet<i32>,
    fail_complete: bool,
    part_delays: HashMap<i32, Duration>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.lock()
            .objects
            .insert((bucket.to_string(), key.to_string()), data.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn exists(&self, bucket: &str, key: &str) -> bool {
        self.object(bucket, key).is_some()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn open_uploads(&self) -> usize {
        self.lock().uploads.len()
    }

    /// Make the copy whose source key is `key` fail
    pub fn fail_copy_of(&self, key: &str) {
        self.lock().failing_copies.insert(key.to_string());
    }

    /// Make the next `times` deletes of `key` fail
    pub fn fail_delete_of(&self, key: &str, times: u32) {
        self.lock().failing_deletes.insert(key.to_string(), times);
    }

    pub fn fail_head_of(&self, key: &str) {
        self.lock().failing_heads.insert(key.to_string());
    }

    pub fn fail_part(&self, part_number: i32) {
        self.lock().failing_parts.insert(part_number);
    }

    pub fn fail_complete(&self) {
        self.lock().fail_complete = true;
    }

    pub fn delay_part(&self, part_number: i32, delay: Duration) {
        self.lock().part_delays.insert(part_number, delay);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn key(location: &ObjectLocation) -> (String, String) {
        (location.bucket.clone(), location.key.as_str().to_string())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, location: &ObjectLocation) -> Result<ObjectInfo> {
        let mut state = self.lock();
        state.calls.push(Call::Head(location.to_string()));
        if state.failing_heads.contains(location.key.as_str()) {
            return Err(Error::Network("head timed out".into()));
        }
        let size = state.objects.get(&Self::key(location)).map(Vec::len);
        size.map(|size| ObjectInfo::file(location.key.as_str(), size as u64))
            .ok_or_else(|| Error::NotFound(location.to_string()))
    }

    async fn list_objects(&self, prefix: &ObjectLocation) -> Result<Vec<ObjectInfo>> {
        let mut state = self.lock();
        state.calls.push(Call::List(prefix.to_string()));

        let dir = prefix.key.as_prefix();
        let mut children: BTreeMap<String, ObjectInfo> = BTreeMap::new();
        let mut marker_object = false;
        for ((bucket, key), data) in &state.objects {
            if bucket != &prefix.bucket {
                continue;
            }
            let Some(rest) = key.strip_prefix(&dir) else {
                continue;
            };
            if rest.is_empty() {
                marker_object = true;
                continue;
            }
            match rest.split_once(SEPARATOR) {
                Some((name, _)) => {
                    children.insert(name.to_string(), ObjectInfo::dir(name));
                }
                None => {
                    children.insert(rest.to_string(), ObjectInfo::file(rest, data.len() as u64));
                }
            }
        }

        if children.is_empty() && !marker_object {
            return Ok(Vec::new());
        }

        let mut listing = vec![ObjectInfo::dir(prefix.key.file_name())];
        listing.extend(children.into_values());
        Ok(listing)
    }

    async fn delete_object(&self, location: &ObjectLocation) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call::Delete(location.to_string()));
        if let Some(remaining) = state.failing_deletes.get_mut(location.key.as_str()) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Network("delete throttled".into()));
            }
        }
        state.objects.remove(&Self::key(location));
        Ok(())
    }

    async fn copy_object(&self, src: &ObjectLocation, dst: &ObjectLocation) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call::Copy {
            from: src.to_string(),
            to: dst.to_string(),
        });
        if state.failing_copies.contains(src.key.as_str()) {
            return Err(Error::Network("copy rejected".into()));
        }
        let data = state
            .objects
            .get(&Self::key(src))
            .cloned()
            .ok_or_else(|| Error::NotFound(src.to_string()))?;
        state.objects.insert(Self::key(dst), data);
        Ok(())
    }

    async fn create_multipart_upload(&self, dst: &ObjectLocation) -> Result<String> {
        let mut state = self.lock();
        state.calls.push(Call::Initiate(dst.to_string()));
        state.next_upload += 1;
        let upload_id = format!("upload-{}", state.next_upload);
        state.uploads.insert(
            upload_id.clone(),
            Upload {
                destination: dst.clone(),
                parts: HashMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part_copy(
        &self,
        src: &ObjectLocation,
        _dst: &ObjectLocation,
        range: ByteRange,
        upload_id: &str,
        part_number: i32,
    ) -> Result<String> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(Call::CopyPart { part_number, range });
            state.part_delays.get(&part_number).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.calls.push(Call::PartDone(part_number));
        if state.failing_parts.contains(&part_number) {
            return Err(Error::Network(format!("part {part_number} rejected")));
        }
        let bytes = match state.objects.get(&Self::key(src)) {
            Some(data) => data[range.start as usize..range.end as usize].to_vec(),
            None => return Err(Error::NotFound(src.to_string())),
        };
        let etag = format!("\"{upload_id}-{part_number}-{}\"", bytes.len());
        let upload = state
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| Error::NotFound(format!("upload {upload_id}")))?;
        upload.parts.insert(part_number, (etag.clone(), bytes));
        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        dst: &ObjectLocation,
        upload_id: &str,
        parts: Vec<PartResult>,
    ) -> Result<()> {
        let mut state = self.lock();
        state
            .calls
            .push(Call::Complete(parts.iter().map(|p| p.part_number).collect()));
        if state.fail_complete {
            return Err(Error::Network("complete failed".into()));
        }

        let upload = state
            .uploads
            .remove(upload_id)
            .ok_or_else(|| Error::NotFound(format!("upload {upload_id}")))?;
        assert_eq!(&upload.destination, dst);

        let numbers: BTreeSet<i32> = parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers.len(), parts.len(), "duplicate part numbers");

        let mut data = Vec::new();
        for part in &parts {
            let (etag, bytes) = upload
                .parts
                .get(&part.part_number)
                .ok_or_else(|| Error::General(format!("part {} missing", part.part_number)))?;
            if etag != &part.etag {
                return Err(Error::General(format!("ETag mismatch for part {}", part.part_number)));
            }
            data.extend_from_slice(bytes);
        }
        state.objects.insert(Self::key(dst), data);
        Ok(())
    }

    async fn abort_multipart_upload(&self, dst: &ObjectLocation, upload_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call::Abort(dst.to_string()));
        state.uploads.remove(upload_id);
        Ok(())
    }
}
