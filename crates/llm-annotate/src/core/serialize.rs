//! Byte and directory round-trips for a component's persistable collaborators.
//!
//! A component persists only what its task and backend can persist, each as an
//! independently named segment (`task`, `backend`). Collaborators without the
//! [`Persist`] capability are left out. Both directions honor the same
//! `exclude` list, so leaving a segment out on save and on load is symmetric.

use anyhow::Context;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use indexmap::IndexMap;
use std::{fs, path::Path};
use tracing::debug;

use crate::{LlmComponent, SerializationError, WorkItem};

pub const TASK_SEGMENT: &str = "task";
pub const BACKEND_SEGMENT: &str = "backend";

/// Persistence capability of a task or backend.
///
/// Only the byte form is required. The directory form defaults to a single
/// file holding those bytes.
pub trait Persist {
    fn to_bytes(&self, exclude: &[&str]) -> anyhow::Result<Vec<u8>>;

    fn from_bytes(&mut self, data: &[u8], exclude: &[&str]) -> anyhow::Result<()>;

    fn to_disk(&self, path: &Path, exclude: &[&str]) -> anyhow::Result<()> {
        let bytes = self.to_bytes(exclude)?;
        fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
    }

    fn from_disk(&mut self, path: &Path, exclude: &[&str]) -> anyhow::Result<()> {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        self.from_bytes(&bytes, exclude)
    }
}

fn is_excluded(exclude: &[&str], segment: &str) -> bool {
    exclude.contains(&segment)
}

/// Collects named byte segments into one opaque container.
struct SegmentWriter<'a> {
    exclude: &'a [&'a str],
    segments: IndexMap<String, String>,
}

impl<'a> SegmentWriter<'a> {
    fn new(exclude: &'a [&'a str]) -> Self {
        Self {
            exclude,
            segments: IndexMap::new(),
        }
    }

    fn write(
        &mut self,
        segment: &str,
        produce: impl FnOnce() -> anyhow::Result<Vec<u8>>,
    ) -> Result<(), SerializationError> {
        if is_excluded(self.exclude, segment) {
            debug!(segment, "segment excluded from serialization");
            return Ok(());
        }
        let bytes = produce().map_err(|err| SerializationError::segment(segment, err))?;
        self.segments
            .insert(segment.to_string(), STANDARD.encode(bytes));
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec(&self.segments)?)
    }
}

/// Reads the container produced by [`SegmentWriter`].
struct SegmentReader<'a> {
    exclude: &'a [&'a str],
    segments: IndexMap<String, String>,
}

impl<'a> SegmentReader<'a> {
    fn parse(data: &[u8], exclude: &'a [&'a str]) -> Result<Self, SerializationError> {
        Ok(Self {
            exclude,
            segments: serde_json::from_slice(data)?,
        })
    }

    /// Hands the segment's bytes to `consume`. Excluded and absent segments are
    /// skipped.
    fn read(
        &self,
        segment: &str,
        consume: impl FnOnce(&[u8]) -> anyhow::Result<()>,
    ) -> Result<(), SerializationError> {
        if is_excluded(self.exclude, segment) {
            debug!(segment, "segment excluded from deserialization");
            return Ok(());
        }
        let Some(encoded) = self.segments.get(segment) else {
            debug!(segment, "segment absent from container");
            return Ok(());
        };
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|source| SerializationError::Base64 {
                segment: segment.to_string(),
                source,
            })?;
        consume(&bytes).map_err(|err| SerializationError::segment(segment, err))
    }
}

impl<I: WorkItem> LlmComponent<I> {
    /// Serializes the persistable collaborators into one byte string.
    #[tracing::instrument(
        name = "llm.component.to_bytes",
        level = "debug",
        skip(self),
        fields(component = %self.name())
    )]
    pub fn to_bytes(&self, exclude: &[&str]) -> Result<Vec<u8>, SerializationError> {
        let mut writer = SegmentWriter::new(exclude);
        if let Some(task) = self.task_persistence() {
            writer.write(TASK_SEGMENT, || task.to_bytes(exclude))?;
        }
        if let Some(backend) = self.backend_persistence() {
            writer.write(BACKEND_SEGMENT, || backend.to_bytes(exclude))?;
        }
        writer.finish()
    }

    /// Restores collaborator state from [`to_bytes`](LlmComponent::to_bytes) output.
    #[tracing::instrument(
        name = "llm.component.from_bytes",
        level = "debug",
        skip(self, data),
        fields(component = %self.name(), len = data.len())
    )]
    pub fn from_bytes(
        &mut self,
        data: &[u8],
        exclude: &[&str],
    ) -> Result<&mut Self, SerializationError> {
        let reader = SegmentReader::parse(data, exclude)?;
        if let Some(task) = self.task_persistence_mut() {
            reader.read(TASK_SEGMENT, |bytes| task.from_bytes(bytes, exclude))?;
        }
        if let Some(backend) = self.backend_persistence_mut() {
            reader.read(BACKEND_SEGMENT, |bytes| backend.from_bytes(bytes, exclude))?;
        }
        Ok(self)
    }

    /// Writes each persistable collaborator to `path/<segment>`.
    #[tracing::instrument(
        name = "llm.component.to_disk",
        level = "debug",
        skip(self),
        fields(component = %self.name())
    )]
    pub fn to_disk(&self, path: &Path, exclude: &[&str]) -> Result<(), SerializationError> {
        fs::create_dir_all(path).map_err(|source| SerializationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(task) = self.task_persistence()
            && !is_excluded(exclude, TASK_SEGMENT)
        {
            task.to_disk(&path.join(TASK_SEGMENT), exclude)
                .map_err(|err| SerializationError::segment(TASK_SEGMENT, err))?;
        }
        if let Some(backend) = self.backend_persistence()
            && !is_excluded(exclude, BACKEND_SEGMENT)
        {
            backend
                .to_disk(&path.join(BACKEND_SEGMENT), exclude)
                .map_err(|err| SerializationError::segment(BACKEND_SEGMENT, err))?;
        }
        Ok(())
    }

    /// Reads collaborator state written by [`to_disk`](LlmComponent::to_disk).
    /// Segments missing on disk are skipped.
    #[tracing::instrument(
        name = "llm.component.from_disk",
        level = "debug",
        skip(self),
        fields(component = %self.name())
    )]
    pub fn from_disk(
        &mut self,
        path: &Path,
        exclude: &[&str],
    ) -> Result<&mut Self, SerializationError> {
        let task_path = path.join(TASK_SEGMENT);
        if let Some(task) = self.task_persistence_mut()
            && !is_excluded(exclude, TASK_SEGMENT)
            && task_path.exists()
        {
            task.from_disk(&task_path, exclude)
                .map_err(|err| SerializationError::segment(TASK_SEGMENT, err))?;
        }
        let backend_path = path.join(BACKEND_SEGMENT);
        if let Some(backend) = self.backend_persistence_mut()
            && !is_excluded(exclude, BACKEND_SEGMENT)
            && backend_path.exists()
        {
            backend
                .from_disk(&backend_path, exclude)
                .map_err(|err| SerializationError::segment(BACKEND_SEGMENT, err))?;
        }
        Ok(self)
    }
}
