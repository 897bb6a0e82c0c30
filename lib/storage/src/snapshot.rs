// Snapshot and manifest files of a collection directory
use crate::internal;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use quiver_core::{CollectionSchema, Doc, Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub const MANIFEST_FILE: &str = "MANIFEST";
pub const SNAPSHOT_FILE: &str = "collection.snap";
pub const WAL_FILE: &str = "wal.log";

/// Highest on-disk format this build reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

/// Small JSON file naming the collection and the current generation. Its
/// presence marks a directory as a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub name: String,
    pub generation: u64,
}

impl Manifest {
    pub fn new(name: impl Into<String>, generation: u64) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            name: name.into(),
            generation,
        }
    }
}

/// Full collection state at one generation.
#[derive(Debug, Deserialize)]
pub struct Snapshot {
    pub generation: u64,
    pub schema: CollectionSchema,
    pub next_doc_id: u64,
    pub docs: Vec<Doc>,
}

// Serialized form of `Snapshot` that borrows the documents.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    generation: u64,
    schema: &'a CollectionSchema,
    next_doc_id: u64,
    docs: Vec<&'a Doc>,
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(bytes))
        .map_err(internal(format!("write {}", path.display())))
}

pub fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(manifest).map_err(internal("encode manifest"))?;
    write_atomic(&dir.join(MANIFEST_FILE), &bytes)
}

/// Read the manifest. A directory without one is not a collection.
pub fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(Error::NotFound(format!(
            "no collection found at {}",
            dir.display()
        )));
    }
    let bytes = std::fs::read(&path)?;
    let manifest: Manifest = serde_json::from_slice(&bytes).map_err(internal("decode manifest"))?;
    if manifest.format_version > FORMAT_VERSION {
        return Err(Error::NotSupported(format!(
            "collection format {} is newer than supported format {}",
            manifest.format_version, FORMAT_VERSION
        )));
    }
    Ok(manifest)
}

pub fn write_snapshot(
    dir: &Path,
    generation: u64,
    schema: &CollectionSchema,
    next_doc_id: u64,
    docs: &[Arc<Doc>],
) -> Result<()> {
    let snapshot = SnapshotRef {
        generation,
        schema,
        next_doc_id,
        docs: docs.iter().map(|d| d.as_ref()).collect(),
    };
    let bytes = bincode::serialize(&snapshot).map_err(internal("encode snapshot"))?;
    write_atomic(&dir.join(SNAPSHOT_FILE), &bytes)
}

pub fn read_snapshot(dir: &Path) -> Result<Snapshot> {
    let path = dir.join(SNAPSHOT_FILE);
    if !path.is_file() {
        return Err(Error::Internal(format!(
            "snapshot missing at {}",
            path.display()
        )));
    }
    let bytes = std::fs::read(&path)?;
    bincode::deserialize(&bytes).map_err(internal("decode snapshot"))
}
