use crate::internal;
use crate::snapshot::{self, Manifest, WAL_FILE};
use crate::wal::WriteAheadLog;
use parking_lot::Mutex;
use quiver_core::{
    Collection, CollectionOptions, CollectionSchema, CollectionStats, CreateIndexOptions, Doc,
    Error, FieldSchema, GroupByVectorQuery, GroupResult, IndexParams, Mutation, OptimizeOptions,
    Operator, Result, VectorQuery,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A collection bound to a directory on disk.
///
/// DML batches go to the in-memory engine and then to the write-ahead log.
/// Schema changes and `optimize` write a new snapshot at the next generation
/// and restart the log. If logging or checkpointing fails after the engine
/// changed, the collection refuses every later call with
/// `FailedPrecondition`; reopening recovers the durable state.
pub struct StoredCollection {
    path: PathBuf,
    options: CollectionOptions,
    engine: Collection,
    // None when opened read-only or after destroy.
    wal: Mutex<Option<WriteAheadLog>>,
    generation: AtomicU64,
    destroyed: AtomicBool,
    failed: AtomicBool,
}

impl StoredCollection {
    /// Create a new collection directory and open it.
    pub fn create_and_open<P: AsRef<Path>>(
        path: P,
        schema: CollectionSchema,
        options: CollectionOptions,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if options.read_only {
            return Err(Error::InvalidArgument(
                "cannot create a collection in read-only mode".to_string(),
            ));
        }
        if path.exists() && !is_empty_dir(&path)? {
            return Err(Error::AlreadyExists(format!(
                "path {} already exists",
                path.display()
            )));
        }
        let engine = Collection::new(schema)?;

        fs::create_dir_all(&path)?;
        let generation = 1;
        let (schema, next_doc_id, docs) = engine.export();
        snapshot::write_snapshot(&path, generation, &schema, next_doc_id, &docs)?;
        let wal = WriteAheadLog::create(path.join(WAL_FILE), generation, options.max_buffer_size)?;
        snapshot::write_manifest(&path, &Manifest::new(schema.name(), generation))?;

        info!("Created collection '{}' at {:?}", schema.name(), path);
        Ok(Self {
            path,
            options,
            engine,
            wal: Mutex::new(Some(wal)),
            generation: AtomicU64::new(generation),
            destroyed: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        })
    }

    /// Open an existing collection directory, replaying its log.
    pub fn open<P: AsRef<Path>>(path: P, options: CollectionOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let manifest = snapshot::read_manifest(&path)?;
        let snap = snapshot::read_snapshot(&path)?;
        if snap.generation != manifest.generation {
            warn!(
                "Manifest generation {} differs from snapshot generation {} in {:?}",
                manifest.generation, snap.generation, path
            );
        }
        let generation = snap.generation;
        let engine = Collection::restore(snap.schema, snap.next_doc_id, snap.docs);

        let wal_path = path.join(WAL_FILE);
        let contents = WriteAheadLog::read(&wal_path)?;
        let current = contents.generation == Some(generation);
        if current {
            let replayed: usize = contents.records.iter().map(|r| r.mutations.len()).sum();
            for record in &contents.records {
                engine.apply(record.mutations.clone());
            }
            if replayed > 0 {
                debug!("Replayed {} mutations from {:?}", replayed, wal_path);
            }
        } else if contents.generation.is_some() {
            debug!("Ignoring stale log {:?}", wal_path);
        }

        let wal = if options.read_only {
            None
        } else if current {
            Some(WriteAheadLog::open_append(&wal_path, &contents, options.max_buffer_size)?)
        } else {
            Some(WriteAheadLog::create(&wal_path, generation, options.max_buffer_size)?)
        };

        info!(
            "Opened collection '{}' at {:?} ({} docs)",
            manifest.name,
            path,
            engine.count()
        );
        Ok(Self {
            path,
            options,
            engine,
            wal: Mutex::new(wal),
            generation: AtomicU64::new(generation),
            destroyed: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    pub fn schema(&self) -> Result<CollectionSchema> {
        self.ensure_live()?;
        Ok(self.engine.schema())
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> Result<CollectionStats> {
        self.ensure_live()?;
        let mut details = self.engine.describe();
        details["generation"] = self.generation().into();
        details["read_only"] = self.options.read_only.into();
        let doc_count = self.engine.count() as u64;
        let memory_usage = self.engine.memory_usage();
        Ok(CollectionStats {
            doc_count,
            memory_usage,
            json_details: serde_json::to_string(&details).map_err(internal("encode stats"))?,
        })
    }

    // ------------------------------------------------------------------
    // DML
    // ------------------------------------------------------------------

    /// Apply one DML batch. Per-row outcomes come back in input order; the
    /// outer error covers failures that affect the whole batch.
    pub fn write(&self, op: Operator, docs: Vec<Doc>) -> Result<Vec<Result<()>>> {
        self.ensure_writable()?;
        let wal = self.wal.lock();
        let batch = self.engine.write(op, docs);
        self.log(wal.as_ref(), batch.mutations)?;
        Ok(batch.results)
    }

    pub fn insert(&self, docs: Vec<Doc>) -> Result<Vec<Result<()>>> {
        self.write(Operator::Insert, docs)
    }

    pub fn upsert(&self, docs: Vec<Doc>) -> Result<Vec<Result<()>>> {
        self.write(Operator::Upsert, docs)
    }

    pub fn update(&self, docs: Vec<Doc>) -> Result<Vec<Result<()>>> {
        self.write(Operator::Update, docs)
    }

    pub fn delete<S: AsRef<str>>(&self, pks: &[S]) -> Result<Vec<Result<()>>> {
        self.ensure_writable()?;
        let wal = self.wal.lock();
        let batch = self.engine.delete(pks);
        self.log(wal.as_ref(), batch.mutations)?;
        Ok(batch.results)
    }

    pub fn delete_by_filter(&self, filter: &str) -> Result<()> {
        self.ensure_writable()?;
        let wal = self.wal.lock();
        let mutations = self.engine.delete_by_filter(filter)?;
        debug!("Filter '{}' deleted {} documents", filter, mutations.len());
        self.log(wal.as_ref(), mutations)
    }

    // ------------------------------------------------------------------
    // DQL
    // ------------------------------------------------------------------

    pub fn query(&self, query: &VectorQuery) -> Result<Vec<Arc<Doc>>> {
        self.ensure_live()?;
        self.engine.query(query)
    }

    pub fn group_by_query(&self, query: &GroupByVectorQuery) -> Result<Vec<GroupResult>> {
        self.ensure_live()?;
        self.engine.group_by_query(query)
    }

    pub fn fetch<S: AsRef<str>>(&self, pks: &[S]) -> Result<Vec<(String, Arc<Doc>)>> {
        self.ensure_live()?;
        Ok(self.engine.fetch(pks))
    }

    // ------------------------------------------------------------------
    // DDL
    // ------------------------------------------------------------------

    pub fn create_index(
        &self,
        column: &str,
        params: IndexParams,
        options: CreateIndexOptions,
    ) -> Result<()> {
        self.ensure_writable()?;
        let wal = self.wal.lock();
        self.engine.create_index(column, params, options)?;
        self.checkpoint(wal.as_ref())
    }

    pub fn drop_index(&self, column: &str) -> Result<()> {
        self.ensure_writable()?;
        let wal = self.wal.lock();
        self.engine.drop_index(column)?;
        self.checkpoint(wal.as_ref())
    }

    pub fn add_column(&self, field: FieldSchema, expression: &str) -> Result<()> {
        self.ensure_writable()?;
        let wal = self.wal.lock();
        self.engine.add_column(field, expression)?;
        self.checkpoint(wal.as_ref())
    }

    pub fn drop_column(&self, name: &str) -> Result<()> {
        self.ensure_writable()?;
        let wal = self.wal.lock();
        self.engine.drop_column(name)?;
        self.checkpoint(wal.as_ref())
    }

    pub fn alter_column(
        &self,
        name: &str,
        rename: Option<&str>,
        new_schema: Option<FieldSchema>,
    ) -> Result<()> {
        self.ensure_writable()?;
        let wal = self.wal.lock();
        self.engine.alter_column(name, rename, new_schema)?;
        self.checkpoint(wal.as_ref())
    }

    pub fn optimize(&self, options: OptimizeOptions) -> Result<()> {
        self.ensure_writable()?;
        let wal = self.wal.lock();
        self.engine.optimize(options)?;
        self.checkpoint(wal.as_ref())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Make every accepted write durable.
    pub fn flush(&self) -> Result<()> {
        self.ensure_live()?;
        if let Some(wal) = self.wal.lock().as_ref() {
            wal.flush().map_err(|e| self.fail(e))?;
        }
        Ok(())
    }

    /// Remove the collection directory. Every later call on this collection
    /// fails with `FailedPrecondition`.
    pub fn destroy(&self) -> Result<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(Error::FailedPrecondition(
                "collection has been destroyed".to_string(),
            ));
        }
        if self.options.read_only {
            return Err(Error::PermissionDenied(
                "collection is opened read-only".to_string(),
            ));
        }
        let mut wal = self.wal.lock();
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Err(Error::FailedPrecondition(
                "collection has been destroyed".to_string(),
            ));
        }
        // Close the log before its directory goes away.
        drop(wal.take());
        fs::remove_dir_all(&self.path)?;
        info!("Destroyed collection at {:?}", self.path);
        Ok(())
    }

    fn log(&self, wal: Option<&WriteAheadLog>, mutations: Vec<Mutation>) -> Result<()> {
        match wal {
            Some(wal) => wal.append(mutations).map_err(|e| self.fail(e)),
            None => Ok(()),
        }
    }

    /// Write the current state as the next generation and restart the log.
    fn checkpoint(&self, wal: Option<&WriteAheadLog>) -> Result<()> {
        self.write_checkpoint(wal).map_err(|e| self.fail(e))
    }

    fn write_checkpoint(&self, wal: Option<&WriteAheadLog>) -> Result<()> {
        let generation = self.generation() + 1;
        let (schema, next_doc_id, docs) = self.engine.export();
        snapshot::write_snapshot(&self.path, generation, &schema, next_doc_id, &docs)?;
        snapshot::write_manifest(&self.path, &Manifest::new(schema.name(), generation))?;
        if let Some(wal) = wal {
            wal.reset(generation)?;
        }
        self.generation.store(generation, Ordering::SeqCst);
        debug!("Checkpointed {:?} at generation {}", self.path, generation);
        Ok(())
    }

    /// Memory is ahead of disk from here on.
    fn fail(&self, e: Error) -> Error {
        self.failed.store(true, Ordering::SeqCst);
        error!("Persisting {:?} failed, collection must be reopened: {}", self.path, e);
        e
    }

    fn ensure_live(&self) -> Result<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(Error::FailedPrecondition(
                "collection has been destroyed".to_string(),
            ));
        }
        if self.failed.load(Ordering::SeqCst) {
            return Err(Error::FailedPrecondition(
                "a previous write could not be persisted; reopen the collection".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        self.ensure_live()?;
        if self.options.read_only {
            return Err(Error::PermissionDenied(
                "collection is opened read-only".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}
