//! RocksDB database implementation.

use crate::batch::BatchOp;
use crate::{ColumnFamily, Storage, StorageError, StorageResult, WriteBatch};
use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode,
    MultiThreaded, Options, WriteOptions,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// RocksDB-backed [`Storage`].
pub struct Database {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    path: PathBuf,
}

impl Database {
    /// Open or create a database at the given path. Creating the column
    /// families is idempotent: a pre-existing schema is accepted.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();
        info!("opening index database at {:?}", path);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(256);
        opts.set_keep_log_file_num(1);

        // One shared block cache keeps memory bounded across families.
        let block_cache = Cache::new_lru_cache(64 * 1024 * 1024);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ColumnFamily::all()
            .iter()
            .map(|cf| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                let mut block_opts = BlockBasedOptions::default();
                block_opts.set_block_cache(&block_cache);
                cf_opts.set_block_based_table_factory(&block_opts);
                ColumnFamilyDescriptor::new(cf.name(), cf_opts)
            })
            .collect();

        let db =
            DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(&opts, path, cf_descriptors)?;
        debug!("index database opened");

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    fn cf_handle(
        &self,
        cf: ColumnFamily,
    ) -> StorageResult<Arc<rocksdb::BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(cf.name())
            .ok_or(StorageError::ColumnFamilyNotFound(cf.name()))
    }
}

impl Storage for Database {
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let handle = self.cf_handle(cf)?;
        Ok(self.db.get_cf(&handle, key)?)
    }

    fn iter_prefix(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let handle = self.cf_handle(cf)?;
        let mode = IteratorMode::From(prefix, rocksdb::Direction::Forward);
        let mut pairs = Vec::new();
        for item in self.db.iterator_cf(&handle, mode) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            pairs.push((key.to_vec(), value.to_vec()));
        }
        Ok(pairs)
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.ops() {
            match op {
                BatchOp::Put { cf, key, value } => {
                    let handle = self.cf_handle(*cf)?;
                    rocks_batch.put_cf(&handle, key, value);
                }
                BatchOp::Delete { cf, key } => {
                    let handle = self.cf_handle(*cf)?;
                    rocks_batch.delete_cf(&handle, key);
                }
            }
        }

        // Commits are the durability boundary of the pipeline, so the
        // batch is synced rather than left to the WAL flush cadence.
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.db.write_opt(rocks_batch, &write_opts)?;
        Ok(())
    }

    fn size_on_disk(&self) -> StorageResult<u64> {
        let mut total = 0u64;
        let mut dirs = vec![self.path.clone()];
        while let Some(dir) = dirs.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let meta = entry.metadata()?;
                if meta.is_dir() {
                    dirs.push(entry.path());
                } else {
                    total += meta.len();
                }
            }
        }
        Ok(total)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_write_read() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(tmp.path()).unwrap();

        let mut batch = WriteBatch::new();
        batch.put(ColumnFamily::Meta, b"key1".to_vec(), b"value1".to_vec());
        db.write_batch(batch).unwrap();

        assert_eq!(
            db.get(ColumnFamily::Meta, b"key1").unwrap(),
            Some(b"value1".to_vec())
        );
        assert_eq!(db.get(ColumnFamily::Elements, b"key1").unwrap(), None);
    }

    #[test]
    fn reopen_is_idempotent_and_persistent() {
        let tmp = TempDir::new().unwrap();
        {
            let db = Database::open(tmp.path()).unwrap();
            let mut batch = WriteBatch::new();
            batch.put(ColumnFamily::States, b"idx".to_vec(), b"state".to_vec());
            db.write_batch(batch).unwrap();
        }
        let db = Database::open(tmp.path()).unwrap();
        assert_eq!(
            db.get(ColumnFamily::States, b"idx").unwrap(),
            Some(b"state".to_vec())
        );
    }

    #[test]
    fn prefix_iteration_is_bounded_and_ordered() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(tmp.path()).unwrap();

        let mut batch = WriteBatch::new();
        batch.put(ColumnFamily::Unspent, b"aa/1".to_vec(), b"".to_vec());
        batch.put(ColumnFamily::Unspent, b"aa/2".to_vec(), b"".to_vec());
        batch.put(ColumnFamily::Unspent, b"ab/1".to_vec(), b"".to_vec());
        db.write_batch(batch).unwrap();

        let pairs = db.iter_prefix(ColumnFamily::Unspent, b"aa/").unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, b"aa/1");
        assert_eq!(pairs[1].0, b"aa/2");
    }

    #[test]
    fn batch_order_applies_delete_after_put() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(tmp.path()).unwrap();

        let mut batch = WriteBatch::new();
        batch.put(ColumnFamily::Elements, b"k".to_vec(), b"v".to_vec());
        batch.delete(ColumnFamily::Elements, b"k".to_vec());
        db.write_batch(batch).unwrap();

        assert_eq!(db.get(ColumnFamily::Elements, b"k").unwrap(), None);
    }
}
