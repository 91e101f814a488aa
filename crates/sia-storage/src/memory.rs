//! In-memory storage backend.

use crate::batch::BatchOp;
use crate::{ColumnFamily, Storage, StorageResult, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A [`Storage`] backed by a BTreeMap. Selected by the `":memory:"`
/// path; the backend of choice for tests.
#[derive(Default)]
pub struct MemoryStorage {
    // Keys are (cf discriminant, key) so one ordered map serves every
    // family while preserving per-family key order for prefix scans.
    map: RwLock<BTreeMap<(u8, Vec<u8>), Vec<u8>>>,
}

fn tag(cf: ColumnFamily) -> u8 {
    ColumnFamily::all()
        .iter()
        .position(|&c| c == cf)
        .expect("known column family") as u8
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.map.read().get(&(tag(cf), key.to_vec())).cloned())
    }

    fn iter_prefix(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let t = tag(cf);
        let start = (t, prefix.to_vec());
        Ok(self
            .map
            .read()
            .range(start..)
            .take_while(|((kt, key), _)| *kt == t && key.starts_with(prefix))
            .map(|((_, key), value)| (key.clone(), value.clone()))
            .collect())
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut map = self.map.write();
        for op in batch.ops() {
            match op {
                BatchOp::Put { cf, key, value } => {
                    map.insert((tag(*cf), key.clone()), value.clone());
                }
                BatchOp::Delete { cf, key } => {
                    map.remove(&(tag(*cf), key.clone()));
                }
            }
        }
        Ok(())
    }

    fn size_on_disk(&self) -> StorageResult<u64> {
        // Logical bytes; there is no disk.
        Ok(self
            .map
            .read()
            .iter()
            .map(|((_, key), value)| 1 + key.len() as u64 + value.len() as u64)
            .sum())
    }
}
