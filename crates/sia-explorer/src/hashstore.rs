//! Flat-file storage for accumulator hashes.
//!
//! The consensus accumulator is a forest of perfect Merkle trees. The
//! hash store keeps one file per tree level: file `i` holds the hashes
//! of subtrees of size `2^i`, each 32 bytes, at offset
//! `(pos / 2^i) * 32` where `pos` is the first leaf covered by the
//! subtree. This makes writing an element's proof and reading it back
//! a constant number of positioned I/Os per level, and keeps the hot
//! level-0 file append-friendly as new leaves arrive.

use crate::{ExplorerError, ExplorerResult};
use sia_types::{Hash256, StateElement};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const HASH_SIZE: u64 = 32;
const NUM_LEVELS: usize = 64;

/// Read/write access to the stored accumulator hashes, injected into
/// the engine alongside [`crate::Store`].
pub trait HashStore: Send + Sync {
    /// Writes the sibling hashes of `elem.merkle_proof` into their
    /// canonical slots along the path from `elem.leaf_index` upward.
    fn modify_leaf(&self, elem: &StateElement) -> ExplorerResult<()>;

    /// Reconstructs the membership proof for a leaf.
    fn merkle_proof(&self, leaf_index: u64) -> ExplorerResult<Vec<Hash256>>;

    /// Makes all previous modifications durable.
    fn commit(&self) -> ExplorerResult<()>;

    /// Bytes on disk across all levels.
    fn size(&self) -> ExplorerResult<u64>;
}

/// [`HashStore`] over 64 per-level flat files in a directory.
pub struct FileHashStore {
    files: Vec<File>,
    num_leaves: AtomicU64,
}

impl FileHashStore {
    /// Opens (creating as needed) the level files `tree_level_<i>.dat`
    /// under `dir`. A level whose size is not a multiple of 32 bytes is
    /// a torn write and refuses to open.
    pub fn open<P: AsRef<Path>>(dir: P) -> ExplorerResult<Self> {
        let dir = dir.as_ref();
        let mut files = Vec::with_capacity(NUM_LEVELS);
        let mut num_leaves = 0;
        for i in 0..NUM_LEVELS {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(dir.join(format!("tree_level_{i}.dat")))?;
            let len = file.metadata()?.len();
            if len % HASH_SIZE != 0 {
                return Err(ExplorerError::Corruption(format!(
                    "tree level {i} contains a partially-written hash"
                )));
            }
            if i == 0 {
                num_leaves = len / HASH_SIZE;
            }
            files.push(file);
        }
        debug!(num_leaves, "opened hash store at {:?}", dir);
        Ok(Self {
            files,
            num_leaves: AtomicU64::new(num_leaves),
        })
    }

    /// Leaves touched so far; the length of the level-0 file in hashes.
    pub fn num_leaves(&self) -> u64 {
        self.num_leaves.load(Ordering::SeqCst)
    }
}

impl HashStore for FileHashStore {
    fn modify_leaf(&self, elem: &StateElement) -> ExplorerResult<()> {
        let mut pos = elem.leaf_index;
        for (i, hash) in elem.merkle_proof.iter().enumerate() {
            let subtree_size = 1u64 << i;
            // move to the sibling subtree at this level
            if elem.leaf_index & subtree_size == 0 {
                pos += subtree_size;
            } else {
                pos -= subtree_size;
            }
            self.files[i].write_all_at(&hash.0, (pos / subtree_size) * HASH_SIZE)?;
        }
        self.num_leaves
            .fetch_max(elem.leaf_index + 1, Ordering::SeqCst);
        Ok(())
    }

    fn merkle_proof(&self, leaf_index: u64) -> ExplorerResult<Vec<Hash256>> {
        let num_leaves = self.num_leaves();
        if leaf_index >= num_leaves {
            return Err(ExplorerError::NotFound);
        }
        let proof_len = (64 - (leaf_index ^ num_leaves).leading_zeros()) as usize - 1;
        let mut proof = Vec::with_capacity(proof_len);
        let mut pos = leaf_index;
        for i in 0..proof_len {
            let subtree_size = 1u64 << i;
            if leaf_index & subtree_size == 0 {
                pos += subtree_size;
            } else {
                pos -= subtree_size;
            }
            let mut hash = [0u8; 32];
            self.files[i].read_exact_at(&mut hash, (pos / subtree_size) * HASH_SIZE)?;
            proof.push(Hash256(hash));
        }
        Ok(proof)
    }

    fn commit(&self) -> ExplorerResult<()> {
        for file in &self.files {
            file.sync_all()?;
        }
        Ok(())
    }

    fn size(&self) -> ExplorerResult<u64> {
        let mut total = 0;
        for file in &self.files {
            total += file.metadata()?.len();
        }
        Ok(total)
    }
}
