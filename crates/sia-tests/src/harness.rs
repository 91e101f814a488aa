//! Test harness wiring a simulator to a full explorer.

use crate::sim::ChainSim;
use sia_explorer::{Explorer, FileHashStore, IndexStore};
use sia_types::Transaction;
use std::path::PathBuf;
use tempfile::TempDir;

/// A simulator-driven explorer over an in-memory index and an on-disk
/// hash store in a temporary directory.
pub struct TestExplorer {
    pub sim: ChainSim,
    pub explorer: Explorer,
    hash_dir: TempDir,
}

impl TestExplorer {
    /// Builds the explorer and applies the simulator's genesis update.
    pub fn new() -> Self {
        let sim = ChainSim::new();
        let hash_dir = TempDir::new().expect("temp dir");
        let hash_store = FileHashStore::open(hash_dir.path()).expect("hash store");
        let genesis = sim.genesis_update();
        let explorer = Explorer::new(
            genesis.state.clone(),
            Box::new(IndexStore::in_memory()),
            Box::new(hash_store),
        );
        explorer.apply(&genesis, true).expect("apply genesis");
        Self {
            sim,
            explorer,
            hash_dir,
        }
    }

    /// Mines a block with the given transactions and applies it.
    pub fn mine(&mut self, txns: Vec<Transaction>) {
        let cau = self.sim.mine_block(txns);
        self.explorer.apply(&cau, true).expect("apply block");
    }

    /// Reverts the tip block.
    pub fn revert_tip(&mut self) {
        let cru = self.sim.revert_block();
        self.explorer.revert(&cru).expect("revert block");
    }

    /// Directory holding the hash store's level files.
    pub fn hash_dir(&self) -> PathBuf {
        self.hash_dir.path().to_path_buf()
    }
}

impl Default for TestExplorer {
    fn default() -> Self {
        Self::new()
    }
}
