//! The explorer engine: consumes apply/revert updates from the chain
//! manager and keeps the index and hash store consistent with the tip.

use crate::{ExplorerResult, HashStore, Store};
use parking_lot::{Mutex, RwLock};
use sia_types::{
    Address, ApplyUpdate, ChainIndex, ChainStats, ConsensusState, Currency, ElementId,
    FileContractElement, Hash256, RevertUpdate, SiacoinElement, SiafundElement, Transaction,
    TransactionId,
};
use tracing::debug;

struct Tip {
    stats: ChainStats,
    state: ConsensusState,
}

/// Maintains the element/transaction index and the accumulator hash
/// store from the chain manager's update stream, and serves the read
/// API over both.
///
/// A single mutex serializes `apply` and `revert` for their full
/// duration; reads never take it and may observe a partially-staged
/// update, which the API treats as best-effort.
pub struct Explorer {
    store: Box<dyn Store>,
    hash_store: Box<dyn HashStore>,
    update_mu: Mutex<()>,
    tip: RwLock<Tip>,
}

impl Explorer {
    /// Creates an explorer over the given stores, positioned at
    /// `state` (normally the genesis state; the chain manager replays
    /// the remaining updates on subscription).
    pub fn new(
        state: ConsensusState,
        store: Box<dyn Store>,
        hash_store: Box<dyn HashStore>,
    ) -> Self {
        Self {
            store,
            hash_store,
            update_mu: Mutex::new(()),
            tip: RwLock::new(Tip {
                stats: ChainStats::default(),
                state,
            }),
        }
    }

    /// Processes one apply update. Writes are staged in the index
    /// transaction; when `may_commit` is set, the hash store is synced
    /// first and the index transaction committed after, so that on a
    /// crash the hash store is never behind the index.
    pub fn apply(&self, cau: &ApplyUpdate, may_commit: bool) -> ExplorerResult<()> {
        let _guard = self.update_mu.lock();
        debug!(
            height = cau.state.index.height,
            txns = cau.block.transactions.len(),
            may_commit,
            "applying block"
        );

        self.store.add_state(&cau.state.index, &cau.state);

        let mut stats = ChainStats::carry_forward(&self.tip.read().stats, cau.block.clone());

        let block_index = cau.block.index();
        for txn in &cau.block.transactions {
            self.store
                .add_transaction(txn, &txn.covered_addresses(), &block_index);
        }

        for elem in &cau.spent_siacoins {
            self.store.remove_element(&elem.id());
            self.store
                .remove_unspent_siacoin_element(&elem.address(), &elem.id());
            stats.spent_siacoins_count += 1;
            self.hash_store.modify_leaf(&elem.state_element)?;
        }
        for elem in &cau.spent_siafunds {
            self.store.remove_element(&elem.id());
            self.store
                .remove_unspent_siafund_element(&elem.address(), &elem.id());
            stats.spent_siafunds_count += 1;
            self.hash_store.modify_leaf(&elem.state_element)?;
        }
        for elem in &cau.resolved_file_contracts {
            self.store.remove_element(&elem.id());
            stats.active_contract_count -= 1;
            stats.active_contract_cost -= elem.contract.payout();
            stats.active_contract_size -= elem.contract.filesize;
            self.hash_store.modify_leaf(&elem.state_element)?;
        }

        for elem in &cau.new_siacoin_elements {
            self.store.add_siacoin_element(elem);
            self.store
                .add_unspent_siacoin_element(&elem.address(), &elem.id());
            self.hash_store.modify_leaf(&elem.state_element)?;
        }
        for elem in &cau.new_siafund_elements {
            self.store.add_siafund_element(elem);
            self.store
                .add_unspent_siafund_element(&elem.address(), &elem.id());
            self.hash_store.modify_leaf(&elem.state_element)?;
        }
        for elem in &cau.revised_file_contracts {
            // a revision replaces the contract element under its id
            self.store.remove_element(&elem.id());
            self.store.add_file_contract_element(elem);
            stats.total_contract_size += elem.contract.filesize;
            stats.total_revision_volume += elem.contract.filesize;
            self.hash_store.modify_leaf(&elem.state_element)?;
        }
        for elem in &cau.new_file_contracts {
            self.store.add_file_contract_element(elem);
            let payout = elem.contract.payout();
            stats.active_contract_count += 1;
            stats.active_contract_cost += payout;
            stats.active_contract_size += elem.contract.filesize;
            stats.total_contract_cost += payout;
            stats.total_contract_size += elem.contract.filesize;
            self.hash_store.modify_leaf(&elem.state_element)?;
        }

        self.store.add_chain_stats(&cau.state.index, &stats);

        {
            let mut tip = self.tip.write();
            tip.state = cau.state.clone();
            tip.stats = stats;
        }

        if may_commit {
            self.hash_store.commit()?;
            self.store.commit()?;
        }
        Ok(())
    }

    /// Processes one revert update, inverting the corresponding apply.
    /// The index transaction commits unconditionally; the hash store is
    /// not synced here, its durability rides on the next apply.
    pub fn revert(&self, cru: &RevertUpdate) -> ExplorerResult<()> {
        let _guard = self.update_mu.lock();
        debug!(height = cru.block.header.height, "reverting block");

        for elem in &cru.spent_siacoins {
            self.store.add_siacoin_element(elem);
            self.store
                .add_unspent_siacoin_element(&elem.address(), &elem.id());
            self.hash_store.modify_leaf(&elem.state_element)?;
        }
        for elem in &cru.spent_siafunds {
            self.store.add_siafund_element(elem);
            self.store
                .add_unspent_siafund_element(&elem.address(), &elem.id());
            self.hash_store.modify_leaf(&elem.state_element)?;
        }
        for elem in &cru.resolved_file_contracts {
            self.store.add_file_contract_element(elem);
            self.hash_store.modify_leaf(&elem.state_element)?;
        }

        for elem in &cru.new_siacoin_elements {
            self.store.remove_element(&elem.id());
            self.store
                .remove_unspent_siacoin_element(&elem.address(), &elem.id());
        }
        for elem in &cru.new_siafund_elements {
            self.store.remove_element(&elem.id());
            self.store
                .remove_unspent_siafund_element(&elem.address(), &elem.id());
        }
        for elem in &cru.revised_file_contracts {
            self.store.remove_element(&elem.id());
        }
        for elem in &cru.new_file_contracts {
            self.store.remove_element(&elem.id());
        }

        // restore the pre-revision contract bindings
        for txn in &cru.block.transactions {
            for rev in &txn.file_contract_revisions {
                self.store.add_file_contract_element(&rev.parent);
                self.hash_store.modify_leaf(&rev.parent.state_element)?;
            }
        }

        // the prior height's stats row is authoritative and was never
        // deleted; reload the cache from it
        let stats = self.store.chain_stats(&cru.state.index)?;
        {
            let mut tip = self.tip.write();
            tip.state = cru.state.clone();
            tip.stats = stats;
        }

        self.store.commit()
    }

    // --- read API ---

    pub fn siacoin_element(&self, id: &ElementId) -> ExplorerResult<SiacoinElement> {
        self.store.siacoin_element(id)
    }

    pub fn siafund_element(&self, id: &ElementId) -> ExplorerResult<SiafundElement> {
        self.store.siafund_element(id)
    }

    pub fn file_contract_element(&self, id: &ElementId) -> ExplorerResult<FileContractElement> {
        self.store.file_contract_element(id)
    }

    /// Sum of unspent siacoins at an address whose maturity height is
    /// below the tip height.
    pub fn siacoin_balance(&self, address: &Address) -> ExplorerResult<Currency> {
        let tip_height = self.tip.read().state.index.height;
        let mut balance = Currency::ZERO;
        for id in self.store.unspent_siacoin_elements(address)? {
            let elem = self.store.siacoin_element(&id)?;
            if elem.maturity_height < tip_height {
                balance += elem.siacoin_output.value;
            }
        }
        Ok(balance)
    }

    /// Sum of unspent siafunds at an address. Funds have no maturity.
    pub fn siafund_balance(&self, address: &Address) -> ExplorerResult<u64> {
        let mut balance = 0;
        for id in self.store.unspent_siafund_elements(address)? {
            balance += self.store.siafund_element(&id)?.siafund_output.value;
        }
        Ok(balance)
    }

    pub fn unspent_siacoin_elements(&self, address: &Address) -> ExplorerResult<Vec<ElementId>> {
        self.store.unspent_siacoin_elements(address)
    }

    pub fn unspent_siafund_elements(&self, address: &Address) -> ExplorerResult<Vec<ElementId>> {
        self.store.unspent_siafund_elements(address)
    }

    pub fn transactions(
        &self,
        address: &Address,
        limit: usize,
        offset: usize,
    ) -> ExplorerResult<Vec<TransactionId>> {
        self.store.transactions(address, limit, offset)
    }

    pub fn transaction(&self, id: &TransactionId) -> ExplorerResult<Transaction> {
        self.store.transaction(id)
    }

    pub fn chain_stats(&self, index: &ChainIndex) -> ExplorerResult<ChainStats> {
        self.store.chain_stats(index)
    }

    /// The rolling stats at the tip, from the engine cache.
    pub fn chain_stats_latest(&self) -> ChainStats {
        self.tip.read().stats.clone()
    }

    pub fn consensus_state(&self, index: &ChainIndex) -> ExplorerResult<ConsensusState> {
        self.store.consensus_state(index)
    }

    /// The consensus state at the tip, from the engine cache.
    pub fn tip_state(&self) -> ConsensusState {
        self.tip.read().state.clone()
    }

    pub fn merkle_proof(&self, leaf_index: u64) -> ExplorerResult<Vec<Hash256>> {
        self.hash_store.merkle_proof(leaf_index)
    }

    /// Bytes on disk across the index and the hash store.
    pub fn size(&self) -> ExplorerResult<u64> {
        Ok(self.store.size()? + self.hash_store.size()?)
    }
}
