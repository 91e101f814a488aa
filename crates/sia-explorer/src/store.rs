//! The element and transaction index.
//!
//! [`IndexStore`] implements the [`Store`] interface over a
//! [`Storage`] backend. All writes between two `commit` calls are
//! staged into one batch: a transaction opens lazily on the first
//! write, reads merge the staged overlay (so a read inside an open
//! transaction sees that transaction's writes), and the first deferred
//! write error rolls the whole batch back at commit time.

use crate::{ExplorerError, ExplorerResult};
use parking_lot::Mutex;
use sia_storage::{ColumnFamily, Database, MemoryStorage, Storage, WriteBatch};
use sia_types::{
    from_bytes, to_bytes, Address, ChainIndex, ChainStats, ConsensusState, ElementId,
    FileContractElement, SiaDecode, SiacoinElement, SiafundElement, Transaction, TransactionId,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Kinds of accumulator element tracked by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Siacoin,
    Siafund,
    Contract,
}

impl ElementKind {
    fn tag(self) -> u8 {
        match self {
            ElementKind::Siacoin => 0,
            ElementKind::Siafund => 1,
            ElementKind::Contract => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Siacoin => "siacoin",
            ElementKind::Siafund => "siafund",
            ElementKind::Contract => "contract",
        }
    }

    fn all() -> [ElementKind; 3] {
        [
            ElementKind::Siacoin,
            ElementKind::Siafund,
            ElementKind::Contract,
        ]
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The index interface the explorer engine drives. Reads return the
/// decoded value or [`ExplorerError::NotFound`]; writes stage into the
/// open transaction and defer their errors to [`Store::commit`].
pub trait Store: Send + Sync {
    fn siacoin_element(&self, id: &ElementId) -> ExplorerResult<SiacoinElement>;
    fn siafund_element(&self, id: &ElementId) -> ExplorerResult<SiafundElement>;
    fn file_contract_element(&self, id: &ElementId) -> ExplorerResult<FileContractElement>;
    fn chain_stats(&self, index: &ChainIndex) -> ExplorerResult<ChainStats>;
    fn consensus_state(&self, index: &ChainIndex) -> ExplorerResult<ConsensusState>;
    fn transaction(&self, id: &TransactionId) -> ExplorerResult<Transaction>;
    /// Unspent element ids for an address, in insertion order.
    fn unspent_siacoin_elements(&self, address: &Address) -> ExplorerResult<Vec<ElementId>>;
    fn unspent_siafund_elements(&self, address: &Address) -> ExplorerResult<Vec<ElementId>>;
    /// Transaction ids touching an address, insertion order, paginated.
    fn transactions(
        &self,
        address: &Address,
        limit: usize,
        offset: usize,
    ) -> ExplorerResult<Vec<TransactionId>>;
    fn size(&self) -> ExplorerResult<u64>;

    fn add_siacoin_element(&self, elem: &SiacoinElement);
    fn add_siafund_element(&self, elem: &SiafundElement);
    fn add_file_contract_element(&self, elem: &FileContractElement);
    /// Deletes the id under every element kind.
    fn remove_element(&self, id: &ElementId);
    fn add_chain_stats(&self, index: &ChainIndex, stats: &ChainStats);
    fn add_unspent_siacoin_element(&self, address: &Address, id: &ElementId);
    fn add_unspent_siafund_element(&self, address: &Address, id: &ElementId);
    fn remove_unspent_siacoin_element(&self, address: &Address, id: &ElementId);
    fn remove_unspent_siafund_element(&self, address: &Address, id: &ElementId);
    fn add_transaction(&self, txn: &Transaction, addresses: &[Address], block: &ChainIndex);
    fn add_state(&self, index: &ChainIndex, state: &ConsensusState);

    /// Finalizes the open transaction. A deferred error rolls the
    /// batch back and is returned; otherwise the batch is flushed
    /// durably and the transaction handle cleared.
    fn commit(&self) -> ExplorerResult<()>;
}

const SEQ_KEY: &[u8] = b"seq";

fn element_key(id: &ElementId, kind: ElementKind) -> Vec<u8> {
    let mut key = to_bytes(id);
    key.push(kind.tag());
    key
}

fn unspent_prefix(address: &Address, kind: ElementKind) -> Vec<u8> {
    let mut prefix = address.0 .0.to_vec();
    prefix.push(kind.tag());
    prefix
}

fn unspent_key(address: &Address, kind: ElementKind, id: &ElementId) -> Vec<u8> {
    let mut key = unspent_prefix(address, kind);
    key.extend_from_slice(&to_bytes(id));
    key
}

fn addr_txn_key(address: &Address, id: &TransactionId) -> Vec<u8> {
    let mut key = address.0 .0.to_vec();
    key.extend_from_slice(&id.0 .0);
    key
}

/// Staged state of the open transaction.
#[derive(Default)]
struct Tx {
    ops: WriteBatch,
    // key -> Some(value) for staged puts, None for staged deletes
    overlay: HashMap<(ColumnFamily, Vec<u8>), Option<Vec<u8>>>,
    err: Option<ExplorerError>,
    // insertion-order counter; persisted at commit when dirty
    seq: u64,
    seq_dirty: bool,
}

impl Tx {
    fn put(&mut self, cf: ColumnFamily, key: Vec<u8>, value: Vec<u8>) {
        self.ops.put(cf, key.clone(), value.clone());
        self.overlay.insert((cf, key), Some(value));
    }

    fn delete(&mut self, cf: ColumnFamily, key: Vec<u8>) {
        self.ops.delete(cf, key.clone());
        self.overlay.insert((cf, key), None);
    }

    fn next_ordinal(&mut self) -> u64 {
        let ordinal = self.seq;
        self.seq += 1;
        self.seq_dirty = true;
        ordinal
    }
}

/// [`Store`] over a [`Storage`] backend.
pub struct IndexStore {
    storage: Arc<dyn Storage>,
    tx: Mutex<Option<Tx>>,
}

impl IndexStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            tx: Mutex::new(None),
        }
    }

    /// Opens the index at `path`; `":memory:"` selects an ephemeral
    /// in-process store.
    pub fn open(path: &str) -> ExplorerResult<Self> {
        if path == ":memory:" {
            return Ok(Self::in_memory());
        }
        Ok(Self::new(Arc::new(Database::open(Path::new(path))?)))
    }

    /// An ephemeral store for tests.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    fn open_tx(&self) -> Tx {
        let mut tx = Tx::default();
        match self.storage.get(ColumnFamily::Meta, SEQ_KEY) {
            Ok(Some(raw)) => match <[u8; 8]>::try_from(raw.as_slice()) {
                Ok(arr) => tx.seq = u64::from_be_bytes(arr),
                Err(_) => {
                    tx.err = Some(ExplorerError::Corruption(
                        "malformed insertion-order counter".into(),
                    ))
                }
            },
            Ok(None) => {}
            Err(e) => tx.err = Some(e.into()),
        }
        tx
    }

    /// Runs `f` against the open transaction, opening one if needed.
    /// Once a deferred error is recorded, later writes are dropped.
    fn with_tx(&self, f: impl FnOnce(&Arc<dyn Storage>, &mut Tx)) {
        let mut guard = self.tx.lock();
        let tx = guard.get_or_insert_with(|| self.open_tx());
        if tx.err.is_none() {
            f(&self.storage, tx);
        }
    }

    /// Point read through the overlay of the open transaction.
    fn read(&self, cf: ColumnFamily, key: &[u8]) -> ExplorerResult<Option<Vec<u8>>> {
        {
            let guard = self.tx.lock();
            if let Some(tx) = guard.as_ref() {
                if let Some(entry) = tx.overlay.get(&(cf, key.to_vec())) {
                    return Ok(entry.clone());
                }
            }
        }
        Ok(self.storage.get(cf, key)?)
    }

    fn read_decoded<T: SiaDecode>(&self, cf: ColumnFamily, key: &[u8]) -> ExplorerResult<T> {
        match self.read(cf, key)? {
            Some(raw) => Ok(from_bytes(&raw)?),
            None => Err(ExplorerError::NotFound),
        }
    }

    /// Prefix scan merging the staged overlay over the base storage.
    fn scan_merged(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
    ) -> ExplorerResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.storage.iter_prefix(cf, prefix)?.into_iter().collect();
        let guard = self.tx.lock();
        if let Some(tx) = guard.as_ref() {
            for ((ocf, key), entry) in &tx.overlay {
                if *ocf != cf || !key.starts_with(prefix) {
                    continue;
                }
                match entry {
                    Some(value) => {
                        merged.insert(key.clone(), value.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    /// Rows sorted by their ordinal value rather than key order.
    fn scan_by_ordinal(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
    ) -> ExplorerResult<Vec<(u64, Vec<u8>)>> {
        let mut rows = Vec::new();
        for (key, value) in self.scan_merged(cf, prefix)? {
            let ordinal = <[u8; 8]>::try_from(value.as_slice()).map(u64::from_be_bytes).map_err(
                |_| ExplorerError::Corruption("malformed insertion-order row".into()),
            )?;
            rows.push((ordinal, key[prefix.len()..].to_vec()));
        }
        rows.sort_by_key(|&(ordinal, _)| ordinal);
        Ok(rows)
    }

    fn stage_element(&self, kind: ElementKind, id: &ElementId, value: Vec<u8>) {
        self.with_tx(|storage, tx| {
            let key = element_key(id, kind);
            // a live element under the same (id, kind) is a schema violation
            let live = match tx.overlay.get(&(ColumnFamily::Elements, key.clone())) {
                Some(entry) => entry.is_some(),
                None => match storage.get(ColumnFamily::Elements, &key) {
                    Ok(existing) => existing.is_some(),
                    Err(e) => {
                        tx.err = Some(e.into());
                        return;
                    }
                },
            };
            if live {
                tx.err = Some(ExplorerError::DuplicateElement { id: *id, kind });
                return;
            }
            tx.put(ColumnFamily::Elements, key, value);
        });
    }

    fn unspent_ids(&self, address: &Address, kind: ElementKind) -> ExplorerResult<Vec<ElementId>> {
        self.scan_by_ordinal(ColumnFamily::Unspent, &unspent_prefix(address, kind))?
            .into_iter()
            .map(|(_, raw)| Ok(from_bytes::<ElementId>(&raw)?))
            .collect()
    }
}

impl Store for IndexStore {
    fn siacoin_element(&self, id: &ElementId) -> ExplorerResult<SiacoinElement> {
        self.read_decoded(
            ColumnFamily::Elements,
            &element_key(id, ElementKind::Siacoin),
        )
    }

    fn siafund_element(&self, id: &ElementId) -> ExplorerResult<SiafundElement> {
        self.read_decoded(
            ColumnFamily::Elements,
            &element_key(id, ElementKind::Siafund),
        )
    }

    fn file_contract_element(&self, id: &ElementId) -> ExplorerResult<FileContractElement> {
        self.read_decoded(
            ColumnFamily::Elements,
            &element_key(id, ElementKind::Contract),
        )
    }

    fn chain_stats(&self, index: &ChainIndex) -> ExplorerResult<ChainStats> {
        self.read_decoded(ColumnFamily::ChainStats, index.to_string().as_bytes())
    }

    fn consensus_state(&self, index: &ChainIndex) -> ExplorerResult<ConsensusState> {
        self.read_decoded(ColumnFamily::States, &to_bytes(index))
    }

    fn transaction(&self, id: &TransactionId) -> ExplorerResult<Transaction> {
        self.read_decoded(ColumnFamily::Transactions, &id.0 .0)
    }

    fn unspent_siacoin_elements(&self, address: &Address) -> ExplorerResult<Vec<ElementId>> {
        self.unspent_ids(address, ElementKind::Siacoin)
    }

    fn unspent_siafund_elements(&self, address: &Address) -> ExplorerResult<Vec<ElementId>> {
        self.unspent_ids(address, ElementKind::Siafund)
    }

    fn transactions(
        &self,
        address: &Address,
        limit: usize,
        offset: usize,
    ) -> ExplorerResult<Vec<TransactionId>> {
        let rows = self.scan_by_ordinal(ColumnFamily::AddressTransactions, &address.0 .0)?;
        rows.into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, raw)| {
                let arr = <[u8; 32]>::try_from(raw.as_slice()).map_err(|_| {
                    ExplorerError::Corruption("malformed transaction history row".into())
                })?;
                Ok(TransactionId(sia_types::Hash256(arr)))
            })
            .collect()
    }

    fn size(&self) -> ExplorerResult<u64> {
        Ok(self.storage.size_on_disk()?)
    }

    fn add_siacoin_element(&self, elem: &SiacoinElement) {
        self.stage_element(ElementKind::Siacoin, &elem.id(), to_bytes(elem));
    }

    fn add_siafund_element(&self, elem: &SiafundElement) {
        self.stage_element(ElementKind::Siafund, &elem.id(), to_bytes(elem));
    }

    fn add_file_contract_element(&self, elem: &FileContractElement) {
        self.stage_element(ElementKind::Contract, &elem.id(), to_bytes(elem));
    }

    fn remove_element(&self, id: &ElementId) {
        self.with_tx(|_, tx| {
            for kind in ElementKind::all() {
                tx.delete(ColumnFamily::Elements, element_key(id, kind));
            }
        });
    }

    fn add_chain_stats(&self, index: &ChainIndex, stats: &ChainStats) {
        self.with_tx(|_, tx| {
            tx.put(
                ColumnFamily::ChainStats,
                index.to_string().into_bytes(),
                to_bytes(stats),
            );
        });
    }

    fn add_unspent_siacoin_element(&self, address: &Address, id: &ElementId) {
        self.with_tx(|_, tx| {
            let ordinal = tx.next_ordinal();
            tx.put(
                ColumnFamily::Unspent,
                unspent_key(address, ElementKind::Siacoin, id),
                ordinal.to_be_bytes().to_vec(),
            );
        });
    }

    fn add_unspent_siafund_element(&self, address: &Address, id: &ElementId) {
        self.with_tx(|_, tx| {
            let ordinal = tx.next_ordinal();
            tx.put(
                ColumnFamily::Unspent,
                unspent_key(address, ElementKind::Siafund, id),
                ordinal.to_be_bytes().to_vec(),
            );
        });
    }

    fn remove_unspent_siacoin_element(&self, address: &Address, id: &ElementId) {
        self.with_tx(|_, tx| {
            tx.delete(
                ColumnFamily::Unspent,
                unspent_key(address, ElementKind::Siacoin, id),
            );
        });
    }

    fn remove_unspent_siafund_element(&self, address: &Address, id: &ElementId) {
        self.with_tx(|_, tx| {
            tx.delete(
                ColumnFamily::Unspent,
                unspent_key(address, ElementKind::Siafund, id),
            );
        });
    }

    fn add_transaction(&self, txn: &Transaction, addresses: &[Address], _block: &ChainIndex) {
        self.with_tx(|_, tx| {
            let id = txn.id();
            tx.put(ColumnFamily::Transactions, id.0 .0.to_vec(), to_bytes(txn));
            for address in addresses {
                let ordinal = tx.next_ordinal();
                tx.put(
                    ColumnFamily::AddressTransactions,
                    addr_txn_key(address, &id),
                    ordinal.to_be_bytes().to_vec(),
                );
            }
        });
    }

    fn add_state(&self, index: &ChainIndex, state: &ConsensusState) {
        self.with_tx(|_, tx| {
            tx.put(ColumnFamily::States, to_bytes(index), to_bytes(state));
        });
    }

    fn commit(&self) -> ExplorerResult<()> {
        let taken = self.tx.lock().take();
        let Some(mut tx) = taken else {
            return Ok(());
        };
        if let Some(err) = tx.err.take() {
            debug!(%err, "rolling back index transaction");
            return Err(ExplorerError::CommitFailed(Box::new(err)));
        }
        if tx.seq_dirty {
            tx.ops.put(
                ColumnFamily::Meta,
                SEQ_KEY.to_vec(),
                tx.seq.to_be_bytes().to_vec(),
            );
        }
        debug!(ops = tx.ops.len(), "committing index transaction");
        self.storage.write_batch(tx.ops)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sia_types::{hash_all, Currency, SiacoinOutput, StateElement};

    fn coin(seed: u64, address: Address, value: u64) -> SiacoinElement {
        SiacoinElement {
            state_element: StateElement {
                id: ElementId {
                    source: hash_all("test/coin", &[&seed.to_be_bytes()]),
                    index: 0,
                },
                leaf_index: seed,
                merkle_proof: vec![],
            },
            siacoin_output: SiacoinOutput {
                value: Currency::siacoins(value),
                address,
            },
            maturity_height: 0,
        }
    }

    fn addr(seed: u64) -> Address {
        Address(hash_all("test/addr", &[&seed.to_be_bytes()]))
    }

    #[test]
    fn read_inside_open_transaction_sees_writes() {
        let store = IndexStore::in_memory();
        let elem = coin(1, addr(1), 100);
        store.add_siacoin_element(&elem);
        // visible before commit
        assert_eq!(store.siacoin_element(&elem.id()).unwrap(), elem);
        store.commit().unwrap();
        assert_eq!(store.siacoin_element(&elem.id()).unwrap(), elem);
    }

    #[test]
    fn missing_rows_report_not_found() {
        let store = IndexStore::in_memory();
        let id = ElementId {
            source: hash_all("test", &[b"nope"]),
            index: 0,
        };
        assert!(matches!(
            store.siacoin_element(&id),
            Err(ExplorerError::NotFound)
        ));
    }

    #[test]
    fn duplicate_element_rolls_back_the_batch() {
        let store = IndexStore::in_memory();
        let elem = coin(1, addr(1), 100);
        let other = coin(2, addr(1), 50);
        store.add_siacoin_element(&elem);
        store.add_siacoin_element(&elem);
        // writes after the first error are dropped
        store.add_siacoin_element(&other);
        let err = store.commit().unwrap_err();
        assert!(matches!(err, ExplorerError::CommitFailed(_)));
        // nothing from the failed batch landed
        assert!(store.siacoin_element(&elem.id()).is_err());
        assert!(store.siacoin_element(&other.id()).is_err());
    }

    #[test]
    fn duplicate_across_commits_is_detected() {
        let store = IndexStore::in_memory();
        let elem = coin(1, addr(1), 100);
        store.add_siacoin_element(&elem);
        store.commit().unwrap();
        store.add_siacoin_element(&elem);
        assert!(store.commit().is_err());
    }

    #[test]
    fn delete_then_add_in_one_batch_is_not_a_duplicate() {
        let store = IndexStore::in_memory();
        let elem = coin(1, addr(1), 100);
        store.add_siacoin_element(&elem);
        store.commit().unwrap();

        store.remove_element(&elem.id());
        store.add_siacoin_element(&elem);
        store.commit().unwrap();
        assert_eq!(store.siacoin_element(&elem.id()).unwrap(), elem);
    }

    #[test]
    fn unspent_set_preserves_insertion_order() {
        let store = IndexStore::in_memory();
        let address = addr(1);
        // ids whose key order differs from insertion order
        let elems: Vec<_> = (0..8).rev().map(|i| coin(i, address, 1)).collect();
        for elem in &elems {
            store.add_siacoin_element(elem);
            store.add_unspent_siacoin_element(&address, &elem.id());
        }
        store.commit().unwrap();

        let ids = store.unspent_siacoin_elements(&address).unwrap();
        assert_eq!(
            ids,
            elems.iter().map(|e| e.id()).collect::<Vec<_>>(),
            "expected insertion order, not key order"
        );

        store.remove_unspent_siacoin_element(&address, &elems[0].id());
        store.commit().unwrap();
        assert_eq!(store.unspent_siacoin_elements(&address).unwrap().len(), 7);
    }

    #[test]
    fn transaction_history_pagination() {
        let store = IndexStore::in_memory();
        let address = addr(1);
        let block = ChainIndex::default();
        let txns: Vec<Transaction> = (0..3)
            .map(|i| Transaction {
                arbitrary_data: vec![i as u8],
                ..Default::default()
            })
            .collect();
        for txn in &txns {
            store.add_transaction(txn, &[address], &block);
        }
        store.commit().unwrap();

        let all = store.transactions(&address, 10, 0).unwrap();
        assert_eq!(all, txns.iter().map(|t| t.id()).collect::<Vec<_>>());
        let middle = store.transactions(&address, 1, 1).unwrap();
        assert_eq!(middle, vec![txns[1].id()]);
        assert!(store.transactions(&address, 10, 3).unwrap().is_empty());
    }

    #[test]
    fn chain_stats_and_state_round_trip() {
        let store = IndexStore::in_memory();
        let index = ChainIndex {
            height: 1,
            id: Default::default(),
        };
        let stats = ChainStats {
            active_contract_count: 10,
            active_contract_cost: Currency::siacoins(825),
            ..Default::default()
        };
        let state = ConsensusState {
            index,
            ..Default::default()
        };
        store.add_chain_stats(&index, &stats);
        store.add_state(&index, &state);
        store.commit().unwrap();

        assert_eq!(store.chain_stats(&index).unwrap(), stats);
        assert_eq!(store.consensus_state(&index).unwrap(), state);
    }
}
