//! # sia-storage
//!
//! Key-value storage layer for the explorer index.
//!
//! The index schema maps onto named column families; the [`Storage`]
//! trait abstracts over the durable RocksDB backend and the in-memory
//! backend used for tests and `":memory:"` deployments. All mutation
//! goes through ordered [`WriteBatch`]es so the index layer above can
//! commit one block's writes atomically.

mod batch;
mod database;
mod error;
mod memory;

pub use batch::{BatchOp, WriteBatch};
pub use database::Database;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;

/// Column families backing the index tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnFamily {
    /// Encoded elements keyed by (element id, kind).
    Elements,
    /// Unspent-set membership keyed by (address, kind, element id).
    Unspent,
    /// Encoded transactions keyed by transaction id.
    Transactions,
    /// Per-address transaction history keyed by (address, txid).
    AddressTransactions,
    /// Rolling per-block statistics keyed by textual chain index.
    ChainStats,
    /// Consensus snapshots keyed by binary chain index.
    States,
    /// Bookkeeping rows (insertion-order counter).
    Meta,
    /// Default column family (required by RocksDB).
    Default,
}

impl ColumnFamily {
    /// The string name of the column family.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnFamily::Elements => "elements",
            ColumnFamily::Unspent => "unspent",
            ColumnFamily::Transactions => "transactions",
            ColumnFamily::AddressTransactions => "address_transactions",
            ColumnFamily::ChainStats => "chainstats",
            ColumnFamily::States => "states",
            ColumnFamily::Meta => "meta",
            ColumnFamily::Default => "default",
        }
    }

    /// All column families, in creation order.
    pub fn all() -> &'static [ColumnFamily] {
        &[
            ColumnFamily::Elements,
            ColumnFamily::Unspent,
            ColumnFamily::Transactions,
            ColumnFamily::AddressTransactions,
            ColumnFamily::ChainStats,
            ColumnFamily::States,
            ColumnFamily::Meta,
            ColumnFamily::Default,
        ]
    }
}

/// Storage backend for the index tables.
///
/// Implementations are injected as `Arc<dyn Storage>` so the same index
/// layer runs against RocksDB in production and a BTreeMap in tests.
pub trait Storage: Send + Sync {
    /// Get a value by key from a column family.
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Key-value pairs whose keys start with `prefix`, in key order.
    fn iter_prefix(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Execute a batch of writes atomically and durably.
    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()>;

    /// Bytes occupied by the store.
    fn size_on_disk(&self) -> StorageResult<u64>;
}
