//! Placeholder adapters for the external collaborators.
//!
//! The daemon serves the read surface on its own; the txpool and
//! syncer routes answer with an error until the operator wires the
//! daemon to a running node.

use sia_api::{ApiError, Syncer, TransactionPool};
use sia_types::Transaction;
use tracing::warn;

/// A syncer adapter with no node behind it.
pub struct DetachedSyncer;

impl Syncer for DetachedSyncer {
    fn peers(&self) -> Vec<String> {
        Vec::new()
    }

    fn connect(&self, _addr: &str) -> Result<(), ApiError> {
        Err(ApiError::Unavailable("syncer not connected".into()))
    }

    fn broadcast_transaction(&self, txn: &Transaction, _depends_on: &[Transaction]) {
        warn!(id = %txn.id(), "dropping broadcast: syncer not connected");
    }
}

/// A transaction pool adapter with no node behind it.
pub struct DetachedTxPool;

impl TransactionPool for DetachedTxPool {
    fn transactions(&self) -> Vec<Transaction> {
        Vec::new()
    }

    fn add_transaction(&self, _txn: Transaction) -> Result<(), ApiError> {
        Err(ApiError::Unavailable("transaction pool not connected".into()))
    }
}
