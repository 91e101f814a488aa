//! Shared application state.

use sia_explorer::Explorer;
use sia_types::Transaction;
use std::sync::Arc;

/// Relays transactions and manages peer connections. Implemented by an
/// external syncer process or adapter.
pub trait Syncer: Send + Sync {
    fn peers(&self) -> Vec<String>;
    fn connect(&self, addr: &str) -> Result<(), crate::ApiError>;
    fn broadcast_transaction(&self, txn: &Transaction, depends_on: &[Transaction]);
}

/// Validates and relays unconfirmed transactions. Implemented by an
/// external transaction pool or adapter.
pub trait TransactionPool: Send + Sync {
    fn transactions(&self) -> Vec<Transaction>;
    fn add_transaction(&self, txn: Transaction) -> Result<(), crate::ApiError>;
}

/// Shared state for API handlers.
#[derive(Clone)]
pub struct AppState {
    pub explorer: Arc<Explorer>,
    pub syncer: Arc<dyn Syncer>,
    pub txpool: Arc<dyn TransactionPool>,
    /// Basic-auth password; `None` disables authentication.
    pub password: Option<String>,
}

impl AppState {
    pub fn new(
        explorer: Arc<Explorer>,
        syncer: Arc<dyn Syncer>,
        txpool: Arc<dyn TransactionPool>,
    ) -> Self {
        Self {
            explorer,
            syncer,
            txpool,
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}
