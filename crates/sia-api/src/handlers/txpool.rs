//! Transaction pool passthrough.

use crate::{ApiResult, AppState};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use sia_types::Transaction;

/// Broadcast request: the transaction plus any unconfirmed parents it
/// depends on, added to the pool first.
#[derive(Deserialize)]
pub struct BroadcastRequest {
    pub transaction: Transaction,
    #[serde(default)]
    pub depends_on: Vec<Transaction>,
}

/// GET /txpool/transactions
pub async fn transactions(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.txpool.transactions())
}

/// POST /txpool/broadcast
pub async fn broadcast(
    State(state): State<AppState>,
    Json(request): Json<BroadcastRequest>,
) -> ApiResult<()> {
    for txn in &request.depends_on {
        state.txpool.add_transaction(txn.clone())?;
    }
    state.txpool.add_transaction(request.transaction.clone())?;
    state
        .syncer
        .broadcast_transaction(&request.transaction, &request.depends_on);
    Ok(())
}
