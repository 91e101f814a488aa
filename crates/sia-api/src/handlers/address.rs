//! Per-address queries and their batch variants.

use super::parse_segment;
use crate::{ApiError, ApiResult, AppState};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sia_types::{Address, Currency, ElementId, SiacoinElement, SiafundElement, Transaction};

/// Batch requests are capped to keep response times bounded.
const MAX_BATCH_SIZE: usize = 100;

/// Siacoin and siafund balances of one address.
#[derive(Serialize, Deserialize)]
pub struct BalanceResponse {
    pub siacoins: Currency,
    pub siafunds: u64,
}

/// Pagination for transaction history.
#[derive(Deserialize)]
pub struct TransactionsQuery {
    pub amount: usize,
    pub offset: usize,
}

/// One entry of a batched transaction-history request.
#[derive(Deserialize)]
pub struct TransactionsRequest {
    pub address: Address,
    pub amount: usize,
    pub offset: usize,
}

fn balance_of(state: &AppState, address: &Address) -> ApiResult<BalanceResponse> {
    Ok(BalanceResponse {
        siacoins: state.explorer.siacoin_balance(address)?,
        siafunds: state.explorer.siafund_balance(address)?,
    })
}

fn siacoin_elements_of(state: &AppState, address: &Address) -> ApiResult<Vec<SiacoinElement>> {
    state
        .explorer
        .unspent_siacoin_elements(address)?
        .iter()
        .map(|id| Ok(state.explorer.siacoin_element(id)?))
        .collect()
}

fn siafund_elements_of(state: &AppState, address: &Address) -> ApiResult<Vec<SiafundElement>> {
    state
        .explorer
        .unspent_siafund_elements(address)?
        .iter()
        .map(|id| Ok(state.explorer.siafund_element(id)?))
        .collect()
}

fn check_batch_len(len: usize) -> ApiResult<()> {
    if len > MAX_BATCH_SIZE {
        return Err(ApiError::bad_request(format!(
            "too many batch entries: maximum {MAX_BATCH_SIZE}, got {len}"
        )));
    }
    Ok(())
}

/// GET /address/:address/balance
pub async fn balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<BalanceResponse>> {
    let address: Address = parse_segment(&address, "address")?;
    Ok(Json(balance_of(&state, &address)?))
}

/// GET /address/:address/siacoins
pub async fn siacoins(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<Vec<ElementId>>> {
    let address: Address = parse_segment(&address, "address")?;
    Ok(Json(state.explorer.unspent_siacoin_elements(&address)?))
}

/// GET /address/:address/siafunds
pub async fn siafunds(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<Vec<ElementId>>> {
    let address: Address = parse_segment(&address, "address")?;
    Ok(Json(state.explorer.unspent_siafund_elements(&address)?))
}

/// GET /address/:address/transactions?amount=N&offset=M
pub async fn transactions(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<Json<Vec<sia_types::TransactionId>>> {
    let address: Address = parse_segment(&address, "address")?;
    Ok(Json(state.explorer.transactions(
        &address,
        query.amount,
        query.offset,
    )?))
}

/// POST /batch/addresses/balance
pub async fn batch_balance(
    State(state): State<AppState>,
    Json(addresses): Json<Vec<Address>>,
) -> ApiResult<Json<Vec<BalanceResponse>>> {
    check_batch_len(addresses.len())?;
    addresses
        .iter()
        .map(|address| balance_of(&state, address))
        .collect::<ApiResult<Vec<_>>>()
        .map(Json)
}

/// POST /batch/addresses/siacoins
pub async fn batch_siacoins(
    State(state): State<AppState>,
    Json(addresses): Json<Vec<Address>>,
) -> ApiResult<Json<Vec<Vec<SiacoinElement>>>> {
    check_batch_len(addresses.len())?;
    addresses
        .iter()
        .map(|address| siacoin_elements_of(&state, address))
        .collect::<ApiResult<Vec<_>>>()
        .map(Json)
}

/// POST /batch/addresses/siafunds
pub async fn batch_siafunds(
    State(state): State<AppState>,
    Json(addresses): Json<Vec<Address>>,
) -> ApiResult<Json<Vec<Vec<SiafundElement>>>> {
    check_batch_len(addresses.len())?;
    addresses
        .iter()
        .map(|address| siafund_elements_of(&state, address))
        .collect::<ApiResult<Vec<_>>>()
        .map(Json)
}

/// POST /batch/addresses/transactions
pub async fn batch_transactions(
    State(state): State<AppState>,
    Json(requests): Json<Vec<TransactionsRequest>>,
) -> ApiResult<Json<Vec<Vec<Transaction>>>> {
    check_batch_len(requests.len())?;
    requests
        .iter()
        .map(|req| {
            state
                .explorer
                .transactions(&req.address, req.amount, req.offset)?
                .iter()
                .map(|id| Ok(state.explorer.transaction(id)?))
                .collect::<ApiResult<Vec<_>>>()
        })
        .collect::<ApiResult<Vec<_>>>()
        .map(Json)
}
