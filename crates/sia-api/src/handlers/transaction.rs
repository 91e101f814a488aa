//! Transaction lookup.

use super::parse_segment;
use crate::{ApiResult, AppState};
use axum::extract::{Path, State};
use axum::Json;
use sia_types::{Transaction, TransactionId};

/// GET /transaction/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Transaction>> {
    let id: TransactionId = parse_segment(&id, "transaction id")?;
    Ok(Json(state.explorer.transaction(&id)?))
}
