//! Chain stats and consensus state handlers.

use super::parse_segment;
use crate::{ApiResult, AppState};
use axum::extract::{Path, State};
use axum::Json;
use sia_types::{ChainIndex, ChainStats, ConsensusState};

/// GET /chain/:index
///
/// Stats for a block; `tip` serves the engine's cached tip stats.
pub async fn stats(
    State(state): State<AppState>,
    Path(index): Path<String>,
) -> ApiResult<Json<ChainStats>> {
    if index == "tip" {
        return Ok(Json(state.explorer.chain_stats_latest()));
    }
    let index: ChainIndex = parse_segment(&index, "chain index")?;
    Ok(Json(state.explorer.chain_stats(&index)?))
}

/// GET /chain/:index/state
pub async fn consensus_state(
    State(state): State<AppState>,
    Path(index): Path<String>,
) -> ApiResult<Json<ConsensusState>> {
    let index: ChainIndex = parse_segment(&index, "chain index")?;
    Ok(Json(state.explorer.consensus_state(&index)?))
}
