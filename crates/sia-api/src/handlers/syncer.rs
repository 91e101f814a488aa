//! Syncer passthrough.

use crate::{ApiResult, AppState};
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct PeerResponse {
    pub net_address: String,
}

#[derive(Deserialize)]
pub struct ConnectRequest {
    pub net_address: String,
}

/// GET /syncer/peers
pub async fn peers(State(state): State<AppState>) -> Json<Vec<PeerResponse>> {
    Json(
        state
            .syncer
            .peers()
            .into_iter()
            .map(|net_address| PeerResponse { net_address })
            .collect(),
    )
}

/// POST /syncer/connect
pub async fn connect(
    State(state): State<AppState>,
    Json(request): Json<ConnectRequest>,
) -> ApiResult<()> {
    state.syncer.connect(&request.net_address)
}
