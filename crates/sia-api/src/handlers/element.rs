//! Element lookup handlers.

use super::parse_segment;
use crate::{ApiResult, AppState};
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use sia_types::{ElementId, FileContractElement, SiacoinElement, SiafundElement};

/// Tagged result of an id search across all element kinds. An empty
/// kind means no element matched.
#[derive(Serialize, Default)]
pub struct ElementSearchResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siacoin_element: Option<SiacoinElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siafund_element: Option<SiafundElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_contract_element: Option<FileContractElement>,
}

/// GET /element/siacoin/:id
pub async fn siacoin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SiacoinElement>> {
    let id: ElementId = parse_segment(&id, "element id")?;
    Ok(Json(state.explorer.siacoin_element(&id)?))
}

/// GET /element/siafund/:id
pub async fn siafund(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SiafundElement>> {
    let id: ElementId = parse_segment(&id, "element id")?;
    Ok(Json(state.explorer.siafund_element(&id)?))
}

/// GET /element/contract/:id
pub async fn contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FileContractElement>> {
    let id: ElementId = parse_segment(&id, "element id")?;
    Ok(Json(state.explorer.file_contract_element(&id)?))
}

/// GET /element/search/:id
///
/// Tries every element kind and tags the hit.
pub async fn search(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ElementSearchResponse>> {
    let id: ElementId = parse_segment(&id, "element id")?;
    let mut response = ElementSearchResponse::default();
    if let Ok(elem) = state.explorer.siacoin_element(&id) {
        response.kind = "siacoin";
        response.siacoin_element = Some(elem);
    } else if let Ok(elem) = state.explorer.siafund_element(&id) {
        response.kind = "siafund";
        response.siafund_element = Some(elem);
    } else if let Ok(elem) = state.explorer.file_contract_element(&id) {
        response.kind = "contract";
        response.file_contract_element = Some(elem);
    }
    Ok(Json(response))
}
