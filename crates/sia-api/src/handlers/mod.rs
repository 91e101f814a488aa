//! Request handlers.

pub mod address;
pub mod chain;
pub mod element;
pub mod syncer;
pub mod transaction;
pub mod txpool;

use crate::{ApiError, ApiResult};
use std::str::FromStr;

/// Parses a path segment that carries a textual identifier. Addresses
/// and transaction ids arrive JSON-encoded (quoted); the bare textual
/// form is accepted too.
pub(crate) fn parse_segment<T>(segment: &str, what: &str) -> ApiResult<T>
where
    T: FromStr + serde::de::DeserializeOwned,
{
    if segment.starts_with('"') {
        return serde_json::from_str(segment)
            .map_err(|e| ApiError::bad_request(format!("invalid {what}: {e}")));
    }
    segment
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid {what}")))
}
