use axum::{extract::State, Extension, Json};
use paycart_locator::LocatorError;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ResolveLocatorBody {
    pub product_url: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ResolvedLocator {
    locator: String,
    prefix: &'static str,
}

/// Maps resolver failures onto 400 responses with a code per failure kind.
pub(super) fn map_locator_error(request_id: String, error: &LocatorError) -> ApiError {
    let code = match error {
        LocatorError::EmptyInput => "empty_product_url",
        LocatorError::MalformedUrl { .. } => "malformed_product_url",
        LocatorError::MissingVariant { .. } => "missing_variant",
        LocatorError::InvalidVariant { .. } => "invalid_variant",
        LocatorError::MissingAsin { .. } => "missing_asin",
    };
    ApiError::new(request_id, code, error.to_string())
}

pub(super) async fn resolve_locator(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ResolveLocatorBody>,
) -> Result<Json<ApiResponse<ResolvedLocator>>, ApiError> {
    let locator = state
        .resolver
        .resolve(&body.product_url)
        .await
        .map_err(|e| map_locator_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ResolvedLocator {
            prefix: locator.prefix().as_str(),
            locator: locator.into_string(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
