use axum::extract::{rejection::QueryRejection, Query};
use axum::Json;
use models::calc::{MultiplyQuery, MultiplyResult};
use tracing::debug;

use crate::errors::JsonApiError;

/// Multiply two numbers.
///
/// Returns the product together with the operation name and both inputs.
#[utoipa::path(
    get, path = "/multiply", tag = "calc",
    params(MultiplyQuery),
    responses(
        (status = 200, description = "Product of a and b", body = MultiplyResult),
        (status = 400, description = "Missing or non-numeric parameter")
    )
)]
pub async fn multiply(query: Result<Query<MultiplyQuery>, QueryRejection>) -> Result<Json<MultiplyResult>, JsonApiError> {
    let Query(q) = query.map_err(|e| JsonApiError::bad_request(e.body_text()))?;
    debug!(a = q.a, b = q.b, "multiply");
    Ok(Json(q.evaluate()))
}
