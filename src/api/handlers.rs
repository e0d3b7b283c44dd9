use crate::core::manager::RateManager;
use crate::core::pricing::{self, PricingError, Quote};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, instrument};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_rate: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        ApiError::BadRequest(message.to_string())
    }
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidInput(message) => ApiError::BadRequest(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// GET /api/health
pub async fn health_check(State(manager): State<Arc<RateManager>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        current_rate: manager.cache().current().map(|rate| rate.value()),
    };
    (StatusCode::OK, Json(response))
}

/// POST /api/calculate
///
/// Body: `{"costPrice": number, "shippingCost": number}`. Numeric strings are
/// accepted as well.
#[instrument(name = "CalculatePrice", skip_all)]
pub async fn calculate_price(
    State(manager): State<Arc<RateManager>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Quote>, ApiError> {
    let Json(body) = payload.map_err(|e| {
        debug!(error = %e, "Rejected request body");
        ApiError::bad_request("Invalid number format")
    })?;

    let cost_price = read_amount(&body, "costPrice")?;
    let shipping_cost = read_amount(&body, "shippingCost")?;
    if cost_price < 0.0 || shipping_cost < 0.0 {
        return Err(ApiError::bad_request("Costs cannot be negative"));
    }

    let rate = manager.get_rate().await.map_err(|e| {
        error!(error = %e, "No exchange rate for price calculation");
        ApiError::Internal(format!("Failed to get exchange rate: {e}"))
    })?;

    let quote = pricing::compute(cost_price, shipping_cost, rate.value())?;
    debug!(?quote, "Calculated price");
    Ok(Json(quote))
}

fn read_amount(body: &Value, field: &str) -> Result<f64, ApiError> {
    let value = body
        .get(field)
        .ok_or_else(|| ApiError::bad_request("Missing required fields"))?;

    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount
        .filter(|a| a.is_finite())
        .ok_or_else(|| ApiError::bad_request("Invalid number format"))
}
