//! Selling price calculation

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;

/// Markup applied to the acquisition cost: `(2x + 1.35x) / 2`.
const MARKUP: Decimal = Decimal::from_parts(1675, 0, 0, false, 3);

/// Flat handling fee in Naira added after conversion.
const HANDLING_FEE: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("{0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub usd_price: f64,
    pub naira_price: f64,
    pub exchange_rate: f64,
}

/// Computes the USD and Naira selling prices for a product.
///
/// Both prices are rounded to two decimal places, ties to even. The Naira
/// price is derived from the unrounded USD price.
pub fn compute(cost_price: f64, shipping_cost: f64, rate: f64) -> Result<Quote, PricingError> {
    if cost_price < 0.0 || shipping_cost < 0.0 {
        return Err(PricingError::InvalidInput(
            "Costs cannot be negative".to_string(),
        ));
    }
    if !(rate.is_finite() && rate > 0.0) {
        return Err(PricingError::InvalidInput(format!(
            "Exchange rate must be positive: {rate}"
        )));
    }

    let cost = to_decimal(cost_price, "costPrice")?;
    let shipping = to_decimal(shipping_cost, "shippingCost")?;
    let fx = to_decimal(rate, "exchangeRate")?;

    let out_of_range = || PricingError::InvalidInput("Costs are out of range".to_string());
    let usd = cost
        .checked_add(shipping)
        .and_then(|acquisition| acquisition.checked_mul(MARKUP))
        .ok_or_else(out_of_range)?;
    let naira = usd
        .checked_mul(fx)
        .and_then(|local| local.checked_add(HANDLING_FEE))
        .ok_or_else(out_of_range)?;

    Ok(Quote {
        usd_price: round_money(usd)?,
        naira_price: round_money(naira)?,
        exchange_rate: rate,
    })
}

fn to_decimal(value: f64, field: &str) -> Result<Decimal, PricingError> {
    Decimal::from_f64(value)
        .ok_or_else(|| PricingError::InvalidInput(format!("{field} is not a valid amount: {value}")))
}

fn round_money(value: Decimal) -> Result<f64, PricingError> {
    value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
        .to_f64()
        .ok_or_else(|| PricingError::InvalidInput(format!("Price out of range: {value}")))
}
