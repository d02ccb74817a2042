//! Stay pricing.
//!
//! Orders are priced with [`price_stay`]. Confirmations settle at the quote
//! carried by the paid order ([`PriceQuote::issued`]) when it matches the
//! amount captured, and otherwise re-price with [`price_stay`].

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

const SECONDS_PER_NIGHT: i64 = 24 * 60 * 60;

/// Minor units (paise, cents) per whole currency unit
pub const MINOR_UNITS_PER_UNIT: i64 = 100;

/// Platform fee as a fraction of the subtotal (10%)
pub fn platform_fee_rate() -> Decimal {
    Decimal::new(10, 2)
}

/// Price breakdown for a stay, in whole currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub nights: i64,
    pub subtotal: i64,
    pub platform_fee: i64,
    pub total: i64,
}

impl PriceQuote {
    /// Rebuild a quote issued earlier from its subtotal and fee
    pub fn issued(nights: i64, subtotal: i64, platform_fee: i64) -> AppResult<Self> {
        if subtotal < 0 || platform_fee < 0 {
            return Err(AppError::Validation("Quoted price must not be negative".to_string()));
        }
        let total = subtotal
            .checked_add(platform_fee)
            .ok_or_else(|| AppError::Validation("Total price out of range".to_string()))?;
        Ok(Self {
            nights,
            subtotal,
            platform_fee,
            total,
        })
    }

    /// Total expressed in the provider's minor units
    pub fn total_minor_units(&self) -> AppResult<i64> {
        to_minor_units(self.total)
    }
}

/// Whole currency units to the provider's minor units
pub fn to_minor_units(amount: i64) -> AppResult<i64> {
    amount
        .checked_mul(MINOR_UNITS_PER_UNIT)
        .ok_or_else(|| AppError::Validation("Total price out of range".to_string()))
}

/// Number of nights in `[start, end)`, rounding partial days up.
///
/// Fails with `InvalidRange` when the range holds no time at all.
pub fn nights_between(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<i64> {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        return Err(AppError::InvalidRange(
            "End date must be after start date".to_string(),
        ));
    }
    Ok((seconds + SECONDS_PER_NIGHT - 1) / SECONDS_PER_NIGHT)
}

/// Round-half-up fee on a non-negative subtotal
pub fn platform_fee(subtotal: i64) -> AppResult<i64> {
    (Decimal::from(subtotal) * platform_fee_rate())
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| AppError::Validation("Platform fee out of range".to_string()))
}

/// Price a stay at `nightly_rate` over `[start, end)`
pub fn price_stay(nightly_rate: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<PriceQuote> {
    if nightly_rate < 0 {
        return Err(AppError::Validation("Nightly rate must not be negative".to_string()));
    }

    let nights = nights_between(start, end)?;
    let subtotal = nightly_rate
        .checked_mul(nights)
        .ok_or_else(|| AppError::Validation("Subtotal out of range".to_string()))?;
    let platform_fee = platform_fee(subtotal)?;
    let total = subtotal
        .checked_add(platform_fee)
        .ok_or_else(|| AppError::Validation("Total price out of range".to_string()))?;

    Ok(PriceQuote {
        nights,
        subtotal,
        platform_fee,
        total,
    })
}
