use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::error::{MarketError, Result};

/// Decimal places of the ledger's native currency unit (wei per coin).
pub const NATIVE_DECIMALS: u32 = 18;

/// Converts a price quoted in major units (whole coins) to the smallest
/// integer unit. The conversion is exact: zero, negative, and sub-wei
/// precision are rejected up front rather than rounded, so an invalid price
/// never costs a ledger write.
pub fn major_to_wei(price: Decimal) -> Result<U256> {
    if price <= Decimal::ZERO {
        return Err(MarketError::InvalidPrice(format!(
            "price must be positive, got {price}"
        )));
    }
    let price = price.normalize();
    let scale = price.scale();
    if scale > NATIVE_DECIMALS {
        return Err(MarketError::InvalidPrice(format!(
            "price {price} is finer than {NATIVE_DECIMALS} decimal places"
        )));
    }
    // mantissa is the integer price scaled by 10^scale; positive after the
    // check above
    let mantissa = price.mantissa() as u128;
    let rest = 10u128.pow(NATIVE_DECIMALS - scale);
    Ok(U256::from(mantissa) * U256::from(rest))
}
