//! Decimal scale conventions for money and quantities.
//!
//! Prices are stored at currency scale (2 decimal places), component and line
//! quantities at scale 3 (fractional quantities such as `0.33` of a 3m bar
//! per metre of run are legitimate). Intermediate arithmetic keeps full
//! precision; rounding happens only when a stored/reported figure is
//! produced.

use rust_decimal::Decimal;

/// Currency scale (two decimal places).
pub const CURRENCY_SCALE: u32 = 2;

/// Quantity scale (three decimal places).
pub const QUANTITY_SCALE: u32 = 3;

/// Round a monetary amount to currency scale.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp(CURRENCY_SCALE)
}

/// Round a quantity to quantity scale.
pub fn round_quantity(quantity: Decimal) -> Decimal {
    quantity.round_dp(QUANTITY_SCALE)
}
