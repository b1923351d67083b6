//! Exact conversion from human-denominated decimal amounts to minor units.
//!
//! The signed payment commitment encodes the amount as an integer count of
//! the currency's smallest accounting unit (e.g. 6 decimal places for a
//! typical stablecoin). The conversion here is pure decimal arithmetic:
//! an amount with more fractional digits than the currency supports is an
//! error, never a silent truncation.

use rust_decimal::Decimal;

/// Errors converting a decimal amount to minor units.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AmountError {
    /// The amount has more significant fractional digits than the currency's
    /// minor-unit scale can represent.
    #[error("amount {amount} has more than {decimals} significant fractional digits")]
    ExcessPrecision {
        /// The offending amount.
        amount: Decimal,
        /// The currency's minor-unit decimals.
        decimals: u32,
    },

    /// The amount is negative.
    #[error("amount {0} is negative")]
    Negative(Decimal),

    /// The amount does not fit in an unsigned 128-bit count of minor units.
    #[error("amount {amount} overflows at {decimals} minor-unit decimals")]
    Overflow {
        /// The offending amount.
        amount: Decimal,
        /// The currency's minor-unit decimals.
        decimals: u32,
    },
}

/// Converts `amount` to an integer count of minor units at the given scale.
///
/// Trailing fractional zeros beyond the scale are not significant and do not
/// fail: `"1.2345670"` at 6 decimals converts to `1234567`.
///
/// # Errors
///
/// Returns [`AmountError::ExcessPrecision`] if the amount carries significant
/// fractional digits beyond `decimals`, [`AmountError::Negative`] for
/// negative amounts, and [`AmountError::Overflow`] if the scaled value does
/// not fit.
pub fn to_minor_units(amount: Decimal, decimals: u32) -> Result<u128, AmountError> {
    if amount < Decimal::ZERO {
        return Err(AmountError::Negative(amount));
    }

    let mantissa = amount.mantissa();
    let scale = amount.scale();

    if scale > decimals {
        let factor = pow10(scale - decimals).ok_or(AmountError::Overflow { amount, decimals })?;
        if mantissa % factor != 0 {
            return Err(AmountError::ExcessPrecision { amount, decimals });
        }
        u128::try_from(mantissa / factor).map_err(|_| AmountError::Overflow { amount, decimals })
    } else {
        let factor = pow10(decimals - scale).ok_or(AmountError::Overflow { amount, decimals })?;
        mantissa
            .checked_mul(factor)
            .and_then(|units| u128::try_from(units).ok())
            .ok_or(AmountError::Overflow { amount, decimals })
    }
}

fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}
