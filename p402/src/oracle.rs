//! Balance oracle capability.
//!
//! Answers "can this account cover this amount" without the payment flow
//! knowing where balances live. The on-chain lookup is an external
//! collaborator; tests substitute a scripted oracle.

use alloy_primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Error querying the balance oracle.
#[derive(Debug, Clone, thiserror::Error)]
#[error("balance query failed: {reason}")]
pub struct OracleError {
    /// Why the query failed.
    pub reason: String,
}

impl OracleError {
    /// Creates a new oracle error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Answers balance sufficiency queries.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Whether `account` holds at least `amount` of the payment currency.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] if the balance cannot be determined. The
    /// payment flow treats a query error as terminal rather than assuming
    /// either answer.
    async fn sufficient_balance(
        &self,
        account: Address,
        amount: Decimal,
    ) -> Result<bool, OracleError>;
}
