//! Spend-limit gate.
//!
//! Stateless decision logic evaluating a candidate payment amount against
//! the configured limits and the ledger's rolling daily total. All checks
//! run; violations accumulate rather than short-circuiting, so a caller can
//! show every applicable reason at once.

use rust_decimal::Decimal;

use crate::config::SpendConfig;

/// A reason a candidate payment violates spend policy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PolicyViolation {
    /// The amount exceeds the per-transaction cap.
    PerTransactionLimitExceeded {
        /// The candidate amount.
        amount: Decimal,
        /// The configured cap.
        limit: Decimal,
    },

    /// The amount would push the trailing 24-hour total past the daily cap.
    DailyLimitExceeded {
        /// Spend already accumulated in the window.
        spent: Decimal,
        /// The candidate amount.
        amount: Decimal,
        /// The configured daily cap.
        limit: Decimal,
    },
}

impl PolicyViolation {
    /// Machine-readable reason code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PerTransactionLimitExceeded { .. } => "per_transaction_limit_exceeded",
            Self::DailyLimitExceeded { .. } => "daily_limit_exceeded",
        }
    }
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerTransactionLimitExceeded { amount, limit } => {
                write!(f, "amount {amount} exceeds the {limit} per-transaction limit")
            }
            Self::DailyLimitExceeded { spent, amount, limit } => {
                write!(
                    f,
                    "amount {amount} on top of {spent} spent today exceeds the {limit} daily limit"
                )
            }
        }
    }
}

/// Outcome of evaluating a candidate amount against spend policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    /// Whether the payment may proceed.
    pub accepted: bool,
    /// Every violated limit, in evaluation order. Empty when accepted.
    pub violations: Vec<PolicyViolation>,
}

/// Evaluates `amount` against the configured limits and the daily total.
///
/// Both limit checks always run. Non-positive amounts are not this gate's
/// concern; callers reject those upstream before consulting policy.
#[must_use]
pub fn evaluate(amount: Decimal, config: &SpendConfig, daily_total: Decimal) -> PolicyDecision {
    let mut violations = Vec::new();

    if amount > config.max_transaction_amount {
        violations.push(PolicyViolation::PerTransactionLimitExceeded {
            amount,
            limit: config.max_transaction_amount,
        });
    }

    if daily_total + amount > config.daily_limit {
        violations.push(PolicyViolation::DailyLimitExceeded {
            spent: daily_total,
            amount,
            limit: config.daily_limit,
        });
    }

    PolicyDecision {
        accepted: violations.is_empty(),
        violations,
    }
}

/// Whether `amount` is small enough to skip the approval prompt.
///
/// Strictly `amount <= auto_approve_under`. This elides the confirmation
/// step only; it never bypasses the hard caps checked by [`evaluate`].
#[must_use]
pub fn should_auto_approve(amount: Decimal, config: &SpendConfig) -> bool {
    amount <= config.auto_approve_under
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn config(max_tx: &str, auto: &str, daily: &str) -> SpendConfig {
        SpendConfig {
            max_transaction_amount: dec(max_tx),
            auto_approve_under: dec(auto),
            daily_limit: dec(daily),
        }
    }

    #[test]
    fn accepts_within_all_limits() {
        let decision = evaluate(dec("0.05"), &config("10", "0.1", "50"), Decimal::ZERO);
        assert!(decision.accepted);
        assert!(decision.violations.is_empty());
    }

    #[test]
    fn rejects_over_per_transaction_limit() {
        let decision = evaluate(dec("12"), &config("10", "0.1", "50"), Decimal::ZERO);
        assert!(!decision.accepted);
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(decision.violations[0].code(), "per_transaction_limit_exceeded");
    }

    #[test]
    fn rejects_when_daily_total_would_be_exceeded() {
        let decision = evaluate(dec("0.05"), &config("10", "0.1", "50"), dec("49.98"));
        assert!(!decision.accepted);
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(decision.violations[0].code(), "daily_limit_exceeded");
    }

    #[test]
    fn exactly_reaching_a_limit_is_allowed() {
        let cfg = config("10", "0.1", "50");
        assert!(evaluate(dec("10"), &cfg, Decimal::ZERO).accepted);
        assert!(evaluate(dec("0.02"), &cfg, dec("49.98")).accepted);
    }

    #[test]
    fn accumulates_every_violation() {
        let decision = evaluate(dec("15"), &config("10", "0.1", "50"), dec("49"));
        assert!(!decision.accepted);
        let codes: Vec<_> = decision.violations.iter().map(PolicyViolation::code).collect();
        assert_eq!(
            codes,
            vec!["per_transaction_limit_exceeded", "daily_limit_exceeded"]
        );
    }

    #[test]
    fn auto_approve_is_a_strict_threshold() {
        let cfg = config("10", "0.1", "50");
        assert!(should_auto_approve(dec("0.1"), &cfg));
        assert!(should_auto_approve(dec("0.05"), &cfg));
        assert!(!should_auto_approve(dec("0.11"), &cfg));
    }

    #[test]
    fn auto_approve_never_bypasses_the_hard_cap() {
        // autoApproveUnder may exceed maxTransactionAmount in configuration;
        // both checks still apply independently.
        let cfg = config("10", "20", "50");
        assert!(should_auto_approve(dec("15"), &cfg));
        let decision = evaluate(dec("15"), &cfg, Decimal::ZERO);
        assert!(!decision.accepted);
        assert_eq!(decision.violations[0].code(), "per_transaction_limit_exceeded");
    }
}
