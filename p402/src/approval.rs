//! Payment approval capability.
//!
//! Amounts over the auto-approve threshold need a decision from somewhere:
//! a fixed policy, an interactive prompt, an upstream tool harness. The
//! [`Approver`] trait is that seam. Two implementations ship here: a fixed
//! automatic decision and a caller-supplied decision function, which is also
//! how tests script a decision-maker.

use async_trait::async_trait;

use crate::proto::PaymentChallenge;

/// A payment awaiting an approval decision.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// The parsed challenge being paid.
    pub challenge: PaymentChallenge,
    /// Counterparty service identifier (host of the paid URL).
    pub service: String,
    /// Full URL of the paid resource.
    pub url: String,
}

/// The outcome of an approval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Proceed with the payment.
    Approved,
    /// Do not pay.
    Denied {
        /// Optional reason to surface to the caller.
        reason: Option<String>,
    },
}

/// Decides whether a payment over the auto-approve threshold proceeds.
#[async_trait]
pub trait Approver: Send + Sync {
    /// Decides on one payment.
    async fn approve(&self, request: &ApprovalRequest) -> ApprovalDecision;
}

/// An approver that always returns the same decision.
///
/// `StaticApprover::allow()` reproduces an unattended setup where anything
/// within the configured limits goes through; `StaticApprover::deny()` turns
/// the threshold into a hard cap.
#[derive(Debug, Clone, Copy)]
pub struct StaticApprover {
    approved: bool,
}

impl StaticApprover {
    /// Approves every request.
    #[must_use]
    pub const fn allow() -> Self {
        Self { approved: true }
    }

    /// Denies every request.
    #[must_use]
    pub const fn deny() -> Self {
        Self { approved: false }
    }
}

#[async_trait]
impl Approver for StaticApprover {
    async fn approve(&self, _request: &ApprovalRequest) -> ApprovalDecision {
        if self.approved {
            ApprovalDecision::Approved
        } else {
            ApprovalDecision::Denied {
                reason: Some("denied by policy".to_owned()),
            }
        }
    }
}

/// An approver that delegates to a caller-supplied function.
///
/// The function is the externally-solicited decision seam: wire it to a
/// prompt, a queue, or a scripted decider in tests.
pub struct FnApprover<F>(F);

impl<F> FnApprover<F>
where
    F: Fn(&ApprovalRequest) -> ApprovalDecision + Send + Sync,
{
    /// Wraps a decision function.
    pub const fn new(decide: F) -> Self {
        Self(decide)
    }
}

impl<F> std::fmt::Debug for FnApprover<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnApprover").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Approver for FnApprover<F>
where
    F: Fn(&ApprovalRequest) -> ApprovalDecision + Send + Sync,
{
    async fn approve(&self, request: &ApprovalRequest) -> ApprovalDecision {
        (self.0)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: &str) -> ApprovalRequest {
        ApprovalRequest {
            challenge: PaymentChallenge {
                recipient: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse().unwrap(),
                amount: amount.parse().unwrap(),
                currency: "USDC".to_owned(),
                nonce: "n".to_owned(),
                description: None,
            },
            service: "api.example.com".to_owned(),
            url: "https://api.example.com/v1/data".to_owned(),
        }
    }

    #[tokio::test]
    async fn static_approver_is_fixed() {
        assert_eq!(
            StaticApprover::allow().approve(&request("1")).await,
            ApprovalDecision::Approved
        );
        assert!(matches!(
            StaticApprover::deny().approve(&request("1")).await,
            ApprovalDecision::Denied { .. }
        ));
    }

    #[tokio::test]
    async fn fn_approver_sees_the_request() {
        let approver = FnApprover::new(|req: &ApprovalRequest| {
            if req.service == "api.example.com" {
                ApprovalDecision::Approved
            } else {
                ApprovalDecision::Denied { reason: None }
            }
        });
        assert_eq!(approver.approve(&request("1")).await, ApprovalDecision::Approved);
    }
}
