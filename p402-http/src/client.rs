//! The payment orchestrator.
//!
//! [`PaymentClient::pay`] drives one payment attempt end to end:
//!
//! ```text
//! request → 402? → parse challenge → spend policy → approval → balance
//!         → sign canonical message → retry with proof → record outcome
//! ```
//!
//! A non-402 response completes immediately with no payment. No state is
//! revisited and there is no re-challenge loop: a second 402 on the retried
//! request is a hard failure. Expected declines (policy, approval, balance)
//! are returned as structured [`PaymentOutcome::Declined`] values; protocol
//! and infrastructure problems are [`PaymentError`]s.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use p402::approval::{ApprovalDecision, ApprovalRequest, Approver, StaticApprover};
use p402::config::{Config, CurrencyConfig, SpendConfig};
use p402::oracle::BalanceOracle;
use p402::policy::{self, PolicyViolation};
use p402::proto::{self, PaymentChallenge};
use p402::signer::Signer;
use p402::timestamp::UnixTimestamp;
use p402::transport::{ServiceRequest, ServiceResponse, Transport};
use p402_store::audit::{AuditAction, AuditTrail};
use p402_store::ledger::{EntryDraft, EntryStatus, Ledger, LedgerEntry};

use crate::error::PaymentError;

/// A request to a possibly-paid resource.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Absolute URL of the resource.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Optional request body, reused verbatim on the retry.
    pub body: Option<String>,
    /// Optional description recorded in the ledger; falls back to the
    /// challenge's description.
    pub description: Option<String>,
}

impl PaymentRequest {
    /// Creates a request with the given method.
    #[must_use]
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            body: None,
            description: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, "GET")
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the ledger description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_service_request(&self, authorization: Option<&str>) -> ServiceRequest {
        let mut request = ServiceRequest::new(&self.url, &self.method);
        if let Some(body) = &self.body {
            request = request.with_body(body);
        }
        if let Some(value) = authorization {
            request = request.with_header(proto::AUTHORIZATION_HEADER, value);
        }
        request
    }
}

/// Why a payment was declined without being attempted.
///
/// These are expected, user-facing outcomes — configuration said no, the
/// decider said no, or the funds are not there — and carry the specifics a
/// caller needs to present.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Declination {
    /// One or more spend limits were violated.
    Policy {
        /// Every violated limit, in evaluation order.
        violations: Vec<PolicyViolation>,
    },
    /// The payer's balance cannot cover the amount.
    InsufficientBalance {
        /// The amount that was asked for.
        amount: Decimal,
    },
    /// The approval capability denied the payment.
    ApprovalDenied {
        /// Optional reason from the decider.
        reason: Option<String>,
    },
}

impl std::fmt::Display for Declination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Policy { violations } => {
                write!(f, "spend policy violated: ")?;
                for (i, violation) in violations.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{violation}")?;
                }
                Ok(())
            }
            Self::InsufficientBalance { amount } => {
                write!(f, "insufficient balance for {amount}")
            }
            Self::ApprovalDenied { reason } => match reason {
                Some(reason) => write!(f, "payment not approved: {reason}"),
                None => write!(f, "payment not approved"),
            },
        }
    }
}

/// Terminal result of a payment attempt that did not hard-fail.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum PaymentOutcome {
    /// The initial response was not a 402; no payment was needed.
    NotRequired(ServiceResponse),
    /// The payment was made and the service accepted it.
    Paid {
        /// The retried response.
        response: ServiceResponse,
        /// The terminal ledger record for the payment.
        entry: LedgerEntry,
    },
    /// The payment was declined before any money moved.
    Declined(Declination),
}

/// Orchestrates the end-to-end payment flow.
///
/// One client is one payer identity: it owns one signer and serializes its
/// payments through a spend gate so two concurrent attempts cannot both
/// pass the daily-limit check and jointly exceed it.
pub struct PaymentClient {
    transport: Arc<dyn Transport>,
    signer: Arc<dyn Signer>,
    oracle: Arc<dyn BalanceOracle>,
    approver: Arc<dyn Approver>,
    ledger: Arc<Ledger>,
    audit: Arc<AuditTrail>,
    spend: SpendConfig,
    currency: CurrencyConfig,
    // Held from the daily-spend read through the terminal ledger append.
    spend_gate: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for PaymentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentClient")
            .field("payer", &self.signer.address())
            .field("spend", &self.spend)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl PaymentClient {
    /// Creates a client from its collaborators and configuration.
    ///
    /// The default approver approves everything the spend limits allow;
    /// use [`Self::with_approver`] to wire a real decision channel.
    #[must_use]
    pub fn new(
        transport: impl Transport + 'static,
        signer: impl Signer + 'static,
        oracle: impl BalanceOracle + 'static,
        ledger: Arc<Ledger>,
        audit: Arc<AuditTrail>,
        config: &Config,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            signer: Arc::new(signer),
            oracle: Arc::new(oracle),
            approver: Arc::new(StaticApprover::allow()),
            ledger,
            audit,
            spend: config.spend.clone(),
            currency: config.currency.clone(),
            spend_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Replaces the approval capability.
    #[must_use]
    pub fn with_approver(mut self, approver: impl Approver + 'static) -> Self {
        self.approver = Arc::new(approver);
        self
    }

    /// Attempts `request`, paying for it if the service demands payment.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] for protocol and infrastructure failures.
    /// Expected declines come back as [`PaymentOutcome::Declined`], not as
    /// errors.
    #[tracing::instrument(skip_all, fields(url = %request.url))]
    pub async fn pay(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
        let initial = self.transport.send(&request.to_service_request(None)).await?;
        if !initial.is_payment_required() {
            tracing::trace!(status = initial.status, "no payment required");
            return Ok(PaymentOutcome::NotRequired(initial));
        }

        let header = initial.challenge().ok_or(PaymentError::MissingChallenge)?;
        let challenge = proto::parse_challenge(header)?;
        if challenge.amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(challenge.amount));
        }

        let service = service_name(&request.url);
        tracing::debug!(
            service = %service,
            amount = %challenge.amount,
            currency = %challenge.currency,
            "received payment challenge"
        );

        let gate = self.spend_gate.lock().await;

        let daily_total = self.ledger.daily_spend(UnixTimestamp::now());
        let decision = policy::evaluate(challenge.amount, &self.spend, daily_total);
        if !decision.accepted {
            self.audit.record(
                AuditAction::LimitExceeded,
                json!({
                    "service": service,
                    "url": request.url,
                    "amount": challenge.amount.to_string(),
                    "violations": decision
                        .violations
                        .iter()
                        .map(PolicyViolation::code)
                        .collect::<Vec<_>>(),
                }),
            );
            return Ok(PaymentOutcome::Declined(Declination::Policy {
                violations: decision.violations,
            }));
        }

        if let Some(declined) = self.seek_approval(request, &challenge, &service).await {
            return Ok(PaymentOutcome::Declined(declined));
        }

        let payer = self.signer.address();
        if !self.oracle.sufficient_balance(payer, challenge.amount).await? {
            return Ok(PaymentOutcome::Declined(Declination::InsufficientBalance {
                amount: challenge.amount,
            }));
        }

        let message = proto::canonical_signing_message(payer, &challenge, self.currency.decimals)?;
        let signature = self.signer.sign(&message).await?;
        let authorization = proto::build_authorization_header(payer, &challenge, &signature, None);

        let description = request
            .description
            .clone()
            .or_else(|| challenge.description.clone())
            .unwrap_or_else(|| "x402 payment".to_owned());
        let pending = self.ledger.append(EntryDraft {
            service: service.clone(),
            description,
            amount: challenge.amount,
            currency: challenge.currency.clone(),
            status: EntryStatus::Pending,
        })?;

        // The signature is committed now; attempt the retry even though the
        // outcome is uncertain, so a spent signature always has a record.
        let retried = self
            .transport
            .send(&request.to_service_request(Some(&authorization)))
            .await;

        let outcome = match retried {
            Ok(response) if response.is_success() => {
                let entry = self.resolve(&pending, EntryStatus::Success);
                self.audit.record(
                    AuditAction::PaymentExecuted,
                    json!({
                        "service": service,
                        "url": request.url,
                        "amount": challenge.amount.to_string(),
                        "currency": challenge.currency,
                        "entry": entry.id.to_string(),
                    }),
                );
                Ok(PaymentOutcome::Paid { response, entry })
            }
            Ok(response) => {
                self.resolve(&pending, EntryStatus::Failed);
                self.audit.record(
                    AuditAction::PaymentFailed,
                    json!({
                        "service": service,
                        "url": request.url,
                        "amount": challenge.amount.to_string(),
                        "status": response.status,
                    }),
                );
                Err(PaymentError::UnexpectedStatus {
                    status: response.status,
                })
            }
            Err(e) => {
                self.resolve(&pending, EntryStatus::Failed);
                self.audit.record(
                    AuditAction::PaymentFailed,
                    json!({
                        "service": service,
                        "url": request.url,
                        "amount": challenge.amount.to_string(),
                        "error": e.to_string(),
                    }),
                );
                Err(e.into())
            }
        };

        drop(gate);
        outcome
    }

    /// Runs the approval step. Returns `Some` when the payment is denied.
    async fn seek_approval(
        &self,
        request: &PaymentRequest,
        challenge: &PaymentChallenge,
        service: &str,
    ) -> Option<Declination> {
        if policy::should_auto_approve(challenge.amount, &self.spend) {
            self.audit.record(
                AuditAction::PaymentApproved,
                json!({
                    "service": service,
                    "amount": challenge.amount.to_string(),
                    "auto_approved": true,
                }),
            );
            return None;
        }

        let approval_request = ApprovalRequest {
            challenge: challenge.clone(),
            service: service.to_owned(),
            url: request.url.clone(),
        };
        match self.approver.approve(&approval_request).await {
            ApprovalDecision::Approved => {
                self.audit.record(
                    AuditAction::PaymentApproved,
                    json!({
                        "service": service,
                        "amount": challenge.amount.to_string(),
                        "auto_approved": false,
                    }),
                );
                None
            }
            ApprovalDecision::Denied { reason } => {
                self.audit.record(
                    AuditAction::PaymentDenied,
                    json!({
                        "service": service,
                        "amount": challenge.amount.to_string(),
                        "reason": reason,
                    }),
                );
                Some(Declination::ApprovalDenied { reason })
            }
        }
    }

    /// Appends the terminal record for a pending entry.
    ///
    /// The money has already moved (or demonstrably not); losing the
    /// outcome to a bookkeeping failure would help nobody, so a failed
    /// append is logged and the pending entry stands in for the terminal
    /// one.
    fn resolve(&self, pending: &LedgerEntry, status: EntryStatus) -> LedgerEntry {
        match self.ledger.record_outcome(&pending.id, status, None) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(
                    entry = %pending.id,
                    status = status.as_str(),
                    error = %e,
                    "failed to record payment outcome in ledger"
                );
                pending.clone()
            }
        }
    }
}

/// Counterparty service identifier: the host of the paid URL.
fn service_name(request_url: &str) -> String {
    url::Url::parse(request_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| request_url.to_owned())
}
