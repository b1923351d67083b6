//! Error taxonomy for the payment flow.

use rust_decimal::Decimal;

use p402::amount::AmountError;
use p402::oracle::OracleError;
use p402::proto::ParseError;
use p402::signer::SignerError;
use p402::transport::TransportError;
use p402_store::ledger::LedgerError;

/// Hard failures of a payment attempt.
///
/// Every variant is terminal for the current attempt; nothing here is
/// retried automatically — retrying is the caller's decision. Expected
/// outcomes (policy rejection, insufficient balance, approval denial) are
/// *not* errors; they come back as
/// [`PaymentOutcome::Declined`](crate::PaymentOutcome::Declined) so callers
/// can show the specific reasons.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PaymentError {
    /// The initial or retried request could not be sent.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service demanded payment but sent no challenge header.
    #[error("payment required but no challenge header present")]
    MissingChallenge,

    /// The challenge header could not be parsed: a protocol-contract
    /// violation by the counterparty, distinct from a policy rejection.
    #[error(transparent)]
    Challenge(#[from] ParseError),

    /// The challenge asked for a non-positive amount.
    #[error("challenge amount {0} is not positive")]
    InvalidAmount(Decimal),

    /// The challenge amount cannot be represented at the currency's
    /// minor-unit scale.
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// The signer refused or failed to sign.
    #[error(transparent)]
    Signing(#[from] SignerError),

    /// The balance oracle could not answer.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// The ledger could not record the attempt before money moved.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The retried request was not accepted. A second 402 lands here too:
    /// there is no re-challenge loop.
    #[error("payment not accepted: retried request returned status {status}")]
    UnexpectedStatus {
        /// Status code of the retried response.
        status: u16,
    },
}
