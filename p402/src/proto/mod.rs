//! Wire format for the x402 challenge-response flow.
//!
//! A server demanding payment responds with HTTP 402 and a challenge header:
//!
//! ```text
//! WWW-Authenticate: x402 recipient="0x...", amount="1.50", currency="USDC", nonce="...", description="..."
//! ```
//!
//! The payer answers by retrying the request with an authorization header
//! carrying the same terms plus its identity and a signature:
//!
//! ```text
//! Authorization: x402 payer="0x...", recipient="0x...", amount="1.50", currency="USDC", nonce="...", signature="..."
//! ```
//!
//! Two representations of the amount coexist and are never conflated: the
//! headers carry the original human-readable decimal string, while the signed
//! commitment (see [`canonical_signing_message`]) encodes an integer count of
//! minor units.

mod error;
mod header;
mod signing;

pub use error::ParseError;
pub use header::{build_authorization_header, parse_challenge};
pub use signing::canonical_signing_message;

use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed tag opening both the challenge and the authorization header.
pub const SCHEME_TAG: &str = "x402";

/// Response header carrying the payment challenge (server → client).
pub const CHALLENGE_HEADER: &str = "www-authenticate";

/// Request header carrying the proof of payment (client → server).
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// HTTP 402 Payment Required status code.
pub const STATUS_PAYMENT_REQUIRED: u16 = 402;

/// A server-issued description of a required payment.
///
/// Parsed from the challenge header of a 402 response. Immutable once
/// parsed; [`parse_challenge`] fails rather than returning a partially
/// populated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentChallenge {
    /// Recipient account identifier.
    pub recipient: Address,

    /// Payment amount in the currency's major unit.
    ///
    /// Kept as an exact decimal so the digits the server sent survive the
    /// round trip into the authorization header unchanged.
    pub amount: Decimal,

    /// Currency code (e.g. `USDC`).
    pub currency: String,

    /// Server-issued single-use replay-prevention token.
    pub nonce: String,

    /// Optional human-readable description of what is being bought.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
