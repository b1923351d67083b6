//! Canonical signing message construction.
//!
//! The payer signs a commitment to the payment terms. Signature verification
//! by a counterparty must be reproducible, so the message layout is fixed:
//!
//! ```text
//! payer        20 bytes
//! recipient    20 bytes
//! amount       32 bytes, big-endian integer count of minor units
//! currency     u32 big-endian length, then UTF-8 bytes
//! nonce        u32 big-endian length, then UTF-8 bytes
//! description  u32 big-endian length, then UTF-8 bytes (empty when absent)
//! ```
//!
//! Length prefixes keep consecutive variable-length fields unambiguous. The
//! amount is converted with exact decimal arithmetic; the human-readable
//! decimal string never appears in the signed bytes.

use alloy_primitives::{Address, U256};

use super::PaymentChallenge;
use crate::amount::{self, AmountError};

/// Builds the canonical byte sequence the payer signs for `challenge`.
///
/// `minor_unit_decimals` is the currency's minor-unit scale (e.g. 6 for a
/// six-decimal stablecoin).
///
/// # Errors
///
/// Returns [`AmountError`] if the challenge amount cannot be represented
/// exactly at the given scale.
pub fn canonical_signing_message(
    payer: Address,
    challenge: &PaymentChallenge,
    minor_unit_decimals: u32,
) -> Result<Vec<u8>, AmountError> {
    let minor_units = amount::to_minor_units(challenge.amount, minor_unit_decimals)?;

    let description = challenge.description.as_deref().unwrap_or("");
    let mut message = Vec::with_capacity(
        20 + 20
            + 32
            + 3 * 4
            + challenge.currency.len()
            + challenge.nonce.len()
            + description.len(),
    );
    message.extend_from_slice(payer.as_slice());
    message.extend_from_slice(challenge.recipient.as_slice());
    message.extend_from_slice(&U256::from(minor_units).to_be_bytes::<32>());
    push_field(&mut message, challenge.currency.as_bytes());
    push_field(&mut message, challenge.nonce.as_bytes());
    push_field(&mut message, description.as_bytes());
    Ok(message)
}

/// Appends one length-prefixed variable-length field.
fn push_field(message: &mut Vec<u8>, bytes: &[u8]) {
    let len = u32::try_from(bytes.len()).expect("header field length fits in u32");
    message.extend_from_slice(&len.to_be_bytes());
    message.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYER: &str = "0x4838B106FCe9647Bdf1E7877BF73cE8B0BAD5f97";
    const RECIPIENT: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

    fn challenge(amount: &str, description: Option<&str>) -> PaymentChallenge {
        PaymentChallenge {
            recipient: RECIPIENT.parse().unwrap(),
            amount: amount.parse().unwrap(),
            currency: "USDC".to_owned(),
            nonce: "n1".to_owned(),
            description: description.map(str::to_owned),
        }
    }

    #[test]
    fn layout_is_fixed() {
        let payer: Address = PAYER.parse().unwrap();
        let message = canonical_signing_message(payer, &challenge("1.234567", None), 6).unwrap();

        assert_eq!(&message[..20], payer.as_slice());
        assert_eq!(&message[20..40], challenge("1", None).recipient.as_slice());
        // 1.234567 at 6 decimals is 1234567 minor units, big-endian in 32 bytes.
        let mut amount = [0u8; 32];
        amount[28..].copy_from_slice(&1_234_567u32.to_be_bytes());
        assert_eq!(&message[40..72], &amount);
        // currency: length 4, "USDC"
        assert_eq!(&message[72..76], &4u32.to_be_bytes());
        assert_eq!(&message[76..80], b"USDC");
        // nonce: length 2, "n1"
        assert_eq!(&message[80..84], &2u32.to_be_bytes());
        assert_eq!(&message[84..86], b"n1");
        // description: empty
        assert_eq!(&message[86..90], &0u32.to_be_bytes());
        assert_eq!(message.len(), 90);
    }

    #[test]
    fn deterministic_for_equal_inputs() {
        let payer: Address = PAYER.parse().unwrap();
        let a = canonical_signing_message(payer, &challenge("0.05", Some("call")), 6).unwrap();
        let b = canonical_signing_message(payer, &challenge("0.05", Some("call")), 6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn absent_and_empty_description_encode_identically() {
        let payer: Address = PAYER.parse().unwrap();
        let absent = canonical_signing_message(payer, &challenge("0.05", None), 6).unwrap();
        let empty = canonical_signing_message(payer, &challenge("0.05", Some("")), 6).unwrap();
        assert_eq!(absent, empty);
    }

    #[test]
    fn differing_description_changes_message() {
        let payer: Address = PAYER.parse().unwrap();
        let a = canonical_signing_message(payer, &challenge("0.05", Some("a")), 6).unwrap();
        let b = canonical_signing_message(payer, &challenge("0.05", Some("b")), 6).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn excess_precision_is_rejected() {
        let payer: Address = PAYER.parse().unwrap();
        let err = canonical_signing_message(payer, &challenge("1.2345678", None), 6).unwrap_err();
        assert!(matches!(err, AmountError::ExcessPrecision { .. }));
    }
}
