//! Challenge parsing and authorization header construction.

use std::fmt::Write as _;
use std::sync::LazyLock;

use alloy_primitives::Address;
use base64::prelude::*;
use regex::Regex;
use rust_decimal::Decimal;

use super::{PaymentChallenge, ParseError, SCHEME_TAG};

/// Matches one `key="value"` pair. Values may contain anything except an
/// unescaped double quote; there is no escape mechanism in this format.
static PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("static regex is valid"));

/// Parses a payment challenge from a challenge header value.
///
/// The header must begin with the `x402` tag followed by a space; the
/// remainder is a sequence of `key="value"` pairs. Unknown keys are ignored.
/// An empty value counts as absent.
///
/// # Errors
///
/// - [`ParseError::MalformedChallenge`] if the tag prefix is missing.
/// - [`ParseError::IncompleteChallenge`] if any of `recipient`, `amount`,
///   `currency`, `nonce` is absent after parsing all pairs.
/// - [`ParseError::InvalidValue`] if `recipient` is not a well-formed
///   account identifier or `amount` is not a decimal number.
pub fn parse_challenge(header: &str) -> Result<PaymentChallenge, ParseError> {
    let params = header
        .strip_prefix(SCHEME_TAG)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or(ParseError::MalformedChallenge)?;

    let mut recipient: Option<Address> = None;
    let mut amount: Option<Decimal> = None;
    let mut currency: Option<String> = None;
    let mut nonce: Option<String> = None;
    let mut description: Option<String> = None;

    for pair in PAIR.captures_iter(params) {
        let (key, value) = (&pair[1], &pair[2]);
        if value.is_empty() {
            continue;
        }
        match key {
            "recipient" => {
                recipient = Some(value.parse().map_err(|_| ParseError::InvalidValue {
                    key: "recipient",
                    message: format!("'{value}' is not an account identifier"),
                })?);
            }
            "amount" => {
                amount = Some(value.parse().map_err(|_| ParseError::InvalidValue {
                    key: "amount",
                    message: format!("'{value}' is not a decimal amount"),
                })?);
            }
            "currency" => currency = Some(value.to_owned()),
            "nonce" => nonce = Some(value.to_owned()),
            "description" => description = Some(value.to_owned()),
            _ => {}
        }
    }

    let mut missing = Vec::new();
    if recipient.is_none() {
        missing.push("recipient");
    }
    if amount.is_none() {
        missing.push("amount");
    }
    if currency.is_none() {
        missing.push("currency");
    }
    if nonce.is_none() {
        missing.push("nonce");
    }
    if !missing.is_empty() {
        return Err(ParseError::IncompleteChallenge { missing });
    }

    Ok(PaymentChallenge {
        recipient: recipient.expect("checked above"),
        amount: amount.expect("checked above"),
        currency: currency.expect("checked above"),
        nonce: nonce.expect("checked above"),
        description,
    })
}

/// Builds the authorization header answering a challenge.
///
/// Pairs appear in fixed order: `payer`, `recipient`, `amount`, `currency`,
/// `nonce`, `signature`, then `settlement_ref` when present. The amount is
/// the challenge's original decimal string so the header stays readable by
/// humans and services; only the signed commitment uses minor units. The
/// signature bytes are base64-encoded.
#[must_use]
pub fn build_authorization_header(
    payer: Address,
    challenge: &PaymentChallenge,
    signature: &[u8],
    settlement_ref: Option<&str>,
) -> String {
    let mut header = format!(
        "{SCHEME_TAG} payer=\"{payer}\", recipient=\"{recipient}\", amount=\"{amount}\", \
         currency=\"{currency}\", nonce=\"{nonce}\", signature=\"{signature}\"",
        recipient = challenge.recipient,
        amount = challenge.amount,
        currency = challenge.currency,
        nonce = challenge.nonce,
        signature = BASE64_STANDARD.encode(signature),
    );
    if let Some(settlement) = settlement_ref {
        let _ = write!(header, ", settlement_ref=\"{settlement}\"");
    }
    header
}
