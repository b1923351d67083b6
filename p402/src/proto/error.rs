//! Errors parsing challenge headers.

use std::fmt;

/// Errors that can occur while parsing a payment challenge header.
///
/// A malformed challenge is a protocol-contract violation by the
/// counterparty; callers surface it distinctly from policy rejections
/// because remediation differs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The header does not start with the `x402` scheme tag.
    #[error("challenge header does not start with the x402 tag")]
    MalformedChallenge,

    /// One or more required fields were absent after parsing all pairs.
    #[error("challenge is missing required fields: {}", MissingList(.missing))]
    IncompleteChallenge {
        /// Names of the absent required fields.
        missing: Vec<&'static str>,
    },

    /// A field was present but its value could not be interpreted.
    #[error("invalid value for challenge field '{key}': {message}")]
    InvalidValue {
        /// The offending field name.
        key: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

/// Comma-joins field names for the `IncompleteChallenge` message.
struct MissingList<'a>(&'a [&'static str]);

impl fmt::Display for MissingList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}
