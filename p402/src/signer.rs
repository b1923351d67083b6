//! Opaque signing capability.
//!
//! Key custody and the signature algorithm live behind this trait; the
//! payment flow only ever hands it the canonical message bytes and never
//! inspects key material.

use alloy_primitives::Address;
use async_trait::async_trait;

/// Error from the signing capability.
#[derive(Debug, Clone, thiserror::Error)]
#[error("signing failed: {reason}")]
pub struct SignerError {
    /// Why the signature could not be produced.
    pub reason: String,
}

impl SignerError {
    /// Creates a new signer error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Produces payment proof signatures.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The payer account identity this signer signs for.
    fn address(&self) -> Address;

    /// Signs the canonical message bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] if the signature cannot be produced.
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;
}
