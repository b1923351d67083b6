#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport and payment orchestration for the p402 SDK.
//!
//! This crate provides the two pieces that turn the `p402` core types into a
//! working payer:
//!
//! - [`HttpTransport`] - a reqwest-backed [`p402::transport::Transport`]
//!   with a mandatory bounded timeout.
//! - [`PaymentClient`] - the orchestrator driving the end-to-end flow:
//!   issue the request, parse the 402 challenge, gate the amount behind
//!   spend policy and approval, check the balance, sign the canonical
//!   commitment, retry with the proof header, and record the outcome in
//!   the ledger and audit trail.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use p402::config::Config;
//! use p402_http::{HttpTransport, PaymentClient, PaymentRequest};
//! use p402_store::{audit::AuditTrail, ledger::Ledger};
//!
//! # async fn pay(signer: impl p402::signer::Signer + 'static,
//! #               oracle: impl p402::oracle::BalanceOracle + 'static)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_from("p402.toml")?;
//! let client = PaymentClient::new(
//!     HttpTransport::from_config(&config.transport)?,
//!     signer,
//!     oracle,
//!     Arc::new(Ledger::open(&config.storage.ledger)?),
//!     Arc::new(AuditTrail::new(&config.storage.audit)),
//!     &config,
//! );
//! let outcome = client
//!     .pay(&PaymentRequest::get("https://api.example.com/v1/data"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod transport;

pub use client::{Declination, PaymentClient, PaymentOutcome, PaymentRequest};
pub use error::PaymentError;
pub use transport::HttpTransport;
