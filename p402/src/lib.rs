#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the payer side of the x402 payment protocol.
//!
//! This crate provides the protocol codec, spend-limit policy, and capability
//! seams used to pay for HTTP resources gated behind `402 Payment Required`
//! challenges. A server describes a required payment in a challenge header;
//! the payer signs a canonical commitment to that payment and retries the
//! request with a proof-of-payment header.
//!
//! The crate is deliberately free of I/O apart from configuration loading.
//! Network transport, key custody, balance lookup, and payment approval are
//! modeled as capability traits so callers inject their own implementations
//! and tests substitute scripted ones.
//!
//! # Modules
//!
//! - [`amount`] - Exact decimal to minor-unit conversion for signing math
//! - [`approval`] - Payment approval capability and stock deciders
//! - [`config`] - TOML configuration with environment variable expansion
//! - [`oracle`] - Balance oracle capability
//! - [`policy`] - Spend-limit gate (per-transaction, daily, auto-approve)
//! - [`proto`] - Challenge/authorization wire codec and canonical signing message
//! - [`signer`] - Opaque signing capability
//! - [`timestamp`] - Unix timestamps and the rolling daily window
//! - [`transport`] - HTTP transport capability

pub mod amount;
pub mod approval;
pub mod config;
pub mod oracle;
pub mod policy;
pub mod proto;
pub mod signer;
pub mod timestamp;
pub mod transport;
