#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Persistence for the p402 payment pipeline.
//!
//! Two independent stores live here:
//!
//! - [`ledger`] - The append-only transaction ledger: the system of record
//!   for every payment attempt and the sole authority for "daily spend to
//!   date". Records are never mutated; a status transition is a new record
//!   linked to the tentative one.
//! - [`audit`] - A line-delimited audit trail for compliance. It duplicates
//!   some ledger information but also records non-transactional events
//!   (approval decisions, configuration changes), and its write failures
//!   never propagate into the payment path.
//!
//! Both stores take their file locations explicitly; nothing here reads a
//! well-known global path.

pub mod audit;
pub mod ledger;
