//! chainview - ledger viewer and hash-chain integrity verifier
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Snapshot data model and chain validation
//! - [`transaction`] - Transaction types and schema checks
//! - [`index`] - Transaction feed and transaction-to-block lookup
//!
//! ## Host State
//! - [`session`] - Current view ownership and atomic refresh
//! - [`cache`] - Views cached by snapshot identity
//! - [`source`] - Snapshot producers
//!
//! ## Integration
//! - `api` - Read-only REST API (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod index;
pub mod transaction;

// ============================================================================
// Host State
// ============================================================================
pub mod cache;
pub mod session;
pub mod source;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
