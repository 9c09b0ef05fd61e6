//! Cryptographic primitives for credential verification.
//!
//! This module provides:
//! - Ed25519 key pairs and `did:key` / multibase key encodings
//! - EdDSA JWT signing and verification
//! - Embedded-proof signing and verification for JSON-LD documents

pub mod keys;
pub mod signing;
