//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic digests (SHA-256, hex encoding)

pub mod crypto;
