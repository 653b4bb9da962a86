//! Infrastructure Layer
//!
//! Repository adapters: PostgreSQL for the service, in-memory for tests and
//! local runs.

pub mod memory;
pub mod postgres;
