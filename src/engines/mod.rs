//! The core dispatch engines (spec §4.1–§4.8, §4.11): pure, independently
//! testable components the orchestration layer composes. No engine holds a
//! reference to another except where the spec's own data flow requires it
//! (e.g. the Resource Pool consults the Rate Ledger; the JIT Validator
//! consults both the Suppression Index and the Resource Pool).

pub mod allocator;
pub mod cache;
pub mod enrichment;
pub mod jit;
pub mod patterns;
pub mod rate_ledger;
pub mod resource_pool;
pub mod scorer;
pub mod suppression;
