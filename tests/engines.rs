//! Integration tests for `src/engines/`.

#[path = "common/mod.rs"]
mod common;

#[path = "engines/allocator_test.rs"]
mod allocator_test;
#[path = "engines/jit_test.rs"]
mod jit_test;
#[path = "engines/rate_ledger_test.rs"]
mod rate_ledger_test;
#[path = "engines/resource_pool_test.rs"]
mod resource_pool_test;
#[path = "engines/suppression_test.rs"]
mod suppression_test;
