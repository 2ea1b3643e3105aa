//! Agency OS — the multi-tenant outbound sales orchestration core: lead
//! pool & allocator, enrichment waterfall, JIT-gated outreach scheduler,
//! reply router, and conversion-intelligence loop (spec §1, §2).
//!
//! Everything outside this subsystem — web UI, auth, billing, ICP
//! extraction, CRM push beyond the meeting-booked event, admin dashboards,
//! onboarding — is an external collaborator this crate never implements.

pub mod admin;
pub mod channels;
pub mod config;
pub mod db;
pub mod engines;
pub mod error;
pub mod logging;
pub mod orchestration;
pub mod providers;
pub mod types;
pub mod webhooks;
