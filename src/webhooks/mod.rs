//! Webhook adapters — the system boundary between channel providers and the
//! Reply Router (inbound, spec §6.2) and between Meeting creation and tenant
//! CRMs (outbound, spec §6.3). Both are thin: the real parsing and routing
//! logic lives in [`crate::channels`] and [`crate::orchestration`]
//! respectively, matching the spec's framing of webhooks as delivery
//! mechanisms rather than a subsystem of their own.

pub mod inbound;
pub mod outbound;
