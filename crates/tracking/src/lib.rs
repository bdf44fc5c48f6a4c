//! Cutsync Tracking Interface
//!
//! Defines the narrow surface the export pipeline uses to talk to the
//! remote tracking database:
//! - **Types:** entity references, filters, batch requests with explicit
//!   correlation ids, server capabilities
//! - **Service:** the `TrackingService` trait injected into the pipeline
//! - **Memory:** a complete in-memory backend for tests and replay
//!
//! Field names follow the remote schema (`code`, `sg_cut_in`,
//! `sg_cut_out`, `sg_cut_order`, `sg_head_in`, `sg_tail_out`, ...).

pub mod memory;
pub mod service;
pub mod types;

pub use memory::MemoryTracking;
pub use service::TrackingService;
pub use types::*;
