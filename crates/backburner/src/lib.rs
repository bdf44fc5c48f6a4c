//! Cutsync Backburner Dispatcher
//!
//! Submits asynchronous render/transcode/upload work to the external
//! Backburner farm:
//! - **Queue:** the `JobQueue` capability interface, job specs with
//!   explicit dependency edges, and an in-memory fake
//! - **Job:** the process-spawning Backburner implementation: name
//!   sanitization, manager selection, per-job context files, job-id
//!   parsing
//! - **Thumbnails:** bundling of preview generation so entities sharing
//!   one source render produce one transcode and one upload
//!
//! This crate only submits; execution and scheduling belong to the farm.

pub mod job;
pub mod queue;
pub mod thumbnails;

pub use job::{AlwaysAuthenticated, AuthProvider, BackburnerQueue};
pub use queue::{FakeQueue, JobId, JobPayload, JobQueue, JobSpec};
pub use thumbnails::ThumbnailGenerator;
