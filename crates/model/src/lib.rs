//! Cutsync Domain Model
//!
//! The in-memory Sequence → Shot → Segment graph built incrementally as
//! the host streams export callbacks, and its reconciliation against the
//! remote tracking database:
//! - **Segment:** raw host metadata plus derived cut/edit frame math
//! - **Shot:** segment container, base-segment selection, cached remote
//!   cut fields
//! - **Sequence:** shot structure sync, cut ordering, Cut/CutItem creation
//!
//! Ownership is exclusive down the chain: a session owns its sequences, a
//! sequence its shots, a shot its segments. Nothing is shared across
//! sessions.

pub mod segment;
pub mod sequence;
pub mod shot;

pub use segment::{Segment, SegmentData};
pub use sequence::{CutSummary, Sequence};
pub use shot::{BatchData, RemoteCutFields, Shot};
