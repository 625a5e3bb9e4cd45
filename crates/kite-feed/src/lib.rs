//! Feed-side data handling: binary tick decoding and the live snapshot store.
//!
//! Decode failures never surface as errors: the policy is to salvage what
//! a frame yields, count the rest, and keep reading. The counters live in
//! `DecodeStats`.

pub mod decoder;
pub mod snapshot;

pub use decoder::{DecodeStats, DecodedFrame, TickDecoder};
pub use snapshot::{SnapshotDelta, SnapshotEntry, SnapshotStore};
