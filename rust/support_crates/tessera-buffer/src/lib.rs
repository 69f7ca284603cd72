//! Typed contiguous buffers that either own their backing memory or adopt a
//! caller-supplied block under an explicit retention and deletion contract.
//!
//! # Modules
//!
//! - [`buffer`]: [`OwnedBuffer`], the concrete buffer type
//! - [`ownership`]: ownership state, retention flag and deletion methods
//! - [`storage`]: the [`Storage`] trait consumed by container types
//! - [`raw`]: fallible zero-initializing allocation helpers

pub mod buffer;
pub mod ownership;
pub mod raw;
pub mod storage;

pub use buffer::OwnedBuffer;
pub use ownership::{DeletionMethod, Deleter, Ownership, Retention};
pub use storage::Storage;
