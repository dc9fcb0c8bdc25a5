//! A small user-space allocator that routes requests to one of two
//! backends based on size: a fixed-capacity buddy allocator for small
//! requests, and direct OS page-mapping for large ones.
//!
//! The core of this crate is [`buddy::BuddyAllocator`]: a binary-tree
//! free-block tracker encoded as a [`bitmap::Bitmap`], with a
//! best-level selection algorithm and a pointer-to-block reverse
//! lookup used on release. [`dispatcher`] is thin routing logic that
//! forwards to the buddy allocator or to [`large`]'s OS page-mapping
//! path, and owns the process-wide lazily-initialized buddy instance.
//!
//! This crate never aborts the process: every failure is a returned
//! `Err` value, and a failed operation leaves the allocator's
//! observable state unchanged.

#![warn(missing_docs)]
#![deny(unreachable_pub)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod bitmap;
pub mod buddy;
pub mod config;
pub mod dispatcher;
pub mod error;
mod large;
mod sync;


pub use bitmap::Bitmap;
pub use buddy::BuddyAllocator;
pub use error::{Error, Result};

/// Allocates `n` bytes, routing to the buddy allocator or the OS
/// page-mapping path by size (see [`dispatcher::alloc`]).
///
/// Returns a null pointer for `n == 0`, `NoSpace`, `TooLarge`, and
/// `OSAlloc`, discarding which of those occurred. Callers that need
/// to distinguish them should call [`dispatcher::alloc`] directly.
#[must_use]
pub fn my_malloc(n: usize) -> *mut u8 {
	dispatcher::alloc(n).unwrap_or(core::ptr::null_mut())
}

/// Releases a pointer previously returned by [`my_malloc`]. A null
/// pointer is a no-op; an invalid pointer is silently rejected (see
/// [`dispatcher::free`] to observe the rejection).
pub fn my_free(p: *mut u8) {
	let _ = dispatcher::free(p);
}
