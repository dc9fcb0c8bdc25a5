//! The failure taxonomy shared by every layer of the allocator.
//!
//! Every fallible operation in this crate returns a `Result<_, Error>`
//! instead of aborting; see the crate-level docs for the "never abort"
//! contract.

use thiserror::Error;

/// The result type used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// The failure kinds a caller of this crate can observe.
///
/// `ZeroSize` is not really a failure (it asks for the documented
/// null-return behaviour) but it shares the `Result` plumbing so call
/// sites can match on it uniformly.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum Error {
	/// `alloc(0)` was requested. Not fatal: the caller gets a null
	/// address back, and the allocator's state is unchanged.
	#[error("requested allocation of zero bytes")]
	ZeroSize,

	/// The level chosen for the request has no usable node, and the
	/// allocator does not fall back to a coarser level.
	#[error("no free block available at the required level")]
	NoSpace,

	/// The request exceeds `POOL_SIZE` and cannot be served by the
	/// buddy allocator.
	#[error("requested size exceeds the pool capacity")]
	TooLarge,

	/// The OS refused to hand out pages (or refused storage for the
	/// pool/bitmap during initialization).
	#[error("the operating system refused the allocation request")]
	OSAlloc,

	/// `free` was given a pointer that cannot be mapped onto a live
	/// block: misaligned, outside the pool, or already-released.
	#[error("pointer does not correspond to a live allocation")]
	InvalidPointer,

	/// A `Bitmap` index fell outside `[0, n)`. Reaching this from
	/// within `BuddyAllocator` indicates an implementation bug, since
	/// the buddy allocator only ever computes indices that are
	/// constructed to be in range.
	#[error("bitmap index {index} out of bounds (size {size})")]
	Bounds {
		/// The out-of-range index that was requested.
		index: usize,
		/// The bitmap's size in bits.
		size: usize,
	},

	/// Storage for the pool or the bitmap could not be obtained.
	#[error("failed to acquire backing storage")]
	Allocation,
}
