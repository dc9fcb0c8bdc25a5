//! Synchronization primitives for the process-wide allocator singleton.
//!
//! The allocator itself is single-threaded by contract: nothing here
//! serializes partial state across `alloc`/`free` calls beyond making
//! the singleton `Sync` so it can live in a `static`.

use std::sync::{Mutex, MutexGuard};

/// A thin wrapper providing synchronized access to an inner value.
pub struct Locked<A> {
	inner: Mutex<A>,
}

impl<A> Locked<A> {
	/// Creates a new `Locked<A>` around a value.
	pub const fn new(inner: A) -> Self {
		Self { inner: Mutex::new(inner) }
	}

	/// Acquires the lock, returning a guard that releases it on drop.
	///
	/// Recovers from poisoning rather than panicking: every operation
	/// on the protected allocator leaves it in a well-defined state
	/// even on its own error paths, so a panic elsewhere while the
	/// lock was held does not imply this allocator's invariants were
	/// violated.
	pub fn lock(&self) -> MutexGuard<'_, A> {
		self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
	}
}
