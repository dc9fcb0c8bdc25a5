//! Routes allocation requests to the [`BuddyAllocator`] or the OS
//! page-mapping path by size, and owns the process-wide buddy
//! instance.
//!
//! This is thin routing logic; it is covered only to the extent it
//! shapes the buddy allocator's public contract.

use std::sync::OnceLock;

use crate::buddy::BuddyAllocator;
use crate::config::SMALL_THRESHOLD;
use crate::error::{Error, Result};
use crate::large;
use crate::sync::Locked;

static BUDDY: OnceLock<Locked<BuddyAllocator>> = OnceLock::new();

fn buddy() -> Result<&'static Locked<BuddyAllocator>> {
	if let Some(b) = BUDDY.get() {
		return Ok(b);
	}
	// Racing initializers both construct an allocator; only one wins
	// the `set`, the other's pool/bitmap are dropped. Acceptable here
	// since the allocator's own contract is single-threaded; this
	// only avoids corrupting the `OnceLock` itself under accidental
	// concurrent first use.
	let fresh = BuddyAllocator::init()?;
	let _ = BUDDY.set(Locked::new(fresh));
	// NOTE: `set` above either succeeded or lost a race to another
	// initializer that also called `set`; either way `get` now
	// succeeds.
	#[allow(clippy::expect_used)]
	Ok(BUDDY.get().expect("just initialized"))
}

/// Allocates `n` bytes, routing by size.
///
/// `n == 0` returns a null pointer without touching either backend.
/// `n < SMALL_THRESHOLD` is forwarded to the buddy allocator;
/// otherwise fresh anonymous pages are requested from the OS.
pub fn alloc(n: usize) -> Result<*mut u8> {
	if n == 0 {
		return Err(Error::ZeroSize);
	}

	if n < SMALL_THRESHOLD {
		buddy()?.lock().alloc(n)
	} else {
		large::alloc(n)
	}
}

/// Releases `p`, routing by whether it lies within the buddy pool.
///
/// `p` being null is a no-op.
pub fn free(p: *mut u8) -> Result<()> {
	if p.is_null() {
		return Ok(());
	}

	let pool = buddy()?;
	let mut guard = pool.lock();
	if guard.contains(p) {
		guard.free(p)
	} else {
		drop(guard);
		large::free(p)
	}
}

/// Exposes the process-wide buddy pool for containment checks from
/// integration tests outside this module (`tests::unit::dispatcher_tests`,
/// `tests::unit::scenario_tests`).
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn buddy_for_test() -> std::sync::MutexGuard<'static, BuddyAllocator> {
	buddy().expect("buddy singleton init").lock()
}
