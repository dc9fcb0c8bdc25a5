//! Invariant-level coverage for [`crate::BuddyAllocator`], independent
//! of the dispatcher. Each test owns its own allocator instance, so
//! these don't need [`crate::tests::lock_dispatcher_tests`].

use crate::config::{MIN_BLOCK, POOL_SIZE};
use crate::{BuddyAllocator, Error};

fn new_allocator() -> BuddyAllocator {
	BuddyAllocator::init().expect("init")
}

#[test]
fn size_adequacy_and_distinct_addresses() {
	let mut a = new_allocator();

	let p1 = a.alloc(100).expect("alloc 100");
	let p2 = a.alloc(256).expect("alloc 256");
	let p3 = a.alloc(50).expect("alloc 50");

	assert_ne!(p1, p2);
	assert_ne!(p2, p3);
	assert_ne!(p1, p3);

	// every returned block must be usable for its full requested size.
	unsafe {
		core::ptr::write_bytes(p1, 0xAA, 100);
		core::ptr::write_bytes(p2, 0xBB, 256);
		core::ptr::write_bytes(p3, 0xCC, 50);
	}

	a.free(p1).expect("free p1");
	a.free(p2).expect("free p2");
	a.free(p3).expect("free p3");
}

#[test]
fn disjointness_under_many_small_allocations() {
	let mut a = new_allocator();
	let mut ptrs: Vec<*mut u8> = Vec::new();

	for _ in 0..10 {
		ptrs.push(a.alloc(64).expect("alloc 64"));
	}

	// pairwise distinct, and none within MIN_BLOCK of another.
	for i in 0..ptrs.len() {
		for j in (i + 1)..ptrs.len() {
			let diff = (ptrs[i] as isize - ptrs[j] as isize).unsigned_abs();
			assert!(diff >= MIN_BLOCK, "blocks {i} and {j} overlap");
		}
	}

	for p in ptrs {
		a.free(p).expect("free");
	}
}

#[test]
fn reuse_after_free_prefers_lower_address() {
	// alloc(512), alloc(128), free the 512, then alloc(128) again
	// should reuse the just-freed, lower-addressed region.
	let mut a = new_allocator();

	let block_a = a.alloc(512).expect("alloc 512");
	let block_b = a.alloc(128).expect("alloc 128");
	a.free(block_a).expect("free block_a");
	let block_c = a.alloc(128).expect("alloc 128 again");

	assert!(block_c < block_b);

	a.free(block_b).expect("free block_b");
	a.free(block_c).expect("free block_c");
}

#[test]
fn reversibility_after_freeing_everything() {
	let mut a = new_allocator();
	let mut ptrs = Vec::new();

	for _ in 0..50 {
		ptrs.push(a.alloc(32).expect("alloc 32"));
	}
	for p in ptrs.drain(..) {
		a.free(p).expect("free");
	}

	// the pool must now accept a whole-pool allocation, which only
	// succeeds if every bit was actually cleared.
	let whole = a.alloc(POOL_SIZE).expect("alloc whole pool");
	assert_eq!(whole, a.pool_base() as *mut u8);
}

#[test]
fn containment_holds_for_every_level() {
	let mut a = new_allocator();
	let base = a.pool_base() as usize;

	for &size in &[64usize, 128, 512, 4096, 1024 * 64] {
		let p = a.alloc(size).expect("alloc");
		let addr = p as usize;
		assert!(addr >= base);
		assert!(addr + size <= base + POOL_SIZE);
		a.free(p).expect("free");
	}
}

#[test]
fn too_large_request_is_rejected() {
	let mut a = new_allocator();
	assert_eq!(a.alloc(POOL_SIZE + 1), Err(Error::TooLarge));
}

#[test]
fn zero_size_request_does_not_mutate_state() {
	let mut a = new_allocator();
	assert_eq!(a.alloc(0), Err(Error::ZeroSize));
	// the pool must still be entirely free.
	let whole = a.alloc(POOL_SIZE).expect("alloc whole pool after zero-size");
	a.free(whole).expect("free");
}

#[test]
fn whole_pool_alloc_then_second_alloc_fails() {
	// whole-pool allocation leaves no room for a second byte
	let mut a = new_allocator();
	let whole = a.alloc(POOL_SIZE).expect("alloc whole pool");
	assert_eq!(whole, a.pool_base() as *mut u8);
	assert_eq!(a.alloc(1), Err(Error::NoSpace));
	a.free(whole).expect("free");
	assert!(a.alloc(1).is_ok());
}

#[test]
fn invalid_free_is_rejected_without_state_change() {
	// an interior pointer must not be accepted as a live block start
	let mut a = new_allocator();
	let p = a.alloc(256).expect("alloc 256");

	let interior = unsafe { p.add(1) };
	assert_eq!(a.free(interior), Err(Error::InvalidPointer));

	// the original block must still be releasable afterwards.
	a.free(p).expect("free should still succeed");
}

#[test]
fn free_of_pointer_outside_pool_is_rejected() {
	let mut a = new_allocator();
	let outside = 0xdead_beefusize as *mut u8;
	assert_eq!(a.free(outside), Err(Error::InvalidPointer));
}

#[test]
fn free_of_null_is_a_no_op() {
	let mut a = new_allocator();
	assert!(a.free(core::ptr::null_mut()).is_ok());

	// the pool must still be entirely free.
	let whole = a.alloc(POOL_SIZE).expect("alloc whole pool after null free");
	a.free(whole).expect("free");
}

#[test]
fn metabuddy_mode_round_trips() {
	let mut a = BuddyAllocator::init_metabuddy().expect("init_metabuddy");

	let p = a.alloc(128).expect("alloc 128");
	unsafe {
		core::ptr::write_bytes(p, 0x42, 128);
	}
	a.free(p).expect("free");

	// after freeing, the whole pool must be reclaimable again.
	let whole = a.alloc(POOL_SIZE).expect("alloc whole pool");
	a.free(whole).expect("free whole pool");
}

#[test]
fn metabuddy_mode_rejects_interior_pointer() {
	let mut a = BuddyAllocator::init_metabuddy().expect("init_metabuddy");
	let p = a.alloc(128).expect("alloc 128");
	let interior = unsafe { p.add(8) };
	assert_eq!(a.free(interior), Err(Error::InvalidPointer));
	a.free(p).expect("free original");
}
