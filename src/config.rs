//! Compile-time tunables.
//!
//! The constants below are plain `pub const`s so a downstream fork can
//! change them, but [`validate_tunables`] is wired into a
//! const-evaluated item below so an invalid combination fails to
//! compile instead of misbehaving at runtime.

/// Size of the buddy pool, in bytes. Must be a power of two.
pub const POOL_SIZE: usize = 1024 * 1024;

/// Size of the smallest allocatable buddy block, in bytes. Must be a
/// power of two that divides `POOL_SIZE`.
pub const MIN_BLOCK: usize = 64;

/// System page size, in bytes, used by the large-allocation path.
pub const PAGE: usize = 4096;

/// Requests of at least this many bytes are routed to the OS
/// page-mapping path instead of the buddy allocator.
pub const SMALL_THRESHOLD: usize = PAGE / 4;

/// Deepest usable level of the buddy tree: level 0 is the whole pool,
/// level `L_MAX` holds `MIN_BLOCK`-sized leaves.
pub const L_MAX: u32 = log2_usize(POOL_SIZE / MIN_BLOCK);

/// Total number of nodes in the complete binary tree spanning levels
/// `0..=L_MAX`, i.e. `2^(L_MAX + 1) - 1`.
pub const NODE_COUNT: usize = (1usize << (L_MAX + 1)) - 1;

/// Integer base-2 logarithm of a power-of-two value, computed at
/// compile time with no floating-point rounding risk.
const fn log2_usize(mut value: usize) -> u32 {
	assert!(value > 0, "log2 of zero is undefined");
	let mut level = 0u32;
	while value > 1 {
		value >>= 1;
		level += 1;
	}
	level
}

/// Validates the tunables above, panicking (at compile time, via the
/// `const _` item below) if they are inconsistent.
///
/// Rejects non-power-of-two tunables at configuration time rather
/// than only checking it where it happens to matter at runtime.
const fn validate_tunables() {
	assert!(POOL_SIZE.is_power_of_two(), "POOL_SIZE must be a power of two");
	assert!(MIN_BLOCK.is_power_of_two(), "MIN_BLOCK must be a power of two");
	assert!(PAGE.is_power_of_two(), "PAGE must be a power of two");
	assert!(MIN_BLOCK <= POOL_SIZE, "MIN_BLOCK must not exceed POOL_SIZE");
	assert!(POOL_SIZE % MIN_BLOCK == 0, "MIN_BLOCK must divide POOL_SIZE");
	assert!(
		SMALL_THRESHOLD < POOL_SIZE / MIN_BLOCK || SMALL_THRESHOLD <= POOL_SIZE / 2,
		"SMALL_THRESHOLD must be small relative to the pool"
	);
	assert!(SMALL_THRESHOLD <= POOL_SIZE / 2, "SMALL_THRESHOLD must be at most POOL_SIZE / 2");
}

const _: () = validate_tunables();
