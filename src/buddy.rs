//! Fixed-pool power-of-two block allocator over a binary tree encoded
//! in a [`Bitmap`].
//!
//! The tree is the only structure: there are no per-level free lists.
//! Occupancy of a block is a single bit; usability of a candidate
//! block is decided by walking its ancestors and descendants on every
//! `alloc`. This trades per-call CPU for zero auxiliary data
//! structures, which is acceptable because `POOL_SIZE`/`MIN_BLOCK` are
//! fixed and small.

use crate::bitmap::Bitmap;
use crate::config::{L_MAX, MIN_BLOCK, NODE_COUNT, POOL_SIZE};
use crate::error::{Error, Result};

/// How a live block's node index is recovered from its address on
/// `free`.
///
/// The two modes are mutually exclusive per allocator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseMode {
	/// Reverse lookup by scanning levels coarsest-to-finest, testing
	/// alignment and the bit at each candidate node.
	Scan,
	/// The node index is stored in the first machine word of the
	/// handed-out block; the returned pointer is offset by one word
	/// past the block base.
	Metabuddy,
}

/// Fixed-capacity buddy allocator over a `POOL_SIZE`-byte pool.
pub struct BuddyAllocator {
	pool: Box<[u8]>,
	bits: Bitmap,
	mode: ReleaseMode,
}

impl BuddyAllocator {
	/// Creates an allocator with an empty bitmap and a freshly
	/// acquired pool of `POOL_SIZE` bytes, using the scanning release
	/// mode.
	pub fn init() -> Result<Self> {
		Self::init_with_mode(ReleaseMode::Scan)
	}

	/// Like [`init`](Self::init), but selects the metabuddy release
	/// mode: the node index is stored in the first machine word of
	/// each handed-out block, making `free` O(1) at the cost of one
	/// word of the user's area per allocation.
	///
	/// See DESIGN.md for why both release strategies are kept as
	/// separate constructors rather than a runtime flag.
	pub fn init_metabuddy() -> Result<Self> {
		Self::init_with_mode(ReleaseMode::Metabuddy)
	}

	fn init_with_mode(mode: ReleaseMode) -> Result<Self> {
		// Acquire pool and bitmap together; if either fails, release
		// whatever was already acquired before surfacing the error.
		let mut pool = Vec::new();
		pool.try_reserve_exact(POOL_SIZE).map_err(|_| Error::Allocation)?;
		pool.resize(POOL_SIZE, 0);
		let pool = pool.into_boxed_slice();

		let bits = Bitmap::init(NODE_COUNT)?;

		#[cfg(feature = "diagnostics")]
		log::debug!(
			"BuddyAllocator::init: pool_size={POOL_SIZE} min_block={MIN_BLOCK} nodes={NODE_COUNT} mode={mode:?}"
		);

		Ok(Self { pool, bits, mode })
	}

	/// The pool's base address, for containment checks by the
	/// dispatcher.
	#[inline]
	#[must_use]
	pub fn pool_base(&self) -> *const u8 {
		self.pool.as_ptr()
	}

	/// The pool's size in bytes (always `POOL_SIZE`).
	#[inline]
	#[must_use]
	pub const fn pool_size(&self) -> usize {
		POOL_SIZE
	}

	/// Whether `ptr` lies within `[pool_base(), pool_base() + POOL_SIZE)`.
	#[must_use]
	pub fn contains(&self, ptr: *const u8) -> bool {
		let base = self.pool_base() as usize;
		let addr = ptr as usize;
		addr.wrapping_sub(base) < POOL_SIZE
	}

	/// Allocates a block of at least `max(n, MIN_BLOCK)` bytes.
	///
	/// Returns `Error::ZeroSize` for `n == 0` (not a failure: no state
	/// change), `Error::TooLarge` if `n > POOL_SIZE`, or
	/// `Error::NoSpace` if the chosen level has no usable node. A
	/// failed scan leaves the bitmap unchanged.
	pub fn alloc(&mut self, n: usize) -> Result<*mut u8> {
		if n == 0 {
			return Err(Error::ZeroSize);
		}
		if n > POOL_SIZE {
			return Err(Error::TooLarge);
		}

		let header = match self.mode {
			ReleaseMode::Scan => 0,
			ReleaseMode::Metabuddy => core::mem::size_of::<usize>(),
		};
		// the metabuddy header eats into the first word of the user
		// area; the request is not grown to compensate in level
		// selection, so a metabuddy-path caller needing n full usable
		// bytes is responsible for pre-adding the header size.
		let rounded = n.max(MIN_BLOCK);
		let level = select_level(rounded);
		let node = self.find_usable_node(level).ok_or(Error::NoSpace)?;

		// NOTE: node came from find_usable_node, which only returns
		// indices within level_range(level) <= NODE_COUNT.
		#[allow(clippy::expect_used)]
		self.bits.set(node).expect("node index computed in-range");

		let block_size = POOL_SIZE >> level;
		let offset = (node - (level_start(level))) * block_size;
		let block_ptr = unsafe { self.pool.as_mut_ptr().add(offset) };

		#[cfg(feature = "diagnostics")]
		log::trace!(
			"BuddyAllocator::alloc: n={n} level={level} node={node} offset={offset} block_size={block_size}"
		);

		match self.mode {
			ReleaseMode::Scan => Ok(block_ptr),
			ReleaseMode::Metabuddy => unsafe {
				(block_ptr as *mut usize).write(node);
				Ok(block_ptr.add(header))
			},
		}
	}

	/// Releases the block containing `p`. `p` must equal a previously
	/// returned address (the block's start); interior pointers and
	/// pointers outside the pool are `Error::InvalidPointer`, and
	/// leave the bitmap unchanged. A null `p` is a no-op.
	pub fn free(&mut self, p: *mut u8) -> Result<()> {
		if p.is_null() {
			return Ok(());
		}

		let node = match self.mode {
			ReleaseMode::Scan => self.locate_by_scan(p)?,
			ReleaseMode::Metabuddy => self.locate_by_header(p)?,
		};

		// NOTE: node came from locate_by_scan/locate_by_header, both of
		// which only return indices already confirmed < NODE_COUNT.
		#[allow(clippy::expect_used)]
		self.bits.clear(node).expect("node index validated by locate_*");

		#[cfg(feature = "diagnostics")]
		log::trace!("BuddyAllocator::free: ptr={p:?} node={node}");

		Ok(())
	}

	/// Finds the first usable node at `level`, scanning node indices
	/// in increasing order (first-fit). A node is usable iff its own
	/// bit is clear, no ancestor's bit is set, and no descendant's bit
	/// is set.
	fn find_usable_node(&self, level: u32) -> Option<usize> {
		let (start, end) = level_range(level);
		(start..end).find(|&i| {
			!self.bits.test(i).unwrap_or(true)
				&& !self.any_ancestor_set(i)
				&& !self.any_descendant_set(i, level)
		})
	}

	/// Walks `i <- (i - 1) / 2` until the root, returning true on the
	/// first set ancestor bit.
	fn any_ancestor_set(&self, mut i: usize) -> bool {
		while i != 0 {
			i = (i - 1) / 2;
			if self.bits.test(i).unwrap_or(true) {
				return true;
			}
		}
		false
	}

	/// For each depth `1..=(L_MAX - level)` below `i`, tests the
	/// contiguous run of descendants at that depth, returning true on
	/// the first set bit found.
	fn any_descendant_set(&self, i: usize, level: u32) -> bool {
		for depth in 1..=(L_MAX - level) {
			let first = ((i + 1) << depth) - 1;
			let count = 1usize << depth;
			for d in 0..count {
				if self.bits.test(first + d).unwrap_or(true) {
					return true;
				}
			}
		}
		false
	}

	/// Reverse lookup from coarsest to finest level: the first level
	/// whose bit is actually set for an aligned offset wins. Only the
	/// level holding the live block can have its bit set there, so
	/// order affects only mis-aimed pointers.
	fn locate_by_scan(&self, p: *mut u8) -> Result<usize> {
		let off = self.offset_in_pool(p)?;

		for level in 0..=L_MAX {
			let block_size = POOL_SIZE >> level;
			if block_size < MIN_BLOCK {
				break;
			}
			if off % block_size != 0 {
				continue;
			}
			let index_in_level = off / block_size;
			let node = level_start(level) + index_in_level;
			if self.bits.test(node).unwrap_or(false) {
				return Ok(node);
			}
		}

		Err(Error::InvalidPointer)
	}

	/// Reads the node index from the header word one word before `p`,
	/// validating it is in range and live before trusting it.
	fn locate_by_header(&self, p: *mut u8) -> Result<usize> {
		let header_size = core::mem::size_of::<usize>();
		let header_ptr = (p as usize)
			.checked_sub(header_size)
			.ok_or(Error::InvalidPointer)? as *mut u8;

		// header must itself land inside the pool.
		self.offset_in_pool(header_ptr)?;

		let node = unsafe { (header_ptr as *const usize).read() };
		if node >= NODE_COUNT || !self.bits.test(node).unwrap_or(false) {
			return Err(Error::InvalidPointer);
		}
		Ok(node)
	}

	fn offset_in_pool(&self, p: *mut u8) -> Result<usize> {
		if p.is_null() || !self.contains(p) {
			return Err(Error::InvalidPointer);
		}
		Ok(p as usize - self.pool_base() as usize)
	}
}

/// Chooses the smallest level whose block size is `>=` the (already
/// rounded-up) requested size, halving `POOL_SIZE` downward from the
/// root.
fn select_level(rounded: usize) -> u32 {
	let mut level = 0;
	let mut block_size = POOL_SIZE;
	while level < L_MAX && block_size / 2 >= rounded {
		block_size /= 2;
		level += 1;
	}
	level
}

/// First node index at `level` (0-based, heap order).
#[inline]
const fn level_start(level: u32) -> usize {
	(1usize << level) - 1
}

/// `[start, end)` node-index range occupied by `level`.
#[inline]
const fn level_range(level: u32) -> (usize, usize) {
	(level_start(level), level_start(level + 1))
}
