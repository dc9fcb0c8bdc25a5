//! Direct OS page-mapping path for requests at or above
//! [`SMALL_THRESHOLD`](crate::config::SMALL_THRESHOLD).
//!
//! The mapped region begins with a single machine word storing the
//! caller-requested byte count; the address returned to the caller is
//! the header address plus one machine word.

use crate::config::PAGE;
use crate::error::{Error, Result};

const HEADER_SIZE: usize = core::mem::size_of::<usize>();

/// Rounds `size` up to a multiple of `PAGE`.
#[inline]
fn round_to_pages(size: usize) -> usize {
	(size + PAGE - 1) & !(PAGE - 1)
}

/// Requests fresh anonymous read-write pages from the OS sized to fit
/// `n` bytes plus the one-word header, writes `n` at offset 0, and
/// returns a pointer to the user area (header address plus one word).
///
/// Fails with `Error::OSAlloc` if the OS refuses the mapping, or
/// `Error::TooLarge` if `n` is so large the header-inclusive size
/// overflows `usize`.
pub fn alloc(n: usize) -> Result<*mut u8> {
	let total = n.checked_add(HEADER_SIZE).ok_or(Error::TooLarge)?;
	let mapped_size = round_to_pages(total);

	let ptr = unsafe {
		libc::mmap(
			core::ptr::null_mut(),
			mapped_size,
			libc::PROT_READ | libc::PROT_WRITE,
			libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
			-1,
			0,
		)
	};

	if ptr == libc::MAP_FAILED {
		#[cfg(feature = "diagnostics")]
		log::warn!("large::alloc: mmap failed for {mapped_size} bytes");
		return Err(Error::OSAlloc);
	}

	unsafe {
		(ptr as *mut usize).write(n);
	}

	#[cfg(feature = "diagnostics")]
	log::trace!("large::alloc: requested={n} mapped={mapped_size} ptr={ptr:?}");

	Ok(unsafe { (ptr as *mut u8).add(HEADER_SIZE) })
}

/// Unmaps the region associated with the user pointer `p` (which must
/// have been returned by [`alloc`]).
///
/// Requires page alignment of the recovered header address; a
/// misaligned address is `Error::InvalidPointer` and leaves the
/// mapping untouched. A page-aligned pointer that happens not to have
/// come from this allocator is not separately detected (see
/// DESIGN.md for why a magic value was considered and dropped).
pub fn free(p: *mut u8) -> Result<()> {
	let header_addr = (p as usize)
		.checked_sub(HEADER_SIZE)
		.ok_or(Error::InvalidPointer)?;

	if header_addr % PAGE != 0 {
		return Err(Error::InvalidPointer);
	}

	let header_ptr = header_addr as *mut usize;
	let requested = unsafe { header_ptr.read() };
	let mapped_size = round_to_pages(requested + HEADER_SIZE);

	let rc = unsafe { libc::munmap(header_ptr as *mut libc::c_void, mapped_size) };
	if rc != 0 {
		#[cfg(feature = "diagnostics")]
		log::warn!("large::free: munmap failed for ptr={header_ptr:?}");
		return Err(Error::OSAlloc);
	}

	#[cfg(feature = "diagnostics")]
	log::trace!("large::free: ptr={p:?} mapped={mapped_size}");

	Ok(())
}
