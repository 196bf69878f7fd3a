// SPDX-License-Identifier: Apache-2.0

use crate::BLOCK_SIZE;

/// Options for tuning [`DefaultPool`](super::DefaultPool)'s behavior.
///
/// # Block size
///
/// The capacity of each leased block, `4096B` by default. Protocol parsing assumes
/// blocks are large enough that a short multi-byte read never spans more than two
/// of them; very small block sizes are mostly useful for testing seam handling.
///
/// # Retain limit
///
/// The maximum number of collected buffers the pool keeps for reuse. Buffers
/// collected past this limit are freed. Defaults to `64`.
///
/// # Allocation
///
/// By default, the pool reuses collected buffers before allocating fresh ones. It
/// can also be set to always allocate, ignoring collected buffers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct PoolOptions {
	pub block_size: usize,
	pub retain_limit: usize,
	pub allocation: Allocate,
}

/// The block allocation mode.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Allocate {
	/// Always allocate fresh storage, never reusing collected buffers.
	Always,
	/// Reuse collected buffers, allocating only when none are left.
	#[default]
	Recycle,
}

impl Allocate {
	/// Returns `true` if the mode is [`Recycle`](Self::Recycle).
	pub fn is_recycle(&self) -> bool {
		matches!(self, Self::Recycle)
	}
}

impl Default for PoolOptions {
	fn default() -> Self { Self::new() }
}

impl PoolOptions {
	/// Creates a new set of pool options.
	pub const fn new() -> Self {
		Self {
			block_size: BLOCK_SIZE,
			retain_limit: 64,
			allocation: Allocate::Recycle,
		}
	}

	/// Returns the block size.
	#[inline]
	pub const fn block_size(&self) -> usize { self.block_size }

	/// Returns the retain limit.
	#[inline]
	pub const fn retain_limit(&self) -> usize { self.retain_limit }

	/// Returns the allocation mode.
	#[inline]
	pub const fn allocation(&self) -> Allocate { self.allocation }

	/// Sets the block size. Panics if `value` is zero.
	#[inline]
	pub fn set_block_size(&mut self, value: usize) {
		assert_ne!(value, 0, "block size should be non-zero");
		self.block_size = value;
	}

	/// Sets the retain limit.
	#[inline]
	pub fn set_retain_limit(&mut self, value: usize) {
		self.retain_limit = value;
	}

	/// Sets the allocation mode.
	#[inline]
	pub fn set_allocation(&mut self, value: Allocate) {
		self.allocation = value;
	}

	/// Sets the block size. Panics if `value` is zero.
	#[inline]
	pub const fn with_block_size(mut self, value: usize) -> Self {
		assert!(value > 0, "block size should be non-zero");
		self.block_size = value;
		self
	}

	/// Sets the retain limit.
	#[inline]
	pub const fn with_retain_limit(mut self, value: usize) -> Self {
		self.retain_limit = value;
		self
	}

	/// Sets the allocation mode.
	#[inline]
	pub const fn with_allocation(mut self, value: Allocate) -> Self {
		self.allocation = value;
		self
	}

	/// Sets allocation to [`Always`](Allocate::Always).
	#[inline]
	pub const fn always_allocate(self) -> Self {
		self.with_allocation(Allocate::Always)
	}
}
