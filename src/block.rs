//! Byte view over a single block inside a page.

use std::ptr::{self, NonNull};
use std::slice;

use crate::layout::BlockLayout;

/// What a block currently holds.
///
/// A free block reuses the first word of its object region as the free-list
/// link; an in-use block's object bytes belong to the caller and are never
/// interpreted by the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
  Free { next: Option<NonNull<u8>> },
  InUse,
}

/// A block addressed by its first byte (the first header byte).
pub struct Block<'a> {
  start: NonNull<u8>,
  layout: &'a BlockLayout,
}

impl<'a> Block<'a> {
  /// # Safety
  ///
  /// `start` must point to `layout.stride()` bytes of a live page, laid out
  /// according to `layout`, and nothing else may access those bytes while the
  /// view is in use.
  pub unsafe fn from_start(
    start: NonNull<u8>,
    layout: &'a BlockLayout,
  ) -> Self {
    Self { start, layout }
  }

  /// # Safety
  ///
  /// Same as [`Block::from_start`], with `object` pointing at the object
  /// region of the block.
  pub unsafe fn from_object(
    object: NonNull<u8>,
    layout: &'a BlockLayout,
  ) -> Self {
    let start = unsafe { object.sub(layout.object_offset()) };
    Self { start, layout }
  }

  pub fn object_ptr(&self) -> NonNull<u8> {
    unsafe { self.start.add(self.layout.object_offset()) }
  }

  pub fn address(&self) -> usize {
    self.object_ptr().as_ptr() as usize
  }

  fn region(
    &self,
    offset: usize,
    len: usize,
  ) -> &[u8] {
    // SAFETY: the constructor guarantees the whole stride is readable and
    // every caller stays within it.
    unsafe { slice::from_raw_parts(self.start.as_ptr().add(offset), len) }
  }

  fn region_mut(
    &mut self,
    offset: usize,
    len: usize,
  ) -> &mut [u8] {
    // SAFETY: as for `region`, plus exclusive access through `&mut self`.
    unsafe { slice::from_raw_parts_mut(self.start.as_ptr().add(offset), len) }
  }

  pub fn header_mut(&mut self) -> &mut [u8] {
    self.region_mut(0, self.layout.header_size())
  }

  /// Header bytes handed to the header strategy.
  pub fn payload(&self) -> &[u8] {
    self.region(0, self.layout.payload_size())
  }

  pub fn payload_mut(&mut self) -> &mut [u8] {
    self.region_mut(0, self.layout.payload_size())
  }

  pub fn left_pad(&self) -> &[u8] {
    self.region(self.layout.left_pad_offset(), self.layout.pad_size())
  }

  pub fn left_pad_mut(&mut self) -> &mut [u8] {
    self.region_mut(self.layout.left_pad_offset(), self.layout.pad_size())
  }

  pub fn object_mut(&mut self) -> &mut [u8] {
    self.region_mut(self.layout.object_offset(), self.layout.object_size())
  }

  pub fn right_pad(&self) -> &[u8] {
    self.region(self.layout.right_pad_offset(), self.layout.pad_size())
  }

  pub fn right_pad_mut(&mut self) -> &mut [u8] {
    self.region_mut(self.layout.right_pad_offset(), self.layout.pad_size())
  }

  pub fn inter_align_mut(&mut self) -> &mut [u8] {
    self.region_mut(self.layout.inter_align_offset(), self.layout.inter_align())
  }

  /// Boundary flag, `None` when the policy has no header.
  pub fn in_use(&self) -> Option<bool> {
    self.layout.flag_offset().map(|offset| self.region(offset, 1)[0] != 0)
  }

  pub fn set_in_use(
    &mut self,
    in_use: bool,
  ) {
    if let Some(offset) = self.layout.flag_offset() {
      self.region_mut(offset, 1)[0] = u8::from(in_use);
    }
  }

  /// Reads the free-list link stored in the object region.
  pub fn next_free(&self) -> Option<NonNull<u8>> {
    // SAFETY: the object region is at least one pointer wide; it may be
    // unaligned when alignment is disabled.
    let next = unsafe { ptr::read_unaligned(self.object_ptr().as_ptr() as *const *mut u8) };
    NonNull::new(next)
  }

  pub fn set_next_free(
    &mut self,
    next: Option<NonNull<u8>>,
  ) {
    let next = next.map_or(ptr::null_mut(), NonNull::as_ptr);
    unsafe { ptr::write_unaligned(self.object_ptr().as_ptr() as *mut *mut u8, next) };
  }
}
