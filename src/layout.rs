//! Byte layout of blocks and pages.
//!
//! Computed once per allocator and reused for every page.
//!
//! ```text
//!   Page:
//!   ┌──────┬────────────┬─────────┬─────────┬─────┬─────────┐
//!   │ link │ left align │ block 0 │ block 1 │ ... │ block N │
//!   └──────┴────────────┴─────────┴─────────┴─────┴─────────┘
//!
//!   Block (one stride):
//!   ┌────────┬──────────┬──────────────┬───────────┬─────────────┐
//!   │ header │ left pad │    object    │ right pad │ inter align │
//!   └────────┴──────────┴──────────────┴───────────┴─────────────┘
//!                       ▲
//!                       └── pointer handed to the caller
//! ```

use std::mem;

use crate::align_to;
use crate::config::PoolConfig;
use crate::header::FLAG_SIZE;

/// Size of the word at the start of every page that chains pages together.
pub const PAGE_LINK_SIZE: usize = mem::size_of::<*mut u8>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
  object_size: usize,
  header_size: usize,
  payload_size: usize,
  pad_size: usize,
  left_align: usize,
  inter_align: usize,
  objects_per_page: usize,
}

impl BlockLayout {
  pub fn new(
    object_size: usize,
    config: &PoolConfig,
  ) -> Self {
    let header_size = config.header_size();
    let pad_size = config.pad_bytes_size;
    let boundary = config.alignment_boundary;

    let before_object = PAGE_LINK_SIZE + header_size + pad_size;
    let left_align = align_to!(before_object, boundary) - before_object;

    let raw_stride = header_size + pad_size + object_size + pad_size;
    let inter_align = align_to!(raw_stride, boundary) - raw_stride;

    Self {
      object_size,
      header_size,
      payload_size: config.header_policy.payload_size(),
      pad_size,
      left_align,
      inter_align,
      objects_per_page: config.objects_per_page,
    }
  }

  pub const fn object_size(&self) -> usize {
    self.object_size
  }

  pub const fn header_size(&self) -> usize {
    self.header_size
  }

  /// Header bytes owned by the header policy (everything but the flag).
  pub const fn payload_size(&self) -> usize {
    self.payload_size
  }

  pub const fn pad_size(&self) -> usize {
    self.pad_size
  }

  pub const fn left_align(&self) -> usize {
    self.left_align
  }

  pub const fn inter_align(&self) -> usize {
    self.inter_align
  }

  pub const fn objects_per_page(&self) -> usize {
    self.objects_per_page
  }

  pub const fn left_pad_offset(&self) -> usize {
    self.header_size
  }

  pub const fn object_offset(&self) -> usize {
    self.header_size + self.pad_size
  }

  pub const fn right_pad_offset(&self) -> usize {
    self.object_offset() + self.object_size
  }

  pub const fn inter_align_offset(&self) -> usize {
    self.right_pad_offset() + self.pad_size
  }

  /// Offset of the boundary flag byte, if the policy has a header.
  pub const fn flag_offset(&self) -> Option<usize> {
    if self.header_size == 0 {
      None
    } else {
      Some(self.header_size - FLAG_SIZE)
    }
  }

  /// Distance between the starts of two neighbouring blocks.
  pub const fn stride(&self) -> usize {
    self.inter_align_offset() + self.inter_align
  }

  /// Offset of block 0 from the start of its page.
  pub const fn first_block_offset(&self) -> usize {
    PAGE_LINK_SIZE + self.left_align
  }

  pub const fn block_offset(
    &self,
    index: usize,
  ) -> usize {
    self.first_block_offset() + index * self.stride()
  }

  pub const fn page_size(&self) -> usize {
    self.first_block_offset() + self.objects_per_page * self.stride()
  }
}
