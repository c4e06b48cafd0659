//! Allocator configuration.
//!
//! A [`PoolConfig`] is fixed once it is handed to
//! [`PoolAllocator::new`](crate::PoolAllocator::new). The two alignment byte
//! counts are derived from it by the layout calculator and written back into
//! the copy the allocator keeps, so [`PoolAllocator::config`](crate::PoolAllocator::config)
//! reports them.

use std::mem;

use crate::error::{PoolError, PoolResult};
use crate::header::{ALLOC_NUM_SIZE, BLOCK_INFO_PTR_SIZE, FLAG_SIZE, REUSE_COUNT_SIZE};

/// Default number of blocks carved out of every page.
pub const DEFAULT_OBJECTS_PER_PAGE: usize = 4;

/// Default page limit.
pub const DEFAULT_MAX_PAGES: usize = 2;

/// How per-block metadata is stored.
///
/// ```text
///   None      ┌──────────┐
///             │ (empty)  │
///             └──────────┘
///   Basic     ┌──────────────┬──────┐
///             │ alloc # (u32)│ flag │
///             └──────────────┴──────┘
///   Extended  ┌──────────┬──────────────┬──────┐
///             │ uses(u16)│ alloc # (u32)│ flag │
///             └──────────┴──────────────┴──────┘
///   External  ┌─────────────────────┬──────┐
///             │ *MemBlockInfo       │ flag │
///             └─────────────────────┴──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HeaderPolicy {
  #[default]
  None,
  Basic,
  Extended,
  External,
}

impl HeaderPolicy {
  /// Bytes of policy payload, excluding the boundary flag byte.
  pub const fn payload_size(self) -> usize {
    match self {
      Self::None => 0,
      Self::Basic => ALLOC_NUM_SIZE,
      Self::Extended => REUSE_COUNT_SIZE + ALLOC_NUM_SIZE,
      Self::External => BLOCK_INFO_PTR_SIZE,
    }
  }

  /// Total header bytes in front of every block.
  pub const fn size(self) -> usize {
    match self {
      Self::None => 0,
      _ => self.payload_size() + FLAG_SIZE,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
  /// Bypass the pool and serve every object straight from the system allocator.
  pub use_client_side_memory_manager: bool,
  pub objects_per_page: usize,
  /// Upper bound on pages; 0 means unbounded.
  pub max_pages: usize,
  pub header_policy: HeaderPolicy,
  /// Power-of-two boundary for object addresses; 0 or 1 disables alignment.
  pub alignment_boundary: usize,
  pub pad_bytes_size: usize,
  pub debug_enabled: bool,
  left_align_bytes: usize,
  inter_align_bytes: usize,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self::new(
      false,
      DEFAULT_OBJECTS_PER_PAGE,
      DEFAULT_MAX_PAGES,
      HeaderPolicy::None,
      0,
      0,
      false,
    )
  }
}

impl PoolConfig {
  pub fn new(
    use_client_side_memory_manager: bool,
    objects_per_page: usize,
    max_pages: usize,
    header_policy: HeaderPolicy,
    alignment_boundary: usize,
    pad_bytes_size: usize,
    debug_enabled: bool,
  ) -> Self {
    Self {
      use_client_side_memory_manager,
      objects_per_page,
      max_pages,
      header_policy,
      alignment_boundary,
      pad_bytes_size,
      debug_enabled,
      left_align_bytes: 0,
      inter_align_bytes: 0,
    }
  }

  pub fn with_objects_per_page(
    mut self,
    objects_per_page: usize,
  ) -> Self {
    self.objects_per_page = objects_per_page;
    self
  }

  pub fn with_max_pages(
    mut self,
    max_pages: usize,
  ) -> Self {
    self.max_pages = max_pages;
    self
  }

  pub fn with_header_policy(
    mut self,
    header_policy: HeaderPolicy,
  ) -> Self {
    self.header_policy = header_policy;
    self
  }

  pub fn with_alignment(
    mut self,
    alignment_boundary: usize,
  ) -> Self {
    self.alignment_boundary = alignment_boundary;
    self
  }

  pub fn with_pad_bytes(
    mut self,
    pad_bytes_size: usize,
  ) -> Self {
    self.pad_bytes_size = pad_bytes_size;
    self
  }

  pub fn with_debug(
    mut self,
    debug_enabled: bool,
  ) -> Self {
    self.debug_enabled = debug_enabled;
    self
  }

  pub fn with_client_side_memory_manager(
    mut self,
    enabled: bool,
  ) -> Self {
    self.use_client_side_memory_manager = enabled;
    self
  }

  /// Header bytes per block for the configured policy.
  pub const fn header_size(&self) -> usize {
    self.header_policy.size()
  }

  /// Alignment bytes between the page link and the first block.
  pub const fn left_align_bytes(&self) -> usize {
    self.left_align_bytes
  }

  /// Alignment bytes after every block's right pad.
  pub const fn inter_align_bytes(&self) -> usize {
    self.inter_align_bytes
  }

  pub(crate) fn with_alignment_bytes(
    mut self,
    left_align_bytes: usize,
    inter_align_bytes: usize,
  ) -> Self {
    self.left_align_bytes = left_align_bytes;
    self.inter_align_bytes = inter_align_bytes;
    self
  }

  /// Rejects configurations the allocator cannot lay out.
  pub fn validate(
    &self,
    object_size: usize,
  ) -> PoolResult<()> {
    if self.objects_per_page == 0 {
      return Err(PoolError::InvalidConfig("objects_per_page must be non-zero"));
    }

    if self.alignment_boundary > 1 && !self.alignment_boundary.is_power_of_two() {
      return Err(PoolError::InvalidConfig("alignment_boundary must be a power of two"));
    }

    if !self.use_client_side_memory_manager && object_size < mem::size_of::<*mut u8>() {
      return Err(PoolError::InvalidConfig("object size cannot hold a free-list link"));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_sizes() {
    assert_eq!(HeaderPolicy::None.size(), 0);
    assert_eq!(HeaderPolicy::Basic.size(), 5);
    assert_eq!(HeaderPolicy::Extended.size(), 7);
    assert_eq!(HeaderPolicy::External.size(), mem::size_of::<usize>() + 1);

    assert_eq!(HeaderPolicy::Basic.payload_size(), 4);
    assert_eq!(HeaderPolicy::External.payload_size(), mem::size_of::<usize>());
  }

  #[test]
  fn test_defaults() {
    let config = PoolConfig::default();

    assert!(!config.use_client_side_memory_manager);
    assert_eq!(config.objects_per_page, DEFAULT_OBJECTS_PER_PAGE);
    assert_eq!(config.max_pages, DEFAULT_MAX_PAGES);
    assert_eq!(config.header_policy, HeaderPolicy::None);
    assert_eq!(config.header_size(), 0);
    assert_eq!(config.left_align_bytes(), 0);
    assert_eq!(config.inter_align_bytes(), 0);
  }

  #[test]
  fn test_validate() {
    let config = PoolConfig::default();
    assert!(config.validate(16).is_ok());

    let empty_page = config.clone().with_objects_per_page(0);
    assert!(matches!(empty_page.validate(16), Err(PoolError::InvalidConfig(_))));

    let odd_alignment = config.clone().with_alignment(12);
    assert!(matches!(odd_alignment.validate(16), Err(PoolError::InvalidConfig(_))));

    assert!(matches!(config.validate(2), Err(PoolError::InvalidConfig(_))));

    let passthrough = config.with_client_side_memory_manager(true);
    assert!(passthrough.validate(2).is_ok());
  }
}
