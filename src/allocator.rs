use std::ptr::NonNull;

use libc::c_void;
use tracing::{debug, error, trace, warn};

use crate::align;
use crate::block::BlockState;
use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::freelist::FreeList;
use crate::header::{BlockMeta, HeaderInfo, HeaderStrategy, strategy_for};
use crate::layout::BlockLayout;
use crate::page::{self, PageList};
use crate::pattern::{ALLOCATED_PATTERN, FREED_PATTERN, check_padding};
use crate::stats::PoolStats;

/// Fixed-size object allocator.
///
/// Serves `object_size` byte blocks out of pages it allocates on demand and
/// keeps until it is dropped. Not thread-safe.
pub struct PoolAllocator {
  config: PoolConfig,
  layout: BlockLayout,
  stats: PoolStats,
  free_list: FreeList,
  pages: PageList,
  header: Box<dyn HeaderStrategy>,
  alloc_counter: u32,
}

impl PoolAllocator {
  /// Builds the allocator and, unless pass-through is configured, its first
  /// page.
  pub fn new(
    object_size: usize,
    config: PoolConfig,
  ) -> PoolResult<Self> {
    config.validate(object_size)?;

    let layout = BlockLayout::new(object_size, &config);
    let config = config.with_alignment_bytes(layout.left_align(), layout.inter_align());
    let page_align = align!(config.alignment_boundary.max(1));
    let passthrough = config.use_client_side_memory_manager;
    let page_size = if passthrough { 0 } else { layout.page_size() };

    debug!(
      object_size,
      page_size,
      header = ?config.header_policy,
      passthrough,
      "creating pool allocator"
    );

    let mut allocator = Self {
      header: strategy_for(config.header_policy),
      stats: PoolStats::new(object_size, page_size),
      pages: PageList::new(layout.page_size(), page_align),
      free_list: FreeList::new(),
      layout,
      config,
      alloc_counter: 0,
    };

    if !passthrough {
      allocator.allocate_new_page()?;
    }

    Ok(allocator)
  }

  /// Hands out one block.
  ///
  /// `label` is kept in the block's metadata record under
  /// [`HeaderPolicy::External`](crate::HeaderPolicy::External) and ignored
  /// otherwise.
  pub fn allocate(
    &mut self,
    label: Option<&str>,
  ) -> PoolResult<NonNull<u8>> {
    if self.config.use_client_side_memory_manager {
      return self.allocate_passthrough();
    }

    if self.free_list.is_empty() {
      self.allocate_new_page()?;
    }

    // SAFETY: the free list only ever holds blocks of our own pages.
    let Some(mut block) = (unsafe { self.free_list.pop(&self.layout) }) else {
      return Err(PoolError::OutOfPages {
        max_pages: self.config.max_pages,
      });
    };

    self.alloc_counter = self.alloc_counter.wrapping_add(1);
    let meta = BlockMeta {
      alloc_num: self.alloc_counter,
      label,
    };

    block.object_mut().fill(ALLOCATED_PATTERN);
    self.header.encode(block.payload_mut(), &meta);
    block.set_in_use(true);
    self.stats.record_allocation(true);

    let object = block.object_ptr();
    if self.config.debug_enabled {
      trace!(address = ?object, alloc_num = meta.alloc_num, ?label, "allocated block");
    }

    Ok(object)
  }

  /// Returns a block to the pool. A null pointer is ignored.
  ///
  /// # Safety
  ///
  /// `object` must be null or a pointer obtained from [`PoolAllocator::allocate`]
  /// on this allocator. In pass-through mode it must additionally not have
  /// been freed already.
  pub unsafe fn free(
    &mut self,
    object: *mut u8,
  ) -> PoolResult<()> {
    let Some(object) = NonNull::new(object) else {
      return Ok(());
    };
    let address = object.as_ptr() as usize;

    if self.stats.deallocations >= self.stats.allocations {
      warn!(address, "free without a matching allocation");
      return Err(PoolError::BadBoundary { address });
    }

    if self.config.use_client_side_memory_manager {
      unsafe { libc::free(object.as_ptr() as *mut c_void) };
      self.stats.record_deallocation(false);
      return Ok(());
    }

    let Some(mut block) = self.pages.find_block(&self.layout, object) else {
      warn!(address, "free of an address outside any block");
      return Err(PoolError::BadBoundary { address });
    };

    let already_free = match block.in_use() {
      Some(in_use) => !in_use,
      // SAFETY: the free list only ever holds blocks of our own pages.
      None => self.config.debug_enabled && unsafe { self.free_list.contains(&self.layout, object) },
    };
    if already_free {
      warn!(address, "block freed twice");
      return Err(PoolError::DoubleFree { address });
    }

    if self.layout.pad_size() > 0 {
      if let Err(err) = check_padding(&block) {
        error!(%err, "refusing to free corrupted block");
        return Err(err);
      }
    }

    block.object_mut().fill(FREED_PATTERN);
    // SAFETY: the block was in use, so it is not on the list yet.
    unsafe { self.free_list.push(&mut block) };
    self.header.release(block.payload_mut());
    block.set_in_use(false);
    self.stats.record_deallocation(true);

    if self.config.debug_enabled {
      trace!(address, "freed block");
    }

    Ok(())
  }

  pub fn stats(&self) -> PoolStats {
    self.stats
  }

  pub fn config(&self) -> &PoolConfig {
    &self.config
  }

  pub fn layout(&self) -> &BlockLayout {
    &self.layout
  }

  pub fn set_debug(
    &mut self,
    enabled: bool,
  ) {
    debug!(enabled, "pool allocator debug mode changed");
    self.config.debug_enabled = enabled;
  }

  /// Top of the free list, null when empty. For diagnostics only.
  pub fn free_list(&self) -> *const u8 {
    self.free_list.head().map_or(std::ptr::null(), |head| head.as_ptr() as *const u8)
  }

  /// Most recently allocated page, null when none. For diagnostics only.
  pub fn page_list(&self) -> *const u8 {
    self.pages.head().map_or(std::ptr::null(), |head| head.as_ptr() as *const u8)
  }

  /// Decoded header of the block at `object`.
  ///
  /// `None` for addresses that are not a block of this allocator and for
  /// [`HeaderPolicy::None`](crate::HeaderPolicy::None).
  pub fn header_info(
    &self,
    object: NonNull<u8>,
  ) -> Option<HeaderInfo> {
    let block = self.pages.find_block(&self.layout, object)?;
    self.header.decode(block.payload())
  }

  /// Live external metadata records.
  pub fn outstanding_records(&self) -> usize {
    self.header.outstanding_records()
  }

  /// Every block of every page with its state, newest page first.
  pub fn blocks(&self) -> Vec<(NonNull<u8>, BlockState)> {
    // SAFETY: the free list only ever holds blocks of our own pages.
    let free = unsafe { self.free_list.addresses(&self.layout) };
    let mut blocks = Vec::with_capacity(self.stats.capacity(self.layout.objects_per_page()));

    for page in self.pages.iter() {
      // SAFETY: pages stay alive until `self` is dropped.
      for block in unsafe { page::blocks_of(page, &self.layout) } {
        let state = if free.contains(&block.address()) {
          BlockState::Free {
            next: block.next_free(),
          }
        } else {
          BlockState::InUse
        };
        blocks.push((block.object_ptr(), state));
      }
    }

    blocks
  }

  /// Calls `callback(object, object_size)` for every block still handed
  /// out and returns how many there were.
  pub fn dump_memory_in_use<F>(
    &self,
    mut callback: F,
  ) -> usize
  where
    F: FnMut(NonNull<u8>, usize),
  {
    let object_size = self.stats.object_size;
    let mut count = 0;

    for (object, state) in self.blocks() {
      if state == BlockState::InUse {
        callback(object, object_size);
        count += 1;
      }
    }

    count
  }

  /// Checks the pad bytes of every block, calling `callback(object,
  /// object_size)` for each corrupted one. Returns the number of corrupted
  /// blocks.
  pub fn validate_pages<F>(
    &self,
    mut callback: F,
  ) -> usize
  where
    F: FnMut(NonNull<u8>, usize),
  {
    if self.layout.pad_size() == 0 {
      return 0;
    }

    let mut count = 0;
    for page in self.pages.iter() {
      // SAFETY: pages stay alive until `self` is dropped.
      for block in unsafe { page::blocks_of(page, &self.layout) } {
        if check_padding(&block).is_err() {
          callback(block.object_ptr(), self.layout.object_size());
          count += 1;
        }
      }
    }

    count
  }

  fn allocate_passthrough(&mut self) -> PoolResult<NonNull<u8>> {
    let size = self.stats.object_size;
    let raw = unsafe { libc::malloc(size.max(1)) } as *mut u8;
    let object = NonNull::new(raw).ok_or(PoolError::OutOfMemory { size })?;

    self.stats.record_allocation(false);
    if self.config.debug_enabled {
      trace!(address = ?object, "allocated unpooled object");
    }

    Ok(object)
  }

  fn allocate_new_page(&mut self) -> PoolResult<()> {
    let max_pages = self.config.max_pages;
    if max_pages != 0 && self.pages.len() >= max_pages {
      warn!(max_pages, "page limit reached");
      return Err(PoolError::OutOfPages { max_pages });
    }

    let page = self.pages.grow()?;
    // SAFETY: `page` was just allocated with this layout's page size.
    unsafe { page::carve_page(page, &self.layout, &mut self.free_list) };
    self.stats.record_page(self.layout.objects_per_page());

    debug!(
      page = ?page,
      pages_in_use = self.stats.pages_in_use,
      "allocated new page"
    );

    Ok(())
  }
}

impl Drop for PoolAllocator {
  fn drop(&mut self) {
    if self.header.owns_records() {
      for page in self.pages.iter() {
        // SAFETY: pages are freed only after this loop, when `pages` drops.
        for mut block in unsafe { page::blocks_of(page, &self.layout) } {
          self.header.release(block.payload_mut());
        }
      }
    }

    debug!(
      pages = self.pages.len(),
      objects_in_use = self.stats.objects_in_use,
      "dropping pool allocator"
    );
  }
}
