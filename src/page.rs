//! Raw pages and the list that chains them.
//!
//! Pages come from `posix_memalign(3)` and go back through `free(3)` only
//! when the list is dropped. The first word of every page holds the address
//! of the page allocated before it:
//!
//! ```text
//!   head ──► ┌──────┬─────────────┐   ┌──────┬─────────────┐
//!            │ next ├─ blocks ... │ ┌►│ next ├─ blocks ... │──► null
//!            └──┬───┴─────────────┘ │ └──────┴─────────────┘
//!               └───────────────────┘
//! ```

use std::ptr::{self, NonNull};

use libc::c_void;

use crate::block::Block;
use crate::error::{PoolError, PoolResult};
use crate::freelist::FreeList;
use crate::layout::BlockLayout;
use crate::pattern::{ALIGN_PATTERN, PAD_PATTERN, UNALLOCATED_PATTERN};

#[derive(Debug)]
pub struct PageList {
  head: Option<NonNull<u8>>,
  len: usize,
  page_size: usize,
  page_align: usize,
}

impl PageList {
  /// `page_align` must be a power of two multiple of the pointer size.
  pub fn new(
    page_size: usize,
    page_align: usize,
  ) -> Self {
    Self {
      head: None,
      len: 0,
      page_size,
      page_align,
    }
  }

  pub fn head(&self) -> Option<NonNull<u8>> {
    self.head
  }

  pub fn len(&self) -> usize {
    self.len
  }

  /// Allocates a page and makes it the new head.
  pub fn grow(&mut self) -> PoolResult<NonNull<u8>> {
    let mut raw: *mut c_void = ptr::null_mut();
    let rc = unsafe { libc::posix_memalign(&mut raw, self.page_align, self.page_size) };

    let page = match NonNull::new(raw as *mut u8) {
      Some(page) if rc == 0 => page,
      _ => {
        return Err(PoolError::OutOfMemory {
          size: self.page_size,
        });
      }
    };

    let next = self.head.map_or(ptr::null_mut(), NonNull::as_ptr);
    // SAFETY: the page is at least one word long and aligned to a word.
    unsafe { (page.as_ptr() as *mut *mut u8).write(next) };

    self.head = Some(page);
    self.len += 1;
    Ok(page)
  }

  pub fn iter(&self) -> Pages {
    Pages { current: self.head }
  }

  /// Finds the block whose object region starts at `object`.
  pub fn find_block<'a>(
    &self,
    layout: &'a BlockLayout,
    object: NonNull<u8>,
  ) -> Option<Block<'a>> {
    let addr = object.as_ptr() as usize;

    for page in self.iter() {
      let first = page.as_ptr() as usize + layout.first_block_offset();
      let end = first + layout.objects_per_page() * layout.stride();
      if addr < first || addr >= end {
        continue;
      }

      let within = (addr - first) % layout.stride();
      if within != layout.object_offset() {
        return None;
      }

      // SAFETY: `addr` is an object boundary inside a live page.
      return Some(unsafe { Block::from_object(object, layout) });
    }

    None
  }
}

impl Drop for PageList {
  fn drop(&mut self) {
    let mut current = self.head.take();

    while let Some(page) = current {
      // SAFETY: every page starts with the link written by `grow`.
      let next = unsafe { (page.as_ptr() as *const *mut u8).read() };
      unsafe { libc::free(page.as_ptr() as *mut c_void) };
      current = NonNull::new(next);
    }

    self.len = 0;
  }
}

/// Iterator over page base addresses, newest first.
pub struct Pages {
  current: Option<NonNull<u8>>,
}

impl Iterator for Pages {
  type Item = NonNull<u8>;

  fn next(&mut self) -> Option<Self::Item> {
    let page = self.current?;
    // SAFETY: pages handed out by `PageList` start with a link word.
    let next = unsafe { (page.as_ptr() as *const *mut u8).read() };
    self.current = NonNull::new(next);
    Some(page)
  }
}

/// Blocks of one page in address order.
///
/// # Safety
///
/// `page` must be a live page of `layout.page_size()` bytes.
pub unsafe fn blocks_of<'a>(
  page: NonNull<u8>,
  layout: &'a BlockLayout,
) -> impl Iterator<Item = Block<'a>> {
  (0..layout.objects_per_page()).map(move |index| {
    let start = unsafe { page.add(layout.block_offset(index)) };
    unsafe { Block::from_start(start, layout) }
  })
}

/// Stamps a fresh page and pushes its blocks onto `free_list` in address
/// order, so the last block of the page ends up on top.
///
/// # Safety
///
/// `page` must be a page freshly returned by [`PageList::grow`] for `layout`.
pub unsafe fn carve_page(
  page: NonNull<u8>,
  layout: &BlockLayout,
  free_list: &mut FreeList,
) {
  let left_align = unsafe { page.add(crate::layout::PAGE_LINK_SIZE) };
  unsafe { ptr::write_bytes(left_align.as_ptr(), ALIGN_PATTERN, layout.left_align()) };

  for mut block in unsafe { blocks_of(page, layout) } {
    block.header_mut().fill(0);
    block.left_pad_mut().fill(PAD_PATTERN);
    block.object_mut().fill(UNALLOCATED_PATTERN);
    block.right_pad_mut().fill(PAD_PATTERN);
    block.inter_align_mut().fill(ALIGN_PATTERN);
    unsafe { free_list.push(&mut block) };
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{HeaderPolicy, PoolConfig};
  use crate::pattern::verify_pattern;

  fn layout() -> BlockLayout {
    let config = PoolConfig::default()
      .with_objects_per_page(3)
      .with_header_policy(HeaderPolicy::Basic)
      .with_alignment(16)
      .with_pad_bytes(2);
    BlockLayout::new(24, &config)
  }

  #[test]
  fn test_grow_links_pages() {
    let layout = layout();
    let mut pages = PageList::new(layout.page_size(), 16);

    let first = pages.grow().unwrap();
    let second = pages.grow().unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages.head(), Some(second));
    assert_eq!(pages.iter().collect::<Vec<_>>(), vec![second, first]);
    assert_eq!(first.as_ptr() as usize % 16, 0);
  }

  #[test]
  fn test_carve_page() {
    let layout = layout();
    let mut pages = PageList::new(layout.page_size(), 16);
    let mut free_list = FreeList::new();

    let page = pages.grow().unwrap();
    unsafe { carve_page(page, &layout, &mut free_list) };

    assert_eq!(free_list.len(), 3);

    let blocks: Vec<_> = unsafe { blocks_of(page, &layout) }.collect();
    assert_eq!(free_list.head(), Some(blocks[2].object_ptr()));

    for block in &blocks {
      assert_eq!(block.in_use(), Some(false));
      assert!(verify_pattern(block.left_pad(), PAD_PATTERN));
      assert!(verify_pattern(block.right_pad(), PAD_PATTERN));
      assert_eq!(block.address() % 16, 0);
      assert_eq!(pages.find_block(&layout, block.object_ptr()).unwrap().address(), block.address());
    }

    // Object bytes past the link word keep the unallocated pattern.
    let object = unsafe { std::slice::from_raw_parts(blocks[0].object_ptr().as_ptr(), 24) };
    let tail = &object[std::mem::size_of::<usize>()..];
    assert!(verify_pattern(tail, UNALLOCATED_PATTERN));
  }

  #[test]
  fn test_find_block_rejects_interior_pointers() {
    let layout = layout();
    let mut pages = PageList::new(layout.page_size(), 16);
    let page = pages.grow().unwrap();

    let object = unsafe { page.add(layout.block_offset(1) + layout.object_offset()) };
    assert!(pages.find_block(&layout, object).is_some());

    let interior = unsafe { object.add(1) };
    assert!(pages.find_block(&layout, interior).is_none());

    let mut outside = 0u64;
    let outside = NonNull::from(&mut outside).cast::<u8>();
    assert!(pages.find_block(&layout, outside).is_none());
  }
}
