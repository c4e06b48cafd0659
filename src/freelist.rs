//! Intrusive LIFO list of unused blocks.
//!
//! ```text
//!   head ──► [obj|next] ──► [obj|next] ──► [obj|next] ──► null
//! ```
//!
//! Entries are object addresses; the link lives in the first word of each
//! free object. The list never owns memory, the pages do.

use std::collections::HashSet;
use std::ptr::NonNull;

use crate::block::Block;
use crate::layout::BlockLayout;

#[derive(Debug, Default)]
pub struct FreeList {
  head: Option<NonNull<u8>>,
  len: usize,
}

impl FreeList {
  pub const fn new() -> Self {
    Self { head: None, len: 0 }
  }

  pub fn head(&self) -> Option<NonNull<u8>> {
    self.head
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  /// Puts `block` on top of the list.
  ///
  /// # Safety
  ///
  /// `block` must not already be on the list, and its object bytes must not
  /// be used by anyone else until it is popped again.
  pub unsafe fn push(
    &mut self,
    block: &mut Block<'_>,
  ) {
    block.set_next_free(self.head);
    self.head = Some(block.object_ptr());
    self.len += 1;
  }

  /// Takes the most recently pushed block.
  ///
  /// # Safety
  ///
  /// Every entry must be a live block laid out according to `layout`.
  pub unsafe fn pop<'a>(
    &mut self,
    layout: &'a BlockLayout,
  ) -> Option<Block<'a>> {
    let head = self.head?;
    let block = unsafe { Block::from_object(head, layout) };
    self.head = block.next_free();
    self.len -= 1;
    Some(block)
  }

  /// Walks the list and collects every entry.
  ///
  /// # Safety
  ///
  /// Same as [`FreeList::pop`].
  pub unsafe fn addresses(
    &self,
    layout: &BlockLayout,
  ) -> HashSet<usize> {
    let mut seen = HashSet::with_capacity(self.len());
    let mut current = self.head;

    while let Some(object) = current {
      seen.insert(object.as_ptr() as usize);
      current = unsafe { Block::from_object(object, layout) }.next_free();
    }

    seen
  }

  /// # Safety
  ///
  /// Same as [`FreeList::pop`].
  pub unsafe fn contains(
    &self,
    layout: &BlockLayout,
    object: NonNull<u8>,
  ) -> bool {
    let mut current = self.head;

    while let Some(entry) = current {
      if entry == object {
        return true;
      }
      current = unsafe { Block::from_object(entry, layout) }.next_free();
    }

    false
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PoolConfig;

  #[test]
  fn test_lifo_order() {
    let layout = BlockLayout::new(16, &PoolConfig::default());
    let mut buf = vec![0u8; layout.stride() * 3];
    let base = NonNull::new(buf.as_mut_ptr()).unwrap();

    let mut list = FreeList::new();
    assert!(list.is_empty());

    let mut objects = Vec::new();
    for index in 0..3 {
      let start = unsafe { base.add(index * layout.stride()) };
      let mut block = unsafe { Block::from_start(start, &layout) };
      objects.push(block.object_ptr());
      unsafe { list.push(&mut block) };
    }

    assert_eq!(list.len(), 3);
    assert_eq!(list.head(), Some(objects[2]));
    assert_eq!(unsafe { list.addresses(&layout) }.len(), 3);
    assert!(unsafe { list.contains(&layout, objects[1]) });

    for expected in objects.iter().rev() {
      let block = unsafe { list.pop(&layout) }.unwrap();
      assert_eq!(block.object_ptr(), *expected);
    }

    assert!(list.is_empty());
    assert!(unsafe { list.pop(&layout) }.is_none());
    assert!(!unsafe { list.contains(&layout, objects[1]) });
  }
}
