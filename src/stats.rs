//! Allocation statistics.

/// Snapshot returned by [`PoolAllocator::stats`](crate::PoolAllocator::stats).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
  pub object_size: usize,
  pub page_size: usize,
  pub free_objects: usize,
  pub objects_in_use: usize,
  pub pages_in_use: usize,
  /// Peak of `objects_in_use`.
  pub most_objects_ever_in_use: usize,
  pub allocations: usize,
  pub deallocations: usize,
}

impl PoolStats {
  pub const fn new(
    object_size: usize,
    page_size: usize,
  ) -> Self {
    Self {
      object_size,
      page_size,
      free_objects: 0,
      objects_in_use: 0,
      pages_in_use: 0,
      most_objects_ever_in_use: 0,
      allocations: 0,
      deallocations: 0,
    }
  }

  pub(crate) fn record_page(
    &mut self,
    objects_per_page: usize,
  ) {
    self.pages_in_use += 1;
    self.free_objects += objects_per_page;
  }

  /// `pooled` is false for objects served straight by the system allocator.
  pub(crate) fn record_allocation(
    &mut self,
    pooled: bool,
  ) {
    if pooled {
      self.free_objects -= 1;
    }
    self.objects_in_use += 1;
    self.allocations += 1;
    self.update_peak();
  }

  pub(crate) fn record_deallocation(
    &mut self,
    pooled: bool,
  ) {
    if pooled {
      self.free_objects += 1;
    }
    self.objects_in_use -= 1;
    self.deallocations += 1;
  }

  fn update_peak(&mut self) {
    if self.objects_in_use > self.most_objects_ever_in_use {
      self.most_objects_ever_in_use = self.objects_in_use;
    }
  }

  /// Blocks carved so far.
  pub const fn capacity(
    &self,
    objects_per_page: usize,
  ) -> usize {
    self.pages_in_use * objects_per_page
  }
}
