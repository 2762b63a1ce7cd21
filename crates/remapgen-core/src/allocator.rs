// Remapgen Core - Index Allocator
// Value-table slots and simultaneous-key suffixes for one generation unit

/// Hands out value-table slot indices and pseudo-key suffixes.
///
/// One allocator covers one generated output file. Slot indices start at 0
/// for each file; simultaneous-key suffixes must stay unique for the whole
/// run, so they are carried into the next file by [`IndexAllocator::next_unit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexAllocator {
    variable_index: usize,
    simultaneous_index: usize,
}

impl IndexAllocator {
    /// Allocator for the first generation unit of a run
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose simultaneous-key suffixes start at `base`
    pub fn with_simultaneous_base(base: usize) -> Self {
        Self {
            variable_index: 0,
            simultaneous_index: base,
        }
    }

    /// Allocator for the next generation unit: fresh slots, same suffix sequence
    pub fn next_unit(&self) -> Self {
        Self::with_simultaneous_base(self.simultaneous_index)
    }

    /// Return the current slot index, then advance
    pub fn next_variable_index(&mut self) -> usize {
        let index = self.variable_index;
        self.variable_index += 1;
        index
    }

    /// Return the current simultaneous-key suffix, then advance
    pub fn next_simultaneous_suffix(&mut self) -> usize {
        let suffix = self.simultaneous_index;
        self.simultaneous_index += 1;
        suffix
    }

    /// Number of slots handed out so far in this unit
    pub fn variable_count(&self) -> usize {
        self.variable_index
    }

    /// Number of suffixes handed out so far in this run
    pub fn simultaneous_count(&self) -> usize {
        self.simultaneous_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_monotonic() {
        let mut alloc = IndexAllocator::new();
        assert_eq!(alloc.next_variable_index(), 0);
        assert_eq!(alloc.next_variable_index(), 1);
        assert_eq!(alloc.next_variable_index(), 2);
        assert_eq!(alloc.variable_count(), 3);
    }

    #[test]
    fn test_counters_are_independent() {
        let mut alloc = IndexAllocator::new();
        assert_eq!(alloc.next_simultaneous_suffix(), 0);
        assert_eq!(alloc.next_variable_index(), 0);
        assert_eq!(alloc.next_simultaneous_suffix(), 1);
        assert_eq!(alloc.next_variable_index(), 1);
    }

    #[test]
    fn test_next_unit_resets_slots_only() {
        let mut alloc = IndexAllocator::new();
        alloc.next_variable_index();
        alloc.next_variable_index();
        alloc.next_simultaneous_suffix();

        let mut next = alloc.next_unit();
        assert_eq!(next.variable_count(), 0);
        assert_eq!(next.next_variable_index(), 0);
        assert_eq!(next.next_simultaneous_suffix(), 1);
    }

    #[test]
    fn test_simultaneous_base() {
        let mut alloc = IndexAllocator::with_simultaneous_base(7);
        assert_eq!(alloc.next_simultaneous_suffix(), 7);
        assert_eq!(alloc.simultaneous_count(), 8);
        assert_eq!(alloc.next_variable_index(), 0);
    }
}
