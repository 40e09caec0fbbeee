//! Sparse sets with O(1) insert, membership and clear.
//!
//! See <https://research.swtch.com/sparse>. Traversal keeps one of these per
//! live state set so every byte step deduplicates states by id without
//! hashing and clears in constant time.

/// A set of indices below a known capacity, iterated in insertion order.
#[derive(Clone, Debug, Default)]
pub struct SparseSet {
    len: usize,
    dense: Vec<usize>,
    sparse: Vec<usize>,
}

impl SparseSet {
    pub fn new(capacity: usize) -> Self {
        SparseSet {
            len: 0,
            dense: vec![0; capacity],
            sparse: vec![0; capacity],
        }
    }

    /// Grow to hold indices below `capacity`. Never shrinks. Clears the set.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        self.clear();
        if capacity > self.dense.len() {
            self.dense.resize(capacity, 0);
            self.sparse.resize(capacity, 0);
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if `id` was not already present.
    #[inline]
    pub fn insert(&mut self, id: usize) -> bool {
        if self.contains(id) {
            return false;
        }
        debug_assert!(self.len < self.capacity(), "sparse set overflow at {id}");
        self.dense[self.len] = id;
        self.sparse[id] = self.len;
        self.len += 1;
        true
    }

    #[inline]
    pub fn contains(&self, id: usize) -> bool {
        let slot = self.sparse[id];
        slot < self.len && self.dense[slot] == id
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.dense[..self.len].iter().copied()
    }

    /// Element at insertion position `i`.
    #[inline]
    pub fn get(&self, i: usize) -> usize {
        self.dense[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut set = SparseSet::new(10);
        assert!(set.is_empty());
        assert!(set.insert(3));
        assert!(set.insert(7));
        assert!(!set.insert(3), "duplicate insert should report false");
        assert_eq!(set.len(), 2);
        assert!(set.contains(7));
        assert!(!set.contains(0));
    }

    #[test]
    fn test_insertion_order() {
        let mut set = SparseSet::new(10);
        for id in [5, 2, 8, 1] {
            set.insert(id);
        }
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![5, 2, 8, 1]);
        assert_eq!(set.get(2), 8);
    }

    #[test]
    fn test_clear_forgets_members() {
        let mut set = SparseSet::new(4);
        set.insert(1);
        set.insert(2);
        set.clear();
        assert!(!set.contains(1));
        assert!(set.insert(2));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_ensure_capacity_grows_only() {
        let mut set = SparseSet::new(5);
        set.insert(4);
        set.ensure_capacity(20);
        assert!(set.is_empty());
        assert_eq!(set.capacity(), 20);
        assert!(set.insert(15));

        set.ensure_capacity(3);
        assert_eq!(set.capacity(), 20);
    }
}
