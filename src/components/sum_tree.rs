//! Segment trees backing the prioritized replay buffer.
//!
//! The trees are stored as flat arrays with the root at index 1 and the
//! leaves at `capacity..2 * capacity`, where `capacity` is rounded up to a
//! power of two.

#[derive(Debug, Clone)]
struct SegmentTree {
    capacity: usize,
    tree: Vec<f64>,
    op: fn(f64, f64) -> f64,
}

impl SegmentTree {
    fn new(
        capacity: usize,
        neutral: f64,
        op: fn(f64, f64) -> f64,
    ) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            capacity,
            tree: vec![neutral; 2 * capacity],
            op,
        }
    }

    fn set(
        &mut self,
        idx: usize,
        value: f64,
    ) {
        debug_assert!(idx < self.capacity);
        let mut idx = idx + self.capacity;
        self.tree[idx] = value;
        while idx > 1 {
            idx /= 2;
            self.tree[idx] = (self.op)(self.tree[2 * idx], self.tree[2 * idx + 1]);
        }
    }

    fn get(
        &self,
        idx: usize,
    ) -> f64 {
        self.tree[idx + self.capacity]
    }

    fn root(&self) -> f64 {
        self.tree[1]
    }
}


/// A sum tree over priorities with a companion min tree.
#[derive(Debug, Clone)]
pub struct SumTree {
    sum: SegmentTree,
    min: SegmentTree,
}

impl SumTree {
    pub fn new(capacity: usize) -> Self {
        Self {
            sum: SegmentTree::new(capacity, 0.0, |a, b| a + b),
            min: SegmentTree::new(capacity, f64::INFINITY, f64::min),
        }
    }

    pub fn capacity(&self) -> usize {
        self.sum.capacity
    }

    /// Set the priority stored at `idx`.
    pub fn set(
        &mut self,
        idx: usize,
        priority: f64,
    ) {
        self.sum.set(idx, priority);
        self.min.set(idx, priority);
    }

    pub fn get(
        &self,
        idx: usize,
    ) -> f64 {
        self.sum.get(idx)
    }

    /// Sum of all priorities.
    pub fn total(&self) -> f64 {
        self.sum.root()
    }

    /// Smallest priority that has been set.
    pub fn min(&self) -> f64 {
        self.min.root()
    }

    /// Find the highest index `i` such that the sum of the priorities before
    /// `i` is at most `prefix_sum`.
    pub fn find_prefix_sum_idx(
        &self,
        mut prefix_sum: f64,
    ) -> usize {
        let tree = &self.sum.tree;
        let mut idx = 1;
        while idx < self.sum.capacity {
            let left = 2 * idx;
            if tree[left] > prefix_sum {
                idx = left;
            } else {
                prefix_sum -= tree[left];
                idx = left + 1;
            }
        }
        idx - self.sum.capacity
    }
}


#[cfg(test)]
mod tests {
    use super::SumTree;

    #[test]
    fn sum_and_min_follow_updates() {
        let mut tree = SumTree::new(5);
        assert_eq!(tree.capacity(), 8);
        assert_eq!(tree.total(), 0.0);
        assert_eq!(tree.min(), f64::INFINITY);

        for (i, p) in [0.5, 0.2, 0.8, 0.3, 1.2].into_iter().enumerate() {
            tree.set(i, p);
        }
        assert!((tree.total() - 3.0).abs() < 1e-12);
        assert_eq!(tree.min(), 0.2);

        tree.set(1, 2.0);
        assert!((tree.total() - 4.8).abs() < 1e-12);
        assert_eq!(tree.min(), 0.3);
        assert_eq!(tree.get(1), 2.0);
    }

    #[test]
    fn prefix_sum_search() {
        let data = [0.5, 0.2, 0.8, 0.3, 1.1, 2.5, 3.9];
        let mut tree = SumTree::new(data.len());
        for (i, &p) in data.iter().enumerate() {
            tree.set(i, p);
        }

        assert_eq!(tree.find_prefix_sum_idx(0.0), 0);
        assert_eq!(tree.find_prefix_sum_idx(0.4), 0);
        assert_eq!(tree.find_prefix_sum_idx(0.6), 1);
        assert_eq!(tree.find_prefix_sum_idx(1.2), 2);
        assert_eq!(tree.find_prefix_sum_idx(1.6), 3);
        assert_eq!(tree.find_prefix_sum_idx(2.0), 4);
        assert_eq!(tree.find_prefix_sum_idx(2.8), 4);
        assert_eq!(tree.find_prefix_sum_idx(5.0), 5);
        assert_eq!(tree.find_prefix_sum_idx(9.2), 6);
    }
}
