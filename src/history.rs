//! Bounded history of recent raw bearings.

use std::collections::VecDeque;

use crate::angle::circular_mean;

/// Fixed-capacity window of raw bearings, oldest evicted first.
///
/// Invariant: `len() <= capacity()`.
#[derive(Debug, Clone)]
pub struct AngleHistory {
    angles: VecDeque<f32>,
    capacity: usize,
}

impl AngleHistory {
    /// Create an empty history. A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            angles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a bearing, evicting the oldest once full.
    pub fn push(&mut self, angle: f32) {
        if self.angles.len() == self.capacity {
            self.angles.pop_front();
        }
        self.angles.push_back(angle);
    }

    /// Wrap-safe mean of the stored bearings.
    pub fn circular_mean(&self) -> Option<f32> {
        circular_mean(self.angles.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.angles.iter().copied()
    }

    pub fn clear(&mut self) {
        self.angles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_never_exceeds_capacity() {
        let mut history = AngleHistory::new(5);
        for i in 0..20 {
            history.push(i as f32 * 0.01);
            assert!(history.len() <= 5);
        }
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut history = AngleHistory::new(3);
        for angle in [0.1, 0.2, 0.3, 0.4] {
            history.push(angle);
        }
        let stored: Vec<f32> = history.iter().collect();
        assert_eq!(stored, vec![0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut history = AngleHistory::new(0);
        history.push(0.5);
        history.push(0.7);
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec![0.7]);
    }

    #[test]
    fn test_mean_and_clear() {
        let mut history = AngleHistory::new(5);
        assert!(history.circular_mean().is_none());

        history.push(0.4);
        history.push(0.6);
        assert_abs_diff_eq!(history.circular_mean().unwrap(), 0.5, epsilon = 1e-6);

        history.clear();
        assert!(history.is_empty());
    }
}
