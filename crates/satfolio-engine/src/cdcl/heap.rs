//! Variable activity and the decision heap.

use satfolio_core::Var;

/// Max-heap of unassigned variables keyed by activity.
#[derive(Debug, Default)]
pub(crate) struct VarHeap {
    heap: Vec<Var>,
    pos: Vec<Option<u32>>,
}

impl VarHeap {
    pub(crate) fn reserve(&mut self, num_vars: usize) {
        self.heap.clear();
        self.heap.reserve(num_vars);
        self.pos.clear();
        self.pos.resize(num_vars, None);
    }

    #[inline]
    pub(crate) fn contains(&self, var: Var) -> bool {
        self.pos[var.index()].is_some()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    fn up(&mut self, mut idx: usize, activity: &[f64]) {
        let var = self.heap[idx];
        while idx != 0 {
            let parent = (idx - 1) >> 1;
            if activity[self.heap[parent].index()] >= activity[var.index()] {
                break;
            }
            self.heap[idx] = self.heap[parent];
            self.pos[self.heap[idx].index()] = Some(idx as u32);
            idx = parent;
        }
        self.heap[idx] = var;
        self.pos[var.index()] = Some(idx as u32);
    }

    fn down(&mut self, mut idx: usize, activity: &[f64]) {
        let var = self.heap[idx];
        loop {
            let left = (idx << 1) + 1;
            if left >= self.heap.len() {
                break;
            }
            let right = left + 1;
            let child = if right < self.heap.len()
                && activity[self.heap[right].index()] > activity[self.heap[left].index()]
            {
                right
            } else {
                left
            };
            if activity[var.index()] >= activity[self.heap[child].index()] {
                break;
            }
            self.heap[idx] = self.heap[child];
            self.pos[self.heap[idx].index()] = Some(idx as u32);
            idx = child;
        }
        self.heap[idx] = var;
        self.pos[var.index()] = Some(idx as u32);
    }

    pub(crate) fn push(&mut self, var: Var, activity: &[f64]) {
        if self.contains(var) {
            return;
        }
        let idx = self.heap.len();
        self.heap.push(var);
        self.pos[var.index()] = Some(idx as u32);
        self.up(idx, activity);
    }

    pub(crate) fn pop(&mut self, activity: &[f64]) -> Option<Var> {
        let top = *self.heap.first()?;
        let last = self.heap.pop()?;
        self.pos[top.index()] = None;
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.pos[last.index()] = Some(0);
            self.down(0, activity);
        }
        Some(top)
    }

    /// Restores heap order after `var`'s activity grew.
    pub(crate) fn increased(&mut self, var: Var, activity: &[f64]) {
        if let Some(idx) = self.pos[var.index()] {
            self.up(idx as usize, activity);
        }
    }
}

/// VSIDS scores.
#[derive(Debug)]
pub(crate) struct Activity {
    pub(crate) scores: Vec<f64>,
    inc: f64,
    pub(crate) decay: f64,
}

impl Default for Activity {
    fn default() -> Self {
        Self {
            scores: Vec::new(),
            inc: 1.0,
            decay: 0.95,
        }
    }
}

impl Activity {
    pub(crate) fn reserve(&mut self, num_vars: usize) {
        self.scores.clear();
        self.scores.resize(num_vars, 0.0);
        self.inc = 1.0;
    }

    /// Bumps `var`; returns true when every score was rescaled.
    pub(crate) fn bump(&mut self, var: Var) -> bool {
        let score = &mut self.scores[var.index()];
        *score += self.inc;
        if *score > 1e100 {
            for s in self.scores.iter_mut() {
                *s *= 1e-100;
            }
            self.inc *= 1e-100;
            return true;
        }
        false
    }

    pub(crate) fn decay(&mut self) {
        self.inc /= self.decay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_in_activity_order() {
        let activity = vec![0.5, 3.0, 1.0, 2.0];
        let mut heap = VarHeap::default();
        heap.reserve(4);
        for i in 0..4 {
            heap.push(Var::new(i), &activity);
        }
        let order: Vec<u32> = std::iter::from_fn(|| heap.pop(&activity))
            .map(|v| v.index() as u32)
            .collect();
        assert_eq!(order, vec![1, 3, 2, 0]);
        assert_eq!(heap.len(), 0);
    }

    #[test]
    fn test_increase_reorders() {
        let mut activity = vec![1.0, 2.0, 3.0];
        let mut heap = VarHeap::default();
        heap.reserve(3);
        for i in 0..3 {
            heap.push(Var::new(i), &activity);
        }
        activity[0] = 10.0;
        heap.increased(Var::new(0), &activity);
        assert_eq!(heap.pop(&activity), Some(Var::new(0)));
    }

    #[test]
    fn test_push_is_idempotent() {
        let activity = vec![1.0];
        let mut heap = VarHeap::default();
        heap.reserve(1);
        heap.push(Var::new(0), &activity);
        heap.push(Var::new(0), &activity);
        assert_eq!(heap.len(), 1);
    }
}
