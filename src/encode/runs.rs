/// Run-length sequence shared by the shape and byte-position encoders.
///
/// Each run stores its value and the inclusive index of its last sample, so
/// lookup is a binary search over runs instead of a walk over samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Runs<T> {
    values: Vec<T>,
    last_index: Vec<usize>,
}

impl<T> Default for Runs<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            last_index: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq> Runs<T> {
    /// Total number of samples covered by all runs.
    pub fn len(&self) -> usize {
        self.last_index.last().map_or(0, |last| last + 1)
    }

    pub fn num_runs(&self) -> usize {
        self.values.len()
    }

    /// Appends `count` repetitions of `value`, extending the last run when equal.
    pub fn push(&mut self, value: T, count: usize) {
        if count == 0 {
            return;
        }
        let next = self.len();
        match self.values.last() {
            Some(last) if *last == value => {
                if let Some(end) = self.last_index.last_mut() {
                    *end += count;
                }
            }
            _ => {
                self.values.push(value);
                self.last_index.push(next + count - 1);
            }
        }
    }

    /// Index of the run holding sample `index`.
    pub fn locate(&self, index: usize) -> Option<usize> {
        if index >= self.len() {
            return None;
        }
        Some(self.last_index.partition_point(|&last| last < index))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.locate(index).map(|run| &self.values[run])
    }

    pub fn value(&self, run: usize) -> &T {
        &self.values[run]
    }

    pub fn run_start(&self, run: usize) -> usize {
        if run == 0 { 0 } else { self.last_index[run - 1] + 1 }
    }

    pub fn run_count(&self, run: usize) -> usize {
        self.last_index[run] + 1 - self.run_start(run)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, usize)> {
        (0..self.num_runs()).map(move |run| (&self.values[run], self.run_count(run)))
    }

    /// Replaces the value of a single sample, splitting its run and merging
    /// equal neighbours. Returns the run now holding `index`.
    pub fn set(&mut self, index: usize, value: T) -> Option<usize> {
        let run = self.locate(index)?;
        if self.values[run] == value {
            return Some(run);
        }

        let start = self.run_start(run);
        let end = self.last_index[run];
        let old = self.values[run].clone();

        let mut rebuilt = Runs::default();
        for r in 0..run {
            rebuilt.push(self.values[r].clone(), self.run_count(r));
        }
        rebuilt.push(old.clone(), index - start);
        rebuilt.push(value, 1);
        rebuilt.push(old, end - index);
        for r in run + 1..self.num_runs() {
            rebuilt.push(self.values[r].clone(), self.run_count(r));
        }

        *self = rebuilt;
        self.locate(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs_of(items: &[(u32, usize)]) -> Runs<u32> {
        let mut runs = Runs::default();
        for &(value, count) in items {
            runs.push(value, count);
        }
        runs
    }

    #[test]
    fn push_merges_equal_values() {
        let runs = runs_of(&[(4, 2), (4, 3), (5, 1), (0, 0)]);
        assert_eq!(runs.len(), 6);
        assert_eq!(runs.num_runs(), 2);
        assert_eq!(runs.iter().collect::<Vec<_>>(), vec![(&4, 5), (&5, 1)]);
    }

    #[test]
    fn locate_uses_run_boundaries() {
        let runs = runs_of(&[(1, 3), (2, 1), (3, 2)]);
        assert_eq!(runs.get(0), Some(&1));
        assert_eq!(runs.get(2), Some(&1));
        assert_eq!(runs.get(3), Some(&2));
        assert_eq!(runs.get(5), Some(&3));
        assert_eq!(runs.get(6), None);
        assert_eq!(runs.run_start(2), 4);
    }

    #[test]
    fn set_splits_middle_of_run() {
        let mut runs = runs_of(&[(7, 5)]);
        runs.set(2, 9);
        assert_eq!(
            runs.iter().collect::<Vec<_>>(),
            vec![(&7, 2), (&9, 1), (&7, 2)]
        );
        assert_eq!(runs.len(), 5);
    }

    #[test]
    fn set_merges_with_neighbours() {
        let mut runs = runs_of(&[(1, 2), (2, 1), (1, 2)]);
        runs.set(2, 1);
        assert_eq!(runs.iter().collect::<Vec<_>>(), vec![(&1, 5)]);

        let mut runs = runs_of(&[(1, 2), (2, 2)]);
        runs.set(1, 2);
        assert_eq!(runs.iter().collect::<Vec<_>>(), vec![(&1, 1), (&2, 3)]);
    }

    #[test]
    fn set_out_of_range_is_none() {
        let mut runs = runs_of(&[(1, 2)]);
        assert_eq!(runs.set(2, 5), None);
        assert_eq!(runs.len(), 2);
    }
}
