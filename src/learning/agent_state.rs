use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::error::ConfigError;

/// Marker for an axis of the tabular value function.
pub trait Axis: Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord {
    const NAME: &'static str;
}

/// Rest-of-market price axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateAxis;

/// Own price axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionAxis;

impl Axis for StateAxis {
    const NAME: &'static str = "state";
}

impl Axis for ActionAxis {
    const NAME: &'static str = "action";
}

/// A grid cell on one axis. State and action buckets are distinct types, so
/// a state bucket can never index the action dimension of a Q table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bucket<A: Axis> {
    idx: usize,
    axis: PhantomData<A>,
}

impl<A: Axis> Bucket<A> {
    pub(crate) fn new(idx: usize) -> Self {
        Bucket {
            idx,
            axis: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.idx
    }
}

/// Maps continuous prices onto an ordered grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Discretiser<A: Axis> {
    grid: Vec<f64>,
    axis: PhantomData<A>,
}

pub type StateGrid = Discretiser<StateAxis>;
pub type ActionGrid = Discretiser<ActionAxis>;

impl<A: Axis> Discretiser<A> {
    /// Builds a discretiser from a non-empty, strictly increasing grid.
    pub fn new(grid: Vec<f64>) -> Result<Self, ConfigError> {
        if grid.is_empty() {
            return Err(ConfigError::EmptyGrid(A::NAME));
        }
        if grid.iter().any(|g| !g.is_finite()) || grid.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::UnsortedGrid(A::NAME));
        }
        Ok(Discretiser {
            grid,
            axis: PhantomData,
        })
    }

    /// Evenly spaced grid of `n` points from `min` to `max` inclusive.
    pub fn linspace(min: f64, max: f64, n: usize) -> Result<Self, ConfigError> {
        Self::new(linspace(min, max, n))
    }

    /// Insertion search: the returned bucket satisfies
    /// `grid[idx - 1] < value <= grid[idx]`. Values beyond the last grid
    /// point clamp to the last bucket.
    ///
    /// The search is left-sided on purpose. A price lying exactly on grid
    /// point `j` maps to bucket `j`, so a firm's chosen action is credited to
    /// the action it played. The right-sided rule
    /// (`grid[idx - 1] <= value < grid[idx]`) would credit it to `j + 1`.
    pub fn bucket(&self, value: f64) -> Bucket<A> {
        let idx = self.grid.partition_point(|g| *g < value);
        Bucket::new(idx.min(self.grid.len() - 1))
    }

    /// The grid value at a bucket.
    pub fn value(&self, bucket: Bucket<A>) -> f64 {
        self.grid[bucket.idx]
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.grid[0]
    }

    pub fn max(&self) -> f64 {
        self.grid[self.grid.len() - 1]
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Iterate over every bucket in grid order.
    pub fn buckets(&self) -> impl Iterator<Item = Bucket<A>> + use<A> {
        (0..self.grid.len()).map(Bucket::new)
    }
}

/// `n` evenly spaced points from `min` to `max` inclusive.
pub fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![min],
        _ => {
            let step = (max - min) / (n - 1) as f64;
            (0..n).map(|i| min + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenths() -> StateGrid {
        Discretiser::linspace(0.0, 1.0, 11).unwrap()
    }

    #[test]
    fn test_bucket_interior() {
        let grid = tenths();
        // 0.25 lies between 0.2 and 0.3.
        let b = grid.bucket(0.25);
        assert_eq!(b.index(), 3);
        assert!(grid.grid()[b.index() - 1] < 0.25);
        assert!(0.25 <= grid.grid()[b.index()]);
    }

    #[test]
    fn test_bucket_exact_grid_point() {
        let grid = tenths();
        for b in grid.buckets() {
            assert_eq!(grid.bucket(grid.value(b)), b);
        }
    }

    #[test]
    fn test_bucket_grid_point_is_left_sided() {
        let grid = Discretiser::<StateAxis>::new(vec![0.0, 0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(grid.bucket(0.3).index(), 3);
        assert_eq!(grid.bucket(0.0).index(), 0);
        assert_eq!(grid.bucket(0.30001).index(), 4);
    }

    #[test]
    fn test_bucket_clamps_out_of_range() {
        let grid = tenths();
        assert_eq!(grid.bucket(-3.0).index(), 0);
        assert_eq!(grid.bucket(1.7).index(), 10);
        assert_eq!(grid.bucket(f64::INFINITY).index(), 10);
    }

    #[test]
    fn test_bucket_monotone() {
        let grid = tenths();
        let values = linspace(-0.5, 1.5, 201);
        for pair in values.windows(2) {
            assert!(grid.bucket(pair[0]) <= grid.bucket(pair[1]));
        }
    }

    #[test]
    fn test_invalid_grids() {
        assert_eq!(
            StateGrid::new(vec![]),
            Err(ConfigError::EmptyGrid("state"))
        );
        assert_eq!(
            ActionGrid::new(vec![0.0, 0.5, 0.5]),
            Err(ConfigError::UnsortedGrid("action"))
        );
        assert_eq!(
            ActionGrid::new(vec![1.0, 0.0]),
            Err(ConfigError::UnsortedGrid("action"))
        );
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
