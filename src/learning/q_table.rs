use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::learning::ValueFunction;
use crate::learning::agent_state::{ActionAxis, ActionGrid, Bucket, StateAxis, StateGrid};

/// Tabular action-value estimates indexed by state bucket and action bucket.
/// The shape is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    pub tab: Array2<f64>,
}

impl QTable {
    pub fn new(states: &StateGrid, actions: &ActionGrid, init_q_value: f64) -> Self {
        QTable {
            tab: Array2::from_elem((states.len(), actions.len()), init_q_value),
        }
    }

    pub fn n_states(&self) -> usize {
        self.tab.nrows()
    }

    pub fn n_actions(&self) -> usize {
        self.tab.ncols()
    }

    pub fn get(&self, state: Bucket<StateAxis>, action: Bucket<ActionAxis>) -> f64 {
        self.tab[[state.index(), action.index()]]
    }

    pub fn set(&mut self, state: Bucket<StateAxis>, action: Bucket<ActionAxis>, value: f64) {
        self.tab[[state.index(), action.index()]] = value;
    }

    /// Highest estimate over all actions at `state`.
    pub fn max_value(&self, state: Bucket<StateAxis>) -> f64 {
        self.tab
            .row(state.index())
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl ValueFunction for QTable {
    type State = Bucket<StateAxis>;
    type Action = Bucket<ActionAxis>;

    fn actions(&self) -> Vec<Bucket<ActionAxis>> {
        (0..self.n_actions()).map(Bucket::new).collect()
    }

    fn action_values(&self, state: &Bucket<StateAxis>) -> Vec<f64> {
        self.tab.row(state.index()).to_vec()
    }
}
