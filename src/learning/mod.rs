pub mod agent_state;
pub mod learning_agent;
pub mod network;
pub mod policy;
pub mod q_table;
pub mod replay;

/// An estimate of action values at a state. Implemented by the tabular
/// [`q_table::QTable`] and the parametric [`network::QNetwork`].
pub trait ValueFunction {
    type State: ?Sized;
    type Action: Copy;

    /// All valid actions, in action order.
    fn actions(&self) -> Vec<Self::Action>;

    /// One estimate per action, aligned with [`ValueFunction::actions`].
    fn action_values(&self, state: &Self::State) -> Vec<f64>;

    /// The action with the highest estimate. Ties go to the first maximum.
    fn greedy_action(&self, state: &Self::State) -> Self::Action {
        let values = self.action_values(state);
        let actions = self.actions();
        actions[argmax(&values)]
    }
}

/// Index of the first maximum. Returns 0 for an empty slice.
pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best_idx, best), (idx, v)| {
            if *v > best { (idx, *v) } else { (best_idx, best) }
        })
        .0
}
