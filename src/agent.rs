use rand::Rng;

use crate::error::ConfigError;
use crate::learning::agent_state::{ActionAxis, ActionGrid, Bucket, StateAxis, StateGrid};
use crate::learning::policy::EpsilonGreedy;
use crate::learning::q_table::QTable;
use crate::learning::replay::ReplayBuffer;
use crate::market::demand;

/// Price and rest-of-market grids shared by every firm in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketGrids {
    pub states: StateGrid,
    pub actions: ActionGrid,
}

/// Learning rates and market size used by [`Firm::observe`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateParams {
    pub alpha: f64,
    pub gamma: f64,
    pub n_firms: usize,
}

/// A price-setting firm learning a Q table over (rest-of-market price, own price).
#[derive(Debug, Clone)]
pub struct Firm {
    pub id: usize,
    pub price: f64,
    price_history: Vec<f64>,
    demand_history: Vec<f64>,
    profit_history: Vec<f64>,
    pub state: Bucket<StateAxis>,
    pub action: Bucket<ActionAxis>,
    pub q_table: QTable,
    pub policy: EpsilonGreedy,
    pub memory: ReplayBuffer<Bucket<StateAxis>, Bucket<ActionAxis>>,
}

impl Firm {
    /// Creates a firm with `horizon`-long histories. The first two periods of
    /// price history are taken from `seed_prices`, so the horizon must leave
    /// at least one period to play after them.
    pub fn new(
        id: usize,
        horizon: usize,
        seed_prices: [f64; 2],
        grids: &MarketGrids,
        init_q_value: f64,
        policy: EpsilonGreedy,
        memory_capacity: usize,
    ) -> Result<Self, ConfigError> {
        if horizon < 3 {
            return Err(ConfigError::HorizonTooShort(horizon));
        }
        let mut price_history = vec![0.0; horizon];
        price_history[..2].copy_from_slice(&seed_prices);
        Ok(Firm {
            id,
            price: seed_prices[1],
            price_history,
            demand_history: vec![0.0; horizon],
            profit_history: vec![0.0; horizon],
            state: Bucket::new(0),
            action: grids.actions.bucket(seed_prices[1]),
            q_table: QTable::new(&grids.states, &grids.actions, init_q_value),
            policy,
            memory: ReplayBuffer::new(memory_capacity)?,
        })
    }

    pub fn price_history(&self) -> &[f64] {
        &self.price_history
    }

    pub fn demand_history(&self) -> &[f64] {
        &self.demand_history
    }

    pub fn profit_history(&self) -> &[f64] {
        &self.profit_history
    }

    /// Records demand and profit for `period`.
    pub fn record_outcome(&mut self, period: usize, demand: f64, profit: f64) {
        self.demand_history[period] = demand;
        self.profit_history[period] = profit;
    }

    /// Bellman estimate for the firm's price decision two periods ago.
    ///
    /// `p_i` is the firm's own price at `period - 2`, `rest` the mean rival
    /// price at `period - 2` and `rest_1` the mean rival price at `period - 1`.
    /// Requires `period >= 2`.
    pub fn update(
        &self,
        period: usize,
        p_i: f64,
        rest: f64,
        rest_1: f64,
        grids: &MarketGrids,
        params: UpdateParams,
    ) -> f64 {
        debug_assert!(period >= 2, "no decision to score before period 2");
        let action = grids.actions.bucket(p_i);
        let state = grids.states.bucket(rest);
        let next_state = grids.states.bucket(rest_1);

        let pot_profit = p_i * demand(p_i, rest_1, params.n_firms);
        let new_est = self.profit_history[period - 2]
            + params.gamma * pot_profit
            + params.gamma.powi(2) * self.q_table.max_value(next_state);
        (1.0 - params.alpha) * self.q_table.get(state, action) + params.alpha * new_est
    }

    /// Scores the price decision from `period - 2` and writes the new
    /// estimate into the Q table. Returns the written value. Requires
    /// `period >= 2`.
    pub fn observe(
        &mut self,
        period: usize,
        p_i: f64,
        rest: f64,
        rest_1: f64,
        grids: &MarketGrids,
        params: UpdateParams,
    ) -> f64 {
        let action = grids.actions.bucket(p_i);
        let state = grids.states.bucket(rest);
        let next_state = grids.states.bucket(rest_1);

        let new_value = self.update(period, p_i, rest, rest_1, grids, params);
        self.q_table.set(state, action, new_value);
        self.memory.add(
            state,
            action,
            self.profit_history[period - 2],
            next_state,
            false,
        );
        new_value
    }

    /// Picks this period's price from the frozen rest-of-market price `rest`
    /// and records it in the firm's own history. The market price matrix is
    /// updated by the caller once every firm has decided.
    pub fn act<R: Rng + ?Sized>(
        &mut self,
        period: usize,
        rest: f64,
        grids: &MarketGrids,
        rng: &mut R,
    ) -> f64 {
        self.state = grids.states.bucket(rest);
        self.action = self.policy.choose_action(&self.q_table, &self.state, rng);
        self.price = grids.actions.value(self.action);
        self.price_history[period] = self.price;
        self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::policy::TimeBasedDecay;
    use float_eq::assert_float_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grids() -> MarketGrids {
        MarketGrids {
            states: StateGrid::linspace(0.0, 1.0, 11).unwrap(),
            actions: ActionGrid::linspace(0.0, 1.0, 11).unwrap(),
        }
    }

    fn firm(grids: &MarketGrids) -> Firm {
        let policy =
            EpsilonGreedy::new(0.0, 1.0, TimeBasedDecay::new(0.001, 100).into()).unwrap();
        Firm::new(0, 100, [0.5, 0.5], grids, 0.0, policy, 50).unwrap()
    }

    fn params(alpha: f64) -> UpdateParams {
        UpdateParams {
            alpha,
            gamma: 0.95,
            n_firms: 2,
        }
    }

    #[test]
    fn test_new_firm() {
        let grids = grids();
        let f = firm(&grids);
        assert_eq!(f.price_history().len(), 100);
        assert_eq!(&f.price_history()[..3], &[0.5, 0.5, 0.0]);
        assert_eq!(f.q_table.n_states(), 11);
        assert_eq!(f.q_table.n_actions(), 11);
    }

    #[test]
    fn test_new_firm_rejects_short_horizon() {
        let grids = grids();
        for horizon in [0, 1, 2] {
            let policy =
                EpsilonGreedy::new(0.0, 1.0, TimeBasedDecay::new(0.001, 100).into()).unwrap();
            let result = Firm::new(0, horizon, [0.5, 0.5], &grids, 0.0, policy, 50);
            assert_eq!(result.err(), Some(ConfigError::HorizonTooShort(horizon)));
        }
    }

    #[test]
    fn test_observe_update_rule() {
        let grids = grids();
        let mut f = firm(&grids);
        f.record_outcome(0, 1.0, 0.5);
        let value = f.observe(2, 0.5, 0.5, 0.3, &grids, params(0.1));

        // pot_profit = 0.5 * (1 - 0.5 + 0.3) = 0.4; Q starts at zero.
        let expected = 0.1 * (0.5 + 0.95 * 0.4);
        assert_float_eq!(value, expected, abs <= 1e-12);
        let s = grids.states.bucket(0.5);
        let a = grids.actions.bucket(0.5);
        assert_float_eq!(f.q_table.get(s, a), expected, abs <= 1e-12);
        assert_eq!(f.memory.len(), 1);
        assert_eq!(f.memory.transitions()[0].reward, 0.5);
        assert_eq!(f.memory.transitions()[0].next_state, grids.states.bucket(0.3));
    }

    #[test]
    fn test_observe_zero_alpha_is_idempotent() {
        let grids = grids();
        let mut f = firm(&grids);
        let mut rng = StdRng::seed_from_u64(66);
        for cell in f.q_table.tab.iter_mut() {
            *cell = rng.random_range(-1.0..1.0);
        }
        f.record_outcome(0, 0.8, 0.3);
        let before = f.q_table.clone();
        for period in 2..40 {
            let p_i = rng.random_range(-0.2..1.2);
            let rest = rng.random_range(-0.2..1.2);
            let rest_1 = rng.random_range(-0.2..1.2);
            f.observe(period, p_i, rest, rest_1, &grids, params(0.0));
        }
        assert_eq!(f.q_table, before);
    }

    #[test]
    fn test_act_greedy_is_deterministic() {
        let grids = grids();
        let mut f = firm(&grids);
        f.policy.set_epsilon(0.0);
        let s = grids.states.bucket(0.4);
        f.q_table.set(s, grids.actions.bucket(0.7), 1.0);

        let mut rng = StdRng::seed_from_u64(1);
        let price = f.act(2, 0.4, &grids, &mut rng);
        assert_eq!(price, grids.actions.value(grids.actions.bucket(0.7)));
        assert_eq!(f.price_history()[2], price);
        assert_eq!(f.state, s);
        assert_eq!(f.action, grids.actions.bucket(0.7));
    }

    #[test]
    fn test_act_stays_on_grid() {
        let grids = grids();
        let mut f = firm(&grids);
        let mut rng = StdRng::seed_from_u64(7);
        for period in 2..100 {
            let price = f.act(period, rng.random_range(0.0..1.0), &grids, &mut rng);
            assert!(grids.actions.grid().contains(&price));
        }
    }
}
