use itertools::Itertools;
use log::{debug, info};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::agent::{Firm, MarketGrids, UpdateParams};
use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::learning::policy::{Decay, EpsilonGreedy, TimeBasedDecay};
use crate::market::{demand, profit, rest_of_market_mean};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Phase {
    Initializing,
    Running,
    Finalizing,
    Done,
}

/// One run of the repeated pricing game.
#[derive(Debug)]
pub struct Simulation {
    pub period: usize,
    /// Committed prices, shape `(horizon, n_firms)`.
    pub prices: Array2<f64>,
    pub epsilon: f64,
    pub firms: Vec<Firm>,
    pub phase: Phase,
    schedule: TimeBasedDecay,
    grids: MarketGrids,
    params: UpdateParams,
    config: SimulationConfig,
    run: usize,
    rng: StdRng,
}

impl Simulation {
    /// Builds run `run` and seeds its first two periods.
    pub fn new(config: &SimulationConfig, run: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        let (states, actions) = config.grids()?;
        let grids = MarketGrids { states, actions };
        let schedule = TimeBasedDecay::new(config.epsilon_final, config.horizon);
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(run as u64));

        let mut firms = Vec::with_capacity(config.n_firms);
        for id in 0..config.n_firms {
            let seed_prices = match config.initial_price {
                Some(price) => [price, price],
                None => [rng.random::<f64>(), rng.random::<f64>()],
            };
            let policy = EpsilonGreedy::new(config.epsilon_min, config.epsilon_max, schedule.into())?;
            firms.push(Firm::new(
                id,
                config.horizon,
                seed_prices,
                &grids,
                config.init_q_value,
                policy,
                config.memory_capacity,
            )?);
        }

        let mut sim = Simulation {
            period: 0,
            prices: Array2::zeros((config.horizon, config.n_firms)),
            epsilon: config.epsilon_max,
            firms,
            phase: Phase::Initializing,
            schedule,
            grids,
            params: UpdateParams {
                alpha: config.alpha,
                gamma: config.gamma,
                n_firms: config.n_firms,
            },
            config: config.clone(),
            run,
            rng,
        };
        sim.initialize();
        Ok(sim)
    }

    /// Publishes the seed prices and back-fills their demand and profit.
    fn initialize(&mut self) {
        for firm in &self.firms {
            for t in 0..2 {
                self.prices[[t, firm.id]] = firm.price_history()[t];
            }
        }
        for t in 0..2 {
            self.record_outcomes(t);
        }
        self.period = 2;
        self.phase = Phase::Running;
    }

    pub fn horizon(&self) -> usize {
        self.config.horizon
    }

    pub fn grids(&self) -> &MarketGrids {
        &self.grids
    }

    /// Advances the state machine by one transition and returns the new phase.
    pub fn step(&mut self) -> Phase {
        match self.phase {
            Phase::Initializing => self.initialize(),
            Phase::Running => self.step_period(),
            Phase::Finalizing => self.finalize(),
            Phase::Done => {}
        }
        self.phase
    }

    /// Runs to completion.
    pub fn run(mut self) -> RunResult {
        while self.step() != Phase::Done {}
        self.into_result()
    }

    fn step_period(&mut self) {
        let t = self.period;
        let older = self.prices.row(t - 2).to_vec();
        let previous = self.prices.row(t - 1).to_vec();

        // Decide: every firm reads only committed rows.
        let mut staged = vec![0.0; self.firms.len()];
        for firm in self.firms.iter_mut() {
            let rest = rest_of_market_mean(&older, firm.id);
            let rest_1 = rest_of_market_mean(&previous, firm.id);
            let p_i = firm.price_history()[t - 2];
            firm.observe(t, p_i, rest, rest_1, &self.grids, self.params);
            staged[firm.id] = firm.act(t, rest_1, &self.grids, &mut self.rng);
        }

        // Commit.
        self.prices.row_mut(t).assign(&Array1::from(staged));
        self.record_outcomes(t);

        self.epsilon = self
            .schedule
            .next_epsilon(self.epsilon, t as u32)
            .clamp(self.config.epsilon_min, self.config.epsilon_max);
        for firm in self.firms.iter_mut() {
            firm.policy.set_epsilon(self.epsilon);
        }
        debug!(
            "run {} period {t} epsilon {:.4} prices {:?}",
            self.run,
            self.epsilon,
            self.prices.row(t)
        );

        self.period += 1;
        if self.period == self.config.horizon {
            self.phase = Phase::Finalizing;
        }
    }

    /// Demand and profit at `period` from the committed price row.
    fn record_outcomes(&mut self, period: usize) {
        let row = self.prices.row(period).to_vec();
        let n_firms = self.params.n_firms;
        for firm in self.firms.iter_mut() {
            let rest = rest_of_market_mean(&row, firm.id);
            let price = firm.price_history()[period];
            let d = demand(price, rest, n_firms);
            firm.record_outcome(period, d, profit(price, d));
        }
    }

    fn finalize(&mut self) {
        let horizon = self.config.horizon;
        for t in horizon - 2..horizon {
            self.record_outcomes(t);
        }
        self.phase = Phase::Done;
    }

    pub fn into_result(self) -> RunResult {
        let shape = (self.config.horizon, self.firms.len());
        let firms = &self.firms;
        let result = RunResult {
            run: self.run,
            prices: Array2::from_shape_fn(shape, |(t, i)| firms[i].price_history()[t]),
            demands: Array2::from_shape_fn(shape, |(t, i)| firms[i].demand_history()[t]),
            profits: Array2::from_shape_fn(shape, |(t, i)| firms[i].profit_history()[t]),
        };
        info!(
            "run {} finished: final prices {:?}, mean profits {:?}",
            self.run,
            result.prices.row(shape.0 - 1),
            result.profits.mean_axis(ndarray::Axis(0))
        );
        result
    }
}

/// Per-run histories indexed by `[period, firm]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run: usize,
    pub prices: Array2<f64>,
    pub demands: Array2<f64>,
    pub profits: Array2<f64>,
}

/// Histories of every run side by side. Column `firm + run * n_firms`
/// holds firm `firm` of run `run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub n_firms: usize,
    pub runs: usize,
    pub prices: Array2<f64>,
    pub demands: Array2<f64>,
    pub profits: Array2<f64>,
}

impl ResultTable {
    pub fn column(n_firms: usize, firm: usize, run: usize) -> usize {
        firm + run * n_firms
    }

    pub fn from_runs(results: &[RunResult]) -> Self {
        let (horizon, n_firms) = results.first().map_or((0, 0), |r| r.prices.dim());
        let runs = results.len();
        let mut table = ResultTable {
            n_firms,
            runs,
            prices: Array2::zeros((horizon, n_firms * runs)),
            demands: Array2::zeros((horizon, n_firms * runs)),
            profits: Array2::zeros((horizon, n_firms * runs)),
        };
        for (run, firm) in (0..runs).cartesian_product(0..n_firms) {
            let col = Self::column(n_firms, firm, run);
            let result = &results[run];
            table.prices.column_mut(col).assign(&result.prices.column(firm));
            table.demands.column_mut(col).assign(&result.demands.column(firm));
            table.profits.column_mut(col).assign(&result.profits.column(firm));
        }
        table
    }
}

/// Runs `config.runs` independent simulations in sequence.
pub fn run_all(config: &SimulationConfig) -> Result<(Vec<RunResult>, ResultTable), ConfigError> {
    let mut results = Vec::with_capacity(config.runs);
    for run in 0..config.runs {
        info!("starting run {}/{}", run + 1, config.runs);
        results.push(Simulation::new(config, run)?.run());
    }
    let table = ResultTable::from_runs(&results);
    Ok((results, table))
}
