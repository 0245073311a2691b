use log::trace;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::ControlConfig;
use crate::error::ConfigError;
use crate::learning::ValueFunction;
use crate::learning::network::QNetwork;
use crate::learning::policy::{DecaySchedule, EpsilonGreedy, GeometricDecay};
use crate::learning::replay::ReplayBuffer;

/// Replay-based Q-learner over a [`QNetwork`], with geometric epsilon decay.
#[derive(Debug, Clone)]
pub struct DqnAgent {
    pub network: QNetwork,
    pub memory: ReplayBuffer<Vec<f32>, usize>,
    pub policy: EpsilonGreedy,
    batch_size: usize,
    gamma: f32,
    learn_steps: u32,
    rng: StdRng,
}

impl DqnAgent {
    pub fn new(config: &ControlConfig, obs_size: usize, n_actions: usize) -> Result<Self, ConfigError> {
        if config.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        ConfigError::check_range("gamma", config.gamma, 0.0, 1.0)?;
        ConfigError::check_range("exploration_decay", config.exploration_decay, 0.0, 1.0)?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let network = QNetwork::new(
            obs_size,
            config.fc1_dims,
            config.fc2_dims,
            n_actions,
            config.learning_rate as f32,
            &mut rng,
        )?;
        let schedule = DecaySchedule::from(GeometricDecay {
            factor: config.exploration_decay,
        });
        Ok(DqnAgent {
            network,
            memory: ReplayBuffer::new(config.memory_capacity)?,
            policy: EpsilonGreedy::new(config.exploration_min, config.exploration_max, schedule)?,
            batch_size: config.batch_size,
            gamma: config.gamma as f32,
            learn_steps: 0,
            rng,
        })
    }

    pub fn choose_action(&mut self, observation: &[f32]) -> usize {
        self.policy
            .choose_action(&self.network, observation, &mut self.rng)
    }

    pub fn remember(
        &mut self,
        state: &[f32],
        action: usize,
        reward: f64,
        next_state: &[f32],
        done: bool,
    ) {
        self.memory
            .add(state.to_vec(), action, reward, next_state.to_vec(), done);
    }

    pub fn epsilon(&self) -> f64 {
        self.policy.epsilon()
    }

    /// One replay update. Does nothing until `batch_size` transitions have
    /// been recorded, so it can be called after every environment step.
    /// Returns the loss when an update happened.
    pub fn learn(&mut self) -> Option<f32> {
        if self.memory.mem_count() < self.batch_size {
            return None;
        }

        let batch = self.memory.sample(self.batch_size, &mut self.rng);
        let obs_size = self.network.obs_size();
        let states = to_matrix(&batch.states, obs_size);
        let next_states = to_matrix(&batch.next_states, obs_size);

        let next_q = self.network.forward(next_states.view());
        let targets: Array1<f32> = next_q
            .rows()
            .into_iter()
            .zip(batch.rewards.iter().zip(batch.not_dones.iter()))
            .map(|(row, (&reward, &not_done))| {
                let future = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                reward as f32 + self.gamma * future * not_done as f32
            })
            .collect();

        let loss = self
            .network
            .train_step(states.view(), &batch.actions, targets.view());

        self.learn_steps += 1;
        let epsilon = self.policy.decay(self.learn_steps);
        trace!("learn step {} loss {loss:.5} epsilon {epsilon:.4}", self.learn_steps);
        Some(loss)
    }

    /// Greedy action values for an observation.
    pub fn q_values(&self, observation: &[f32]) -> Vec<f64> {
        self.network.action_values(observation)
    }
}

fn to_matrix(rows: &[Vec<f32>], width: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows.len(), width), |(i, j)| rows[i][j])
}
