//! Fixed-capacity experience store for replay-based learning.

use itertools::multiunzip;
use rand::Rng;

use crate::error::ConfigError;

/// One recorded step. `not_done` is `0.0` for terminal transitions so the
/// bootstrapped future term vanishes in the Bellman target.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S, A> {
    pub state: S,
    pub action: A,
    pub reward: f64,
    pub next_state: S,
    pub not_done: f64,
}

/// Parallel sequences drawn by [`ReplayBuffer::sample`].
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<S, A> {
    pub states: Vec<S>,
    pub actions: Vec<A>,
    pub rewards: Vec<f64>,
    pub next_states: Vec<S>,
    pub not_dones: Vec<f64>,
}

impl<S, A> Batch<S, A> {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Circular buffer of transitions. The write slot is `mem_count % capacity`;
/// the oldest entry is overwritten once the buffer is full.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<S, A> {
    memory: Vec<Transition<S, A>>,
    capacity: usize,
    mem_count: usize,
}

impl<S: Clone, A: Clone> ReplayBuffer<S, A> {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(ReplayBuffer {
            memory: Vec::with_capacity(capacity),
            capacity,
            mem_count: 0,
        })
    }

    pub fn add(&mut self, state: S, action: A, reward: f64, next_state: S, done: bool) {
        let transition = Transition {
            state,
            action,
            reward,
            next_state,
            not_done: if done { 0.0 } else { 1.0 },
        };
        let mem_index = self.mem_count % self.capacity;
        if self.memory.len() < self.capacity {
            self.memory.push(transition);
        } else {
            self.memory[mem_index] = transition;
        }
        self.mem_count += 1;
    }

    /// Uniform sampling with replacement over the filled window. Returns an
    /// empty batch if nothing has been written yet.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Batch<S, A> {
        let window = self.len();
        if window == 0 {
            return Batch {
                states: vec![],
                actions: vec![],
                rewards: vec![],
                next_states: vec![],
                not_dones: vec![],
            };
        }
        let (states, actions, rewards, next_states, not_dones): (
            Vec<S>,
            Vec<A>,
            Vec<f64>,
            Vec<S>,
            Vec<f64>,
        ) = multiunzip((0..batch_size).map(|_| {
            let t = &self.memory[rng.random_range(0..window)];
            (
                t.state.clone(),
                t.action.clone(),
                t.reward,
                t.next_state.clone(),
                t.not_done,
            )
        }));
        Batch {
            states,
            actions,
            rewards,
            next_states,
            not_dones,
        }
    }

    /// Total number of writes since construction.
    pub fn mem_count(&self) -> usize {
        self.mem_count
    }

    /// Number of transitions currently held, `min(mem_count, capacity)`.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Transitions in storage order (not write order once wrapped).
    pub fn transitions(&self) -> &[Transition<S, A>] {
        &self.memory
    }
}
