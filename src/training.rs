use log::info;
use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::learning::learning_agent::DqnAgent;

/// Consumes `(episode, average_reward)` pairs, e.g. for plotting.
pub trait RewardSink {
    fn record(&mut self, episode: u32, average_reward: f64);
}

impl RewardSink for Vec<(u32, f64)> {
    fn record(&mut self, episode: u32, average_reward: f64) {
        self.push((episode, average_reward));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub episodes: u32,
    pub best_reward: f64,
    pub average_reward: f64,
    pub last_reward: f64,
    pub epsilon: f64,
    pub scores: Vec<f64>,
}

/// Plays `episodes` episodes, learning after every step.
pub fn train<E, S>(env: &mut E, agent: &mut DqnAgent, episodes: u32, sink: &mut S) -> TrainingReport
where
    E: Environment + ?Sized,
    S: RewardSink + ?Sized,
{
    let mut best_reward = 0.0;
    let mut total_reward = 0.0;
    let mut scores = Vec::with_capacity(episodes as usize);

    for episode in 1..=episodes {
        let mut state = env.reset();
        let mut score = 0.0;
        loop {
            let action = agent.choose_action(&state);
            let step = env.step(action);
            agent.remember(&state, action, step.reward, &step.observation, step.done);
            agent.learn();
            score += step.reward;
            state = step.observation;
            if step.done {
                break;
            }
        }

        if score > best_reward {
            best_reward = score;
        }
        total_reward += score;
        scores.push(score);
        let average = total_reward / episode as f64;
        info!(
            "Episode {episode} Average Reward {average:.2} Best Reward {best_reward} Last Reward {score} Epsilon {:.4}",
            agent.epsilon()
        );
        sink.record(episode, average);
    }

    TrainingReport {
        episodes,
        best_reward,
        average_reward: if episodes == 0 {
            0.0
        } else {
            total_reward / episodes as f64
        },
        last_reward: scores.last().copied().unwrap_or(0.0),
        epsilon: agent.epsilon(),
        scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlConfig;
    use crate::environment::Step;
    use float_eq::assert_float_eq;

    /// Ends after `length` steps; reward 1 for action 1, 0 otherwise.
    struct Corridor {
        length: u32,
        t: u32,
    }

    impl Environment for Corridor {
        fn reset(&mut self) -> Vec<f32> {
            self.t = 0;
            vec![0.0]
        }

        fn step(&mut self, action: usize) -> Step {
            self.t += 1;
            Step {
                observation: vec![self.t as f32 / self.length as f32],
                reward: if action == 1 { 1.0 } else { 0.0 },
                done: self.t >= self.length,
                info: None,
            }
        }

        fn observation_size(&self) -> usize {
            1
        }

        fn n_actions(&self) -> usize {
            2
        }
    }

    fn config() -> ControlConfig {
        ControlConfig {
            memory_capacity: 256,
            batch_size: 4,
            fc1_dims: 8,
            fc2_dims: 8,
            learning_rate: 0.01,
            ..ControlConfig::default()
        }
    }

    #[test]
    fn test_report_and_sink() {
        let mut env = Corridor { length: 5, t: 0 };
        let mut agent = DqnAgent::new(&config(), 1, 2).unwrap();
        let mut sink: Vec<(u32, f64)> = vec![];
        let report = train(&mut env, &mut agent, 10, &mut sink);

        assert_eq!(report.episodes, 10);
        assert_eq!(report.scores.len(), 10);
        assert_eq!(sink.len(), 10);
        assert_eq!(sink.iter().map(|(e, _)| *e).collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());
        let mean = report.scores.iter().sum::<f64>() / 10.0;
        assert_float_eq!(report.average_reward, mean, abs <= 1e-12);
        assert_float_eq!(sink[9].1, mean, abs <= 1e-12);
        assert_eq!(report.last_reward, report.scores[9]);
        assert!(report.scores.iter().all(|s| *s <= report.best_reward));
        assert_eq!(agent.memory.mem_count(), 50);
        // Learning started after the fourth transition and decayed epsilon.
        assert!(report.epsilon < 1.0);
    }

    #[test]
    fn test_zero_episodes() {
        let mut env = Corridor { length: 5, t: 0 };
        let mut agent = DqnAgent::new(&config(), 1, 2).unwrap();
        let mut sink: Vec<(u32, f64)> = vec![];
        let report = train(&mut env, &mut agent, 0, &mut sink);
        assert!(sink.is_empty());
        assert_eq!(report.average_reward, 0.0);
        assert_eq!(agent.memory.mem_count(), 0);
    }
}
