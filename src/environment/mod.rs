pub mod cart_pole;

pub use cart_pole::CartPole;

/// Outcome of one environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub observation: Vec<f32>,
    pub reward: f64,
    pub done: bool,
    /// Free-form diagnostics, e.g. why an episode ended.
    pub info: Option<String>,
}

/// An episodic control task with a discrete action space.
///
/// Modelled on the Gym interface: [`reset`] starts an episode and returns the
/// first observation, and each [`step`] applies one action.
///
/// [`reset`]: Environment::reset
/// [`step`]: Environment::step
pub trait Environment {
    fn reset(&mut self) -> Vec<f32>;

    fn step(&mut self, action: usize) -> Step;

    /// Length of the observation vector.
    fn observation_size(&self) -> usize;

    /// Number of discrete actions.
    fn n_actions(&self) -> usize;
}
