//! Parametric action-value function: a fully connected network mapping an
//! observation to one estimate per action, trained with Adam on a mean
//! squared error loss.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::learning::ValueFunction;

/// A fully connected layer, `y = x W^T + b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    /// Weights, shape `(out_dim, in_dim)`.
    pub w: Array2<f32>,
    pub b: Array1<f32>,
}

impl Dense {
    /// Glorot-uniform weights, zero bias.
    pub fn random<R: Rng + ?Sized>(in_dim: usize, out_dim: usize, rng: &mut R) -> Self {
        let limit = (6.0 / (in_dim + out_dim) as f32).sqrt();
        Dense {
            w: Array2::from_shape_fn((out_dim, in_dim), |_| rng.random_range(-limit..limit)),
            b: Array1::zeros(out_dim),
        }
    }

    pub fn forward(&self, x: ArrayView2<f32>) -> Array2<f32> {
        x.dot(&self.w.t()) + &self.b
    }
}

/// Adam moment estimates for each layer's weights and bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    pub lr: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
    pub t: i32,
    m_w: Vec<Array2<f32>>,
    v_w: Vec<Array2<f32>>,
    m_b: Vec<Array1<f32>>,
    v_b: Vec<Array1<f32>>,
}

impl Adam {
    pub fn new(layers: &[Dense], lr: f32) -> Self {
        Adam {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            t: 0,
            m_w: layers.iter().map(|l| Array2::zeros(l.w.raw_dim())).collect(),
            v_w: layers.iter().map(|l| Array2::zeros(l.w.raw_dim())).collect(),
            m_b: layers.iter().map(|l| Array1::zeros(l.b.raw_dim())).collect(),
            v_b: layers.iter().map(|l| Array1::zeros(l.b.raw_dim())).collect(),
        }
    }

    /// Applies one update. `grads` holds `(dW, db)` per layer, in layer order.
    pub fn step(&mut self, layers: &mut [Dense], grads: &[(Array2<f32>, Array1<f32>)]) {
        self.t += 1;
        let lr_t =
            self.lr * (1.0 - self.beta2.powi(self.t)).sqrt() / (1.0 - self.beta1.powi(self.t));
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.eps);

        for (i, (layer, (gw, gb))) in layers.iter_mut().zip(grads).enumerate() {
            self.m_w[i].zip_mut_with(gw, |m, g| *m = beta1 * *m + (1.0 - beta1) * g);
            self.v_w[i].zip_mut_with(gw, |v, g| *v = beta2 * *v + (1.0 - beta2) * g * g);
            ndarray::Zip::from(&mut layer.w)
                .and(&self.m_w[i])
                .and(&self.v_w[i])
                .for_each(|p, m, v| *p -= lr_t * m / (v.sqrt() + eps));

            self.m_b[i].zip_mut_with(gb, |m, g| *m = beta1 * *m + (1.0 - beta1) * g);
            self.v_b[i].zip_mut_with(gb, |v, g| *v = beta2 * *v + (1.0 - beta2) * g * g);
            ndarray::Zip::from(&mut layer.b)
                .and(&self.m_b[i])
                .and(&self.v_b[i])
                .for_each(|p, m, v| *p -= lr_t * m / (v.sqrt() + eps));
        }
    }
}

/// Two hidden ReLU layers followed by a linear output layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetwork {
    layers: Vec<Dense>,
    optimizer: Adam,
}

impl QNetwork {
    pub fn new<R: Rng + ?Sized>(
        obs_size: usize,
        fc1_dims: usize,
        fc2_dims: usize,
        n_actions: usize,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        if [obs_size, fc1_dims, fc2_dims, n_actions].contains(&0) {
            return Err(ConfigError::ZeroWidth);
        }
        ConfigError::check_range("learning_rate", learning_rate as f64, f64::MIN_POSITIVE, 1.0)?;
        let layers = vec![
            Dense::random(obs_size, fc1_dims, rng),
            Dense::random(fc1_dims, fc2_dims, rng),
            Dense::random(fc2_dims, n_actions, rng),
        ];
        let optimizer = Adam::new(&layers, learning_rate);
        Ok(QNetwork { layers, optimizer })
    }

    pub fn obs_size(&self) -> usize {
        self.layers[0].w.ncols()
    }

    pub fn n_actions(&self) -> usize {
        self.layers[self.layers.len() - 1].w.nrows()
    }

    pub fn optimizer(&self) -> &Adam {
        &self.optimizer
    }

    /// Action values for a batch of observations, shape `(batch, n_actions)`.
    pub fn forward(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let last = self.layers.len() - 1;
        let mut a = x.to_owned();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(a.view());
            a = if i < last { z.mapv(relu) } else { z };
        }
        a
    }

    /// One forward, backward and optimiser step on the squared error between
    /// the estimates of the taken `actions` and `targets`. Returns the loss
    /// before the update.
    pub fn train_step(
        &mut self,
        states: ArrayView2<f32>,
        actions: &[usize],
        targets: ArrayView1<f32>,
    ) -> f32 {
        let last = self.layers.len() - 1;
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut a = states.to_owned();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(a.view());
            inputs.push(a);
            a = if i < last { z.mapv(relu) } else { z.clone() };
            pre_activations.push(z);
        }

        let batch = a.nrows() as f32;
        let mut loss = 0.0;
        let mut delta = Array2::<f32>::zeros(a.raw_dim());
        for (row, (&action, &target)) in actions.iter().zip(targets.iter()).enumerate() {
            let diff = a[[row, action]] - target;
            loss += diff * diff;
            delta[[row, action]] = 2.0 * diff / batch;
        }
        loss /= batch;

        let mut grads = Vec::with_capacity(self.layers.len());
        for i in (0..self.layers.len()).rev() {
            if i < last {
                delta = delta * &pre_activations[i].mapv(relu_grad);
            }
            let gw = delta.t().dot(&inputs[i]);
            let gb = delta.sum_axis(Axis(0));
            if i > 0 {
                delta = delta.dot(&self.layers[i].w);
            }
            grads.push((gw, gb));
        }
        grads.reverse();

        self.optimizer.step(&mut self.layers, &grads);
        loss
    }
}

impl ValueFunction for QNetwork {
    type State = [f32];
    type Action = usize;

    fn actions(&self) -> Vec<usize> {
        (0..self.n_actions()).collect()
    }

    fn action_values(&self, state: &[f32]) -> Vec<f64> {
        let x = ArrayView1::from(state).insert_axis(Axis(0));
        self.forward(x).iter().map(|v| *v as f64).collect()
    }
}

fn relu(z: f32) -> f32 {
    z.max(0.0)
}

fn relu_grad(z: f32) -> f32 {
    if z > 0.0 { 1.0 } else { 0.0 }
}
