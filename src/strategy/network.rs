// src/strategy/network.rs

//! A small multilayer perceptron for action-value estimates.
//!
//! Hidden layers use ReLU, the output layer is linear with one unit per
//! action. Weights are stored row-major (`outputs x inputs`) so the layout can
//! be serialized as-is into a model artifact.

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
}

impl DenseLayer {
    fn new<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        // He-uniform initialization for ReLU activations.
        let limit = (6.0 / inputs as f64).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        Self {
            inputs,
            outputs,
            weights: (0..inputs * outputs).map(|_| dist.sample(rng)).collect(),
            biases: vec![0.0; outputs],
        }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .chunks_exact(self.inputs)
            .zip(&self.biases)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }
}

/// Gradient buffers shaped like one `DenseLayer`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGrads {
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetwork {
    layers: Vec<DenseLayer>,
}

impl QNetwork {
    /// Builds a network with the given layer widths, input first.
    ///
    /// `sizes` must hold at least two entries.
    pub fn new<R: Rng + ?Sized>(sizes: &[usize], rng: &mut R) -> Self {
        let layers = sizes
            .windows(2)
            .map(|pair| DenseLayer::new(pair[0], pair[1], rng))
            .collect();
        Self { layers }
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.inputs)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, |l| l.outputs)
    }

    /// Checks that every layer's buffers agree with its declared shape and
    /// that consecutive layers chain.
    pub fn check_shapes(&self) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("network has no layers".into());
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.inputs == 0 || layer.outputs == 0 {
                return Err(format!("layer {i} has a zero dimension"));
            }
            if layer.weights.len() != layer.inputs * layer.outputs
                || layer.biases.len() != layer.outputs
            {
                return Err(format!("layer {i} parameter count does not match its shape"));
            }
            if layer.weights.iter().chain(&layer.biases).any(|p| !p.is_finite()) {
                return Err(format!("layer {i} contains non-finite parameters"));
            }
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].outputs != pair[1].inputs {
                return Err(format!("layer {i} output does not feed layer {}", i + 1));
            }
        }
        Ok(())
    }

    /// Q-values for every action.
    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        self.activations(input).pop().unwrap_or_default()
    }

    /// Input followed by each layer's output (post-activation).
    fn activations(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut acts = Vec::with_capacity(self.layers.len() + 1);
        acts.push(input.to_vec());
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            let mut out = layer.forward(&acts[i]);
            if i < last {
                out.iter_mut().for_each(|v| *v = v.max(0.0));
            }
            acts.push(out);
        }
        acts
    }

    pub fn zero_grads(&self) -> Vec<LayerGrads> {
        self.layers
            .iter()
            .map(|l| LayerGrads {
                weights: vec![0.0; l.weights.len()],
                biases: vec![0.0; l.biases.len()],
            })
            .collect()
    }

    /// Backpropagates `output_grad` (dLoss/dOutput) for one input and adds the
    /// parameter gradients into `grads`. Returns the forward output.
    pub fn accumulate_gradients(
        &self,
        input: &[f64],
        output_grad: &[f64],
        grads: &mut [LayerGrads],
    ) -> Vec<f64> {
        let acts = self.activations(input);
        let mut delta = output_grad.to_vec();

        for (i, layer) in self.layers.iter().enumerate().rev() {
            let layer_input = &acts[i];
            let g = &mut grads[i];
            for (o, d) in delta.iter().enumerate() {
                if *d == 0.0 {
                    continue;
                }
                let row = o * layer.inputs;
                for (j, x) in layer_input.iter().enumerate() {
                    g.weights[row + j] += d * x;
                }
                g.biases[o] += d;
            }

            if i > 0 {
                let mut prev = vec![0.0; layer.inputs];
                for (o, d) in delta.iter().enumerate() {
                    let row = &layer.weights[o * layer.inputs..(o + 1) * layer.inputs];
                    for (p, w) in prev.iter_mut().zip(row) {
                        *p += w * d;
                    }
                }
                // ReLU derivative on the hidden activation feeding this layer.
                for (p, a) in prev.iter_mut().zip(layer_input) {
                    if *a <= 0.0 {
                        *p = 0.0;
                    }
                }
                delta = prev;
            }
        }

        acts.last().cloned().unwrap_or_default()
    }

    pub fn copy_from(&mut self, other: &QNetwork) {
        self.layers.clone_from(&other.layers);
    }
}

/// Scales gradients so their global L2 norm is at most `max_norm`.
pub fn clip_grad_norm(grads: &mut [LayerGrads], max_norm: f64) -> f64 {
    let norm = grads
        .iter()
        .flat_map(|g| g.weights.iter().chain(&g.biases))
        .map(|v| v * v)
        .sum::<f64>()
        .sqrt();
    if norm > max_norm && norm > 0.0 {
        let scale = max_norm / norm;
        for g in grads.iter_mut() {
            g.weights.iter_mut().for_each(|v| *v *= scale);
            g.biases.iter_mut().for_each(|v| *v *= scale);
        }
    }
    norm
}

/// Adam optimizer state for one `QNetwork`.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    m: Vec<LayerGrads>,
    v: Vec<LayerGrads>,
}

impl Adam {
    pub fn new(network: &QNetwork, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            m: network.zero_grads(),
            v: network.zero_grads(),
        }
    }

    /// Applies one descent step with the given gradients.
    pub fn step(&mut self, network: &mut QNetwork, grads: &[LayerGrads]) {
        self.t = self.t.saturating_add(1);
        let (lr, beta1, beta2, eps) = (self.learning_rate, self.beta1, self.beta2, self.epsilon);
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        for ((layer, g), (m, v)) in network
            .layers
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            let groups = [
                (&mut layer.weights, &g.weights, &mut m.weights, &mut v.weights),
                (&mut layer.biases, &g.biases, &mut m.biases, &mut v.biases),
            ];
            for (params, g, m, v) in groups {
                for k in 0..params.len() {
                    m[k] = beta1 * m[k] + (1.0 - beta1) * g[k];
                    v[k] = beta2 * v[k] + (1.0 - beta2) * g[k] * g[k];
                    let m_hat = m[k] / bias1;
                    let v_hat = v[k] / bias2;
                    params[k] -= lr * m_hat / (v_hat.sqrt() + eps);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn output_has_one_value_per_action() {
        let net = QNetwork::new(&[14, 8, 51], &mut StdRng::seed_from_u64(0));
        assert_eq!(net.input_dim(), 14);
        assert_eq!(net.output_dim(), 51);
        assert_eq!(net.predict(&[0.5; 14]).len(), 51);
        assert!(net.check_shapes().is_ok());
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut net = QNetwork::new(&[3, 4, 2], &mut StdRng::seed_from_u64(11));
        let input = [0.3, -0.7, 1.1];
        // Loss = output[1], so dLoss/dOutput = [0, 1].
        let mut grads = net.zero_grads();
        net.accumulate_gradients(&input, &[0.0, 1.0], &mut grads);

        let h = 1e-6;
        for k in 0..net.layers[0].weights.len() {
            let original = net.layers[0].weights[k];
            net.layers[0].weights[k] = original + h;
            let up = net.predict(&input)[1];
            net.layers[0].weights[k] = original - h;
            let down = net.predict(&input)[1];
            net.layers[0].weights[k] = original;
            let numeric = (up - down) / (2.0 * h);
            assert!(
                (numeric - grads[0].weights[k]).abs() < 1e-4,
                "weight {k}: numeric {numeric} vs analytic {}",
                grads[0].weights[k]
            );
        }
    }

    #[test]
    fn adam_reduces_squared_error() {
        let mut net = QNetwork::new(&[2, 8, 1], &mut StdRng::seed_from_u64(5));
        let mut adam = Adam::new(&net, 1e-2);
        let input = [1.0, -1.0];
        let target = 3.0;
        let initial = (net.predict(&input)[0] - target).powi(2);
        for _ in 0..500 {
            let out = net.predict(&input)[0];
            let mut grads = net.zero_grads();
            net.accumulate_gradients(&input, &[2.0 * (out - target)], &mut grads);
            adam.step(&mut net, &grads);
        }
        let trained = (net.predict(&input)[0] - target).powi(2);
        assert!(trained < initial * 0.01, "loss {initial} -> {trained}");
    }

    #[test]
    fn clipping_bounds_global_norm() {
        let mut grads = vec![LayerGrads {
            weights: vec![3.0, 4.0],
            biases: vec![0.0],
        }];
        let norm = clip_grad_norm(&mut grads, 1.0);
        assert_eq!(norm, 5.0);
        assert!((grads[0].weights[0] - 0.6).abs() < 1e-12);
        assert!((grads[0].weights[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn shape_check_catches_truncated_layers() {
        let mut net = QNetwork::new(&[3, 2], &mut StdRng::seed_from_u64(0));
        net.layers[0].weights.pop();
        assert!(net.check_shapes().is_err());
    }
}
