//! Fixed-topology feed-forward network. This is the genome: crossover,
//! mutation and cloning all act on the weight/bias stack.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EvoError, Result};
use crate::matrix::Matrix;

const WEIGHT_MIN: f32 = -1.0;
const WEIGHT_MAX: f32 = 1.0;
const BIAS_MIN: f32 = -1.0;
const BIAS_MAX: f32 = 1.0;
const MUTATION_MULTIPLIER: f32 = 0.9;

/// Layer sizes of a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub inputs: usize,
    pub hidden: usize,
    pub outputs: usize,
    pub hidden_layers: usize,
}

impl Topology {
    pub fn new(inputs: usize, hidden: usize, outputs: usize, hidden_layers: usize) -> Self {
        Self { inputs, hidden, outputs, hidden_layers }
    }

    /// Number of weight/bias pairs: input edge, interior edges, output edge.
    pub fn edges(&self) -> usize {
        self.hidden_layers + 2
    }

    /// `(rows, columns)` of the weight matrix on edge `i`.
    fn weight_shape(&self, i: usize) -> (usize, usize) {
        if i == 0 {
            (self.hidden, self.inputs)
        } else if i == self.edges() - 1 {
            (self.outputs, self.hidden)
        } else {
            (self.hidden, self.hidden)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuralNet {
    topology: Topology,
    weights: Vec<Matrix>,
    biases: Vec<Matrix>,
}

impl NeuralNet {
    /// Every weight and bias drawn uniformly from `[-1, 1)`.
    pub fn new<R: Rng + ?Sized>(topology: Topology, rng: &mut R) -> Self {
        let mut weights = Vec::with_capacity(topology.edges());
        let mut biases = Vec::with_capacity(topology.edges());
        for i in 0..topology.edges() {
            let (rows, cols) = topology.weight_shape(i);
            weights.push(Matrix::random(rows, cols, WEIGHT_MIN, WEIGHT_MAX, rng));
            biases.push(Matrix::random(rows, 1, BIAS_MIN, BIAS_MAX, rng));
        }
        Self { topology, weights, biases }
    }

    /// Assembles a network from explicit matrices, checking every shape.
    pub fn from_parts(topology: Topology, weights: Vec<Matrix>, biases: Vec<Matrix>) -> Result<Self> {
        let net = Self { topology, weights, biases };
        net.validate()?;
        Ok(net)
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn weights(&self) -> &[Matrix] {
        &self.weights
    }

    pub fn biases(&self) -> &[Matrix] {
        &self.biases
    }

    /// Checks every matrix against the declared topology. Used after decoding
    /// a genome from disk.
    pub fn validate(&self) -> Result<()> {
        let t = self.topology;
        if self.weights.len() != t.edges() || self.biases.len() != t.edges() {
            return Err(EvoError::TopologyMismatch(format!(
                "expected {} edges, found {} weights and {} biases",
                t.edges(),
                self.weights.len(),
                self.biases.len()
            )));
        }
        for i in 0..t.edges() {
            let (rows, cols) = t.weight_shape(i);
            let (w, b) = (&self.weights[i], &self.biases[i]);
            let dense = w.values().len() == rows * cols && b.values().len() == rows;
            if w.shape() != (rows, cols) || b.shape() != (rows, 1) || !dense {
                return Err(EvoError::TopologyMismatch(format!("edge {i} does not match {t:?}")));
            }
        }
        Ok(())
    }

    /// ReLU forward pass.
    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.topology.inputs {
            return Err(EvoError::ShapeMismatch {
                op: "forward",
                left: (self.topology.inputs, 1),
                right: (input.len(), 1),
            });
        }
        let mut layer = Matrix::from_column(input);
        for (w, b) in self.weights.iter().zip(&self.biases) {
            layer = w.multiply(&layer)?.add(b)?.map(|v| v.max(0.0));
        }
        layer.to_array()
    }

    /// Child whose every matrix is an independent 2-D cut of the matching
    /// pair from `self` and `other`.
    pub fn cross_with<R: Rng + ?Sized>(&self, other: &NeuralNet, rng: &mut R) -> Result<NeuralNet> {
        if self.topology != other.topology {
            return Err(EvoError::TopologyMismatch(format!(
                "cannot cross {:?} with {:?}",
                self.topology, other.topology
            )));
        }
        let mut weights = Vec::with_capacity(self.weights.len());
        let mut biases = Vec::with_capacity(self.biases.len());
        for i in 0..self.weights.len() {
            weights.push(self.weights[i].cross_with(&other.weights[i], rng)?);
            biases.push(self.biases[i].cross_with(&other.biases[i], rng)?);
        }
        Ok(NeuralNet { topology: self.topology, weights, biases })
    }

    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f32, rng: &mut R) {
        for m in self.weights.iter_mut() {
            m.mutate(WEIGHT_MIN, WEIGHT_MAX, MUTATION_MULTIPLIER, rate, rng);
        }
        for m in self.biases.iter_mut() {
            m.mutate(BIAS_MIN, BIAS_MAX, MUTATION_MULTIPLIER, rate, rng);
        }
    }
}
