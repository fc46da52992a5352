//! The snake's decision model: a fixed-topology multi-layer perceptron.
//!
//! The network is a pure function of its weights; the genetic algorithm in
//! [crate::genalg] only ever exchanges flat weight vectors with it.

use crate::persist::Tokens;
use rand::Rng;
use rulinalg::matrix::{BaseMatrix, BaseMatrixMut, Matrix};
use std::{
    error::Error,
    io::{self, Write},
};

/// Multi-layer perceptron with tanh hidden layers and a logistic output
/// layer. Every layer sees a constant bias input of 1 appended to its input,
/// so a layer of `n` neurons fed by `m` values owns an `n x (m + 1)` weight
/// matrix.
#[derive(Debug)]
pub struct Mlp {
    input_size: usize,
    layer_sizes: Vec<usize>,
    default_input_size: usize,
    default_layer_sizes: Vec<usize>,
    weights_count: usize,
    layers: Vec<Matrix<f64>>,
}

impl Mlp {
    /// Build a network with the given topology and uniformly random weights
    /// in [-1, 1]. An empty `layer_sizes` is the degenerate no-op topology:
    /// the forward pass returns its bias-augmented input unchanged.
    pub fn new(input_size: usize, layer_sizes: Vec<usize>, rng: &mut impl Rng) -> Self {
        let mut mlp = Self {
            input_size,
            default_input_size: input_size,
            default_layer_sizes: layer_sizes.clone(),
            layer_sizes,
            weights_count: 0,
            layers: Vec::new(),
        };
        mlp.init(rng);
        mlp
    }

    /// Rebuild every layer matrix with fresh random weights in [-1, 1].
    fn init(&mut self, rng: &mut impl Rng) {
        self.layers.clear();
        self.weights_count = 0;

        let mut cols = self.input_size + 1;
        for &rows in &self.layer_sizes {
            let weights = (0..rows * cols)
                .map(|_| rng.random_range(-1.0..=1.0))
                .collect::<Vec<f64>>();
            self.layers.push(Matrix::new(rows, cols, weights));
            self.weights_count += rows * cols;
            cols = rows + 1;
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Total weight count across all layers; this is the chromosome length
    /// the optimizer evolves.
    pub fn weights_count(&self) -> usize {
        self.weights_count
    }

    /// Run an input vector through the network. Hidden activations are
    /// tanh (so they lie in (-1, 1)); the output layer is the logistic
    /// function (so outputs lie in (0, 1)).
    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>, Box<dyn Error>> {
        if input.len() != self.input_size {
            return Err(format!(
                "input vector size {} doesn't match mlp input size {}",
                input.len(),
                self.input_size
            )
            .into());
        }

        let mut biased = Vec::with_capacity(input.len() + 1);
        biased.extend_from_slice(input);
        biased.push(1.);

        if self.layers.is_empty() {
            return Ok(biased);
        }

        let mut x = Matrix::new(biased.len(), 1, biased);
        for layer in &self.layers[..self.layers.len() - 1] {
            let mut y = (layer * &x).apply(&f64::tanh).into_vec();
            y.push(1.);
            let rows = y.len();
            x = Matrix::new(rows, 1, y);
        }

        let out = &self.layers[self.layers.len() - 1] * &x;
        Ok(out.apply(&|v: f64| 1. / (1. + (-v).exp())).into_vec())
    }

    /// Every layer's weights flattened row-major, layer by layer. Exact
    /// inverse of [Mlp::set_weights].
    pub fn weights_vector(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.weights_count);
        for layer in &self.layers {
            flat.extend_from_slice(layer.data());
        }
        flat
    }

    /// Overwrite every layer from a flat weight vector. The length is
    /// validated before any layer is touched, so a mismatch never leaves the
    /// network partially written.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<(), Box<dyn Error>> {
        if weights.len() != self.weights_count {
            return Err(format!(
                "weight vector size {} doesn't match mlp weight count {}",
                weights.len(),
                self.weights_count
            )
            .into());
        }

        let mut start = 0;
        for layer in self.layers.iter_mut() {
            let (rows, cols) = (layer.rows(), layer.cols());
            *layer = Matrix::new(rows, cols, weights[start..start + rows * cols].to_vec());
            start += rows * cols;
        }
        Ok(())
    }

    /// Write the topology (input size, layer count, layer sizes). Weights
    /// are never persisted; they live in the optimizer's chromosomes.
    pub fn store_config(&self, mut w: impl Write) -> io::Result<()> {
        writeln!(w, "{}", self.input_size)?;
        writeln!(w, "{}", self.layer_sizes.len())?;
        for size in &self.layer_sizes {
            write!(w, "{size} ")?;
        }
        writeln!(w)
    }

    /// Read a stored topology and rebuild the network around it. A topology
    /// change invalidates any previous weights, so all weights are
    /// re-randomized.
    pub fn load_config(
        &mut self,
        tokens: &mut Tokens,
        rng: &mut impl Rng,
    ) -> Result<(), Box<dyn Error>> {
        self.input_size = tokens.next()?;
        let layer_count: usize = tokens.next()?;
        self.layer_sizes = (0..layer_count)
            .map(|_| tokens.next())
            .collect::<Result<_, _>>()?;
        self.init(rng);
        Ok(())
    }

    /// Restore the topology the network was constructed with and
    /// re-randomize.
    pub fn reset(&mut self, rng: &mut impl Rng) {
        self.input_size = self.default_input_size;
        self.layer_sizes = self.default_layer_sizes.clone();
        self.init(rng);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn test_weights_count() {
        let mut rng = rng();
        // (5+1)*5 + (5+1)*5 + (5+1)*3
        assert_eq!(Mlp::new(5, vec![5, 5, 3], &mut rng).weights_count(), 78);
        assert_eq!(Mlp::new(2, vec![4], &mut rng).weights_count(), 12);
        assert_eq!(Mlp::new(3, vec![], &mut rng).weights_count(), 0);
    }

    #[test]
    fn test_initial_weights_in_range() {
        let mlp = Mlp::new(4, vec![6, 2], &mut rng());
        assert!(mlp.weights_vector().iter().all(|w| (-1. ..=1.).contains(w)));
    }

    #[test]
    fn test_weights_round_trip() {
        let mut mlp = Mlp::new(3, vec![4, 2], &mut rng());
        let before = mlp.weights_vector();
        mlp.set_weights(&before).unwrap();
        assert_eq!(mlp.weights_vector(), before);

        let fresh = (0..mlp.weights_count())
            .map(|i| i as f64 / 10.)
            .collect::<Vec<_>>();
        mlp.set_weights(&fresh).unwrap();
        assert_eq!(mlp.weights_vector(), fresh);
    }

    #[test]
    fn test_set_weights_rejects_wrong_length() {
        let mut mlp = Mlp::new(3, vec![4, 2], &mut rng());
        let before = mlp.weights_vector();
        assert!(mlp.set_weights(&[0.; 5]).is_err());
        // a rejected write must not touch any layer
        assert_eq!(mlp.weights_vector(), before);
    }

    #[test]
    fn test_forward_shape_and_range() {
        let mlp = Mlp::new(5, vec![5, 5, 3], &mut rng());
        let out = mlp.forward(&[0.5, -3., 12., 0., 7.]).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| *v > 0. && *v < 1.));
    }

    #[test]
    fn test_forward_rejects_wrong_input_size() {
        let mlp = Mlp::new(5, vec![3], &mut rng());
        assert!(mlp.forward(&[1., 2., 3.]).is_err());
    }

    #[test]
    fn test_forward_empty_topology_is_identity() {
        let mlp = Mlp::new(3, vec![], &mut rng());
        assert_eq!(mlp.forward(&[4., -2., 0.5]).unwrap(), vec![4., -2., 0.5, 1.]);
    }

    #[test]
    fn test_forward_known_weights() {
        let mut mlp = Mlp::new(1, vec![1], &mut rng());
        // single neuron: logistic(0*x + 0*bias) = 0.5
        mlp.set_weights(&[0., 0.]).unwrap();
        let out = mlp.forward(&[123.]).unwrap();
        approx::assert_relative_eq!(out[0], 0.5);
    }

    #[test]
    fn test_config_round_trip_rerandomizes() {
        let mut rng = rng();
        let src = Mlp::new(5, vec![5, 5, 3], &mut rng);
        let mut buf = Vec::new();
        src.store_config(&mut buf).unwrap();

        let mut dst = Mlp::new(2, vec![2], &mut rng);
        let mut tokens = Tokens::from_reader(buf.as_slice()).unwrap();
        dst.load_config(&mut tokens, &mut rng).unwrap();
        assert_eq!(dst.input_size(), 5);
        assert_eq!(dst.weights_count(), 78);
        assert_eq!(dst.forward(&[0.; 5]).unwrap().len(), 3);
    }

    #[test]
    fn test_load_config_rejects_garbage() {
        let mut rng = rng();
        let mut mlp = Mlp::new(2, vec![2], &mut rng);
        let mut tokens = Tokens::from_reader("5 two".as_bytes()).unwrap();
        assert!(mlp.load_config(&mut tokens, &mut rng).is_err());
    }

    #[test]
    fn test_reset_restores_default_topology() {
        let mut rng = rng();
        let mut mlp = Mlp::new(5, vec![5, 5, 3], &mut rng);
        let mut tokens = Tokens::from_reader("2 1 4".as_bytes()).unwrap();
        mlp.load_config(&mut tokens, &mut rng).unwrap();
        assert_eq!(mlp.weights_count(), 12);

        mlp.reset(&mut rng);
        assert_eq!(mlp.input_size(), 5);
        assert_eq!(mlp.weights_count(), 78);
    }
}
