use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::activation::sigmoid;
use super::error::FormatError;
use super::parser;

/// Training range of one network input or output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Maps `value` from the training range onto [0, 1]
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    /// Maps an activation in [0, 1] back onto the training range
    #[inline]
    pub fn denormalize(&self, activation: f64) -> f64 {
        self.min + activation * (self.max - self.min)
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Fully connected transition between two planes of the network.
///
/// `weights` is stored row-major with one row per unit of the receiving plane.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Layer {
    pub(crate) inputs: usize,
    pub(crate) weights: Vec<f64>,
    pub(crate) bias: Vec<f64>,
}

impl Layer {
    #[inline]
    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .chunks_exact(self.inputs)
            .zip(&self.bias)
            .map(|(row, &bias)| {
                let sum = row
                    .iter()
                    .zip(input)
                    .fold(bias, |acc, (weight, activation)| acc + weight * activation);
                sigmoid(sum)
            })
            .collect()
    }
}

/// Feed-forward back-propagation network with a tabulated activation.
///
/// Immutable after construction: evaluation reads the weights only, so one
/// instance can be shared by any number of worker threads.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNetwork {
    pub(crate) input_bounds: Vec<Bounds>,
    pub(crate) planes: Vec<usize>,
    pub(crate) layers: Vec<Layer>,
    pub(crate) output_bounds: Vec<Bounds>,
}

impl NeuralNetwork {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        let text = fs::read_to_string(path)?;
        text.parse()
    }

    /// Evaluates the network for one input vector.
    ///
    /// `input` must hold exactly [`input_count`](Self::input_count) values.
    pub fn calc(&self, input: &[f64]) -> Vec<f64> {
        debug_assert_eq!(input.len(), self.input_count());

        let mut activations: Vec<f64> = input
            .iter()
            .zip(&self.input_bounds)
            .map(|(&value, bounds)| bounds.normalize(value))
            .collect();

        for layer in &self.layers {
            activations = layer.forward(&activations);
        }

        activations
            .iter()
            .zip(&self.output_bounds)
            .map(|(&activation, bounds)| bounds.denormalize(activation))
            .collect()
    }

    pub fn input_count(&self) -> usize {
        self.input_bounds.len()
    }

    pub fn output_count(&self) -> usize {
        self.output_bounds.len()
    }

    pub fn input_bounds(&self) -> &[Bounds] {
        &self.input_bounds
    }

    pub fn output_bounds(&self) -> &[Bounds] {
        &self.output_bounds
    }

    /// Number of units per plane, input plane first
    pub fn planes(&self) -> &[usize] {
        &self.planes
    }
}

impl FromStr for NeuralNetwork {
    type Err = FormatError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parser::parse(text)
    }
}

impl fmt::Display for NeuralNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topology: Vec<String> = self.planes.iter().map(|p| p.to_string()).collect();
        write!(f, "NeuralNetwork {{ planes: {} }}", topology.join("x"))
    }
}
