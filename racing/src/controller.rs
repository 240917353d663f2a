//! Steering controllers: the boundary between the simulation and whatever
//! decides where a car goes.

use race_protocol::{Genome, LayerGenome};
use rand::Rng;
use thiserror::Error;

use crate::devices::TRACK_RADAR_RAY_COUNT;
use crate::devices::car_controls::DECISION_MIN_LEN;

/// Maps the radar distances of one car to a decision vector.
///
/// Decisions should carry at least two components: component 0 votes for a
/// right turn, component 1 for a left turn. See
/// [`turn_command`](crate::devices::turn_command).
pub trait Controller {
    fn activate(&mut self, inputs: &[f64; TRACK_RADAR_RAY_COUNT]) -> Vec<f64>;
}

impl<C: Controller + ?Sized> Controller for Box<C> {
    fn activate(&mut self, inputs: &[f64; TRACK_RADAR_RAY_COUNT]) -> Vec<f64> {
        (**self).activate(inputs)
    }
}

/// Adapts a closure into a [`Controller`].
pub struct FnController<F>(pub F);

impl<F> Controller for FnController<F>
where
    F: FnMut(&[f64; TRACK_RADAR_RAY_COUNT]) -> Vec<f64>,
{
    fn activate(&mut self, inputs: &[f64; TRACK_RADAR_RAY_COUNT]) -> Vec<f64> {
        (self.0)(inputs)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GenomeError {
    #[error("genome {id} has no layers")]
    NoLayers { id: u64 },
    #[error("genome {id} layer {layer} has no outputs")]
    EmptyLayer { id: u64, layer: usize },
    #[error("genome {id} layer {layer} row {row} has {actual} inputs, expected {expected}")]
    InputWidth {
        id: u64,
        layer: usize,
        row: usize,
        actual: usize,
        expected: usize,
    },
    #[error("genome {id} layer {layer} has {actual} biases, expected {expected}")]
    BiasCount {
        id: u64,
        layer: usize,
        actual: usize,
        expected: usize,
    },
    #[error("genome {id} produces {actual} outputs, at least 2 are required")]
    TooFewOutputs { id: u64, actual: usize },
    #[error("genome {id} layer {layer} contains a non-finite parameter")]
    NonFinite { id: u64, layer: usize },
}

/// Steepened logistic used by NEAT-style networks.
fn sigmoid(z: f64) -> f64 {
    let z = (5.0 * z).clamp(-60.0, 60.0);
    1.0 / (1.0 + (-z).exp())
}

/// Dense feed-forward network with a sigmoid on every layer.
#[derive(Debug, Clone)]
pub struct FeedForward {
    id: u64,
    layers: Vec<LayerGenome>,
}

impl FeedForward {
    pub fn from_genome(genome: &Genome) -> Result<Self, GenomeError> {
        let id = genome.id;
        if genome.layers.is_empty() {
            return Err(GenomeError::NoLayers { id });
        }

        let mut expected = TRACK_RADAR_RAY_COUNT;
        for (layer, params) in genome.layers.iter().enumerate() {
            if params.weights.is_empty() {
                return Err(GenomeError::EmptyLayer { id, layer });
            }
            for (row, weights) in params.weights.iter().enumerate() {
                if weights.len() != expected {
                    return Err(GenomeError::InputWidth {
                        id,
                        layer,
                        row,
                        actual: weights.len(),
                        expected,
                    });
                }
            }
            if params.biases.len() != params.weights.len() {
                return Err(GenomeError::BiasCount {
                    id,
                    layer,
                    actual: params.biases.len(),
                    expected: params.weights.len(),
                });
            }
            let finite = params.weights.iter().flatten().all(|w| w.is_finite())
                && params.biases.iter().all(|b| b.is_finite());
            if !finite {
                return Err(GenomeError::NonFinite { id, layer });
            }
            expected = params.weights.len();
        }

        if expected < DECISION_MIN_LEN {
            return Err(GenomeError::TooFewOutputs {
                id,
                actual: expected,
            });
        }

        Ok(Self {
            id,
            layers: genome.layers.clone(),
        })
    }

    /// Uniform weights and biases in `-1..1`; `hidden` lists hidden layer widths.
    pub fn random(rng: &mut impl Rng, id: u64, hidden: &[usize]) -> Self {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut inputs = TRACK_RADAR_RAY_COUNT;
        for &outputs in hidden
            .iter()
            .filter(|&&width| width > 0)
            .chain(std::iter::once(&DECISION_MIN_LEN))
        {
            layers.push(LayerGenome {
                weights: (0..outputs)
                    .map(|_| {
                        (0..inputs)
                            .map(|_| rng.random_range(-1.0..1.0))
                            .collect::<Vec<f64>>()
                    })
                    .collect(),
                biases: (0..outputs).map(|_| rng.random_range(-1.0..1.0)).collect(),
            });
            inputs = outputs;
        }
        Self { id, layers }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn to_genome(&self) -> Genome {
        Genome {
            id: self.id,
            layers: self.layers.clone(),
        }
    }
}

impl Controller for FeedForward {
    fn activate(&mut self, inputs: &[f64; TRACK_RADAR_RAY_COUNT]) -> Vec<f64> {
        let mut values = inputs.to_vec();
        for layer in &self.layers {
            values = layer
                .weights
                .iter()
                .zip(&layer.biases)
                .map(|(row, bias)| {
                    let z: f64 = row.iter().zip(&values).map(|(w, v)| w * v).sum();
                    sigmoid(z + bias)
                })
                .collect();
        }
        values
    }
}
