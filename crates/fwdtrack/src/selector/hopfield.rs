use nalgebra::{DMatrix, DVector};
use rand::seq::SliceRandom;
use rand::Rng;

/// Annealing parameters of the network.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Annealing {
    pub initial_temp: f64,
    pub inf_temp: f64,
    pub stable_threshold: f64,
}

/// Hopfield network over candidate neurons.
///
/// Neuron `i` receives the field `omega * q_i - sum_j c_ij * y_j`, where
/// `c_ij = 1` for conflicting candidates, and updates to
/// `y_i = (1 + tanh(h_i / T)) / 2`.
pub(crate) struct HopfieldNetwork {
    weights: DMatrix<f64>,
    bias: DVector<f64>,
    states: DVector<f64>,
    temp: f64,
    annealing: Annealing,
}

impl HopfieldNetwork {
    /// `conflicts[(i, j)]` is 1 when candidates `i` and `j` cannot coexist.
    /// Initial activations are drawn uniformly from [0, 1).
    pub(crate) fn new<R: Rng + ?Sized>(
        conflicts: &DMatrix<f64>,
        quality: &[f64],
        omega: f64,
        annealing: Annealing,
        rng: &mut R,
    ) -> Self {
        let n = quality.len();
        let mut weights = -conflicts.clone();
        weights.fill_diagonal(0.0);
        let bias = DVector::from_iterator(n, quality.iter().map(|q| omega * q));
        let states = DVector::from_iterator(n, (0..n).map(|_| rng.gen::<f64>()));
        Self {
            weights,
            bias,
            states,
            temp: annealing.initial_temp,
            annealing,
        }
    }

    /// One asynchronous sweep over all neurons in random order, then one
    /// cooling step. Returns the largest activation change.
    pub(crate) fn sweep<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        let n = self.states.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut max_change = 0.0_f64;
        for i in order {
            let field = self.bias[i] + self.weights.row(i).dot(&self.states.transpose());
            let y = 0.5 * (1.0 + (field / self.temp).tanh());
            max_change = max_change.max((y - self.states[i]).abs());
            self.states[i] = y;
        }
        self.temp = self.annealing.inf_temp + 0.5 * (self.temp - self.annealing.inf_temp);
        max_change
    }

    /// Temperature within `stable_threshold` of `inf_temp`.
    pub(crate) fn is_cooled(&self) -> bool {
        self.temp - self.annealing.inf_temp <= self.annealing.stable_threshold
    }

    /// Largest change below `stable_threshold`, checked only once cooled.
    pub(crate) fn is_stable(&self, max_change: f64) -> bool {
        self.is_cooled() && max_change < self.annealing.stable_threshold
    }

    pub(crate) fn states(&self) -> &DVector<f64> {
        &self.states
    }

    pub(crate) fn temperature(&self) -> f64 {
        self.temp
    }
}
