//! Iterative chi-square refinement of the inverse network state
//!
//! Starting from the inverse network output, the five log-domain state variables
//! are adjusted by Levenberg-Marquardt steps so that the forward network
//! reproduces the measured log reflectances more closely. The state never leaves
//! the training bounds of the forward network.

pub mod glm;

use crate::bands::FORWARD_BAND_COUNT;
use crate::config::{FitSettings, PowerLaw, WaterParameters};
use crate::nn::{Bounds, NeuralNetwork};
use crate::water::{
    ENVIRONMENT_SIZE, Environment, LOG_A_GELBSTOFF, LOG_A_PIG, LOG_B_TSM, STATE_SIZE, State,
    WaterAlgorithm,
};

use glm::NormalEquations;

/// Forward difference step on the log-domain state
pub const JACOBIAN_STEP: f64 = 1e-3;

const DAMPING_DOWN: f64 = 0.1;
const DAMPING_UP: f64 = 10.0;

/// Outcome of one refinement, kept even when it did not converge
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Final log-domain state
    pub state: State,
    /// Smallest and largest value of each state variable over all accepted iterates
    pub state_min: State,
    pub state_max: State,
    pub chi_square: f64,
    pub iterations: usize,
    /// Norm of the last proposed state change
    pub parameter_change: f64,
    pub converged: bool,
    pub tsm: f64,
    pub chl_conc: f64,
}

impl FitResult {
    fn quantity(&self, index: usize) -> (f64, f64, f64) {
        (
            self.state[index].exp(),
            self.state_min[index].exp(),
            self.state_max[index].exp(),
        )
    }

    /// `(value, min, max)` of the gelbstoff absorption
    pub fn a_gelbstoff(&self) -> (f64, f64, f64) {
        self.quantity(LOG_A_GELBSTOFF)
    }

    pub fn a_pig(&self) -> (f64, f64, f64) {
        self.quantity(LOG_A_PIG)
    }

    pub fn b_tsm(&self) -> (f64, f64, f64) {
        self.quantity(LOG_B_TSM)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChiSquareFitting {
    settings: FitSettings,
    tsm_conversion: PowerLaw,
    chl_conversion: PowerLaw,
}

struct Problem<'a> {
    algorithm: &'a dyn WaterAlgorithm,
    forward: &'a NeuralNetwork,
    environment: &'a Environment,
    log_rlw_cut: &'a [f64; FORWARD_BAND_COUNT],
    bounds: &'a [Bounds],
}

impl Problem<'_> {
    fn residuals(&self, state: &State) -> Vec<f64> {
        let output = self
            .forward
            .calc(&self.algorithm.forward_input(self.environment, state));
        self.algorithm.residuals(&output, self.log_rlw_cut)
    }

    fn clamp(&self, state: &mut State) {
        for (value, bounds) in state.iter_mut().zip(self.bounds) {
            *value = bounds.clamp(*value);
        }
    }

    /// Forward difference Jacobian, stepping backwards at an upper bound
    fn jacobian(&self, state: &State, residuals: &[f64]) -> Vec<[f64; STATE_SIZE]> {
        let mut jacobian = vec![[0.0; STATE_SIZE]; residuals.len()];
        for j in 0..STATE_SIZE {
            let mut perturbed = *state;
            let h = if state[j] + JACOBIAN_STEP <= self.bounds[j].max {
                JACOBIAN_STEP
            } else {
                -JACOBIAN_STEP
            };
            perturbed[j] += h;
            let shifted = self.residuals(&perturbed);
            for (row, (after, before)) in jacobian.iter_mut().zip(shifted.iter().zip(residuals)) {
                row[j] = (after - before) / h;
            }
        }
        jacobian
    }
}

fn sum_of_squares(residuals: &[f64]) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

impl ChiSquareFitting {
    pub fn new(parameters: &WaterParameters) -> Self {
        Self {
            settings: parameters.fit,
            tsm_conversion: parameters.tsm_conversion,
            chl_conversion: parameters.chl_conversion,
        }
    }

    pub fn settings(&self) -> &FitSettings {
        &self.settings
    }

    /// Refines `initial` against the measured log reflectances.
    ///
    /// The forward network must take [`ENVIRONMENT_SIZE`] + [`STATE_SIZE`] inputs.
    pub fn perform(
        &self,
        algorithm: &dyn WaterAlgorithm,
        forward: &NeuralNetwork,
        environment: &Environment,
        log_rlw_cut: &[f64; FORWARD_BAND_COUNT],
        initial: &State,
    ) -> FitResult {
        let problem = Problem {
            algorithm,
            forward,
            environment,
            log_rlw_cut,
            bounds: &forward.input_bounds()[ENVIRONMENT_SIZE..],
        };

        let mut state = *initial;
        problem.clamp(&mut state);
        let mut residuals = problem.residuals(&state);
        let mut chi_square = sum_of_squares(&residuals);

        let mut state_min = state;
        let mut state_max = state;
        let mut damping = self.settings.initial_damping;
        let mut parameter_change = 0.0;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.settings.max_iterations {
            iterations += 1;

            let jacobian = problem.jacobian(&state, &residuals);
            let Some(delta) = NormalEquations::new(&jacobian, &residuals).step(damping) else {
                damping *= DAMPING_UP;
                parameter_change = 0.0;
                continue;
            };

            let mut trial = state;
            for (value, step) in trial.iter_mut().zip(delta) {
                *value += step;
            }
            problem.clamp(&mut trial);

            parameter_change = trial
                .iter()
                .zip(&state)
                .map(|(new, old)| (new - old).powi(2))
                .sum::<f64>()
                .sqrt();

            let trial_residuals = problem.residuals(&trial);
            let trial_chi_square = sum_of_squares(&trial_residuals);

            if trial_chi_square < chi_square {
                let drop = chi_square - trial_chi_square;
                state = trial;
                residuals = trial_residuals;
                chi_square = trial_chi_square;
                damping *= DAMPING_DOWN;

                for ((value, min), max) in state.iter().zip(&mut state_min).zip(&mut state_max) {
                    *min = min.min(*value);
                    *max = max.max(*value);
                }

                if parameter_change < self.settings.parameter_tolerance
                    || drop < self.settings.chi_square_tolerance
                {
                    converged = true;
                    break;
                }
            } else {
                damping *= DAMPING_UP;
                if parameter_change < self.settings.parameter_tolerance {
                    converged = true;
                    break;
                }
            }
        }

        FitResult {
            state,
            state_min,
            state_max,
            chi_square,
            iterations,
            parameter_change,
            converged,
            tsm: self.tsm_conversion.apply_log(state[LOG_B_TSM]),
            chl_conc: self.chl_conversion.apply(state[LOG_A_PIG].exp()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::water::create_algorithm;
    use crate::water::tests::{environment, environment_bounds, flat_network};

    /// Forward network whose output `i` is linear-ish in state variable `i % 5`
    fn sensitive_forward_net() -> NeuralNetwork {
        let mut text = String::from("input 10\n");
        for (min, max) in environment_bounds() {
            text.push_str(&format!("{min} {max}\n"));
        }
        for _ in 0..STATE_SIZE {
            text.push_str("-5 5\n");
        }
        text.push_str("planes 3 10 5 10\nwgt 0 10 5\n");
        for unit in 0..STATE_SIZE {
            let row: Vec<&str> = (0..10)
                .map(|input| if input == ENVIRONMENT_SIZE + unit { "2" } else { "0" })
                .collect();
            text.push_str(&row.join(" "));
            text.push('\n');
        }
        text.push_str("wgt 1 5 10\n");
        for output in 0..FORWARD_BAND_COUNT {
            let row: Vec<&str> = (0..STATE_SIZE)
                .map(|unit| if unit == output % STATE_SIZE { "4" } else { "0" })
                .collect();
            text.push_str(&row.join(" "));
            text.push('\n');
        }
        text.push_str("bias 1 5\n-1 -1 -1 -1 -1\nbias 2 10\n");
        text.push_str(&"-2 ".repeat(FORWARD_BAND_COUNT));
        text.push_str("\noutput 10\n");
        for _ in 0..FORWARD_BAND_COUNT {
            text.push_str("-8 -3\n");
        }
        text.parse().unwrap()
    }

    fn eutrophic_setup() -> (WaterParameters, Box<dyn WaterAlgorithm>) {
        let parameters = WaterParameters::for_variant(crate::config::AlgorithmVariant::Eutrophic);
        let algorithm = create_algorithm(&parameters);
        (parameters, algorithm)
    }

    #[test]
    fn test_recovers_state_of_synthetic_spectrum() {
        let (parameters, algorithm) = eutrophic_setup();
        let forward = sensitive_forward_net();
        let env = environment();

        let truth = [0.3, -1.2, 0.8, -0.4, 1.1];
        let modelled = forward.calc(&algorithm.forward_input(&env, &truth));
        let mut cut = [0.0; FORWARD_BAND_COUNT];
        cut.copy_from_slice(&modelled);

        let start = [0.0, -1.0, 0.5, -0.2, 0.8];
        let fitting = ChiSquareFitting::new(&parameters);
        let result = fitting.perform(algorithm.as_ref(), &forward, &env, &cut, &start);

        assert!(result.converged);
        assert!(result.iterations <= parameters.fit.max_iterations);
        assert!(result.chi_square < 1e-6, "{}", result.chi_square);

        let initial_chi_square = algorithm.chi_square(
            &forward.calc(&algorithm.forward_input(&env, &start)),
            &cut,
        );
        assert!(result.chi_square < initial_chi_square);

        for i in 0..STATE_SIZE {
            assert!(result.state_min[i] <= result.state[i]);
            assert!(result.state[i] <= result.state_max[i]);
        }
        let (a_pig, a_pig_min, a_pig_max) = result.a_pig();
        assert!(a_pig_min <= a_pig && a_pig <= a_pig_max);
        assert!((result.chl_conc - 0.0318 * a_pig).abs() < 1e-12);
        assert!((result.tsm - 1.73 * result.state[LOG_B_TSM].exp()).abs() < 1e-9);
    }

    #[test]
    fn test_single_iteration_without_tolerance_fails() {
        let (mut parameters, algorithm) = eutrophic_setup();
        parameters.fit.max_iterations = 1;
        parameters.fit.parameter_tolerance = 0.0;
        parameters.fit.chi_square_tolerance = 0.0;

        let forward = sensitive_forward_net();
        let cut = [-5.0; FORWARD_BAND_COUNT];
        let start = [1.0, 1.0, 1.0, 1.0, 1.0];

        let result = ChiSquareFitting::new(&parameters).perform(
            algorithm.as_ref(),
            &forward,
            &environment(),
            &cut,
            &start,
        );

        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert!(result.chi_square.is_finite());
        assert!(result.parameter_change > 0.0);
    }

    #[test]
    fn test_state_stays_within_forward_bounds() {
        let (parameters, algorithm) = eutrophic_setup();
        let forward = sensitive_forward_net();
        let cut = [-2.0; FORWARD_BAND_COUNT]; // above every reachable output

        let start = [9.0, -9.0, 0.0, 0.0, 0.0];
        let result = ChiSquareFitting::new(&parameters).perform(
            algorithm.as_ref(),
            &forward,
            &environment(),
            &cut,
            &start,
        );

        for (value, bounds) in result.state.iter().zip(&forward.input_bounds()[5..]) {
            assert!(bounds.contains(*value), "{value}");
        }
        assert!(result.state_max[0] <= 5.0);
        assert!(result.state_min[1] >= -5.0);
    }

    #[test]
    fn test_flat_forward_network_converges_immediately() {
        let (parameters, algorithm) = eutrophic_setup();
        let mut inputs = environment_bounds();
        inputs.extend([(-5.0, 5.0); STATE_SIZE]);
        let forward = flat_network(&inputs, &[(-6.0, -4.0); FORWARD_BAND_COUNT]);

        let cut = [-5.0; FORWARD_BAND_COUNT];
        let start = [0.1, 0.2, 0.3, 0.4, 0.5];
        let result = ChiSquareFitting::new(&parameters).perform(
            algorithm.as_ref(),
            &forward,
            &environment(),
            &cut,
            &start,
        );

        // no sensitivity: the step vanishes and the start is kept
        assert!(result.converged);
        assert_eq!(result.state, start);
        assert!(result.parameter_change < parameters.fit.parameter_tolerance);
    }

    #[test]
    fn test_unsolvable_system_proposes_no_step() {
        let (mut parameters, algorithm) = eutrophic_setup();
        parameters.fit.max_iterations = 3;
        let forward = sensitive_forward_net();

        // a missing measurement makes every normal equation system non-finite
        let mut cut = [-5.0; FORWARD_BAND_COUNT];
        cut[2] = f64::NAN;
        let start = [0.1, 0.2, 0.3, 0.4, 0.5];

        let result = ChiSquareFitting::new(&parameters).perform(
            algorithm.as_ref(),
            &forward,
            &environment(),
            &cut,
            &start,
        );

        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.parameter_change, 0.0);
        assert_eq!(result.state, start);
    }
}
