//! Local linear model of the forward network around a state.
//!
//! The forward network is linearised by forward differences; the damped normal
//! equations `(JᵀJ + λI) δ = -Jᵀr` of that linear model give the state update.

/// Least-squares system `JᵀJ`, `Jᵀr` of a linearised residual vector
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEquations<const N: usize> {
    pub jtj: [[f64; N]; N],
    pub jtr: [f64; N],
}

impl<const N: usize> NormalEquations<N> {
    /// `jacobian` holds one row of `N` partial derivatives per residual
    pub fn new(jacobian: &[[f64; N]], residuals: &[f64]) -> Self {
        let mut jtj = [[0.0; N]; N];
        let mut jtr = [0.0; N];

        for (row, &residual) in jacobian.iter().zip(residuals) {
            for i in 0..N {
                jtr[i] += row[i] * residual;
                for j in 0..N {
                    jtj[i][j] += row[i] * row[j];
                }
            }
        }

        Self { jtj, jtr }
    }

    /// Solves for the damped Gauss-Newton step `δ`.
    ///
    /// Returns `None` when the damped system is not positive definite.
    pub fn step(&self, damping: f64) -> Option<[f64; N]> {
        let mut a = self.jtj;
        for (i, row) in a.iter_mut().enumerate() {
            row[i] += damping;
        }
        let b = self.jtr.map(|value| -value);
        solve_cholesky(&a, &b)
    }
}

/// Solves `A x = b` for a symmetric positive definite `A` by Cholesky decomposition.
pub fn solve_cholesky<const N: usize>(a: &[[f64; N]; N], b: &[f64; N]) -> Option<[f64; N]> {
    // A = L Lᵀ
    let mut l = [[0.0_f64; N]; N];
    for i in 0..N {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let diag = a[i][i] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[i][j] = diag.sqrt();
            } else {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }

    // L y = b
    let mut y = [0.0; N];
    for i in 0..N {
        let sum: f64 = (0..i).map(|j| l[i][j] * y[j]).sum();
        y[i] = (b[i] - sum) / l[i][i];
    }

    // Lᵀ x = y
    let mut x = [0.0; N];
    for i in (0..N).rev() {
        let sum: f64 = ((i + 1)..N).map(|j| l[j][i] * x[j]).sum();
        x[i] = (y[i] - sum) / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cholesky_solve() {
        let a = [[4.0, 2.0, 0.6], [2.0, 5.0, 1.0], [0.6, 1.0, 3.0]];
        let expected = [1.0, -2.0, 0.5];
        let b: [f64; 3] = std::array::from_fn(|i| (0..3).map(|j| a[i][j] * expected[j]).sum());

        let x = solve_cholesky(&a, &b).unwrap();
        for (value, expected) in x.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_singular_system_is_rejected() {
        let a = [[1.0, 1.0], [1.0, 1.0]];
        assert_eq!(solve_cholesky(&a, &[1.0, 1.0]), None);
    }

    #[test]
    fn test_undamped_step_solves_linear_problem() {
        // r(x) = J x - y at x = 0 gives r = -y; the Gauss-Newton step is the least-squares solution
        let jacobian = [[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let target = [1.0, 4.0, 3.0];
        let residuals = target.map(|value| -value);

        let step = NormalEquations::new(&jacobian, &residuals).step(0.0).unwrap();
        assert!((step[0] - 1.0).abs() < 1e-12);
        assert!((step[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_damping_shortens_step() {
        let jacobian = [[1.0, 0.0], [0.0, 1.0]];
        let residuals = [-1.0, -1.0];
        let equations = NormalEquations::new(&jacobian, &residuals);

        let free = equations.step(0.0).unwrap();
        let damped = equations.step(1.0).unwrap();
        assert!((free[0] - 1.0).abs() < 1e-12);
        assert!((damped[0] - 0.5).abs() < 1e-12);
    }
}
