//! Testing functions and utilities useful for benchmarking, debugging and smoke
//! testing.
//!
//! [`Sphere`] and [`ExtendedRosenbrock`] are recommended for first tests.
//! Others can be used for specific conditions (e.g., ill-conditioning or many
//! local optima).
//!
//! # References
//!
//! \[1\] [A Literature Survey of Benchmark Functions For Global Optimization
//! Problems](https://arxiv.org/abs/1308.4008)
//!
//! \[2\] [Completely Derandomized Self-Adaptation in Evolution
//! Strategies](https://doi.org/10.1162/106365601750190398)

#![allow(unused)]

use std::error::Error as StdError;

use nalgebra::{storage::Storage, DVector, Dyn, IsContiguous, OVector, Vector};
use thiserror::Error;

use crate::core::{Domain, Function, GoalType, Objective, Optimizer, Problem};

/// Extension of the [`Problem`] trait that provides additional information that
/// is useful for testing optimizers.
pub trait TestProblem: Problem {
    /// Standard initial values for the problem. Using the same initial values is
    /// essential for fair comparison of methods.
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>>;
}

/// Extension of the [`Function`] trait that provides additional information
/// that is useful for testing optimizers.
pub trait TestFunction: Function + TestProblem {
    /// A set of global optima (if known and finite). This is mostly just for
    /// information, for example to know how close an optimizer got even if it
    /// failed. For testing if a given point is global optimum,
    /// [`TestFunction::is_optimum`] should be used.
    fn optima(&self) -> Vec<OVector<Self::Field, Dyn>> {
        Vec::new()
    }

    /// Test if given point is a global optimum of the function, given the
    /// tolerance `eps`.
    ///
    /// By default, the point is considered optimal if it is not farther than
    /// `eps` from any of the [optima](TestFunction::optima).
    fn is_optimum<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>, eps: Self::Field) -> bool
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        self.optima()
            .iter()
            .any(|optimum| (x - optimum).norm() <= eps)
    }
}

/// [Sphere
/// function](https://en.wikipedia.org/wiki/Test_functions_for_optimization)
/// \[1\].
///
/// This is a simple paraboloid which can be used in early development and
/// sanity checking as it can be considered a trivial problem.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    n: usize,
}

impl Sphere {
    /// Initializes the function with given dimension.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "n must be greater than zero");
        Self { n }
    }
}

impl Default for Sphere {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Problem for Sphere {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        Domain::unconstrained(self.n)
    }
}

impl Function for Sphere {
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        x.iter().map(|xi| xi.powi(2)).sum()
    }
}

impl TestProblem for Sphere {
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>> {
        let init = DVector::from_iterator(
            self.n,
            (0..self.n).map(|i| if i % 2 == 0 { 10.0 } else { -10.0 }),
        );

        vec![init]
    }
}

impl TestFunction for Sphere {
    fn optima(&self) -> Vec<OVector<Self::Field, Dyn>> {
        vec![DVector::from_element(self.n, 0.0)]
    }

    fn is_optimum<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>, eps: Self::Field) -> bool
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        self.apply(x).abs() <= eps
    }
}

/// Sphere function with the minimum moved to `(shift, ..., shift)`, bounded
/// to `[-10, 10]` in every variable.
///
/// Useful when the optimum should not coincide with the origin, which is the
/// default starting point of many setups.
#[derive(Debug, Clone, Copy)]
pub struct ShiftedSphere {
    n: usize,
    shift: f64,
}

impl ShiftedSphere {
    /// Initializes the function with given dimension and shift of the minimum.
    pub fn new(n: usize, shift: f64) -> Self {
        assert!(n > 0, "n must be greater than zero");
        Self { n, shift }
    }
}

impl Problem for ShiftedSphere {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        (0..self.n).map(|_| (-10.0, 10.0)).collect()
    }
}

impl Function for ShiftedSphere {
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        x.iter().map(|xi| (xi - self.shift).powi(2)).sum()
    }
}

impl TestProblem for ShiftedSphere {
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>> {
        vec![DVector::zeros(self.n)]
    }
}

impl TestFunction for ShiftedSphere {
    fn optima(&self) -> Vec<OVector<Self::Field, Dyn>> {
        vec![DVector::from_element(self.n, self.shift)]
    }
}

/// [Extended Rosenbrock
/// function](https://en.wikipedia.org/wiki/Rosenbrock_function) \[1\] (also
/// known as Rosenbrock's valley or banana function).
///
/// The global minimum is inside a long, narrow, parabolic shaped flat valley.
/// The challenge is to find the solution inside the valley.
#[derive(Debug, Clone, Copy)]
pub struct ExtendedRosenbrock {
    n: usize,
}

impl ExtendedRosenbrock {
    /// Initializes the function with given dimension.
    ///
    /// The dimension **must** be a multiplier of 2.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "n must be greater than zero");
        assert!(n % 2 == 0, "n must be a multiple of 2");
        Self { n }
    }
}

impl Default for ExtendedRosenbrock {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Problem for ExtendedRosenbrock {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        Domain::unconstrained(self.n)
    }
}

impl Function for ExtendedRosenbrock {
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        (0..(self.n / 2))
            .map(|i| {
                let x1 = x[2 * i];
                let x2 = x[2 * i + 1];
                100.0 * (x2 - x1 * x1).powi(2) + (1.0 - x1).powi(2)
            })
            .sum()
    }
}

impl TestProblem for ExtendedRosenbrock {
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>> {
        let init1 = DVector::from_iterator(
            self.n,
            (0..self.n).map(|i| if i % 2 == 0 { -1.2 } else { 1.0 }),
        );

        let init2 = DVector::from_iterator(
            self.n,
            (0..self.n).map(|i| if i % 2 == 0 { 6.39 } else { -0.221 }),
        );

        vec![init1, init2]
    }
}

impl TestFunction for ExtendedRosenbrock {
    fn optima(&self) -> Vec<OVector<Self::Field, Dyn>> {
        vec![DVector::from_element(self.n, 1.0)]
    }
}

/// Ellipsoid function \[2\].
///
/// A convex quadratic whose axes are scaled from 1 to 10<sup>6</sup>, so the
/// Hessian matrix has condition number 10<sup>6</sup>.
#[derive(Debug, Clone, Copy)]
pub struct Ellipsoid {
    n: usize,
}

impl Ellipsoid {
    /// Initializes the function with given dimension.
    ///
    /// The dimension must be at least 2.
    pub fn new(n: usize) -> Self {
        assert!(n > 1, "n must be greater than one");
        Self { n }
    }

    fn weight(&self, i: usize) -> f64 {
        10f64.powf(6.0 * i as f64 / (self.n - 1) as f64)
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::new(3)
    }
}

impl Problem for Ellipsoid {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        Domain::unconstrained(self.n)
    }
}

impl Function for Ellipsoid {
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        x.iter()
            .enumerate()
            .map(|(i, xi)| self.weight(i) * xi.powi(2))
            .sum()
    }
}

impl TestProblem for Ellipsoid {
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>> {
        let init1 = DVector::from_element(self.n, 1.0);

        let init2 = DVector::from_iterator(
            self.n,
            (0..self.n).map(|i| match i % 3 {
                0 => -3.0,
                1 => 2.0,
                2 => -1.0,
                _ => unreachable!(),
            }),
        );

        vec![init1, init2]
    }
}

impl TestFunction for Ellipsoid {
    fn optima(&self) -> Vec<OVector<Self::Field, Dyn>> {
        vec![DVector::zeros(self.n)]
    }
}

/// [Rastrigin
/// function](https://en.wikipedia.org/wiki/Rastrigin_function) \[1\].
///
/// Highly multimodal function with regularly distributed local minima. Local
/// optimizers are expected to end in one of them.
#[derive(Debug, Clone, Copy)]
pub struct Rastrigin {
    n: usize,
}

impl Rastrigin {
    /// Initializes the function with given dimension.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "n must be greater than zero");
        Self { n }
    }
}

impl Default for Rastrigin {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Problem for Rastrigin {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        (0..self.n).map(|_| (-5.12, 5.12)).collect()
    }
}

impl Function for Rastrigin {
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        let two_pi = 2.0 * std::f64::consts::PI;
        10.0 * self.n as f64
            + x.iter()
                .map(|xi| xi.powi(2) - 10.0 * (two_pi * xi).cos())
                .sum::<f64>()
    }
}

impl TestProblem for Rastrigin {
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>> {
        let init = DVector::from_iterator(
            self.n,
            (0..self.n).map(|i| if i % 2 == 0 { 2.5 } else { -3.5 }),
        );

        vec![init]
    }
}

impl TestFunction for Rastrigin {
    fn optima(&self) -> Vec<OVector<Self::Field, Dyn>> {
        vec![DVector::zeros(self.n)]
    }
}

/// Function with the sign flipped, defined on the same domain.
///
/// Maximizing the negated function must give the same points as minimizing
/// the original one.
#[derive(Debug, Clone, Copy)]
pub struct Negated<F>(pub F);

impl<F: Problem> Problem for Negated<F> {
    type Field = F::Field;

    fn domain(&self) -> Domain<Self::Field> {
        self.0.domain()
    }
}

impl<F: Function> Function for Negated<F> {
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        -self.0.apply(x)
    }
}

/// Optimization error of the testing optimizer driver (see [`optimize`]).
#[derive(Debug, Error)]
pub enum TestingError<E: StdError + 'static> {
    /// Error of the optimizer used.
    #[error("{0}")]
    Inner(#[from] E),
    /// Optimizer terminated without reaching the expected minimum.
    #[error("optimizer did not reach the minimum")]
    Termination,
}

/// A simple optimizer driver that can be used in tests.
///
/// The function is minimized from `x` with given evaluations budget. The
/// optimization is successful if the final value is not greater than `min +
/// tolerance`.
pub fn optimize<F: Function, O: Optimizer<F>>(
    f: &F,
    dom: &Domain<F::Field>,
    mut optimizer: O,
    mut x: OVector<F::Field, Dyn>,
    min: F::Field,
    max_evaluations: usize,
    tolerance: F::Field,
) -> Result<OVector<F::Field, Dyn>, TestingError<O::Error>>
where
    O::Error: StdError,
{
    let mut obj = Objective::with_max_evaluations(f, GoalType::Minimize, max_evaluations);
    let fx = optimizer.optimize(&mut obj, dom, &mut x)?;

    if fx <= min + tolerance {
        Ok(x)
    } else {
        Err(TestingError::Termination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dvector;

    #[test]
    fn optima_have_minimal_values() {
        assert_eq!(Sphere::new(3).apply(&dvector![0.0, 0.0, 0.0]), 0.0);
        assert_eq!(ShiftedSphere::new(2, 3.0).apply(&dvector![3.0, 3.0]), 0.0);
        assert_eq!(
            ExtendedRosenbrock::new(4).apply(&dvector![1.0, 1.0, 1.0, 1.0]),
            0.0
        );
        assert_eq!(Ellipsoid::new(3).apply(&dvector![0.0, 0.0, 0.0]), 0.0);
        assert_eq!(Rastrigin::new(2).apply(&dvector![0.0, 0.0]), 0.0);
    }

    #[test]
    fn ellipsoid_weights() {
        let f = Ellipsoid::new(3);
        approx::assert_relative_eq!(f.apply(&dvector![1.0, 0.0, 0.0]), 1.0);
        approx::assert_relative_eq!(f.apply(&dvector![0.0, 1.0, 0.0]), 1e3);
        approx::assert_relative_eq!(f.apply(&dvector![0.0, 0.0, 1.0]), 1e6);
    }

    #[test]
    fn is_optimum_by_distance() {
        let f = ExtendedRosenbrock::new(2);

        assert!(f.is_optimum(&dvector![1.0, 1.0 + 1e-4], 1e-3));
        assert!(!f.is_optimum(&dvector![1.0, 1.1], 1e-3));
    }

    #[test]
    fn negated_keeps_domain() {
        let f = ShiftedSphere::new(2, 1.0);
        let g = Negated(f);
        let x = dvector![0.5, -2.0];

        assert_eq!(g.apply(&x), -f.apply(&x));
        assert_eq!(g.domain().lower(), f.domain().lower());
        assert_eq!(g.domain().upper(), f.domain().upper());
    }
}
