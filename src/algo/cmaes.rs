//! CMA-ES (Covariance Matrix Adaptation Evolution Strategy) optimization
//! method.
//!
//! [CMA-ES](https://en.wikipedia.org/wiki/CMA-ES) is a stochastic,
//! derivative-free method for nonlinear, non-convex optimization. In each
//! generation, a population of candidates is sampled from a multivariate
//! normal distribution. The mean of the distribution is moved towards the
//! best candidates and the covariance matrix is adapted so that the
//! distribution follows the landscape of the function. The overall step size
//! is controlled separately by the length of the evolution path.
//!
//! Unlike [BOBYQA](super::bobyqa), the method does not assume any smoothness
//! of the function, which makes it suitable for rugged or multimodal
//! problems at the cost of more evaluations.
//!
//! Bound constraints are handled by resampling infeasible candidates (see
//! [`CmaesOptions::check_feasible_count`]) and, if that fails, by repairing
//! them into the domain with a penalty proportional to the repair distance.
//! The initial point is used as the mean of the first generation and must lie
//! in the domain.
//!
//! # References
//!
//! \[1\] [The CMA Evolution Strategy: A Tutorial](https://arxiv.org/abs/1604.00772)
//!
//! \[2\] [Completely Derandomized Self-Adaptation in Evolution
//! Strategies](https://doi.org/10.1162/106365601750190398)

use std::collections::VecDeque;

use getset::{CopyGetters, Setters};
use log::{debug, trace};
use nalgebra::{
    convert, storage::StorageMut, ComplexField, Dyn, IsContiguous, OMatrix, OVector, RealField,
    Vector, U1,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use thiserror::Error;

use crate::core::{Domain, EvaluationError, Function, Objective, Optimizer, Problem};

/// Specification for the initial step size.
#[derive(Debug, Clone, Copy)]
pub enum SigmaInit<S> {
    /// Fixed value.
    Fixed(S),
    /// Estimated from the bounds of the domain. It is 0.3 times the smallest
    /// finite width of the domain. If all variables are unbounded, the largest
    /// magnitude given by the domain scale is used, or one if there is no
    /// scale.
    Estimated,
}

/// Number of candidates sampled in each generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopulationSize {
    /// Fixed size. It must be at least two.
    Fixed(usize),
    /// Default size _4 + floor(3 ln n)_.
    #[default]
    Recommended,
}

impl PopulationSize {
    /// Gets the population size for given dimension.
    pub fn count(&self, dim: usize) -> usize {
        match self {
            PopulationSize::Fixed(lambda) => *lambda,
            PopulationSize::Recommended => 4 + (3.0 * (dim as f64).ln()).floor() as usize,
        }
    }
}

/// Options for [`Cmaes`] optimizer.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct CmaesOptions<P: Problem> {
    /// Population size. Default: recommended (see [`PopulationSize`]).
    population_size: PopulationSize,
    /// Initial step size. Default: estimated (see [`SigmaInit`]).
    sigma_init: SigmaInit<P::Field>,
    /// Maximum number of generations. Default: `10000`.
    max_iterations: usize,
    /// The optimization stops when a function value is lower or equal to
    /// this. Default: negative infinity.
    stop_fitness: P::Field,
    /// The optimization stops when the standard deviation of the distribution
    /// is below this in all coordinates. Default: `1e-11`.
    tol_x: P::Field,
    /// The optimization stops when the range of the best function values of
    /// the recent generations is below this. Default: `1e-12`.
    tol_fun: P::Field,
    /// Number of resampling attempts for a candidate that is out of bounds,
    /// before it is repaired. Default: `0`.
    check_feasible_count: usize,
    /// Seed of the random number generator. Default: `0`.
    seed: u64,
}

impl<P: Problem> Default for CmaesOptions<P> {
    fn default() -> Self {
        Self {
            population_size: PopulationSize::Recommended,
            sigma_init: SigmaInit::Estimated,
            max_iterations: 10000,
            stop_fitness: convert(f64::NEG_INFINITY),
            tol_x: convert(1e-11),
            tol_fun: convert(1e-12),
            check_feasible_count: 0,
            seed: 0,
        }
    }
}

/// CMA-ES optimizer.
///
/// See [module](self) documentation for more details.
pub struct Cmaes<P: Problem> {
    options: CmaesOptions<P>,
    rng: StdRng,
    iter: usize,
}

impl<P: Problem> Cmaes<P> {
    /// Initializes CMA-ES optimizer with default options.
    pub fn new(p: &P, dom: &Domain<P::Field>) -> Self {
        Self::with_options(p, dom, CmaesOptions::default())
    }

    /// Initializes CMA-ES optimizer with given options.
    pub fn with_options(_: &P, _: &Domain<P::Field>, options: CmaesOptions<P>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(options.seed),
            options,
            iter: 0,
        }
    }

    /// Gets the options of the optimizer.
    pub fn options(&self) -> &CmaesOptions<P> {
        &self.options
    }

    /// Gets the number of generations of the last optimization.
    pub fn iterations(&self) -> usize {
        self.iter
    }

    /// Resets the random number generator to the seed from options.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.options.seed);
        self.iter = 0;
    }
}

/// Error returned from [`Cmaes`] optimizer.
#[derive(Debug, Error)]
pub enum CmaesError {
    /// Dimension of the initial point does not match the domain.
    #[error("initial point has dimension {actual}, but domain has {expected}")]
    DimensionMismatch {
        /// Dimension of the domain.
        expected: usize,
        /// Dimension of the initial point.
        actual: usize,
    },
    /// Initial point is not inside the domain.
    #[error("initial point is out of bounds in variable {index}")]
    InitialOutOfBounds {
        /// Index of the first variable out of bounds.
        index: usize,
    },
    /// Population is too small for recombination.
    #[error("population size {0} is too small, at least 2 is required")]
    InvalidPopulationSize(usize),
    /// Initial step size is not positive and finite.
    #[error("initial step size must be positive and finite")]
    InvalidSigma,
    /// Error when evaluating the objective function.
    #[error("{0}")]
    Evaluation(#[from] EvaluationError),
}

/// Strategy parameters derived from the dimension and the population size.
struct Parameters<T> {
    lambda: usize,
    mu: usize,
    weights: Vec<T>,
    mueff: T,
    cc: T,
    cs: T,
    c1: T,
    cmu: T,
    damps: T,
    chi_n: T,
}

impl<T: RealField + Copy> Parameters<T> {
    fn new(n: usize, lambda: usize) -> Self {
        let one = T::one();
        let two: T = convert(2.0);
        let nf: T = convert(n as f64);

        let mu = lambda / 2;
        let weights = (0..mu)
            .map(|i| convert::<_, T>(mu as f64 + 0.5).ln() - convert::<_, T>(i as f64 + 1.0).ln())
            .collect::<Vec<_>>();
        let sum = weights.iter().fold(T::zero(), |acc, w| acc + *w);
        let weights = weights.into_iter().map(|w| w / sum).collect::<Vec<_>>();
        let mueff = one / weights.iter().fold(T::zero(), |acc, w| acc + *w * *w);

        let cc = (convert::<_, T>(4.0) + mueff / nf) / (nf + convert(4.0) + two * mueff / nf);
        let cs = (mueff + two) / (nf + mueff + convert(5.0));
        let c1 = two / ((nf + convert(1.3)).powi(2) + mueff);
        let cmu = (one - c1)
            .min(two * (mueff - two + one / mueff) / ((nf + two).powi(2) + mueff));
        let damps = one
            + two * T::zero().max(((mueff - one) / (nf + one)).sqrt() - one)
            + cs;
        let chi_n = nf.sqrt()
            * (one - one / (convert::<_, T>(4.0) * nf)
                + one / (convert::<_, T>(21.0) * nf * nf));

        Self {
            lambda,
            mu,
            weights,
            mueff,
            cc,
            cs,
            c1,
            cmu,
            damps,
            chi_n,
        }
    }
}

/// Candidate of a generation.
struct Candidate<T: RealField + Copy> {
    /// Standard normal sample.
    z: OVector<T, Dyn>,
    /// Sampled point, possibly out of bounds.
    x: OVector<T, Dyn>,
    /// Point repaired into the domain.
    repaired: OVector<T, Dyn>,
    /// Function value in the repaired point.
    value: T,
    /// Distance between the sampled and the repaired point.
    penalty: T,
    /// Penalized function value used for the ranking.
    fitness: T,
}

fn estimate_sigma<T: RealField + Copy>(dom: &Domain<T>) -> T {
    let smallest_width = dom
        .lower()
        .iter()
        .zip(dom.upper().iter())
        .map(|(l, u)| *u - *l)
        .filter(|width| width.is_finite())
        .fold(None, |acc: Option<T>, width| {
            Some(acc.map_or(width, |acc| acc.min(width)))
        });

    match smallest_width {
        Some(width) => convert::<_, T>(0.3) * width,
        None => dom
            .scale()
            .map(|scale| scale.iter().fold(T::zero(), |acc, s| acc.max(T::one() / *s)))
            .unwrap_or_else(T::one),
    }
}

impl<F: Function> Optimizer<F> for Cmaes<F> {
    const NAME: &'static str = "CMA-ES";

    type Error = CmaesError;

    fn optimize<Sx>(
        &mut self,
        obj: &mut Objective<'_, F>,
        dom: &Domain<F::Field>,
        x: &mut Vector<F::Field, Dyn, Sx>,
    ) -> Result<F::Field, Self::Error>
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous,
    {
        let CmaesOptions {
            population_size,
            sigma_init,
            max_iterations,
            stop_fitness,
            tol_x,
            tol_fun,
            check_feasible_count,
            ..
        } = self.options;

        let n = dom.dim();

        if x.nrows() != n {
            return Err(CmaesError::DimensionMismatch {
                expected: n,
                actual: x.nrows(),
            });
        }

        let zero: F::Field = convert(0.0);
        let one: F::Field = convert(1.0);
        let two: F::Field = convert(2.0);

        let lambda = population_size.count(n);
        if lambda < 2 {
            return Err(CmaesError::InvalidPopulationSize(lambda));
        }

        let mut sigma = match sigma_init {
            SigmaInit::Fixed(fixed) => fixed,
            SigmaInit::Estimated => estimate_sigma(dom),
        };
        if !(sigma > zero && sigma.is_finite()) {
            return Err(CmaesError::InvalidSigma);
        }

        let params = Parameters::<F::Field>::new(n, lambda);
        let Parameters {
            mu,
            mueff,
            cc,
            cs,
            c1,
            cmu,
            damps,
            chi_n,
            ..
        } = params;

        if let Some(index) = (0..n).find(|&i| !(x[i] >= dom.lower()[i] && x[i] <= dom.upper()[i]))
        {
            return Err(CmaesError::InitialOutOfBounds { index });
        }

        let dim = Dyn(n);
        let mut xmean = OVector::<F::Field, Dyn>::from_iterator_generic(dim, U1, x.iter().copied());

        let mut pc = OVector::<F::Field, Dyn>::zeros_generic(dim, U1);
        let mut ps = OVector::<F::Field, Dyn>::zeros_generic(dim, U1);
        let mut b = OMatrix::<F::Field, Dyn, Dyn>::identity_generic(dim, dim);
        let mut d = OVector::<F::Field, Dyn>::from_element_generic(dim, U1, one);
        let mut c = OMatrix::<F::Field, Dyn, Dyn>::identity_generic(dim, dim);

        let mut best_x = xmean.clone();
        let mut best_value = obj.eval(&best_x)?;

        // Best fitness values of the recent generations.
        let history_len = 10 + (30 * n) / lambda;
        let mut history = VecDeque::with_capacity(history_len);

        let mut candidates = (0..params.lambda)
            .map(|_| Candidate {
                z: OVector::zeros_generic(dim, U1),
                x: OVector::zeros_generic(dim, U1),
                repaired: OVector::zeros_generic(dim, U1),
                value: zero,
                penalty: zero,
                fitness: zero,
            })
            .collect::<Vec<_>>();

        self.iter = 0;

        debug!(
            "starting CMA-ES with n = {}, lambda = {}, mu = {}, sigma = {}",
            n, lambda, mu, sigma
        );

        loop {
            self.iter += 1;
            let bd = &b * OMatrix::from_diagonal(&d);

            // Sample the population.
            for candidate in candidates.iter_mut() {
                for attempt in 0..=check_feasible_count {
                    for zi in candidate.z.iter_mut() {
                        let sample: f64 = self.rng.sample(StandardNormal);
                        *zi = convert(sample);
                    }

                    candidate.x = &xmean + (&bd * &candidate.z) * sigma;

                    if attempt == check_feasible_count || dom.contains(&candidate.x) {
                        break;
                    }
                }

                candidate.repaired.copy_from(&candidate.x);
                dom.project(&mut candidate.repaired);
                candidate.penalty = candidate
                    .x
                    .iter()
                    .zip(candidate.repaired.iter())
                    .fold(zero, |acc, (xi, ri)| acc + (*xi - *ri).abs());
                candidate.value = obj.eval(&candidate.repaired)?;

                if candidate.value < best_value {
                    best_value = candidate.value;
                    best_x.copy_from(&candidate.repaired);
                }
            }

            // Penalties are scaled by the range of the values in the
            // generation.
            let (min_value, max_value) = candidates.iter().fold(
                (candidates[0].value, candidates[0].value),
                |(min, max), candidate| (min.min(candidate.value), max.max(candidate.value)),
            );
            let value_range = max_value - min_value;
            for candidate in candidates.iter_mut() {
                candidate.fitness = candidate.value + candidate.penalty * value_range;
            }

            candidates.sort_by(|a, b| {
                a.fitness
                    .partial_cmp(&b.fitness)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            // Recombination.
            let xold = xmean.clone();
            let mut zmean = OVector::<F::Field, Dyn>::zeros_generic(dim, U1);
            xmean.fill(zero);
            for (w, candidate) in params.weights.iter().zip(candidates.iter()) {
                xmean.axpy(*w, &candidate.x, one);
                zmean.axpy(*w, &candidate.z, one);
            }

            // Cumulation of the evolution paths.
            ps *= one - cs;
            ps.axpy((cs * (two - cs) * mueff).sqrt(), &(&b * &zmean), one);

            let ps_norm = ps.norm();
            let hsig = ps_norm
                / (one - (one - cs).powi(2 * self.iter as i32)).sqrt()
                / chi_n
                < convert::<_, F::Field>(1.4) + two / convert::<_, F::Field>(n as f64 + 1.0);
            let hsig_value = if hsig { one } else { zero };

            pc *= one - cc;
            pc.axpy(
                hsig_value * (cc * (two - cc) * mueff).sqrt() / sigma,
                &(&xmean - &xold),
                one,
            );

            // Rank-one and rank-mu update of the covariance matrix.
            let old_weight = one - c1 - cmu + (one - hsig_value) * c1 * cc * (two - cc);
            c *= old_weight;
            c.ger(c1, &pc, &pc, one);
            for (w, candidate) in params.weights.iter().zip(candidates.iter()) {
                let y = (&candidate.x - &xold) / sigma;
                c.ger(cmu * *w, &y, &y, one);
            }

            // Step size adaptation.
            sigma *= ((cs / damps) * (ps_norm / chi_n - one)).exp();

            // Flat fitness, the step size is increased to escape.
            let quarter = (0.1 + lambda as f64 / 4.0) as usize;
            if candidates[0].fitness == candidates[quarter.min(lambda - 1)].fitness {
                sigma *= (convert::<_, F::Field>(0.2) + cs / damps).exp();
                debug!("flat fitness, sigma increased to {}", sigma);
            }

            // Decomposition of the covariance matrix, C = B D^2 B^T.
            c = (&c + c.transpose()) * convert::<_, F::Field>(0.5);
            let eigen = c.clone().symmetric_eigen();
            b = eigen.eigenvectors;
            d = eigen
                .eigenvalues
                .map(|e| e.max(convert(1e-20)).sqrt());

            let best_fitness = candidates[0].fitness;
            if history.len() == history_len {
                history.pop_front();
            }
            history.push_back(best_fitness);

            trace!(
                "generation {}: best fitness = {}, sigma = {}, mean = {:?}",
                self.iter,
                best_fitness,
                sigma,
                xmean.as_slice()
            );

            // Termination criteria.
            if self.iter >= max_iterations {
                debug!("maximum number of iterations reached");
                break;
            }

            if best_value <= stop_fitness {
                debug!("stop fitness reached");
                break;
            }

            let small_steps = (0..n).all(|i| sigma * pc[i].abs().max(c[(i, i)].sqrt()) < tol_x);
            if small_steps {
                debug!("step size below tolerance");
                break;
            }

            if self.iter > 2 {
                let (history_min, history_max) = history
                    .iter()
                    .fold((best_fitness, best_fitness), |(min, max), f| {
                        (min.min(*f), max.max(*f))
                    });
                let generation_worst = candidates[lambda - 1].fitness;
                if history_max.max(generation_worst) - history_min < tol_fun {
                    debug!("function values range below tolerance");
                    break;
                }
            }

            let (d_min, d_max) = d
                .iter()
                .fold((d[0], d[0]), |(min, max), di| (min.min(*di), max.max(*di)));
            if d_max > convert::<_, F::Field>(1e7) * d_min {
                debug!("covariance matrix is ill-conditioned");
                break;
            }
        }

        debug!(
            "CMA-ES finished after {} generations with f = {}",
            self.iter, best_value
        );

        x.copy_from(&best_x);
        Ok(obj.externalize(best_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::{dvector, DVector};

    use crate::core::GoalType;
    use crate::testing::*;

    fn run<F: Function<Field = f64>>(
        f: &F,
        dom: &Domain<f64>,
        options: CmaesOptions<F>,
        goal: GoalType,
        x: &mut DVector<f64>,
        max_evaluations: usize,
    ) -> (Result<f64, CmaesError>, usize) {
        let mut obj = Objective::with_max_evaluations(f, goal, max_evaluations);
        let mut optimizer = Cmaes::with_options(f, dom, options);
        let result = optimizer.optimize(&mut obj, dom, x);
        (result, obj.evaluations())
    }

    #[test]
    fn sphere() {
        let f = Sphere::new(3);
        let dom = f.domain();
        let eps = 1e-6;

        for x in f.initials() {
            let optimizer = Cmaes::new(&f, &dom);
            optimize(&f, &dom, optimizer, x, 0.0, 100000, eps)
                .expect("optimization failed");
        }
    }

    #[test]
    fn known_optimum() {
        let f = ShiftedSphere::new(3, 3.0);
        let dom = f.domain();
        let mut x = dvector![0.0, 0.0, 0.0];

        let (result, evaluations) = run(
            &f,
            &dom,
            CmaesOptions::default(),
            GoalType::Minimize,
            &mut x,
            100000,
        );
        let fx = result.unwrap();

        assert!(fx <= 1e-10);
        assert!(evaluations < 100000);
        for xi in x.iter() {
            approx::assert_abs_diff_eq!(*xi, 3.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn rosenbrock() {
        let f = ExtendedRosenbrock::new(2);
        let dom = f.domain();
        let mut options = CmaesOptions::default();
        options.set_sigma_init(SigmaInit::Fixed(0.5));

        let mut x = dvector![-1.2, 1.0];
        let (result, _) = run(&f, &dom, options, GoalType::Minimize, &mut x, 100000);

        assert!(result.unwrap() <= 1e-8);
        assert!(f.is_optimum(&x, 1e-3));
    }

    #[test]
    fn optimum_on_bound() {
        let f = ShiftedSphere::new(2, 3.0);
        let dom = Domain::rect(vec![-1.0, -1.0], vec![1.0, 2.0]);
        let mut options = CmaesOptions::default();
        options.set_check_feasible_count(3);

        let mut x = dvector![0.0, 0.0];
        let (result, _) = run(&f, &dom, options, GoalType::Minimize, &mut x, 100000);

        approx::assert_abs_diff_eq!(result.unwrap(), 5.0, epsilon = 1e-6);
        assert!(dom.contains(&x));
        approx::assert_abs_diff_eq!(x, dvector![1.0, 2.0], epsilon = 1e-3);
    }

    #[test]
    fn same_seed_same_result() {
        let f = Rastrigin::new(2);
        let dom = f.domain();
        let mut options = CmaesOptions::default();
        options.set_seed(7).set_max_iterations(50);

        let mut x1 = dvector![2.0, -3.0];
        let mut x2 = x1.clone();
        let (r1, e1) = run(&f, &dom, options.clone(), GoalType::Minimize, &mut x1, 10000);
        let (r2, e2) = run(&f, &dom, options, GoalType::Minimize, &mut x2, 10000);

        assert_eq!(r1.unwrap(), r2.unwrap());
        assert_eq!(e1, e2);
        assert_eq!(x1, x2);
    }

    #[test]
    fn reset_repeats_run() {
        let f = Rastrigin::new(2);
        let dom = f.domain();
        let mut options = CmaesOptions::default();
        options.set_max_iterations(20);
        let mut optimizer = Cmaes::with_options(&f, &dom, options);

        let mut x1 = dvector![2.0, -3.0];
        let mut obj = Objective::new(&f, GoalType::Minimize);
        let r1 = optimizer.optimize(&mut obj, &dom, &mut x1).unwrap();
        assert_eq!(optimizer.iterations(), 20);

        optimizer.reset();
        assert_eq!(optimizer.iterations(), 0);

        let mut x2 = dvector![2.0, -3.0];
        let mut obj = Objective::new(&f, GoalType::Minimize);
        let r2 = optimizer.optimize(&mut obj, &dom, &mut x2).unwrap();

        assert_eq!(r1, r2);
        assert_eq!(x1, x2);
    }

    #[test]
    fn maximize_negated() {
        let f = ShiftedSphere::new(2, 1.0);
        let g = Negated(f);
        let dom = f.domain();

        let mut x_min = dvector![-4.0, 4.0];
        let mut x_max = x_min.clone();

        let (min, _) = run(
            &f,
            &dom,
            CmaesOptions::default(),
            GoalType::Minimize,
            &mut x_min,
            100000,
        );
        let (max, _) = run(
            &g,
            &dom,
            CmaesOptions::default(),
            GoalType::Maximize,
            &mut x_max,
            100000,
        );

        assert_eq!(min.unwrap(), -max.unwrap());
        assert_eq!(x_min, x_max);
    }

    #[test]
    fn budget_exhausted() {
        let f = ExtendedRosenbrock::new(4);
        let dom = f.domain();
        let mut x = dvector![-1.2, 1.0, -1.2, 1.0];

        let (result, evaluations) = run(
            &f,
            &dom,
            CmaesOptions::default(),
            GoalType::Minimize,
            &mut x,
            30,
        );

        assert!(matches!(
            result,
            Err(CmaesError::Evaluation(EvaluationError::TooManyEvaluations(30)))
        ));
        assert_eq!(evaluations, 30);
    }

    #[test]
    fn invalid_configuration() {
        let f = Sphere::new(2);
        let dom = f.domain();

        let mut options = CmaesOptions::default();
        options.set_population_size(PopulationSize::Fixed(1));
        let mut x = dvector![1.0, 1.0];
        let (result, evaluations) =
            run(&f, &dom, options, GoalType::Minimize, &mut x, 1000);
        assert!(matches!(result, Err(CmaesError::InvalidPopulationSize(1))));
        assert_eq!(evaluations, 0);

        let mut options = CmaesOptions::default();
        options.set_sigma_init(SigmaInit::Fixed(-1.0));
        let (result, _) = run(&f, &dom, options, GoalType::Minimize, &mut x, 1000);
        assert!(matches!(result, Err(CmaesError::InvalidSigma)));

        let mut x = dvector![1.0, 1.0, 1.0];
        let (result, _) = run(
            &f,
            &dom,
            CmaesOptions::default(),
            GoalType::Minimize,
            &mut x,
            1000,
        );
        assert!(matches!(
            result,
            Err(CmaesError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn initial_point_out_of_bounds() {
        let f = ShiftedSphere::new(2, 1.0);
        let dom = Domain::rect(vec![-1.0, -1.0], vec![1.0, 1.0]);
        let mut x = dvector![0.5, 1.5];

        let (result, evaluations) = run(
            &f,
            &dom,
            CmaesOptions::default(),
            GoalType::Minimize,
            &mut x,
            1000,
        );

        assert!(matches!(
            result,
            Err(CmaesError::InitialOutOfBounds { index: 1 })
        ));
        assert_eq!(evaluations, 0);
        assert_eq!(x, dvector![0.5, 1.5]);
    }

    #[test]
    fn sigma_estimated_from_bounds() {
        let dom = Domain::rect(vec![-1.0, 0.0], vec![1.0, 10.0]);
        approx::assert_relative_eq!(estimate_sigma(&dom), 0.6);

        let dom = Domain::<f64>::unconstrained(2);
        assert_eq!(estimate_sigma(&dom), 1.0);

        let dom = Domain::<f64>::unconstrained(2).with_scale(vec![0.01, 0.1]);
        approx::assert_relative_eq!(estimate_sigma(&dom), 100.0);
    }

    #[test]
    fn recommended_population_size() {
        assert_eq!(PopulationSize::Recommended.count(2), 6);
        assert_eq!(PopulationSize::Recommended.count(10), 10);
        assert_eq!(PopulationSize::Fixed(20).count(10), 20);
    }
}
