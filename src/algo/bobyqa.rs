//! BOBYQA (Bound Optimization BY Quadratic Approximation) optimization method.
//!
//! [BOBYQA](https://www.damtp.cam.ac.uk/user/na/NA_papers/NA2009_06.pdf) is a
//! derivative-free trust region method for minimizing a function subject to
//! bound constraints. It maintains a quadratic model of the function which
//! interpolates the function values in a set of _npt_ points, where _n + 2 <=
//! npt <= (n + 1) (n + 2) / 2_. The model is updated by the least Frobenius
//! norm of the change of its second derivative matrix, so that only one
//! function evaluation is needed in each iteration.
//!
//! The method is suitable for problems of moderate dimensionality where the
//! function is relatively expensive to evaluate and smooth. The dimension of
//! the problem must be at least two.
//!
//! # References
//!
//! \[1\] [The BOBYQA algorithm for bound constrained optimization without
//! derivatives](https://www.damtp.cam.ac.uk/user/na/NA_papers/NA2009_06.pdf)
//!
//! \[2\] [The NEWUOA software for unconstrained optimization without
//! derivatives](https://link.springer.com/chapter/10.1007/0-387-30065-1_16)
//!
//! \[3\] [Least Frobenius norm updating of quadratic models that satisfy
//! interpolation conditions](https://link.springer.com/article/10.1007/s10107-003-0490-7)

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::{convert, storage::StorageMut, Dyn, IsContiguous, Vector};
use thiserror::Error;

use crate::core::{Domain, EvaluationError, Function, Objective, Optimizer, Problem};

mod altmov;
mod bobyqb;
mod model;
mod packed;
mod prelim;
mod trsbox;
mod update;

use model::Model;

/// Minimal dimension of the problem supported by [`Bobyqa`].
pub const MINIMUM_DIMENSION: usize = 2;

/// Number of interpolation points used by [`Bobyqa`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationPoints {
    /// Fixed number of points. It must lie in the interval _[n + 2, (n + 1) (n
    /// + 2) / 2]_.
    Fixed(usize),
    /// The choice of _2n + 1_ points recommended by the author of the method.
    #[default]
    Recommended,
}

impl InterpolationPoints {
    /// Gets the number of interpolation points for given dimension.
    pub fn count(&self, dim: usize) -> usize {
        match self {
            InterpolationPoints::Fixed(npt) => *npt,
            InterpolationPoints::Recommended => 2 * dim + 1,
        }
    }
}

/// Options for [`Bobyqa`] optimizer.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct BobyqaOptions<P: Problem> {
    /// Number of interpolation points. Default: _2n + 1_ (see
    /// [`InterpolationPoints`]).
    interpolation_points: InterpolationPoints,
    /// Initial trust region radius. It is reduced to one third of the smallest
    /// width of the domain if the width is not at least twice the radius.
    /// Default: `10`.
    initial_radius: P::Field,
    /// Trust region radius at which the optimization stops. Default: `1e-8`.
    stopping_radius: P::Field,
}

impl<P: Problem> Default for BobyqaOptions<P> {
    fn default() -> Self {
        Self {
            interpolation_points: InterpolationPoints::Recommended,
            initial_radius: convert(10.0),
            stopping_radius: convert(1e-8),
        }
    }
}

/// BOBYQA optimizer.
///
/// See [module](self) documentation for more details.
pub struct Bobyqa<P: Problem> {
    options: BobyqaOptions<P>,
}

impl<P: Problem> Bobyqa<P> {
    /// Initializes BOBYQA optimizer with default options.
    pub fn new(p: &P, dom: &Domain<P::Field>) -> Self {
        Self::with_options(p, dom, BobyqaOptions::default())
    }

    /// Initializes BOBYQA optimizer with given options.
    pub fn with_options(_: &P, _: &Domain<P::Field>, options: BobyqaOptions<P>) -> Self {
        Self { options }
    }

    /// Gets the options of the optimizer.
    pub fn options(&self) -> &BobyqaOptions<P> {
        &self.options
    }
}

/// Error returned from [`Bobyqa`] optimizer.
#[derive(Debug, Error)]
pub enum BobyqaError {
    /// Dimension of the problem is lower than the method supports.
    #[error("dimension {dim} is too small, at least {min} is required")]
    DimensionTooSmall {
        /// Dimension of the problem.
        dim: usize,
        /// Minimal supported dimension.
        min: usize,
    },
    /// Number of interpolation points is out of the valid interval.
    #[error("number of interpolation points {npt} is out of range [{min}, {max}]")]
    InterpolationPointsOutOfRange {
        /// Requested number of interpolation points.
        npt: usize,
        /// Lower bound of the interval.
        min: usize,
        /// Upper bound of the interval.
        max: usize,
    },
    /// Trust region radii are not positive and ordered.
    #[error("trust region radii must satisfy 0 < stopping radius <= initial radius < infinity")]
    InvalidRadius,
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
    /// A trust region step failed to reduce the quadratic model, which
    /// indicates an inconsistent model.
    #[error("trust region step failed to reduce the quadratic model")]
    TrustRegionStepFailed,
    /// Error when evaluating the objective function.
    #[error("{0}")]
    Evaluation(#[from] EvaluationError),
}

impl<F: Function> Optimizer<F> for Bobyqa<F> {
    const NAME: &'static str = "BOBYQA";

    type Error = BobyqaError;

    fn optimize<Sx>(
        &mut self,
        obj: &mut Objective<'_, F>,
        dom: &Domain<F::Field>,
        x: &mut Vector<F::Field, Dyn, Sx>,
    ) -> Result<F::Field, Self::Error>
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous,
    {
        let BobyqaOptions {
            interpolation_points,
            initial_radius,
            stopping_radius,
        } = self.options;

        let n = dom.dim();

        if x.nrows() != n {
            return Err(BobyqaError::DimensionMismatch {
                expected: n,
                actual: x.nrows(),
            });
        }

        let zero: F::Field = convert(0.0);
        let infinity: F::Field = convert(f64::INFINITY);
        if !(zero < stopping_radius
            && stopping_radius <= initial_radius
            && initial_radius < infinity)
        {
            return Err(BobyqaError::InvalidRadius);
        }

        let npt = interpolation_points.count(n);
        let (mut model, rhobeg) = Model::setup(dom, npt, initial_radius)?;

        if let Some(index) = (0..n).find(|&i| !(x[i] >= dom.lower()[i] && x[i] <= dom.upper()[i]))
        {
            return Err(BobyqaError::InitialOutOfBounds { index });
        }

        model.adjust_start(dom, x, rhobeg);

        debug!(
            "starting BOBYQA with n = {}, npt = {}, rhobeg = {}, rhoend = {}",
            n, npt, rhobeg, stopping_radius
        );

        let f = model.bobyqb(obj, dom, x, rhobeg, stopping_radius)?;

        debug!(
            "BOBYQA finished after {} evaluations with f = {}",
            obj.evaluations(),
            f
        );

        Ok(obj.externalize(f))
    }
}
