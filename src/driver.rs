//! High-level API for optimization.
//!
//! This module contains the driver that encapsulates all internal state and
//! provides a simple API to run the optimization process.
//!
//! The simplest way of using the driver is to initialize it with the defaults:
//!
//! ```rust
//! use dfopt::OptimizerDriver;
//! # use dfopt::{Domain, Problem};
//! #
//! # struct MyFunction;
//! #
//! # impl MyFunction {
//! #     fn new() -> Self {
//! #         Self
//! #     }
//! # }
//! #
//! # impl Problem for MyFunction {
//! #     type Field = f64;
//! #
//! #     fn domain(&self) -> Domain<Self::Field> {
//! #         Domain::unconstrained(2)
//! #     }
//! # }
//!
//! let f = MyFunction::new();
//!
//! let mut optimizer = OptimizerDriver::new(&f);
//! ```
//!
//! If you need to specify additional settings, use the builder:
//!
//! ```rust
//! use dfopt::{GoalType, OptimizerDriver};
//! # use dfopt::{Domain, Problem};
//! #
//! # struct MyFunction;
//! #
//! # impl MyFunction {
//! #     fn new() -> Self {
//! #         Self
//! #     }
//! # }
//! #
//! # impl Problem for MyFunction {
//! #     type Field = f64;
//! #
//! #     fn domain(&self) -> Domain<Self::Field> {
//! #         Domain::unconstrained(2)
//! #     }
//! # }
//!
//! let f = MyFunction::new();
//!
//! let mut optimizer = OptimizerDriver::builder(&f)
//!     .with_initial(vec![10.0, -10.0])
//!     .with_goal(GoalType::Maximize)
//!     .with_max_evaluations(1000)
//!     .with_algo(dfopt::algo::Cmaes::new)
//!     .build();
//! ```
//!
//! Once you have the optimizer, you can run it:
//!
//! ```rust
//! # use dfopt::nalgebra as na;
//! # use dfopt::{Domain, Function, OptimizerDriver, Problem};
//! # use na::{Dyn, IsContiguous};
//! #
//! # struct MyFunction;
//! #
//! # impl MyFunction {
//! #     fn new() -> Self {
//! #         Self
//! #     }
//! # }
//! #
//! # impl Problem for MyFunction {
//! #     type Field = f64;
//! #
//! #     fn domain(&self) -> Domain<Self::Field> {
//! #         Domain::unconstrained(2)
//! #     }
//! # }
//! #
//! # impl Function for MyFunction {
//! #     fn apply<Sx>(&self, x: &na::Vector<Self::Field, Dyn, Sx>) -> Self::Field
//! #     where
//! #         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
//! #     {
//! #         (x[0] + x[1] - 1.0).powi(2) + (x[0] - x[1]).powi(2)
//! #     }
//! # }
//! #
//! # let f = MyFunction::new();
//! #
//! # let mut optimizer = OptimizerDriver::new(&f);
//! #
//! let (x, fx) = optimizer.optimize().expect("optimizer error");
//! println!("f({:?}) = {}", x, fx);
//! ```

use nalgebra::{convert, DimName, Dyn, OVector, U1};

use crate::{algo::Bobyqa, Domain, Function, GoalType, Objective, Optimizer, Problem};

/// Builder for the [`OptimizerDriver`].
pub struct OptimizerBuilder<'a, F: Problem, A> {
    f: &'a F,
    dom: Domain<F::Field>,
    algo: A,
    x0: OVector<F::Field, Dyn>,
    goal: GoalType,
    max_evaluations: usize,
}

impl<'a, F: Problem> OptimizerBuilder<'a, F, Bobyqa<F>> {
    fn new(f: &'a F) -> Self {
        let dom = f.domain();
        let algo = Bobyqa::new(f, &dom);

        let dim = Dyn(dom.dim());
        let x0 = OVector::from_element_generic(dim, U1::name(), convert(0.0));

        Self {
            f,
            dom,
            algo,
            x0,
            goal: GoalType::Minimize,
            max_evaluations: usize::MAX,
        }
    }
}

impl<'a, F: Problem, A> OptimizerBuilder<'a, F, A> {
    /// Sets the initial point from which the optimization starts.
    ///
    /// The point is projected into the domain when the driver is built.
    pub fn with_initial(mut self, x0: Vec<F::Field>) -> Self {
        let dim = Dyn(self.dom.dim());
        self.x0 = OVector::from_vec_generic(dim, U1::name(), x0);
        self
    }

    /// Sets whether the function is minimized or maximized.
    pub fn with_goal(mut self, goal: GoalType) -> Self {
        self.goal = goal;
        self
    }

    /// Sets the maximal number of function evaluations.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Sets specific algorithm to be used.
    ///
    /// This builder method accepts a closure that takes the reference to the
    /// problem and its domain. For the algorithms in dfopt, you can simply
    /// pass the `new` constructor directly (e.g., `Cmaes::new`).
    pub fn with_algo<A2, FA>(self, factory: FA) -> OptimizerBuilder<'a, F, A2>
    where
        FA: FnOnce(&F, &Domain<F::Field>) -> A2,
    {
        let algo = factory(self.f, &self.dom);

        OptimizerBuilder {
            f: self.f,
            dom: self.dom,
            algo,
            x0: self.x0,
            goal: self.goal,
            max_evaluations: self.max_evaluations,
        }
    }

    /// Builds the [`OptimizerDriver`].
    pub fn build(self) -> OptimizerDriver<'a, F, A> {
        let Self {
            f,
            dom,
            algo,
            mut x0,
            goal,
            max_evaluations,
        } = self;

        dom.project(&mut x0);

        // Worst possible value in the sense of the goal.
        let fx = match goal {
            GoalType::Minimize => convert(f64::INFINITY),
            GoalType::Maximize => convert(f64::NEG_INFINITY),
        };

        OptimizerDriver {
            f,
            dom,
            algo,
            x: x0,
            fx,
            goal,
            max_evaluations,
            evaluations: 0,
        }
    }
}

/// The driver for the process of optimization.
///
/// For default settings, use [`OptimizerDriver::new`]. For more flexibility,
/// use [`OptimizerDriver::builder`]. For the usage of the driver, see
/// [module](self) documentation.
pub struct OptimizerDriver<'a, F: Problem, A> {
    f: &'a F,
    dom: Domain<F::Field>,
    algo: A,
    x: OVector<F::Field, Dyn>,
    fx: F::Field,
    goal: GoalType,
    max_evaluations: usize,
    evaluations: usize,
}

impl<'a, F: Problem> OptimizerDriver<'a, F, Bobyqa<F>> {
    /// Returns the builder for specifying additional settings.
    pub fn builder(f: &'a F) -> OptimizerBuilder<'a, F, Bobyqa<F>> {
        OptimizerBuilder::new(f)
    }

    /// Initializes the driver with the default settings.
    pub fn new(f: &'a F) -> Self {
        OptimizerDriver::builder(f).build()
    }
}

impl<'a, F: Problem, A> OptimizerDriver<'a, F, A> {
    /// Returns reference to the current point.
    pub fn x(&self) -> &[F::Field] {
        self.x.as_slice()
    }

    /// Returns the function value in the current point.
    ///
    /// Before the optimization, this is the worst possible value in the sense
    /// of the goal.
    pub fn fx(&self) -> F::Field {
        self.fx
    }

    /// Returns the number of function evaluations in the last optimization.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

impl<'a, F: Function, A: Optimizer<F>> OptimizerDriver<'a, F, A> {
    /// Runs the optimization from the current point, returning the best point
    /// and its function value in case of no error.
    ///
    /// Running the optimization again continues from the point found
    /// previously, with a fresh evaluations budget.
    pub fn optimize(&mut self) -> Result<(&[F::Field], F::Field), A::Error> {
        let mut obj = Objective::with_max_evaluations(self.f, self.goal, self.max_evaluations);
        let result = self.algo.optimize(&mut obj, &self.dom, &mut self.x);
        self.evaluations = obj.evaluations();

        self.fx = result?;
        Ok((self.x.as_slice(), self.fx))
    }

    /// Returns the name of the used optimizer.
    pub fn name(&self) -> &str {
        A::NAME
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        algo::{bobyqa::BobyqaError, Cmaes},
        testing::{ExtendedRosenbrock, Negated, ShiftedSphere, Sphere},
        EvaluationError,
    };

    use super::*;

    struct WithDomain(pub Domain<f64>);

    impl Problem for WithDomain {
        type Field = f64;

        fn domain(&self) -> Domain<Self::Field> {
            self.0.clone()
        }
    }

    #[test]
    fn basic_use_case() {
        let f = Sphere::new(4);
        let mut optimizer = OptimizerDriver::builder(&f)
            // Zeros are the optimum for sphere, there would be no point is
            // such test.
            .with_initial(vec![10.0; 4])
            .build();

        let tolerance = 1e-6;
        let (_, value) = optimizer.optimize().unwrap();

        assert!(value <= tolerance);
        assert_eq!(optimizer.fx(), value);
        assert!(optimizer.evaluations() > 0);
        assert_eq!(optimizer.name(), "BOBYQA");
    }

    #[test]
    fn custom_algo() {
        let f = Sphere::new(4);
        let mut optimizer = OptimizerDriver::builder(&f)
            .with_algo(Cmaes::new)
            .with_initial(vec![10.0; 4])
            .build();

        let tolerance = 1e-6;
        let (_, value) = optimizer.optimize().unwrap();

        assert!(value <= tolerance);
        assert_eq!(optimizer.name(), "CMA-ES");
    }

    #[test]
    fn initial() {
        let x0 = vec![10.0; 4];

        let f = Sphere::new(4);
        let optimizer = OptimizerDriver::builder(&f)
            .with_initial(x0.clone())
            .build();

        assert_eq!(optimizer.x(), &x0);
        assert_eq!(optimizer.fx(), f64::INFINITY);
        assert_eq!(optimizer.evaluations(), 0);
    }

    #[test]
    fn initial_in_domain() {
        let f = WithDomain(Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0]));
        let optimizer = OptimizerDriver::builder(&f)
            .with_initial(vec![10.0, -10.0])
            .build();

        assert_eq!(optimizer.x(), &[1.0, 0.0]);
    }

    #[test]
    fn default_initial_is_projected_origin() {
        let f = WithDomain(Domain::rect(vec![1.0, -2.0], vec![3.0, 2.0]));
        let optimizer = OptimizerDriver::new(&f);

        assert_eq!(optimizer.x(), &[1.0, 0.0]);
    }

    #[test]
    fn maximize() {
        let f = Negated(ShiftedSphere::new(2, 1.0));
        let mut optimizer = OptimizerDriver::builder(&f)
            .with_goal(GoalType::Maximize)
            .build();

        assert_eq!(optimizer.fx(), f64::NEG_INFINITY);

        let (x, value) = optimizer.optimize().unwrap();

        approx::assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(x[1], 1.0, epsilon = 1e-6);
        assert!(value <= 0.0 && value >= -1e-10);
    }

    #[test]
    fn budget_exhausted() {
        let f = ExtendedRosenbrock::new(2);
        let mut optimizer = OptimizerDriver::builder(&f)
            .with_initial(vec![-1.2, 1.0])
            .with_max_evaluations(10)
            .build();

        let result = optimizer.optimize();

        assert!(matches!(
            result,
            Err(BobyqaError::Evaluation(
                EvaluationError::TooManyEvaluations(10)
            ))
        ));
        assert_eq!(optimizer.evaluations(), 10);
    }
}
