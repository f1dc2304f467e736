#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_arguments)]
#![warn(missing_docs)]

//! # dfopt
//!
//! A pure Rust framework and implementation of derivative-free methods for
//! bound-constrained optimization.
//!
//! The library is meant for minimizing (or maximizing) functions of several
//! variables whose derivatives are not available, for example because the
//! function is a result of a simulation or it is expensive to evaluate. Bound
//! constraints for variables are supported first-class, which is useful for
//! engineering applications. All optimizers implement the same interface and
//! all function evaluations go through an objective wrapper that respects the
//! evaluations budget.
//!
//! ## Algorithms
//!
//! * [BOBYQA](algo::bobyqa) -- Recommended method for smooth functions. It
//!   builds a quadratic model of the function from interpolation points and
//!   needs relatively few evaluations.
//! * [CMA-ES](algo::cmaes) -- Evolution strategy for rugged, noisy or
//!   multimodal functions, at the cost of more evaluations.
//!
//! ## Problem
//!
//! The problem of bound-constrained optimization is about finding values of
//! *n* variables for which a scalar function is minimal (or maximal).
//!
//! Mathematically, the problem is formulated as
//!
//! ```text
//! min f(x),
//!
//! where x = { x1, ..., xn }
//! and Li <= xi <= Ui for some bounds [L, U] for every i
//! ```
//!
//! The bounds can be negative/positive infinity, effectively making the
//! variable unconstrained.
//!
//! When it comes to code, the problem is any type that implements the
//! [`Function`] and [`Problem`] traits.
//!
//! ```rust
//! // dfopt is based on `nalgebra` crate.
//! use dfopt::nalgebra as na;
//! use dfopt::{Domain, Function, Problem};
//! use na::{Dyn, IsContiguous};
//!
//! // A problem is represented by a type.
//! struct Rosenbrock {
//!     a: f64,
//!     b: f64,
//! }
//!
//! impl Problem for Rosenbrock {
//!     // The numeric type. Usually f64 or f32.
//!     type Field = f64;
//!
//!     // Specification for the domain. At the very least, the dimension
//!     // must be known.
//!     fn domain(&self) -> Domain<Self::Field> {
//!         Domain::unconstrained(2)
//!     }
//! }
//!
//! impl Function for Rosenbrock {
//!     // Evaluate the function in a trial point.
//!     fn apply<Sx>(&self, x: &na::Vector<Self::Field, Dyn, Sx>) -> Self::Field
//!     where
//!         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
//!     {
//!         (self.a - x[0]).powi(2) + self.b * (x[1] - x[0].powi(2)).powi(2)
//!     }
//! }
//! ```
//!
//! And that's it. There is no need for defining gradient vector or Hessian
//! matrix, all the algorithms are derivative-free by definition.
//!
//! The previous example used unconstrained variables, but it is also possible
//! to specify bounds.
//!
//! ```rust
//! # use dfopt::nalgebra as na;
//! # use dfopt::*;
//! #
//! # struct Rosenbrock {
//! #     a: f64,
//! #     b: f64,
//! # }
//! #
//! impl Problem for Rosenbrock {
//! #     type Field = f64;
//!     // ...
//!
//!     fn domain(&self) -> Domain<Self::Field> {
//!         [(-10.0, 10.0), (-10.0, 10.0)].into_iter().collect()
//!     }
//! }
//! ```
//!
//! ## Optimizing
//!
//! When you have your function available, you can use the [`OptimizerDriver`]
//! to run the optimization until the algorithm's termination criteria are met
//! or the evaluations budget is exhausted.
//!
//! ```rust
//! use dfopt::OptimizerDriver;
//! # use dfopt::nalgebra as na;
//! # use dfopt::{Domain, Function, Problem};
//! # use na::{Dyn, IsContiguous};
//! #
//! # struct Rosenbrock {
//! #     a: f64,
//! #     b: f64,
//! # }
//! #
//! # impl Problem for Rosenbrock {
//! #     type Field = f64;
//! #
//! #     fn domain(&self) -> Domain<Self::Field> {
//! #         Domain::unconstrained(2)
//! #     }
//! # }
//! #
//! # impl Function for Rosenbrock {
//! #     fn apply<Sx>(&self, x: &na::Vector<Self::Field, Dyn, Sx>) -> Self::Field
//! #     where
//! #         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
//! #     {
//! #         (self.a - x[0]).powi(2) + self.b * (x[1] - x[0].powi(2)).powi(2)
//! #     }
//! # }
//!
//! let f = Rosenbrock { a: 1.0, b: 1.0 };
//! let mut optimizer = OptimizerDriver::builder(&f)
//!     .with_initial(vec![-10.0, -5.0])
//!     .with_max_evaluations(10_000)
//!     .build();
//!
//! let (x, fx) = optimizer.optimize().expect("optimizer encountered an error");
//!
//! println!("f({:?}) = {}", x, fx);
//! println!("evaluations: {}", optimizer.evaluations());
//! ```
//!
//! ## License
//!
//! Licensed under MIT.

pub mod algo;
mod core;
pub mod driver;

pub use core::*;
pub use driver::OptimizerDriver;

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
