//! Core abstractions and types for dfopt.
//!
//! *Users* are mainly interested in implementing the [`Function`] and
//! [`Problem`] traits, specifying the [domain](Domain) of the problem.
//!
//! Algorithms *developers* are interested in implementing the [`Optimizer`]
//! trait and evaluating the function through the [`Objective`] wrapper, which
//! takes care of the evaluation budget and the optimization goal.

mod base;
mod domain;
mod function;
mod objective;
mod optimizer;

pub use base::*;
pub use domain::*;
pub use function::*;
pub use objective::*;
pub use optimizer::*;
