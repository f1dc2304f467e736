//! Objective function wrapper shared by all optimizers.
//!
//! The wrapper is responsible for the bookkeeping that is not specific to
//! any algorithm: counting the evaluations against the budget and flipping the
//! sign of the values when the goal is to maximize.

use log::debug;
use nalgebra::{storage::Storage, Dyn, IsContiguous, Vector};
use thiserror::Error;

use super::{base::GoalType, function::Function};

/// Error raised by the [`Objective`] during an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// The evaluation budget was exhausted.
    #[error("maximal count ({0}) of objective function evaluations exceeded")]
    TooManyEvaluations(usize),
}

/// Function evaluated in the sense of minimization with a limited budget of
/// evaluations.
pub struct Objective<'f, F: Function> {
    f: &'f F,
    goal: GoalType,
    evaluations: usize,
    max_evaluations: usize,
}

impl<'f, F: Function> Objective<'f, F> {
    /// Wraps the function with unlimited evaluations budget.
    pub fn new(f: &'f F, goal: GoalType) -> Self {
        Self::with_max_evaluations(f, goal, usize::MAX)
    }

    /// Wraps the function with given evaluations budget.
    pub fn with_max_evaluations(f: &'f F, goal: GoalType, max_evaluations: usize) -> Self {
        Self {
            f,
            goal,
            evaluations: 0,
            max_evaluations,
        }
    }

    /// Evaluates the function in given point.
    ///
    /// The returned value is negated if the goal is
    /// [`GoalType::Maximize`], so the caller always minimizes. Exceeding the
    /// budget is reported as [`EvaluationError::TooManyEvaluations`] and no
    /// evaluation takes place.
    pub fn eval<Sx>(&mut self, x: &Vector<F::Field, Dyn, Sx>) -> Result<F::Field, EvaluationError>
    where
        Sx: Storage<F::Field, Dyn> + IsContiguous,
    {
        if self.evaluations >= self.max_evaluations {
            debug!("evaluations budget ({}) exhausted", self.max_evaluations);
            return Err(EvaluationError::TooManyEvaluations(self.max_evaluations));
        }

        self.evaluations += 1;
        Ok(self.internalize(self.f.apply(x)))
    }

    /// Converts a value in the sense of the goal into the sense of
    /// minimization used internally.
    pub fn internalize(&self, value: F::Field) -> F::Field {
        match self.goal {
            GoalType::Minimize => value,
            GoalType::Maximize => -value,
        }
    }

    /// Converts an internal (minimization) value back into the sense of the
    /// goal.
    pub fn externalize(&self, value: F::Field) -> F::Field {
        // Negation is an involution.
        self.internalize(value)
    }

    /// Gets the wrapped function.
    pub fn function(&self) -> &'f F {
        self.f
    }

    /// Gets the goal of the optimization.
    pub fn goal(&self) -> GoalType {
        self.goal
    }

    /// Gets the number of evaluations performed so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Gets the evaluations budget.
    pub fn max_evaluations(&self) -> usize {
        self.max_evaluations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::Sphere;

    #[test]
    fn counts_evaluations_until_budget() {
        let f = Sphere::new(2);
        let mut obj = Objective::with_max_evaluations(&f, GoalType::Minimize, 2);
        let x = nalgebra::dvector![1.0, 2.0];

        assert_eq!(obj.eval(&x), Ok(5.0));
        assert_eq!(obj.eval(&x), Ok(5.0));
        assert_eq!(obj.eval(&x), Err(EvaluationError::TooManyEvaluations(2)));
        assert_eq!(obj.evaluations(), 2);
        assert_eq!(obj.max_evaluations(), 2);
        assert!(obj.goal().is_minimize());
    }

    #[test]
    fn maximize_negates_values() {
        let f = Sphere::new(2);
        let mut obj = Objective::new(&f, GoalType::Maximize);
        let x = nalgebra::dvector![1.0, 2.0];

        let value = obj.eval(&x).unwrap();
        assert_eq!(value, -5.0);
        assert_eq!(obj.externalize(value), 5.0);
    }
}
