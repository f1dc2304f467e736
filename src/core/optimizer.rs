use nalgebra::{storage::StorageMut, Dyn, IsContiguous, Vector};

use super::{domain::Domain, function::Function, objective::Objective};

/// Interface of an optimizer.
///
/// An optimizer is an algorithm which takes a starting point _x_ and runs the
/// whole optimization process until its own termination criteria are met or
/// the evaluations budget of the [`Objective`] is exhausted.
///
/// ## Implementing an optimizer
///
/// Here is an implementation of a simple "optimizer" which evaluates the function
/// along coordinate axes and keeps the best point found.
///
/// ```rust
/// use dfopt::nalgebra as na;
/// use dfopt::{Domain, EvaluationError, Function, Objective, Optimizer};
/// use na::{storage::StorageMut, Dyn, IsContiguous, Vector};
///
/// struct Axes {
///     step: f64,
/// }
///
/// impl<F: Function<Field = f64>> Optimizer<F> for Axes {
///     const NAME: &'static str = "Axes";
///     type Error = EvaluationError;
///
///     fn optimize<Sx>(
///         &mut self,
///         obj: &mut Objective<'_, F>,
///         dom: &Domain<F::Field>,
///         x: &mut Vector<F::Field, Dyn, Sx>,
///     ) -> Result<F::Field, Self::Error>
///     where
///         Sx: StorageMut<F::Field, Dyn> + IsContiguous,
///     {
///         let mut best = obj.eval(x)?;
///         let mut trial = x.clone_owned();
///
///         for i in 0..dom.dim() {
///             for sign in [-1.0, 1.0] {
///                 trial.copy_from(x);
///                 trial[i] += sign * self.step;
///                 dom.project(&mut trial);
///
///                 let value = obj.eval(&trial)?;
///                 if value < best {
///                     best = value;
///                     x.copy_from(&trial);
///                 }
///             }
///         }
///
///         // The value must be returned in the sense of the goal.
///         Ok(obj.externalize(best))
///     }
/// }
/// ```
pub trait Optimizer<F: Function> {
    /// Name of the optimizer.
    const NAME: &'static str;

    /// Error while optimizing.
    type Error;

    /// Runs the optimization process.
    ///
    /// The value of `x` is the starting point. After the method returns
    /// successfully, `x` _must_ hold the best point found and the return value
    /// _must_ be the function value in that point, in the sense of the goal of
    /// the objective (i.e., not negated for maximization).
    ///
    /// All function evaluations _must_ go through the objective, so the
    /// evaluations budget is respected.
    fn optimize<Sx>(
        &mut self,
        obj: &mut Objective<'_, F>,
        dom: &Domain<F::Field>,
        x: &mut Vector<F::Field, Dyn, Sx>,
    ) -> Result<F::Field, Self::Error>
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous;
}
