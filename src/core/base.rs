use nalgebra::RealField;

use super::domain::Domain;

/// The base trait for [`Function`](super::function::Function).
pub trait Problem {
    /// Type of the field, usually f64 or f32.
    type Field: RealField + Copy;

    /// Gets the domain (bound constraints) of the problem.
    fn domain(&self) -> Domain<Self::Field>;
}

/// Direction of the optimization.
///
/// The algorithms always minimize internally. For [`GoalType::Maximize`], the
/// function values are negated on the way in and the final value is negated
/// back on the way out (see [`Objective`](super::objective::Objective)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoalType {
    /// Search for a minimum.
    #[default]
    Minimize,
    /// Search for a maximum.
    Maximize,
}

impl GoalType {
    /// Returns `true` if the goal is [`GoalType::Minimize`].
    pub fn is_minimize(&self) -> bool {
        matches!(self, GoalType::Minimize)
    }
}
