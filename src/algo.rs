//! The collection of implemented algorithms.

pub mod bobyqa;
pub mod cmaes;

pub use bobyqa::Bobyqa;
pub use cmaes::Cmaes;
