//! Problem domain definition (dimensionality, bound constraints).

use std::iter::FromIterator;

use na::{Dim, DimName};
use nalgebra as na;
use nalgebra::{storage::Storage, storage::StorageMut, OVector, RealField, Vector};

/// Domain for a problem.
///
/// The domain is a box given by lower and upper bounds of every variable.
/// Positive and negative infinity are allowed and make the variable
/// unconstrained in the corresponding direction.
#[derive(Debug, Clone)]
pub struct Domain<T: RealField + Copy> {
    lower: OVector<T, na::Dyn>,
    upper: OVector<T, na::Dyn>,
    scale: Option<OVector<T, na::Dyn>>,
}

impl<T: RealField + Copy> Domain<T> {
    /// Creates unconstrained domain with given dimensionality.
    pub fn unconstrained(dim: usize) -> Self {
        assert!(dim > 0, "empty domain");

        let inf = T::from_subset(&f64::INFINITY);
        let n = na::Dyn(dim);
        let one = na::Const::<1>;

        Self {
            lower: OVector::from_iterator_generic(n, one, (0..dim).map(|_| -inf)),
            upper: OVector::from_iterator_generic(n, one, (0..dim).map(|_| inf)),
            scale: None,
        }
    }

    /// Creates rectangular domain with given lower and upper bounds.
    ///
    /// Positive and negative infinity can be used to indicate a value unbounded
    /// in that dimension and direction. If the entire domain is unconstrained,
    /// use [`Domain::unconstrained`] instead.
    pub fn rect(lower: Vec<T>, upper: Vec<T>) -> Self {
        assert!(
            lower.len() == upper.len(),
            "lower and upper have different size"
        );

        let dim = lower.len();
        assert!(dim > 0, "empty domain");

        let scale = lower
            .iter()
            .copied()
            .zip(upper.iter().copied())
            .map(|(l, u)| T::one() / estimate_magnitude_from_bounds(l, u));

        let dim = na::Dyn(dim);
        let scale = OVector::from_iterator_generic(dim, na::U1::name(), scale);
        let lower = OVector::from_iterator_generic(dim, na::U1::name(), lower);
        let upper = OVector::from_iterator_generic(dim, na::U1::name(), upper);

        Self {
            lower,
            upper,
            scale: Some(scale),
        }
    }

    /// Sets a custom scale for the domain.
    ///
    /// Scale of a variable is the inverse of its expected magnitude.
    pub fn with_scale(mut self, scale: Vec<T>) -> Self {
        assert!(
            scale.len() == self.lower.nrows(),
            "scale has invalid dimension"
        );

        let dim = na::Dyn(self.lower.nrows());
        let scale = OVector::from_iterator_generic(dim, na::U1::name(), scale);

        self.scale = Some(scale);
        self
    }

    /// Gets the dimensionality of the domain.
    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    /// Gets the lower bounds.
    pub fn lower(&self) -> &OVector<T, na::Dyn> {
        &self.lower
    }

    /// Gets the upper bounds.
    pub fn upper(&self) -> &OVector<T, na::Dyn> {
        &self.upper
    }

    /// Gets the scale if available.
    ///
    /// Scale can be either provided by [`Domain::with_scale`] or estimated for
    /// a constrained domain. If there is no reliable way to estimate the scale
    /// (for unconstrained problem), `None` is returned.
    pub fn scale(&self) -> Option<&OVector<T, na::Dyn>> {
        self.scale.as_ref()
    }

    /// Determines whether the point lies inside the domain (bounds included).
    pub fn contains<D, Sx>(&self, x: &Vector<T, D, Sx>) -> bool
    where
        D: Dim,
        Sx: Storage<T, D>,
    {
        self.lower
            .iter()
            .zip(self.upper.iter())
            .zip(x.iter())
            .all(|((li, ui), xi)| li <= xi && xi <= ui)
    }

    /// Projects given point into the domain.
    pub fn project<D, Sx>(&self, x: &mut Vector<T, D, Sx>) -> bool
    where
        D: Dim,
        Sx: StorageMut<T, D>,
    {
        let mut not_feasible = false;

        self.lower
            .iter()
            .zip(self.upper.iter())
            .zip(x.iter_mut())
            .for_each(|((li, ui), xi)| {
                if &*xi < li {
                    *xi = *li;
                    not_feasible = true;
                } else if &*xi > ui {
                    *xi = *ui;
                    not_feasible = true;
                }
            });

        not_feasible
    }

    /// Projects given point into the domain in given dimension.
    pub fn project_in<D, Sx>(&self, x: &mut Vector<T, D, Sx>, i: usize) -> bool
    where
        D: Dim,
        Sx: StorageMut<T, D>,
    {
        let li = self.lower[i];
        let ui = self.upper[i];
        let xi = &mut x[(i, 0)];

        if *xi < li {
            *xi = li;
            true
        } else if *xi > ui {
            *xi = ui;
            true
        } else {
            false
        }
    }
}

impl<T: RealField + Copy> FromIterator<(T, T)> for Domain<T> {
    fn from_iter<I: IntoIterator<Item = (T, T)>>(iter: I) -> Self {
        let (lower, upper): (Vec<_>, Vec<_>) = iter.into_iter().unzip();
        Self::rect(lower, upper)
    }
}

/// Estimates magnitude of the variable given lower and upper bounds.
pub fn estimate_magnitude_from_bounds<T: RealField + Copy>(lower: T, upper: T) -> T {
    let ten = T::from_subset(&10.0);
    let half = T::from_subset(&0.5);

    let avg = half * (lower.abs() + upper.abs());
    let magnitude = ten.powf(avg.abs().log10().trunc());

    // For [0, 0] range or infinite bounds, the computed magnitude is undefined.
    if magnitude.is_finite() && magnitude > T::zero() {
        magnitude
    } else {
        T::one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_clamps_into_bounds() {
        let dom = Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0]);
        let mut x = nalgebra::dvector![10.0, -10.0];

        assert!(dom.project(&mut x));
        assert_eq!(x.as_slice(), &[1.0, 0.0]);
        assert!(!dom.project(&mut x));
    }

    #[test]
    fn project_in_single_dimension() {
        let dom = Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0]);
        let mut x = nalgebra::dvector![10.0, -10.0];

        assert!(dom.project_in(&mut x, 1));
        assert_eq!(x.as_slice(), &[10.0, 0.0]);
    }

    #[test]
    fn contains_includes_bounds() {
        let dom: Domain<f64> = [(-1.0, 1.0), (0.0, 2.0)].into_iter().collect();

        assert!(dom.contains(&nalgebra::dvector![-1.0, 2.0]));
        assert!(!dom.contains(&nalgebra::dvector![-1.0, 2.5]));
    }

    #[test]
    fn unconstrained_has_no_scale() {
        let dom = Domain::<f64>::unconstrained(3);

        assert_eq!(dom.dim(), 3);
        assert!(dom.scale().is_none());
        assert!(dom.contains(&nalgebra::dvector![1e300, -1e300, 0.0]));
    }

    #[test]
    fn magnitude_from_bounds() {
        assert_eq!(estimate_magnitude_from_bounds(-100.0, 300.0), 100.0);
        assert_eq!(estimate_magnitude_from_bounds(0.0, 0.0), 1.0);
        assert_eq!(estimate_magnitude_from_bounds(f64::NEG_INFINITY, 1.0), 1.0);
    }
}
