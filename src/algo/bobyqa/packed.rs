use std::ops::{Index, IndexMut};

use nalgebra::{storage::Storage, Dyn, OVector, RealField, Vector, U1};

/// Symmetric matrix storing only its upper triangle, packed column by column.
///
/// Element `(i, j)` with `i <= j` lives at `j (j + 1) / 2 + i`, so the storage
/// holds `n (n + 1) / 2` values.
#[derive(Debug, Clone)]
pub(super) struct PackedSymmetric<T: RealField + Copy> {
    n: usize,
    data: OVector<T, Dyn>,
}

impl<T: RealField + Copy> PackedSymmetric<T> {
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: OVector::zeros_generic(Dyn(n * (n + 1) / 2), U1),
        }
    }

    #[inline]
    fn index_of(i: usize, j: usize) -> usize {
        let (i, j) = if i <= j { (i, j) } else { (j, i) };
        j * (j + 1) / 2 + i
    }

    pub fn fill_zero(&mut self) {
        self.data.fill(T::zero());
    }

    /// Accumulates the product of the matrix with `s` into `out`.
    pub fn mul_acc<Ss, So>(&self, s: &Vector<T, Dyn, Ss>, out: &mut Vector<T, Dyn, So>)
    where
        Ss: Storage<T, Dyn>,
        So: nalgebra::storage::StorageMut<T, Dyn>,
    {
        let mut ih = 0;
        for j in 0..self.n {
            for i in 0..=j {
                let h = self.data[ih];
                if i < j {
                    out[j] += h * s[i];
                }
                out[i] += h * s[j];
                ih += 1;
            }
        }
    }

    /// Computes `0.5 s^T H s`.
    pub fn half_quadratic_form<Ss>(&self, s: &Vector<T, Dyn, Ss>) -> T
    where
        Ss: Storage<T, Dyn>,
    {
        let half: T = nalgebra::convert(0.5);
        let mut sum = T::zero();
        let mut ih = 0;
        for j in 0..self.n {
            for i in 0..=j {
                let mut temp = s[i] * s[j];
                if i == j {
                    temp *= half;
                }
                sum += self.data[ih] * temp;
                ih += 1;
            }
        }
        sum
    }

    /// Performs the rank-one update `H += alpha v v^T`.
    pub fn add_outer<Sv>(&mut self, alpha: T, v: &Vector<T, Dyn, Sv>)
    where
        Sv: Storage<T, Dyn>,
    {
        let mut ih = 0;
        for i in 0..self.n {
            let temp = alpha * v[i];
            for j in 0..=i {
                self.data[ih] += temp * v[j];
                ih += 1;
            }
        }
    }

    /// Performs the symmetric rank-two update `H += u v^T + v u^T`.
    pub fn add_sym_outer<Su, Sv>(&mut self, u: &Vector<T, Dyn, Su>, v: &Vector<T, Dyn, Sv>)
    where
        Su: Storage<T, Dyn>,
        Sv: Storage<T, Dyn>,
    {
        let mut ih = 0;
        for j in 0..self.n {
            for i in 0..=j {
                self.data[ih] += u[i] * v[j] + v[i] * u[j];
                ih += 1;
            }
        }
    }
}

impl<T: RealField + Copy> Index<(usize, usize)> for PackedSymmetric<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        &self.data[Self::index_of(i, j)]
    }
}

impl<T: RealField + Copy> IndexMut<(usize, usize)> for PackedSymmetric<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        &mut self.data[Self::index_of(i, j)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::{dvector, DMatrix};

    fn dense(h: &PackedSymmetric<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(h.n, h.n, |i, j| h[(i, j)])
    }

    #[test]
    fn index_is_symmetric() {
        let mut h = PackedSymmetric::<f64>::zeros(3);
        h[(2, 0)] = 4.0;
        h[(1, 1)] = 2.0;

        assert_eq!(h[(0, 2)], 4.0);
        assert_eq!(h.data[PackedSymmetric::<f64>::index_of(1, 1)], 2.0);
        assert_eq!(h.data.len(), 6);
    }

    #[test]
    fn products_agree_with_dense() {
        let mut h = PackedSymmetric::<f64>::zeros(3);
        h.add_outer(2.0, &dvector![1.0, -1.0, 3.0]);
        h.add_sym_outer(&dvector![0.5, 0.0, 1.0], &dvector![2.0, 1.0, -1.0]);

        let s = dvector![0.3, -0.7, 1.1];
        let full = dense(&h);

        let mut hs = dvector![0.0, 0.0, 0.0];
        h.mul_acc(&s, &mut hs);

        approx::assert_relative_eq!(hs, &full * &s, epsilon = 1e-12);
        approx::assert_relative_eq!(
            h.half_quadratic_form(&s),
            0.5 * s.dot(&(&full * &s)),
            epsilon = 1e-12
        );
    }
}
