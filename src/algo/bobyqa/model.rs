use nalgebra::{
    convert, storage::StorageMut, Dyn, IsContiguous, OMatrix, OVector, RealField, Vector, U1,
};

use crate::core::Domain;

use super::{packed::PackedSymmetric, BobyqaError, MINIMUM_DIMENSION};

/// Quadratic model of the objective and the interpolation set it is built
/// on.
///
/// All points are stored relative to `xbase`. `bmat` holds the last _n_
/// columns of the inverse of the interpolation system matrix and `zmat` is the
/// factor such that `zmat * zmat^T` equals its leading _npt x npt_ block.
pub(super) struct Model<T: RealField + Copy> {
    pub(super) n: usize,
    pub(super) npt: usize,
    pub(super) xbase: OVector<T, Dyn>,
    pub(super) xpt: OMatrix<T, Dyn, Dyn>,
    pub(super) fval: OVector<T, Dyn>,
    pub(super) xopt: OVector<T, Dyn>,
    pub(super) gopt: OVector<T, Dyn>,
    pub(super) hq: PackedSymmetric<T>,
    pub(super) pq: OVector<T, Dyn>,
    pub(super) bmat: OMatrix<T, Dyn, Dyn>,
    pub(super) zmat: OMatrix<T, Dyn, Dyn>,
    pub(super) sl: OVector<T, Dyn>,
    pub(super) su: OVector<T, Dyn>,
    pub(super) xnew: OVector<T, Dyn>,
    pub(super) xalt: OVector<T, Dyn>,
    pub(super) d: OVector<T, Dyn>,
    pub(super) vlag: OVector<T, Dyn>,
    pub(super) kopt: usize,
}

impl<T: RealField + Copy> Model<T> {
    /// Validates the dimension and the number of interpolation points and
    /// allocates the model.
    ///
    /// Returns the model together with the initial trust region radius, which
    /// is reduced if the domain is too narrow for it.
    pub(super) fn setup(
        dom: &Domain<T>,
        npt: usize,
        initial_radius: T,
    ) -> Result<(Self, T), BobyqaError> {
        let n = dom.dim();

        if n < MINIMUM_DIMENSION {
            return Err(BobyqaError::DimensionTooSmall {
                dim: n,
                min: MINIMUM_DIMENSION,
            });
        }

        let min = n + 2;
        let max = (n + 1) * (n + 2) / 2;

        if npt < min || npt > max {
            return Err(BobyqaError::InterpolationPointsOutOfRange { npt, min, max });
        }

        let min_diff = dom
            .lower()
            .iter()
            .zip(dom.upper().iter())
            .map(|(l, u)| *u - *l)
            .fold(convert::<_, T>(f64::INFINITY), |acc, diff| acc.min(diff));

        let two: T = convert(2.0);
        let rhobeg = if min_diff < two * initial_radius {
            min_diff / convert(3.0)
        } else {
            initial_radius
        };

        let dim = Dyn(n);
        let points = Dyn(npt);

        let model = Self {
            n,
            npt,
            xbase: OVector::zeros_generic(dim, U1),
            xpt: OMatrix::zeros_generic(points, dim),
            fval: OVector::zeros_generic(points, U1),
            xopt: OVector::zeros_generic(dim, U1),
            gopt: OVector::zeros_generic(dim, U1),
            hq: PackedSymmetric::zeros(n),
            pq: OVector::zeros_generic(points, U1),
            bmat: OMatrix::zeros_generic(Dyn(npt + n), dim),
            zmat: OMatrix::zeros_generic(points, Dyn(npt - n - 1)),
            sl: OVector::zeros_generic(dim, U1),
            su: OVector::zeros_generic(dim, U1),
            xnew: OVector::zeros_generic(dim, U1),
            xalt: OVector::zeros_generic(dim, U1),
            d: OVector::zeros_generic(dim, U1),
            vlag: OVector::zeros_generic(Dyn(npt + n), U1),
            kopt: 0,
        };

        Ok((model, rhobeg))
    }

    /// Moves the starting point so that it is either exactly on a bound or at
    /// least `rhobeg` away from it, and sets the bound differences
    /// accordingly.
    pub(super) fn adjust_start<Sx>(
        &mut self,
        dom: &Domain<T>,
        x: &mut Vector<T, Dyn, Sx>,
        rhobeg: T,
    ) where
        Sx: StorageMut<T, Dyn> + IsContiguous,
    {
        let zero = T::zero();

        for j in 0..self.n {
            let lower = dom.lower()[j];
            let upper = dom.upper()[j];
            let width = upper - lower;

            self.sl[j] = lower - x[j];
            self.su[j] = upper - x[j];

            if self.sl[j] >= -rhobeg {
                if self.sl[j] >= zero {
                    x[j] = lower;
                    self.sl[j] = zero;
                    self.su[j] = width;
                } else {
                    x[j] = lower + rhobeg;
                    self.sl[j] = -rhobeg;
                    self.su[j] = (upper - x[j]).max(rhobeg);
                }
            } else if self.su[j] <= rhobeg {
                if self.su[j] <= zero {
                    x[j] = upper;
                    self.sl[j] = -width;
                    self.su[j] = zero;
                } else {
                    x[j] = upper - rhobeg;
                    self.sl[j] = (lower - x[j]).min(-rhobeg);
                    self.su[j] = rhobeg;
                }
            }
        }
    }

    /// Writes `xbase + v` clamped into the domain to `x`. Components of `v`
    /// that are exactly at a bound difference are set exactly to the bound.
    pub(super) fn absolute_point<Sx>(
        &self,
        dom: &Domain<T>,
        v: impl Fn(usize) -> T,
        x: &mut Vector<T, Dyn, Sx>,
    ) where
        Sx: StorageMut<T, Dyn>,
    {
        for j in 0..self.n {
            let lower = dom.lower()[j];
            let upper = dom.upper()[j];
            let vj = v(j);

            x[j] = (self.xbase[j] + vj).max(lower).min(upper);

            if vj == self.sl[j] {
                x[j] = lower;
            }
            if vj == self.su[j] {
                x[j] = upper;
            }
        }
    }

    /// Computes the values of the Lagrange functions at `xopt + d` into
    /// `vlag` and returns the `beta` parameter of the updating formula.
    ///
    /// On return, `w[k]` holds `xpt_k^T d (0.5 xpt_k^T d + xpt_k^T xopt)` and
    /// `w[npt + k]` holds `xpt_k^T d`, which is needed for the prediction of
    /// the change of the model.
    pub(super) fn lagrange_values(&mut self, w: &mut OVector<T, Dyn>, xoptsq: T) -> T {
        let Self {
            n,
            npt,
            xpt,
            xopt,
            bmat,
            zmat,
            d,
            vlag,
            kopt,
            ..
        } = self;
        let (n, npt) = (*n, *npt);
        let half: T = convert(0.5);

        for k in 0..npt {
            let mut suma = T::zero();
            let mut sumb = T::zero();
            let mut sum = T::zero();
            for j in 0..n {
                suma += xpt[(k, j)] * d[j];
                sumb += xpt[(k, j)] * xopt[j];
                sum += bmat[(k, j)] * d[j];
            }
            w[k] = suma * (half * suma + sumb);
            vlag[k] = sum;
            w[npt + k] = suma;
        }

        let mut beta = T::zero();
        for jj in 0..zmat.ncols() {
            let mut sum = T::zero();
            for k in 0..npt {
                sum += zmat[(k, jj)] * w[k];
            }
            beta -= sum * sum;
            for k in 0..npt {
                vlag[k] += sum * zmat[(k, jj)];
            }
        }

        let mut dsq = T::zero();
        let mut bsum = T::zero();
        let mut dx = T::zero();
        for j in 0..n {
            dsq += d[j] * d[j];
            let mut sum = T::zero();
            for k in 0..npt {
                sum += w[k] * bmat[(k, j)];
            }
            bsum += sum * d[j];
            let jp = npt + j;
            for i in 0..n {
                sum += bmat[(jp, i)] * d[i];
            }
            vlag[jp] = sum;
            bsum += sum * d[j];
            dx += d[j] * xopt[j];
        }

        vlag[*kopt] += T::one();

        dx * dx + dsq * (xoptsq + dx + dx + half * dsq) + beta - bsum
    }

    /// Computes the squared distance of the `k`-th interpolation point from
    /// given point.
    pub(super) fn distsq_from(&self, k: usize, y: &OVector<T, Dyn>) -> T {
        (0..self.n).fold(T::zero(), |acc, j| {
            let temp = self.xpt[(k, j)] - y[j];
            acc + temp * temp
        })
    }

    /// Computes `xpt_k^T v`.
    pub(super) fn point_dot(&self, k: usize, v: &OVector<T, Dyn>) -> T {
        (0..self.n).fold(T::zero(), |acc, j| acc + self.xpt[(k, j)] * v[j])
    }

    /// Computes the `k`-th element of the diagonal of `zmat * zmat^T`.
    pub(super) fn hdiag(&self, k: usize) -> T {
        self.zmat.row(k).norm_squared()
    }
}

#[cfg(test)]
impl Model<f64> {
    /// Checks that `zmat` and `bmat` agree with the explicit inverse of the
    /// interpolation system matrix of the current points.
    pub(super) fn assert_inverse_consistent(&self, tol: f64) {
        use nalgebra::DMatrix;

        let n = self.n;
        let npt = self.npt;
        let size = npt + 1 + n;

        let mut w = DMatrix::<f64>::zeros(size, size);
        for i in 0..npt {
            for j in 0..npt {
                let dot = self.xpt.row(i).dot(&self.xpt.row(j));
                w[(i, j)] = 0.5 * dot * dot;
            }
            w[(i, npt)] = 1.0;
            w[(npt, i)] = 1.0;
            for c in 0..n {
                w[(i, npt + 1 + c)] = self.xpt[(i, c)];
                w[(npt + 1 + c, i)] = self.xpt[(i, c)];
            }
        }

        let h = w.try_inverse().expect("interpolation system is singular");
        let omega = &self.zmat * self.zmat.transpose();

        let close = |a: f64, b: f64| (a - b).abs() <= tol * (1.0 + b.abs());

        for i in 0..npt {
            for j in 0..npt {
                assert!(
                    close(omega[(i, j)], h[(i, j)]),
                    "zmat mismatch at ({}, {}): {} != {}",
                    i,
                    j,
                    omega[(i, j)],
                    h[(i, j)]
                );
            }
            for c in 0..n {
                assert!(
                    close(self.bmat[(i, c)], h[(i, npt + 1 + c)]),
                    "bmat mismatch at ({}, {})",
                    i,
                    c
                );
            }
        }

        for r in 0..n {
            for c in 0..n {
                assert!(
                    close(self.bmat[(npt + r, c)], h[(npt + 1 + r, npt + 1 + c)]),
                    "bmat mismatch at ({}, {})",
                    npt + r,
                    c
                );
            }
        }
    }
}
