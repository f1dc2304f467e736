use log::debug;
use nalgebra::{convert, storage::StorageMut, Dyn, IsContiguous, RealField, Vector};

use crate::core::{Domain, EvaluationError, Function, Objective};

use super::model::Model;

impl<T: RealField + Copy> Model<T> {
    /// Builds the initial interpolation set around `x` and the quadratic model
    /// that interpolates the function in it.
    ///
    /// The first _2n + 1_ points lie on the coordinate axes through `x`
    /// (first a step in each direction, then a step in the opposite one),
    /// the rest are combinations of two axis steps which provide the
    /// off-diagonal second derivatives. Exactly _npt_ evaluations are
    /// performed.
    pub(super) fn prelim<F, Sx>(
        &mut self,
        obj: &mut Objective<'_, F>,
        dom: &Domain<T>,
        x: &mut Vector<T, Dyn, Sx>,
        rhobeg: T,
    ) -> Result<(), EvaluationError>
    where
        F: Function<Field = T>,
        Sx: StorageMut<T, Dyn> + IsContiguous,
    {
        let n = self.n;
        let npt = self.npt;

        let zero = T::zero();
        let one = T::one();
        let two: T = convert(2.0);
        let half: T = convert(0.5);

        let rhosq = rhobeg * rhobeg;
        let recip = one / rhosq;

        self.xbase.copy_from(x);
        self.xpt.fill(zero);
        self.bmat.fill(zero);
        self.zmat.fill(zero);
        self.hq.fill_zero();
        self.pq.fill(zero);
        self.gopt.fill(zero);

        let mut stepa = zero;
        let mut stepb = zero;
        let mut fbeg = zero;

        // Coordinates (counted from one) combined in an off-diagonal point.
        let mut ipt = 0;
        let mut jpt = 0;

        for nfm in 0..npt {
            if nfm <= 2 * n {
                if nfm >= 1 && nfm <= n {
                    let c = nfm - 1;
                    stepa = rhobeg;
                    if self.su[c] == zero {
                        stepa = -stepa;
                    }
                    self.xpt[(nfm, c)] = stepa;
                } else if nfm > n {
                    let c = nfm - n - 1;
                    stepa = self.xpt[(nfm - n, c)];
                    stepb = -rhobeg;
                    if self.sl[c] == zero {
                        stepb = (two * rhobeg).min(self.su[c]);
                    }
                    if self.su[c] == zero {
                        stepb = (-two * rhobeg).max(self.sl[c]);
                    }
                    self.xpt[(nfm, c)] = stepb;
                }
            } else {
                let itemp = (nfm - n - 1) / n;
                jpt = nfm - itemp * n - n;
                ipt = jpt + itemp;
                if ipt > n {
                    let temp = jpt;
                    jpt = ipt - n;
                    ipt = temp;
                }
                self.xpt[(nfm, ipt - 1)] = self.xpt[(ipt, ipt - 1)];
                self.xpt[(nfm, jpt - 1)] = self.xpt[(jpt, jpt - 1)];
            }

            self.absolute_point(dom, |j| self.xpt[(nfm, j)], x);
            let f = obj.eval(&*x)?;
            self.fval[nfm] = f;

            if nfm == 0 {
                fbeg = f;
                self.kopt = 0;
            } else if f < self.fval[self.kopt] {
                self.kopt = nfm;
            }

            if nfm <= 2 * n {
                if nfm >= 1 && nfm <= n {
                    let c = nfm - 1;
                    self.gopt[c] = (f - fbeg) / stepa;

                    // No opposite point will be placed along this axis.
                    if npt < nfm + 1 + n {
                        self.bmat[(0, c)] = -one / stepa;
                        self.bmat[(nfm, c)] = one / stepa;
                        self.bmat[(npt + c, c)] = -half * rhosq;
                    }
                } else if nfm > n {
                    let c = nfm - n - 1;
                    let temp = (f - fbeg) / stepb;
                    let diff = stepb - stepa;

                    self.hq[(c, c)] = two * (temp - self.gopt[c]) / diff;
                    self.gopt[c] = (self.gopt[c] * stepb - temp * stepa) / diff;

                    // The lower value of the pair is kept in the axis point so
                    // it contributes to the off-diagonal terms.
                    if stepa * stepb < zero && f < self.fval[nfm - n] {
                        self.fval[nfm] = self.fval[nfm - n];
                        self.fval[nfm - n] = f;
                        if self.kopt == nfm {
                            self.kopt = nfm - n;
                        }
                        self.xpt[(nfm - n, c)] = stepb;
                        self.xpt[(nfm, c)] = stepa;
                    }

                    self.bmat[(0, c)] = -(stepa + stepb) / (stepa * stepb);
                    self.bmat[(nfm, c)] = -half / self.xpt[(nfm - n, c)];
                    self.bmat[(nfm - n, c)] = -self.bmat[(0, c)] - self.bmat[(nfm, c)];

                    self.zmat[(0, c)] = two.sqrt() / (stepa * stepb);
                    self.zmat[(nfm, c)] = half.sqrt() / rhosq;
                    self.zmat[(nfm - n, c)] = -self.zmat[(0, c)] - self.zmat[(nfm, c)];
                }
            } else {
                let col = nfm - n - 1;
                self.zmat[(0, col)] = recip;
                self.zmat[(nfm, col)] = recip;
                self.zmat[(ipt, col)] = -recip;
                self.zmat[(jpt, col)] = -recip;

                let temp = self.xpt[(nfm, ipt - 1)] * self.xpt[(nfm, jpt - 1)];
                self.hq[(ipt - 1, jpt - 1)] =
                    (fbeg - self.fval[ipt] - self.fval[jpt] + f) / temp;
            }
        }

        debug!(
            "initial interpolation set built, best point {} with f = {}",
            self.kopt, self.fval[self.kopt]
        );

        Ok(())
    }
}
