use log::{debug, warn};
use nalgebra::{convert, storage::StorageMut, Dyn, IsContiguous, OVector, RealField, Vector, U1};

use crate::core::{Domain, Function, Objective};

use super::{model::Model, BobyqaError};

/// Kind of the step that is going to be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Trust region step too short to be worth an evaluation, unless the
    /// optimization is about to end.
    Short,
    /// Step improving the geometry of the interpolation set.
    Geometry,
    /// Step minimizing the quadratic model in the trust region.
    TrustRegion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Recenter,
    TrustRegion,
    ShiftBase,
    AlternativeMove,
    LagrangeValues,
    Evaluate,
    FarthestPoint,
    ShrinkRho,
    Finish,
}

impl<T: RealField + Copy> Model<T> {
    /// Runs the main loop of the method, starting from the interpolation set
    /// built around `x` with radius `rhobeg` until the radius reaches
    /// `rhoend`.
    ///
    /// On success, `x` holds the best point found and its value is returned.
    pub(super) fn bobyqb<F, Sx>(
        &mut self,
        obj: &mut Objective<'_, F>,
        dom: &Domain<T>,
        x: &mut Vector<T, Dyn, Sx>,
        rhobeg: T,
        rhoend: T,
    ) -> Result<T, BobyqaError>
    where
        F: Function<Field = T>,
        Sx: StorageMut<T, Dyn> + IsContiguous,
    {
        let n = self.n;
        let npt = self.npt;

        let zero = T::zero();
        let two: T = convert(2.0);
        let half: T = convert(0.5);
        let tenth: T = convert(0.1);
        let ten: T = convert(10.0);
        let one_and_half: T = convert(1.5);
        let seven_tenths: T = convert(0.7);

        let mut w = OVector::<T, Dyn>::zeros_generic(Dyn(2 * (npt + n)), U1);

        self.prelim(obj, dom, x, rhobeg)?;

        let kbase = 0;
        for i in 0..n {
            self.xopt[i] = self.xpt[(self.kopt, i)];
        }
        let mut xoptsq = self.xopt.norm_squared();
        let mut fsave = self.fval[0];

        let mut nf = npt;
        let mut nfsav = nf;

        let mut rho = rhobeg;
        let mut delta = rho;
        let mut step = Step::Geometry;
        let mut itest = 0;

        // Errors of the model in the last three steps.
        let mut diffa = zero;
        let mut diffb = zero;
        let mut diffc = zero;

        let mut ratio = zero;
        let mut dnorm = zero;
        let mut dsq = zero;
        let mut knew = 0;
        let mut adelt = zero;
        let mut alpha = zero;
        let mut cauchy = zero;
        let mut denom = zero;
        let mut distsq = zero;
        let mut beta = zero;
        let mut f = fsave;

        let mut stage = Stage::Recenter;

        loop {
            match stage {
                Stage::Recenter => {
                    // Gradient of the model at xopt when it is not the base
                    // point.
                    if self.kopt != kbase {
                        let mut hd = OVector::zeros_generic(Dyn(n), U1);
                        self.hessian_product(&self.xopt, &mut hd);
                        self.gopt += &hd;
                    }
                    stage = Stage::TrustRegion;
                }
                Stage::TrustRegion => {
                    let result = self.trsbox(delta);
                    dsq = result.dsq;
                    let crvmin = result.crvmin;
                    let gnew = result.gnew;

                    dnorm = delta.min(dsq.sqrt());

                    if dnorm < half * rho {
                        step = Step::Short;
                        distsq = (ten * rho).powi(2);

                        if nf <= nfsav + 2 {
                            stage = Stage::FarthestPoint;
                            continue;
                        }

                        // Reduce rho only if the recent errors of the model
                        // are small compared to the predicted changes.
                        let errbig = diffa.max(diffb).max(diffc);
                        let frhosq = convert::<_, T>(0.125) * rho * rho;

                        if crvmin > zero && errbig > frhosq * crvmin {
                            stage = Stage::FarthestPoint;
                            continue;
                        }

                        let bdtol = errbig / rho;
                        let inaccurate = (0..n).any(|j| {
                            let mut bdtest = bdtol;
                            if self.xnew[j] == self.sl[j] {
                                bdtest = gnew[j];
                            }
                            if self.xnew[j] == self.su[j] {
                                bdtest = -gnew[j];
                            }

                            if bdtest < bdtol {
                                let curv = (0..npt).fold(self.hq[(j, j)], |acc, k| {
                                    acc + self.pq[k] * self.xpt[(k, j)].powi(2)
                                });
                                bdtest += half * curv * rho;
                                bdtest < bdtol
                            } else {
                                false
                            }
                        });

                        stage = if inaccurate {
                            Stage::FarthestPoint
                        } else {
                            Stage::ShrinkRho
                        };
                        continue;
                    }

                    step = Step::TrustRegion;
                    stage = Stage::ShiftBase;
                }
                Stage::ShiftBase => {
                    // Shift the base point to xopt when xopt is far from it
                    // compared to the step, to reduce the rounding errors.
                    if dsq <= convert::<_, T>(1e-3) * xoptsq {
                        self.shift_base(&mut w, xoptsq);
                        xoptsq = zero;
                    }

                    stage = if step == Step::Geometry {
                        Stage::AlternativeMove
                    } else {
                        Stage::LagrangeValues
                    };
                }
                Stage::AlternativeMove => {
                    (alpha, cauchy) = self.altmov(knew, adelt);
                    for i in 0..n {
                        self.d[i] = self.xnew[i] - self.xopt[i];
                    }
                    stage = Stage::LagrangeValues;
                }
                Stage::LagrangeValues => {
                    beta = self.lagrange_values(&mut w, xoptsq);

                    if step == Step::Geometry {
                        denom = self.vlag[knew].powi(2) + alpha * beta;

                        if denom < cauchy && cauchy > zero {
                            for i in 0..n {
                                self.xnew[i] = self.xalt[i];
                                self.d[i] = self.xnew[i] - self.xopt[i];
                            }
                            cauchy = zero;
                            continue;
                        }

                        if denom <= half * self.vlag[knew].powi(2) {
                            warn!(
                                "denominator of the updating formula is too small (denom = {})",
                                denom
                            );
                            stage = Stage::Finish;
                            continue;
                        }
                    } else {
                        let delsq = delta * delta;
                        match self.choose_replacement(beta, delsq, &self.xopt, Some(self.kopt)) {
                            Some((k, den)) => {
                                knew = k;
                                denom = den;
                            }
                            None => {
                                warn!("no interpolation point can be replaced without loss of accuracy");
                                stage = Stage::Finish;
                                continue;
                            }
                        }
                    }

                    stage = Stage::Evaluate;
                }
                Stage::Evaluate => {
                    self.absolute_point(dom, |j| self.xnew[j], x);
                    f = obj.eval(&*x)?;
                    nf += 1;

                    if step == Step::Short {
                        fsave = f;
                        stage = Stage::Finish;
                        continue;
                    }

                    let fopt = self.fval[self.kopt];
                    let vquad = self.model_change(&w);

                    let diff = f - fopt - vquad;
                    diffc = diffb;
                    diffb = diffa;
                    diffa = diff.abs();

                    if dnorm > rho {
                        nfsav = nf;
                    }

                    if step == Step::TrustRegion {
                        if vquad >= zero {
                            return Err(BobyqaError::TrustRegionStepFailed);
                        }

                        ratio = (f - fopt) / vquad;

                        if ratio <= tenth {
                            delta = (half * delta).min(dnorm);
                        } else if ratio <= seven_tenths {
                            delta = (half * delta).max(dnorm);
                        } else {
                            delta = (half * delta).max(dnorm + dnorm);
                        }
                        if delta <= one_and_half * rho {
                            delta = rho;
                        }

                        debug!(
                            "trust region step: f = {}, ratio = {}, delta = {}",
                            f, ratio, delta
                        );

                        // The new point is going to be the best one, so it may
                        // be worth replacing a point far from it.
                        if f < fopt {
                            if let Some((k, den)) =
                                self.choose_replacement(beta, delta * delta, &self.xnew, None)
                            {
                                knew = k;
                                denom = den;
                            }
                        }
                    }

                    self.update(beta, denom, knew);
                    if self.replace_point(knew, f, diff, &mut w) {
                        xoptsq = self.xopt.norm_squared();
                    }

                    if step == Step::TrustRegion {
                        // Replace the model by the one of least Frobenius norm
                        // of the whole Hessian if its gradient is repeatedly
                        // much smaller.
                        let (gqsq, gisq) = self.least_frobenius_gradient(&mut w);

                        itest += 1;
                        if gqsq < ten * gisq {
                            itest = 0;
                        }

                        if itest >= 3 {
                            debug!("quadratic model replaced by the least Frobenius norm one");
                            for i in 0..n {
                                self.gopt[i] = self.vlag[npt + i];
                            }
                            for k in 0..npt {
                                self.pq[k] = w[npt + k];
                            }
                            self.hq.fill_zero();
                            itest = 0;
                        }
                    }

                    if step == Step::Geometry || f <= fopt + tenth * vquad {
                        stage = Stage::TrustRegion;
                        continue;
                    }

                    distsq = (two * delta).powi(2).max((ten * rho).powi(2));
                    stage = Stage::FarthestPoint;
                }
                Stage::FarthestPoint => {
                    let mut farthest = None;
                    for k in 0..npt {
                        let sum = self.distsq_from(k, &self.xopt);
                        if sum > distsq {
                            farthest = Some(k);
                            distsq = sum;
                        }
                    }

                    if let Some(k) = farthest {
                        knew = k;
                        let dist = distsq.sqrt();

                        if step == Step::Short {
                            delta = (tenth * delta).min(half * dist);
                            if delta <= one_and_half * rho {
                                delta = rho;
                            }
                        }

                        step = Step::Geometry;
                        adelt = (tenth * dist).min(delta).max(rho);
                        dsq = adelt * adelt;

                        stage = Stage::ShiftBase;
                        continue;
                    }

                    stage = if step == Step::Short {
                        Stage::ShrinkRho
                    } else if ratio > zero || delta.max(dnorm) > rho {
                        Stage::TrustRegion
                    } else {
                        Stage::ShrinkRho
                    };
                }
                Stage::ShrinkRho => {
                    if rho > rhoend {
                        delta = half * rho;
                        ratio = rho / rhoend;

                        rho = if ratio <= convert::<_, T>(16.0) {
                            rhoend
                        } else if ratio <= convert::<_, T>(250.0) {
                            ratio.sqrt() * rhoend
                        } else {
                            tenth * rho
                        };
                        delta = delta.max(rho);

                        debug!(
                            "rho reduced to {} after {} evaluations, f = {}",
                            rho,
                            nf,
                            self.fval[self.kopt]
                        );

                        step = Step::Geometry;
                        nfsav = nf;
                        stage = Stage::TrustRegion;
                        continue;
                    }

                    // Evaluate the last short step before finishing.
                    stage = if step == Step::Short {
                        Stage::Evaluate
                    } else {
                        Stage::Finish
                    };
                }
                Stage::Finish => return Ok(self.finish(dom, x, f, fsave)),
            }
        }
    }

    /// Writes the best point to `x` and returns its value.
    ///
    /// `x` already holds the last evaluated point with value `f`. It is kept
    /// only if it was a final short step better than the incumbent.
    fn finish<Sx>(&self, dom: &Domain<T>, x: &mut Vector<T, Dyn, Sx>, f: T, fsave: T) -> T
    where
        Sx: StorageMut<T, Dyn>,
    {
        if self.fval[self.kopt] <= fsave {
            self.absolute_point(dom, |j| self.xopt[j], x);
            self.fval[self.kopt]
        } else {
            f
        }
    }

    /// Chooses the interpolation point to be replaced by `xnew`.
    ///
    /// The denominator of the updating formula is weighted by the distance of
    /// the points from `center`. Returns the index of the point and the
    /// denominator, or `None` if the cancellation in the denominator is too
    /// large for any point.
    fn choose_replacement(
        &self,
        beta: T,
        delsq: T,
        center: &OVector<T, Dyn>,
        skip: Option<usize>,
    ) -> Option<(usize, T)> {
        let one = T::one();
        let mut scaden = T::zero();
        let mut biglsq = T::zero();
        let mut chosen = None;

        for k in (0..self.npt).filter(|k| Some(*k) != skip) {
            let den = beta * self.hdiag(k) + self.vlag[k].powi(2);
            let distsq = self.distsq_from(k, center);
            let temp = one.max((distsq / delsq).powi(2));

            if temp * den > scaden {
                scaden = temp * den;
                chosen = Some((k, den));
            }
            biglsq = biglsq.max(temp * self.vlag[k].powi(2));
        }

        if scaden <= convert::<_, T>(0.5) * biglsq {
            None
        } else {
            chosen
        }
    }

    /// Moves the base point to `xopt` and updates the matrices and the model
    /// accordingly.
    fn shift_base(&mut self, w: &mut OVector<T, Dyn>, xoptsq: T) {
        let n = self.n;
        let npt = self.npt;
        let half: T = convert(0.5);
        let fracsq = convert::<_, T>(0.25) * xoptsq;

        let mut sumpq = T::zero();
        for k in 0..npt {
            sumpq += self.pq[k];
            let sum = self.point_dot(k, &self.xopt) - half * xoptsq;
            w[npt + k] = sum;
            let temp = fracsq - half * sum;

            for i in 0..n {
                w[i] = self.bmat[(k, i)];
                self.vlag[i] = sum * self.xpt[(k, i)] + temp * self.xopt[i];
                let ip = npt + i;
                for j in 0..=i {
                    self.bmat[(ip, j)] += w[i] * self.vlag[j] + self.vlag[i] * w[j];
                }
            }
        }

        for jj in 0..self.zmat.ncols() {
            let mut sumz = T::zero();
            let mut sumw = T::zero();
            for k in 0..npt {
                sumz += self.zmat[(k, jj)];
                self.vlag[k] = w[npt + k] * self.zmat[(k, jj)];
                sumw += self.vlag[k];
            }

            for j in 0..n {
                let mut sum = (fracsq * sumz - half * sumw) * self.xopt[j];
                for k in 0..npt {
                    sum += self.vlag[k] * self.xpt[(k, j)];
                }
                w[j] = sum;
                for k in 0..npt {
                    self.bmat[(k, j)] += sum * self.zmat[(k, jj)];
                }
            }

            for i in 0..n {
                let ip = i + npt;
                let temp = w[i];
                for j in 0..=i {
                    self.bmat[(ip, j)] += temp * w[j];
                }
            }
        }

        for j in 0..n {
            w[j] = -half * sumpq * self.xopt[j];
            for k in 0..npt {
                w[j] += self.pq[k] * self.xpt[(k, j)];
                self.xpt[(k, j)] -= self.xopt[j];
            }
            for i in 0..=j {
                self.hq[(i, j)] += w[i] * self.xopt[j] + self.xopt[i] * w[j];
                self.bmat[(npt + i, j)] = self.bmat[(npt + j, i)];
            }
        }

        for i in 0..n {
            self.xbase[i] += self.xopt[i];
            self.xnew[i] -= self.xopt[i];
            self.sl[i] -= self.xopt[i];
            self.su[i] -= self.xopt[i];
        }
        self.xopt.fill(T::zero());

        debug!("base point shifted to {:?}", self.xbase.as_slice());
    }

    /// Computes the change of the model from `xopt` to `xopt + d`.
    ///
    /// The products `xpt_k^T d` must be stored in `w[npt..2 npt]` as left by
    /// [`lagrange_values`](Model::lagrange_values).
    fn model_change(&self, w: &OVector<T, Dyn>) -> T {
        let half: T = convert(0.5);
        let mut vquad = T::zero();

        for j in 0..self.n {
            vquad += self.d[j] * self.gopt[j];
            for i in 0..=j {
                let mut temp = self.d[i] * self.d[j];
                if i == j {
                    temp *= half;
                }
                vquad += self.hq[(i, j)] * temp;
            }
        }

        for k in 0..self.npt {
            vquad += half * self.pq[k] * w[self.npt + k].powi(2);
        }

        vquad
    }

    /// Replaces the `knew`-th interpolation point by `xnew` with function
    /// value `f` and updates the model, where `diff` is the error of the model
    /// at the new point. The matrices must be already updated.
    ///
    /// Returns whether the new point became the best one, in which case
    /// `xopt` and the gradient are moved to it.
    fn replace_point(&mut self, knew: usize, f: T, diff: T, w: &mut OVector<T, Dyn>) -> bool {
        let n = self.n;
        let npt = self.npt;
        let improved = f < self.fval[self.kopt];

        // The implicit part of the Hessian of the removed point becomes
        // explicit.
        let pqold = self.pq[knew];
        self.pq[knew] = T::zero();
        for i in 0..n {
            let temp = pqold * self.xpt[(knew, i)];
            for j in 0..=i {
                self.hq[(i, j)] += temp * self.xpt[(knew, j)];
            }
        }

        for jj in 0..self.zmat.ncols() {
            let temp = diff * self.zmat[(knew, jj)];
            for k in 0..npt {
                self.pq[k] += temp * self.zmat[(k, jj)];
            }
        }

        self.fval[knew] = f;
        for i in 0..n {
            self.xpt[(knew, i)] = self.xnew[i];
            w[i] = self.bmat[(knew, i)];
        }

        for k in 0..npt {
            let suma = self.zmat.row(knew).dot(&self.zmat.row(k));
            let temp = suma * self.point_dot(k, &self.xopt);
            for i in 0..n {
                w[i] += temp * self.xpt[(k, i)];
            }
        }

        for i in 0..n {
            self.gopt[i] += diff * w[i];
        }

        if improved {
            self.kopt = knew;
            self.xopt.copy_from(&self.xnew);

            let mut hd = OVector::<T, Dyn>::zeros_generic(Dyn(n), U1);
            self.hessian_product(&self.d, &mut hd);
            self.gopt += &hd;
        }

        improved
    }

    /// Computes the gradient at `xopt` and the second derivative parameters of
    /// the quadratic model that interpolates the current function values and
    /// has the least Frobenius norm of its whole Hessian.
    ///
    /// The gradient is stored in the last _n_ elements of `vlag` and the
    /// parameters in `w[npt..2 npt]`. Returns the squared norms of the
    /// projected gradients of the current model and of the new one.
    fn least_frobenius_gradient(&mut self, w: &mut OVector<T, Dyn>) -> (T, T) {
        let n = self.n;
        let npt = self.npt;
        let zero = T::zero();

        let fopt = self.fval[self.kopt];
        for k in 0..npt {
            self.vlag[k] = self.fval[k] - fopt;
            w[k] = zero;
        }

        for j in 0..self.zmat.ncols() {
            let mut sum = zero;
            for k in 0..npt {
                sum += self.zmat[(k, j)] * self.vlag[k];
            }
            for k in 0..npt {
                w[k] += sum * self.zmat[(k, j)];
            }
        }

        for k in 0..npt {
            let sum = self.point_dot(k, &self.xopt);
            w[k + npt] = w[k];
            w[k] = sum * w[k];
        }

        let mut gqsq = zero;
        let mut gisq = zero;
        for i in 0..n {
            let mut sum = zero;
            for k in 0..npt {
                sum += self.bmat[(k, i)] * self.vlag[k] + self.xpt[(k, i)] * w[k];
            }

            if self.xopt[i] == self.sl[i] {
                gqsq += self.gopt[i].min(zero).powi(2);
                gisq += sum.min(zero).powi(2);
            } else if self.xopt[i] == self.su[i] {
                gqsq += self.gopt[i].max(zero).powi(2);
                gisq += sum.max(zero).powi(2);
            } else {
                gqsq += self.gopt[i].powi(2);
                gisq += sum * sum;
            }

            self.vlag[npt + i] = sum;
        }

        (gqsq, gisq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::{dvector, storage::Storage};

    use crate::core::{GoalType, Problem};

    /// `x0^2 + x0 x1 + 2 x1^2 + x0 - 3 x2 + x2^2`.
    struct Quadratic;

    impl Problem for Quadratic {
        type Field = f64;

        fn domain(&self) -> Domain<Self::Field> {
            Domain::unconstrained(3)
        }
    }

    impl Function for Quadratic {
        fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
        where
            Sx: Storage<Self::Field, Dyn> + IsContiguous,
        {
            x[0] * x[0] + x[0] * x[1] + 2.0 * x[1] * x[1] + x[0] - 3.0 * x[2] + x[2] * x[2]
        }
    }

    fn initial_model(npt: usize) -> Model<f64> {
        let f = Quadratic;
        let dom = f.domain();
        let mut obj = Objective::new(&f, GoalType::Minimize);
        let (mut model, rhobeg) = Model::setup(&dom, npt, 1.0).unwrap();
        let mut x = dvector![0.5, -1.0, 2.0];
        model.adjust_start(&dom, &mut x, rhobeg);
        model.prelim(&mut obj, &dom, &mut x, rhobeg).unwrap();

        let kopt = model.kopt;
        for j in 0..model.n {
            model.xopt[j] = model.xpt[(kopt, j)];
        }

        let mut hs = dvector![0.0, 0.0, 0.0];
        model.hessian_product(&model.xopt, &mut hs);
        model.gopt += &hs;

        model
    }

    fn assert_interpolates(model: &Model<f64>) {
        let fopt = model.fval[model.kopt];

        for k in 0..model.npt {
            let s = model.xpt.row(k).transpose() - &model.xopt;
            let mut hs = dvector![0.0, 0.0, 0.0];
            model.hessian_product(&s, &mut hs);
            let q = model.gopt.dot(&s) + 0.5 * s.dot(&hs);

            approx::assert_abs_diff_eq!(model.fval[k] - fopt, q, epsilon = 1e-10);
        }
    }

    fn replace(model: &mut Model<f64>, knew: usize, d: [f64; 3]) -> bool {
        let npt = model.npt;
        let n = model.n;

        for j in 0..n {
            model.d[j] = d[j];
            model.xnew[j] = model.xopt[j] + d[j];
        }

        let mut w = OVector::<f64, Dyn>::zeros_generic(Dyn(2 * (npt + n)), U1);
        let beta = model.lagrange_values(&mut w, model.xopt.norm_squared());
        let denom = model.hdiag(knew) * beta + model.vlag[knew].powi(2);

        let f = Quadratic.apply(&(&model.xbase + &model.xnew));
        let diff = f - model.fval[model.kopt] - model.model_change(&w);

        model.update(beta, denom, knew);
        model.replace_point(knew, f, diff, &mut w)
    }

    #[test]
    fn replaced_point_is_interpolated() {
        let mut model = initial_model(7);
        assert_interpolates(&model);

        assert!(!replace(&mut model, 4, [0.3, -0.2, 0.1]));
        assert_interpolates(&model);
        model.assert_inverse_consistent(1e-10);

        assert!(replace(&mut model, 4, [-0.5, 0.6, -0.4]));
        assert_eq!(model.kopt, 4);
        assert_interpolates(&model);
        model.assert_inverse_consistent(1e-10);
    }

    #[test]
    fn model_change_of_full_quadratic_is_exact() {
        let mut model = initial_model(10);
        let d = dvector![0.2, 0.4, -0.3];
        model.d.copy_from(&d);

        let mut w = OVector::<f64, Dyn>::zeros_generic(Dyn(26), U1);
        model.lagrange_values(&mut w, model.xopt.norm_squared());

        let xopt = &model.xbase + &model.xopt;
        let expected = Quadratic.apply(&(&xopt + &d)) - Quadratic.apply(&xopt);
        approx::assert_relative_eq!(model.model_change(&w), expected, epsilon = 1e-10);
    }

    #[test]
    fn shift_base_keeps_points() {
        for npt in [7, 10] {
            let mut model = initial_model(npt);
            let before = model.xpt.clone();
            let xbase = model.xbase.clone();
            let xopt = model.xopt.clone();

            let mut w = OVector::<f64, Dyn>::zeros_generic(Dyn(2 * (npt + 3)), U1);
            model.shift_base(&mut w, xopt.norm_squared());

            assert_eq!(model.xbase, &xbase + &xopt);
            assert_eq!(model.xopt, dvector![0.0, 0.0, 0.0]);
            for k in 0..npt {
                for j in 0..3 {
                    approx::assert_abs_diff_eq!(
                        model.xbase[j] + model.xpt[(k, j)],
                        xbase[j] + before[(k, j)],
                        epsilon = 1e-14
                    );
                }
            }

            model.assert_inverse_consistent(1e-10);
            assert_interpolates(&model);
        }
    }

    #[test]
    fn replacement_skips_best_point() {
        let mut model = initial_model(7);
        model.d.copy_from(&dvector![0.3, -0.2, 0.1]);

        let mut w = OVector::<f64, Dyn>::zeros_generic(Dyn(20), U1);
        let beta = model.lagrange_values(&mut w, model.xopt.norm_squared());

        let (knew, denom) = model
            .choose_replacement(beta, 1.0, &model.xopt, Some(model.kopt))
            .unwrap();

        assert_ne!(knew, model.kopt);
        approx::assert_relative_eq!(
            denom,
            beta * model.hdiag(knew) + model.vlag[knew].powi(2),
            epsilon = 1e-14
        );
    }

    #[test]
    fn damaged_denominator_ends_with_incumbent() {
        let mut model = initial_model(7);
        model.vlag.fill(1.0);

        // Every denominator is negative, no point can be replaced.
        assert!(model
            .choose_replacement(-1e6, 1.0, &model.xopt, Some(model.kopt))
            .is_none());

        let dom = Quadratic.domain();
        let mut x = dvector![10.0, 10.0, 10.0];
        let fsave = model.fval[0];
        let fx = model.finish(&dom, &mut x, 100.0, fsave);

        assert_eq!(fx, model.fval[model.kopt]);
        approx::assert_abs_diff_eq!(x, &model.xbase + &model.xopt, epsilon = 1e-14);
        approx::assert_abs_diff_eq!(Quadratic.apply(&x), fx, epsilon = 1e-12);
    }

    #[test]
    fn finish_keeps_better_short_step() {
        let model = initial_model(7);
        let dom = Quadratic.domain();

        let mut x = dvector![10.0, 10.0, 10.0];
        let f = model.fval[model.kopt] - 1.0;
        let fx = model.finish(&dom, &mut x, f, f);

        assert_eq!(fx, f);
        assert_eq!(x, dvector![10.0, 10.0, 10.0]);
    }
}
