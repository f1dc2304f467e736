use log::trace;
use nalgebra::{convert, try_convert, Dyn, OVector, RealField, U1};

use super::model::Model;

/// Whether a variable is fixed at one of its bounds during the trust region
/// step calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fixed {
    Free,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Restart the conjugate gradient iterations from steepest descent.
    Restart,
    /// Conjugate gradient iteration in the subspace of free variables.
    Conjugate,
    /// The step reached the trust region boundary.
    Boundary,
    /// Prepare an alternative iteration on the boundary.
    Alternative,
    /// Rotate the step within the two dimensional subspace spanned by the
    /// step and the gradient.
    Rotate,
    /// Compute the final step respecting the bounds.
    Finish,
}

/// Result of the trust region subproblem.
pub(super) struct TrustRegionStep<T: RealField + Copy> {
    /// Squared length of the step.
    pub(super) dsq: T,
    /// Least curvature of the model along the conjugate directions, zero if
    /// the step reached the trust region boundary and negative if no
    /// curvature was computed.
    pub(super) crvmin: T,
    /// Gradient of the model at `xopt + d`.
    pub(super) gnew: OVector<T, Dyn>,
}

impl<T: RealField + Copy> Model<T> {
    /// Computes the product of the model Hessian with `s`.
    pub(super) fn hessian_product(&self, s: &OVector<T, Dyn>, hs: &mut OVector<T, Dyn>) {
        hs.fill(T::zero());
        self.hq.mul_acc(s, hs);

        for k in 0..self.npt {
            if self.pq[k] != T::zero() {
                let temp = self.point_dot(k, s) * self.pq[k];
                for i in 0..self.n {
                    hs[i] += temp * self.xpt[(k, i)];
                }
            }
        }
    }

    /// Approximately minimizes the quadratic model within the trust region
    /// of radius `delta` around `xopt` and the bounds.
    ///
    /// A truncated conjugate gradient method is applied to the free
    /// variables, fixing a variable whenever it hits a bound. When the step
    /// reaches the trust region boundary, it is improved by rotations in two
    /// dimensional subspaces while it stays on the boundary. The step is
    /// stored in `d` and the new point in `xnew`.
    pub(super) fn trsbox(&mut self, delta: T) -> TrustRegionStep<T> {
        let n = self.n;

        let zero = T::zero();
        let one = T::one();
        let half: T = convert(0.5);
        let onemin = -one;
        let stall: T = convert(1e-4);
        let small: T = convert(0.01);

        let dim = Dyn(n);
        let mut xbdi = vec![Fixed::Free; n];
        let mut gnew = self.gopt.clone();
        let mut s = OVector::zeros_generic(dim, U1);
        let mut hs = OVector::zeros_generic(dim, U1);
        let mut hred = OVector::zeros_generic(dim, U1);

        let mut iterc = 0usize;
        let mut nact = 0usize;

        for i in 0..n {
            if self.xopt[i] <= self.sl[i] {
                if self.gopt[i] >= zero {
                    xbdi[i] = Fixed::Lower;
                }
            } else if self.xopt[i] >= self.su[i] && self.gopt[i] <= zero {
                xbdi[i] = Fixed::Upper;
            }
            if xbdi[i] != Fixed::Free {
                nact += 1;
            }
        }
        self.d.fill(zero);

        let mut delsq = delta * delta;
        let mut qred = zero;
        let mut crvmin = onemin;

        let mut beta = zero;
        let mut gredsq = zero;
        let mut ggsav = zero;
        let mut itermax = 0usize;

        let mut dredsq = zero;
        let mut dredg = zero;

        let mut stage = Stage::Restart;

        loop {
            match stage {
                Stage::Restart => {
                    beta = zero;
                    stage = Stage::Conjugate;
                }
                Stage::Conjugate => {
                    let mut stepsq = zero;
                    for i in 0..n {
                        if xbdi[i] != Fixed::Free {
                            s[i] = zero;
                        } else if beta == zero {
                            s[i] = -gnew[i];
                        } else {
                            s[i] = beta * s[i] - gnew[i];
                        }
                        stepsq += s[i] * s[i];
                    }

                    if stepsq == zero {
                        stage = Stage::Finish;
                        continue;
                    }

                    if beta == zero {
                        gredsq = stepsq;
                        itermax = iterc + n - nact;
                    }

                    if gredsq * delsq <= stall * qred * qred {
                        stage = Stage::Finish;
                        continue;
                    }

                    self.hessian_product(&s, &mut hs);

                    let mut resid = delsq;
                    let mut ds = zero;
                    let mut shs = zero;
                    for i in 0..n {
                        if xbdi[i] == Fixed::Free {
                            resid -= self.d[i] * self.d[i];
                            ds += s[i] * self.d[i];
                            shs += s[i] * hs[i];
                        }
                    }

                    if resid <= zero {
                        stage = Stage::Boundary;
                        continue;
                    }

                    // Length of the step to the trust region boundary.
                    let temp = (stepsq * resid + ds * ds).sqrt();
                    let blen = if ds < zero {
                        (temp - ds) / stepsq
                    } else {
                        resid / (temp + ds)
                    };

                    let mut stplen = blen;
                    if shs > zero {
                        stplen = blen.min(gredsq / shs);
                    }

                    // Reduce the step to preserve the bounds.
                    let mut iact = None;
                    for i in 0..n {
                        if s[i] != zero {
                            let xsum = self.xopt[i] + self.d[i];
                            let temp = if s[i] > zero {
                                (self.su[i] - xsum) / s[i]
                            } else {
                                (self.sl[i] - xsum) / s[i]
                            };
                            if temp < stplen {
                                stplen = temp;
                                iact = Some(i);
                            }
                        }
                    }

                    let mut sdec = zero;
                    if stplen > zero {
                        iterc += 1;
                        let temp = shs / stepsq;
                        if iact.is_none() && temp > zero {
                            crvmin = crvmin.min(temp);
                            if crvmin == onemin {
                                crvmin = temp;
                            }
                        }

                        ggsav = gredsq;
                        gredsq = zero;
                        for i in 0..n {
                            gnew[i] += stplen * hs[i];
                            if xbdi[i] == Fixed::Free {
                                gredsq += gnew[i] * gnew[i];
                            }
                            self.d[i] += stplen * s[i];
                        }

                        sdec = (stplen * (ggsav - half * stplen * shs)).max(zero);
                        qred += sdec;
                    }

                    if let Some(i) = iact {
                        nact += 1;
                        xbdi[i] = if s[i] < zero {
                            Fixed::Lower
                        } else {
                            Fixed::Upper
                        };
                        delsq -= self.d[i] * self.d[i];

                        stage = if delsq <= zero {
                            Stage::Boundary
                        } else {
                            Stage::Restart
                        };
                        continue;
                    }

                    if stplen < blen {
                        if iterc == itermax || sdec <= small * qred {
                            stage = Stage::Finish;
                        } else {
                            beta = gredsq / ggsav;
                        }
                        continue;
                    }

                    stage = Stage::Boundary;
                }
                Stage::Boundary => {
                    crvmin = zero;
                    stage = Stage::Alternative;
                }
                Stage::Alternative => {
                    if nact + 1 >= n {
                        stage = Stage::Finish;
                        continue;
                    }

                    dredsq = zero;
                    dredg = zero;
                    gredsq = zero;
                    for i in 0..n {
                        if xbdi[i] == Fixed::Free {
                            dredsq += self.d[i] * self.d[i];
                            dredg += self.d[i] * gnew[i];
                            gredsq += gnew[i] * gnew[i];
                            s[i] = self.d[i];
                        } else {
                            s[i] = zero;
                        }
                    }

                    self.hessian_product(&s, &mut hs);
                    hred.copy_from(&hs);
                    stage = Stage::Rotate;
                }
                Stage::Rotate => {
                    iterc += 1;

                    // The search direction is a combination of the reduced step
                    // and the reduced gradient orthogonal to the step.
                    let temp = gredsq * dredsq - dredg * dredg;
                    if temp <= stall * qred * qred {
                        stage = Stage::Finish;
                        continue;
                    }

                    let temp = temp.sqrt();
                    for i in 0..n {
                        s[i] = if xbdi[i] == Fixed::Free {
                            (dredg * self.d[i] - dredsq * gnew[i]) / temp
                        } else {
                            zero
                        };
                    }
                    let sredg = -temp;

                    // Upper bound on the tangent of half the angle of the
                    // rotation, given by the bounds on the variables.
                    let mut angbd = one;
                    let mut iact = None;
                    let mut xsav = Fixed::Free;
                    let mut reached = false;

                    for i in 0..n {
                        if xbdi[i] != Fixed::Free {
                            continue;
                        }

                        let tempa = self.xopt[i] + self.d[i] - self.sl[i];
                        let tempb = self.su[i] - self.xopt[i] - self.d[i];

                        if tempa <= zero {
                            nact += 1;
                            xbdi[i] = Fixed::Lower;
                            reached = true;
                            break;
                        } else if tempb <= zero {
                            nact += 1;
                            xbdi[i] = Fixed::Upper;
                            reached = true;
                            break;
                        }

                        let ssq = self.d[i] * self.d[i] + s[i] * s[i];

                        let temp = ssq - (self.xopt[i] - self.sl[i]).powi(2);
                        if temp > zero {
                            let temp = temp.sqrt() - s[i];
                            if angbd * temp > tempa {
                                angbd = tempa / temp;
                                iact = Some(i);
                                xsav = Fixed::Lower;
                            }
                        }

                        let temp = ssq - (self.su[i] - self.xopt[i]).powi(2);
                        if temp > zero {
                            let temp = temp.sqrt() + s[i];
                            if angbd * temp > tempb {
                                angbd = tempb / temp;
                                iact = Some(i);
                                xsav = Fixed::Upper;
                            }
                        }
                    }

                    if reached {
                        stage = Stage::Alternative;
                        continue;
                    }

                    self.hessian_product(&s, &mut hs);

                    let mut shs = zero;
                    let mut dhs = zero;
                    let mut dhd = zero;
                    for i in 0..n {
                        if xbdi[i] == Fixed::Free {
                            shs += s[i] * hs[i];
                            dhs += self.d[i] * hs[i];
                            dhd += self.d[i] * hred[i];
                        }
                    }

                    // Seek the greatest reduction of the model for equally
                    // spaced values of the tangent of half the angle.
                    let mut redmax = zero;
                    let mut isav = 0usize;
                    let mut redsav = zero;
                    let mut rdprev = zero;
                    let mut rdnext = zero;

                    let iu = try_convert::<_, f64>(angbd * convert(17.0) + convert(3.1))
                        .map(|iu| iu as usize)
                        .unwrap_or(3);
                    let iu_t: T = convert(iu as f64);

                    let reduction = |angt: T| {
                        let sth = (angt + angt) / (one + angt * angt);
                        let temp = shs + angt * (angt * dhd - dhs - dhs);
                        sth * (angt * dredg - sredg - half * sth * temp)
                    };

                    for i in 1..=iu {
                        let angt = angbd * convert(i as f64) / iu_t;
                        let rednew = reduction(angt);

                        if rednew > redmax {
                            redmax = rednew;
                            isav = i;
                            rdprev = redsav;
                        } else if i == isav + 1 {
                            rdnext = rednew;
                        }
                        redsav = rednew;
                    }

                    if isav == 0 {
                        stage = Stage::Finish;
                        continue;
                    }

                    let mut angt = angbd;
                    if isav < iu {
                        let temp = (rdnext - rdprev) / (redmax + redmax - rdprev - rdnext);
                        angt = angbd * (convert::<_, T>(isav as f64) + half * temp) / iu_t;
                    }

                    let cth = (one - angt * angt) / (one + angt * angt);
                    let sth = (angt + angt) / (one + angt * angt);
                    let sdec = reduction(angt);

                    if sdec <= zero {
                        stage = Stage::Finish;
                        continue;
                    }

                    dredg = zero;
                    gredsq = zero;
                    for i in 0..n {
                        gnew[i] += (cth - one) * hred[i] + sth * hs[i];
                        if xbdi[i] == Fixed::Free {
                            self.d[i] = cth * self.d[i] + sth * s[i];
                            dredg += self.d[i] * gnew[i];
                            gredsq += gnew[i] * gnew[i];
                        }
                        hred[i] = cth * hred[i] + sth * hs[i];
                    }
                    qred += sdec;

                    if let (Some(i), true) = (iact, isav == iu) {
                        nact += 1;
                        xbdi[i] = xsav;
                        stage = Stage::Alternative;
                        continue;
                    }

                    if sdec <= small * qred {
                        stage = Stage::Finish;
                    }
                }
                Stage::Finish => {
                    let mut dsq = zero;
                    for i in 0..n {
                        self.xnew[i] = (self.xopt[i] + self.d[i]).min(self.su[i]).max(self.sl[i]);
                        match xbdi[i] {
                            Fixed::Lower => self.xnew[i] = self.sl[i],
                            Fixed::Upper => self.xnew[i] = self.su[i],
                            Fixed::Free => {}
                        }
                        self.d[i] = self.xnew[i] - self.xopt[i];
                        dsq += self.d[i] * self.d[i];
                    }

                    trace!(
                        "trust region step: |d|^2 = {}, crvmin = {}, reduction = {}",
                        dsq,
                        crvmin,
                        qred
                    );

                    return TrustRegionStep { dsq, crvmin, gnew };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dvector;

    use crate::core::Domain;

    fn model(sl: [f64; 2], su: [f64; 2]) -> Model<f64> {
        let dom = Domain::unconstrained(2);
        let (mut model, _) = Model::setup(&dom, 5, 1.0).unwrap();
        model.sl.copy_from_slice(&sl);
        model.su.copy_from_slice(&su);
        model
    }

    #[test]
    fn unconstrained_newton_step() {
        let mut model = model([-100.0; 2], [100.0; 2]);

        // q(d) = g^T d + 0.5 d^T H d with H = diag(2, 4) and g = (-1, 2).
        model.gopt.copy_from(&dvector![-1.0, 2.0]);
        model.hq[(0, 0)] = 2.0;
        model.hq[(1, 1)] = 4.0;

        let step = model.trsbox(10.0);

        approx::assert_relative_eq!(model.d, dvector![0.5, -0.5], epsilon = 1e-12);
        approx::assert_relative_eq!(step.dsq, 0.5, epsilon = 1e-12);
        approx::assert_relative_eq!(step.gnew, dvector![0.0, 0.0], epsilon = 1e-12);
        assert!(step.crvmin > 0.0);
        assert_eq!(model.xnew, &model.xopt + &model.d);
    }

    #[test]
    fn step_on_trust_region_boundary() {
        let mut model = model([-100.0; 2], [100.0; 2]);

        model.gopt.copy_from(&dvector![-1.0, 2.0]);
        model.hq[(0, 0)] = 2.0;
        model.hq[(1, 1)] = 4.0;

        let delta = 0.1;
        let step = model.trsbox(delta);

        approx::assert_relative_eq!(step.dsq.sqrt(), delta, epsilon = 1e-12);
        assert_eq!(step.crvmin, 0.0);
        // The step decreases the model.
        let q = model.gopt.dot(&model.d) + model.hq.half_quadratic_form(&model.d);
        assert!(q < 0.0);
    }

    #[test]
    fn step_respects_bounds() {
        let mut model = model([-0.25, -10.0], [10.0, 10.0]);

        // The unconstrained minimizer is at (-1, 0.5).
        model.gopt.copy_from(&dvector![1.0, -1.0]);
        model.hq[(0, 0)] = 1.0;
        model.hq[(1, 1)] = 2.0;

        let step = model.trsbox(5.0);

        assert_eq!(model.xnew[0], model.sl[0]);
        approx::assert_relative_eq!(model.xnew[1], 0.5, epsilon = 1e-12);
        approx::assert_relative_eq!(step.dsq, 0.25f64.powi(2) + 0.25, epsilon = 1e-12);
    }

    #[test]
    fn negative_curvature_goes_to_boundary() {
        let mut model = model([-100.0; 2], [100.0; 2]);

        model.gopt.copy_from(&dvector![1.0, 0.5]);
        model.hq[(0, 0)] = -1.0;
        model.hq[(1, 1)] = 1.0;

        let step = model.trsbox(2.0);

        approx::assert_relative_eq!(step.dsq, 4.0, epsilon = 1e-10);
        assert_eq!(step.crvmin, 0.0);
        assert!(model.d[0] < -1.9);
    }

    #[test]
    fn implicit_hessian_product() {
        let mut model = model([-100.0; 2], [100.0; 2]);

        model.hq[(0, 1)] = 1.0;
        model.pq[1] = 2.0;
        model.xpt[(1, 0)] = 1.0;
        model.xpt[(1, 1)] = -1.0;

        let s = dvector![3.0, 1.0];
        let mut hs = dvector![0.0, 0.0];
        model.hessian_product(&s, &mut hs);

        // [[0, 1], [1, 0]] s + 2 (xpt_1^T s) xpt_1
        assert_eq!(hs, dvector![1.0 + 4.0, 3.0 - 4.0]);
    }
}
