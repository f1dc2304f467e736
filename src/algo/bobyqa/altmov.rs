use log::trace;
use nalgebra::{convert, Dyn, OVector, RealField, U1};

use super::model::Model;

/// Bound that limits a line search step, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Limit {
    None,
    Lower(usize),
    Upper(usize),
}

impl<T: RealField + Copy> Model<T> {
    /// Computes a step that increases the denominator of the updating formula
    /// when the `knew`-th interpolation point is going to be replaced.
    ///
    /// Two candidates are generated. `xnew` is chosen on the lines through
    /// `xopt` and the other interpolation points so that the value of the
    /// `knew`-th Lagrange function is large. `xalt` is a Cauchy step of that
    /// Lagrange function (or its negative), restricted to `adelt` and the
    /// bounds.
    ///
    /// Returns `alpha`, the `knew`-th diagonal element of the inverse matrix
    /// block, and `cauchy`, the square of the Lagrange function's value at
    /// `xalt`.
    pub(super) fn altmov(&mut self, knew: usize, adelt: T) -> (T, T) {
        let n = self.n;
        let npt = self.npt;

        let zero = T::zero();
        let one = T::one();
        let half: T = convert(0.5);
        let quarter: T = convert(0.25);
        let constant = one + convert::<_, T>(2.0).sqrt();

        // The knew-th column of the leading block of the inverse matrix.
        let mut hcol = OVector::<T, Dyn>::zeros_generic(Dyn(npt), U1);
        for j in 0..self.zmat.ncols() {
            let temp = self.zmat[(knew, j)];
            for k in 0..npt {
                hcol[k] += temp * self.zmat[(k, j)];
            }
        }
        let alpha = hcol[knew];
        let ha = half * alpha;

        // Gradient of the knew-th Lagrange function at xopt.
        let mut glag = OVector::<T, Dyn>::zeros_generic(Dyn(n), U1);
        for i in 0..n {
            glag[i] = self.bmat[(knew, i)];
        }
        for k in 0..npt {
            let temp = hcol[k] * self.point_dot(k, &self.xopt);
            for i in 0..n {
                glag[i] += temp * self.xpt[(k, i)];
            }
        }

        // Search along the lines through xopt and the other interpolation
        // points.
        let mut presav = zero;
        let mut ksav = knew;
        let mut stpsav = zero;
        let mut ibdsav = Limit::None;

        for k in 0..npt {
            if k == self.kopt {
                continue;
            }

            let mut dderiv = zero;
            let mut distsq = zero;
            for i in 0..n {
                let temp = self.xpt[(k, i)] - self.xopt[i];
                dderiv += glag[i] * temp;
                distsq += temp * temp;
            }

            let mut subd = adelt / distsq.sqrt();
            let mut slbd = -subd;
            let mut ilbd = Limit::None;
            let mut iubd = Limit::None;
            let sumin = one.min(subd);

            for i in 0..n {
                let temp = self.xpt[(k, i)] - self.xopt[i];
                let lower = self.sl[i] - self.xopt[i];
                let upper = self.su[i] - self.xopt[i];

                if temp > zero {
                    if slbd * temp < lower {
                        slbd = lower / temp;
                        ilbd = Limit::Lower(i);
                    }
                    if subd * temp > upper {
                        subd = sumin.max(upper / temp);
                        iubd = Limit::Upper(i);
                    }
                } else if temp < zero {
                    if slbd * temp > upper {
                        slbd = upper / temp;
                        ilbd = Limit::Upper(i);
                    }
                    if subd * temp < lower {
                        subd = sumin.max(lower / temp);
                        iubd = Limit::Lower(i);
                    }
                }
            }

            let (step, vlag, isbd) = if k == knew {
                let diff = dderiv - one;
                let mut step = slbd;
                let mut vlag = slbd * (dderiv - slbd * diff);
                let mut isbd = ilbd;

                let temp = subd * (dderiv - subd * diff);
                if temp.abs() > vlag.abs() {
                    step = subd;
                    vlag = temp;
                    isbd = iubd;
                }

                let tempd = half * dderiv;
                let tempa = tempd - diff * slbd;
                let tempb = tempd - diff * subd;
                if tempa * tempb < zero {
                    let temp = tempd * tempd / diff;
                    if temp.abs() > vlag.abs() {
                        step = tempd / diff;
                        vlag = temp;
                        isbd = Limit::None;
                    }
                }

                (step, vlag, isbd)
            } else {
                let mut step = slbd;
                let mut vlag = slbd * (one - slbd);
                let mut isbd = ilbd;

                let temp = subd * (one - subd);
                if temp.abs() > vlag.abs() {
                    step = subd;
                    vlag = temp;
                    isbd = iubd;
                }

                if subd > half && vlag.abs() < quarter {
                    step = half;
                    vlag = quarter;
                    isbd = Limit::None;
                }

                (step, vlag * dderiv, isbd)
            };

            let temp = step * (one - step) * distsq;
            let predsq = vlag * vlag * (vlag * vlag + ha * temp * temp);
            if predsq > presav {
                presav = predsq;
                ksav = k;
                stpsav = step;
                ibdsav = isbd;
            }
        }

        for i in 0..n {
            let temp = self.xopt[i] + stpsav * (self.xpt[(ksav, i)] - self.xopt[i]);
            self.xnew[i] = self.su[i].min(temp).max(self.sl[i]);
        }
        match ibdsav {
            Limit::Lower(i) => self.xnew[i] = self.sl[i],
            Limit::Upper(i) => self.xnew[i] = self.su[i],
            Limit::None => {}
        }

        // Cauchy steps of the Lagrange function and of its negative. The
        // entries of w equal to bigstp mark the free variables.
        let bigstp = adelt + adelt;
        let mut w = OVector::<T, Dyn>::zeros_generic(Dyn(n), U1);
        let mut saved = OVector::<T, Dyn>::zeros_generic(Dyn(n), U1);
        let mut csave = zero;
        let mut cauchy = zero;

        for negated in [false, true] {
            let mut wfixsq = zero;
            let mut ggfree = zero;

            for i in 0..n {
                w[i] = zero;
                let tempa = (self.xopt[i] - self.sl[i]).min(glag[i]);
                let tempb = (self.xopt[i] - self.su[i]).max(glag[i]);
                if tempa > zero || tempb < zero {
                    w[i] = bigstp;
                    ggfree += glag[i] * glag[i];
                }
            }

            if ggfree == zero {
                return (alpha, zero);
            }

            // Fix the variables whose Cauchy step would leave the bounds.
            let mut step = zero;
            loop {
                let temp = adelt * adelt - wfixsq;
                if temp <= zero {
                    break;
                }

                let wsqsav = wfixsq;
                step = (temp / ggfree).sqrt();
                ggfree = zero;

                for i in 0..n {
                    if w[i] == bigstp {
                        let temp = self.xopt[i] - step * glag[i];
                        if temp <= self.sl[i] {
                            w[i] = self.sl[i] - self.xopt[i];
                            wfixsq += w[i] * w[i];
                        } else if temp >= self.su[i] {
                            w[i] = self.su[i] - self.xopt[i];
                            wfixsq += w[i] * w[i];
                        } else {
                            ggfree += glag[i] * glag[i];
                        }
                    }
                }

                if wfixsq <= wsqsav || ggfree <= zero {
                    break;
                }
            }

            let mut gw = zero;
            for i in 0..n {
                if w[i] == bigstp {
                    w[i] = -step * glag[i];
                    self.xalt[i] = self.sl[i].max(self.su[i].min(self.xopt[i] + w[i]));
                } else if w[i] == zero {
                    self.xalt[i] = self.xopt[i];
                } else if glag[i] > zero {
                    self.xalt[i] = self.sl[i];
                } else {
                    self.xalt[i] = self.su[i];
                }
                gw += glag[i] * w[i];
            }

            let mut curv = zero;
            for k in 0..npt {
                let temp = self.point_dot(k, &w);
                curv += hcol[k] * temp * temp;
            }
            if negated {
                curv = -curv;
            }

            if curv > -gw && curv < -constant * gw {
                let scale = -gw / curv;
                for i in 0..n {
                    let temp = self.xopt[i] + scale * w[i];
                    self.xalt[i] = self.sl[i].max(self.su[i].min(temp));
                }
                cauchy = (half * gw * scale).powi(2);
            } else {
                cauchy = (gw + half * curv).powi(2);
            }

            if !negated {
                glag.neg_mut();
                saved.copy_from(&self.xalt);
                csave = cauchy;
            }
        }

        if csave > cauchy {
            self.xalt.copy_from(&saved);
            cauchy = csave;
        }

        trace!(
            "alternative move for point {}: line through point {} with step {}, cauchy = {}",
            knew,
            ksav,
            stpsav,
            cauchy
        );

        (alpha, cauchy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::{dvector, storage::Storage, IsContiguous, Vector};

    use crate::core::{Domain, Function, GoalType, Objective, Problem};

    struct Bowl;

    impl Problem for Bowl {
        type Field = f64;

        fn domain(&self) -> Domain<Self::Field> {
            Domain::rect(vec![-1.0, -1.0, 0.0], vec![3.0, 2.0, 4.0])
        }
    }

    impl Function for Bowl {
        fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
        where
            Sx: Storage<Self::Field, Dyn> + IsContiguous,
        {
            (x[0] - 1.0).powi(2) + 3.0 * x[1].powi(2) + x[0] * x[2] + (x[2] - 2.0).powi(2)
        }
    }

    fn initial_model(npt: usize) -> Model<f64> {
        let f = Bowl;
        let dom = f.domain();
        let mut obj = Objective::new(&f, GoalType::Minimize);
        let (mut model, rhobeg) = Model::setup(&dom, npt, 0.5).unwrap();
        let mut x = dvector![0.0, 0.0, 0.0];
        model.adjust_start(&dom, &mut x, rhobeg);
        model.prelim(&mut obj, &dom, &mut x, rhobeg).unwrap();

        let kopt = model.kopt;
        for j in 0..model.n {
            model.xopt[j] = model.xpt[(kopt, j)];
        }
        model
    }

    fn assert_feasible_within(model: &Model<f64>, x: &OVector<f64, Dyn>, radius: f64) {
        for i in 0..model.n {
            assert!(x[i] >= model.sl[i] && x[i] <= model.su[i]);
        }
        assert!((x - &model.xopt).norm() <= radius * (1.0 + 1e-12));
    }

    #[test]
    fn alpha_is_diagonal_of_inverse() {
        let mut model = initial_model(7);

        for knew in 0..7 {
            if knew == model.kopt {
                continue;
            }
            let (alpha, _) = model.altmov(knew, 0.3);
            approx::assert_relative_eq!(alpha, model.hdiag(knew), epsilon = 1e-12);
        }
    }

    #[test]
    fn candidates_are_feasible() {
        for npt in [5, 7, 10] {
            let mut model = initial_model(npt);
            let adelt = 0.3;

            for knew in 0..npt {
                if knew == model.kopt {
                    continue;
                }

                let (_, cauchy) = model.altmov(knew, adelt);
                assert!(cauchy >= 0.0);

                let xnew = model.xnew.clone();
                let xalt = model.xalt.clone();
                assert_feasible_within(&model, &xnew, adelt);
                assert_feasible_within(&model, &xalt, adelt);
            }
        }
    }

    #[test]
    fn step_changes_lagrange_function() {
        let mut model = initial_model(7);
        let knew = (model.kopt + 1) % 7;

        model.altmov(knew, 0.3);
        model.d = &model.xnew - &model.xopt;

        let xoptsq = model.xopt.norm_squared();
        let mut w = OVector::<f64, Dyn>::zeros_generic(Dyn(20), U1);
        model.lagrange_values(&mut w, xoptsq);

        // The knew-th Lagrange function is one at its own point and zero at
        // xopt, so a useful step gives it a nonzero value.
        assert!(model.vlag[knew].abs() > 1e-3);
    }
}
