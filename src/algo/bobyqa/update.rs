use nalgebra::{convert, Dyn, OVector, RealField, U1};

use super::model::Model;

impl<T: RealField + Copy> Model<T> {
    /// Updates `bmat` and `zmat` when the `knew`-th interpolation point is
    /// replaced by `xopt + d`.
    ///
    /// The values of the Lagrange functions at the new point must be in
    /// `vlag`, `beta` and `denom` are the parameters of the updating formula
    /// computed by the caller. `denom` must be positive.
    pub(super) fn update(&mut self, beta: T, denom: T, knew: usize) {
        let n = self.n;
        let npt = self.npt;
        let nptm = self.zmat.ncols();

        let zero = T::zero();
        let ztest = self.zmat.iter().fold(zero, |acc, z| acc.max(z.abs())) * convert(1e-20);

        // Apply the rotations that put zeros in the knew-th row of zmat.
        for j in 1..nptm {
            if self.zmat[(knew, j)].abs() > ztest {
                let temp = (self.zmat[(knew, 0)].powi(2) + self.zmat[(knew, j)].powi(2)).sqrt();
                let tempa = self.zmat[(knew, 0)] / temp;
                let tempb = self.zmat[(knew, j)] / temp;

                for i in 0..npt {
                    let temp = tempa * self.zmat[(i, 0)] + tempb * self.zmat[(i, j)];
                    self.zmat[(i, j)] = tempa * self.zmat[(i, j)] - tempb * self.zmat[(i, 0)];
                    self.zmat[(i, 0)] = temp;
                }
            }
            self.zmat[(knew, j)] = zero;
        }

        // The first npt components of the knew-th column of H.
        let mut w = OVector::<T, Dyn>::zeros_generic(Dyn(npt + n), U1);
        for i in 0..npt {
            w[i] = self.zmat[(knew, 0)] * self.zmat[(i, 0)];
        }

        let alpha = w[knew];
        let tau = self.vlag[knew];
        self.vlag[knew] -= T::one();

        let temp = denom.sqrt();
        let tempb = self.zmat[(knew, 0)] / temp;
        let tempa = tau / temp;
        for i in 0..npt {
            self.zmat[(i, 0)] = tempa * self.zmat[(i, 0)] - tempb * self.vlag[i];
        }

        for j in 0..n {
            let jp = npt + j;
            w[jp] = self.bmat[(knew, j)];
            let tempa = (alpha * self.vlag[jp] - tau * w[jp]) / denom;
            let tempb = (-beta * w[jp] - tau * self.vlag[jp]) / denom;

            for i in 0..=jp {
                self.bmat[(i, j)] += tempa * self.vlag[i] + tempb * w[i];
                if i >= npt {
                    self.bmat[(jp, i - npt)] = self.bmat[(i, j)];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::{dvector, storage::Storage, IsContiguous, Vector};

    use crate::core::{Domain, Function, GoalType, Objective, Problem};

    struct Paraboloid;

    impl Problem for Paraboloid {
        type Field = f64;

        fn domain(&self) -> Domain<Self::Field> {
            Domain::unconstrained(3)
        }
    }

    impl Function for Paraboloid {
        fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
        where
            Sx: Storage<Self::Field, Dyn> + IsContiguous,
        {
            x[0] * x[0] + x[0] * x[1] + 2.0 * x[1] * x[1] + x[0] - 3.0 * x[2] + x[2] * x[2]
        }
    }

    fn initial_model(npt: usize) -> Model<f64> {
        let f = Paraboloid;
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
        model
    }

    fn replace(model: &mut Model<f64>, knew: usize, d: [f64; 3]) {
        let npt = model.npt;
        let n = model.n;

        for j in 0..n {
            model.d[j] = d[j];
            model.xnew[j] = model.xopt[j] + d[j];
        }

        let xoptsq = model.xopt.norm_squared();
        let mut w = OVector::<f64, Dyn>::zeros_generic(Dyn(2 * (npt + n)), U1);
        let beta = model.lagrange_values(&mut w, xoptsq);
        let denom = model.hdiag(knew) * beta + model.vlag[knew].powi(2);
        assert!(denom > 0.0);

        model.update(beta, denom, knew);

        for j in 0..n {
            model.xpt[(knew, j)] = model.xnew[j];
        }
    }

    #[test]
    fn update_keeps_inverse_consistent() {
        let mut model = initial_model(7);

        replace(&mut model, 4, [0.3, -0.2, 0.1]);
        model.assert_inverse_consistent(1e-10);

        replace(&mut model, 0, [-0.5, 0.25, 0.7]);
        model.assert_inverse_consistent(1e-10);

        replace(&mut model, 6, [0.1, 0.1, 0.1]);
        model.assert_inverse_consistent(1e-10);
    }

    #[test]
    fn update_zeroes_row_of_zmat() {
        let mut model = initial_model(10);

        replace(&mut model, 8, [0.2, 0.4, -0.3]);

        for j in 1..model.zmat.ncols() {
            assert_eq!(model.zmat[(8, j)], 0.0);
        }
        model.assert_inverse_consistent(1e-10);
    }

    #[test]
    fn lagrange_values_at_interpolation_point() {
        let mut model = initial_model(7);
        let kopt = model.kopt;
        let k = if kopt == 3 { 4 } else { 3 };

        // Moving onto another interpolation point gives the Kronecker delta.
        let d = [
            model.xpt[(k, 0)] - model.xopt[0],
            model.xpt[(k, 1)] - model.xopt[1],
            model.xpt[(k, 2)] - model.xopt[2],
        ];
        for j in 0..3 {
            model.d[j] = d[j];
        }

        let xoptsq = model.xopt.norm_squared();
        let mut w = OVector::<f64, Dyn>::zeros_generic(Dyn(20), U1);
        model.lagrange_values(&mut w, xoptsq);

        for i in 0..model.npt {
            let expected = if i == k { 1.0 } else { 0.0 };
            approx::assert_abs_diff_eq!(model.vlag[i], expected, epsilon = 1e-12);
        }
    }
}
