use dfopt::algo::{cmaes::CmaesOptions, Cmaes};
use dfopt::nalgebra as na;
use dfopt::{Domain, Function, OptimizerDriver, Problem};
use na::{Dyn, IsContiguous};

// https://en.wikipedia.org/wiki/Rosenbrock_function
struct Rosenbrock {
    a: f64,
    b: f64,
}

impl Problem for Rosenbrock {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        [(-10.0, 10.0), (-10.0, 10.0)].into_iter().collect()
    }
}

impl Function for Rosenbrock {
    fn apply<Sx>(&self, x: &na::Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
    {
        (self.a - x[0]).powi(2) + self.b * (x[1] - x[0].powi(2)).powi(2)
    }
}

fn main() -> Result<(), String> {
    let f = Rosenbrock { a: 1.0, b: 100.0 };
    let tolerance = 1e-6;

    let mut bobyqa = OptimizerDriver::builder(&f)
        .with_initial(vec![-10.0, -5.0])
        .with_max_evaluations(10_000)
        .build();

    println!("running {}", bobyqa.name());
    let (x, fx) = bobyqa.optimize().map_err(|error| format!("{error}"))?;
    println!("f({:?}) = {}", x, fx);
    println!("evaluations = {}", bobyqa.evaluations());

    let mut cmaes = OptimizerDriver::builder(&f)
        .with_initial(vec![-10.0, -5.0])
        .with_max_evaluations(100_000)
        .with_algo(|f, dom| {
            let mut options = CmaesOptions::default();
            options.set_seed(42);
            Cmaes::with_options(f, dom, options)
        })
        .build();

    println!("running {}", cmaes.name());
    let (x, fx) = cmaes.optimize().map_err(|error| format!("{error}"))?;
    println!("f({:?}) = {}", x, fx);
    println!("evaluations = {}", cmaes.evaluations());

    if fx <= tolerance {
        Ok(())
    } else {
        Err("did not converge".to_string())
    }
}
