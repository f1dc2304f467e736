use criterion::{criterion_group, criterion_main, Criterion};
use dfopt::{
    algo::{Bobyqa, Cmaes},
    nalgebra as na,
    testing::*,
    Domain, GoalType, Objective, Optimizer, Problem,
};

const MAX_EVALUATIONS: usize = 1_000_000;
const TOLERANCE: f64 = 1e-8;

fn optimize<F, O>(f: &F, dom: &Domain<F::Field>, mut optimizer: O, mut x: na::DVector<f64>) -> bool
where
    F: TestFunction<Field = f64>,
    O: Optimizer<F>,
{
    let mut obj = Objective::with_max_evaluations(f, GoalType::Minimize, MAX_EVALUATIONS);

    match optimizer.optimize(&mut obj, dom, &mut x) {
        Ok(fx) => fx <= TOLERANCE,
        Err(_) => false,
    }
}

fn sphere(c: &mut Criterion) {
    let f = Sphere::new(10);
    let dom = f.domain();
    let x = &f.initials()[0];

    c.bench_function("BOBYQA sphere", |b| {
        b.iter(|| assert!(optimize(&f, &dom, Bobyqa::new(&f, &dom), x.clone_owned())))
    });

    c.bench_function("CMA-ES sphere", |b| {
        b.iter(|| assert!(optimize(&f, &dom, Cmaes::new(&f, &dom), x.clone_owned())))
    });
}

fn rosenbrock1(c: &mut Criterion) {
    let f = ExtendedRosenbrock::new(2);
    let dom = f.domain();
    let x = &f.initials()[0];

    c.bench_function("BOBYQA rosenbrock 1", |b| {
        b.iter(|| assert!(optimize(&f, &dom, Bobyqa::new(&f, &dom), x.clone_owned())))
    });

    c.bench_function("CMA-ES rosenbrock 1", |b| {
        b.iter(|| assert!(optimize(&f, &dom, Cmaes::new(&f, &dom), x.clone_owned())))
    });
}

fn rosenbrock2(c: &mut Criterion) {
    let f = ExtendedRosenbrock::new(2);
    let dom = f.domain();
    let x = &f.initials()[1];

    c.bench_function("BOBYQA rosenbrock 2", |b| {
        b.iter(|| assert!(optimize(&f, &dom, Bobyqa::new(&f, &dom), x.clone_owned())))
    });

    c.bench_function("CMA-ES rosenbrock 2", |b| {
        b.iter(|| assert!(optimize(&f, &dom, Cmaes::new(&f, &dom), x.clone_owned())))
    });
}

fn rosenbrock_large(c: &mut Criterion) {
    let f = ExtendedRosenbrock::new(20);
    let dom = f.domain();
    let x = &f.initials()[0];

    c.bench_function("BOBYQA rosenbrock large", |b| {
        b.iter(|| assert!(optimize(&f, &dom, Bobyqa::new(&f, &dom), x.clone_owned())))
    });
}

fn ellipsoid(c: &mut Criterion) {
    let f = Ellipsoid::new(5);
    let dom = f.domain();
    let x = &f.initials()[1];

    c.bench_function("BOBYQA ellipsoid", |b| {
        b.iter(|| assert!(optimize(&f, &dom, Bobyqa::new(&f, &dom), x.clone_owned())))
    });

    c.bench_function("CMA-ES ellipsoid", |b| {
        b.iter(|| assert!(optimize(&f, &dom, Cmaes::new(&f, &dom), x.clone_owned())))
    });
}

criterion_group!(
    optimizers,
    sphere,
    rosenbrock1,
    rosenbrock2,
    rosenbrock_large,
    ellipsoid
);
criterion_main!(optimizers);
