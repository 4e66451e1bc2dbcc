//! Benchmarks for tree generation, evaluation and breeding.

#![allow(missing_docs)] // Benchmark macros generate undocumented functions
#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sprig::events::EventBus;
use sprig::gp::{
    Breeder, EvaluationError, EvolutionConfig, InitialisationConfig, TreeGenerator, evaluate_population, initialise,
};
use sprig::node::{Bindings, Function, Primitive};
use sprig::{DataType, Individual, Syntax, Value};

fn parity_syntax() -> Syntax {
    Syntax::new(
        vec![
            Function::And.into(),
            Function::Or.into(),
            Function::Not.into(),
            Primitive::variable("D0", DataType::Boolean),
            Primitive::variable("D1", DataType::Boolean),
            Primitive::variable("D2", DataType::Boolean),
        ],
        DataType::Boolean,
    )
    .unwrap()
}

fn even_three_parity(individual: &Individual) -> Result<f64, EvaluationError> {
    let mut errors = 0.0;
    for case in 0..8_u32 {
        let mut ctx = Bindings::new()
            .with("D0", case & 1 == 1)
            .with("D1", case & 2 == 2)
            .with("D2", case & 4 == 4);
        if individual.evaluate(&mut ctx)? != Value::Boolean(case.count_ones() % 2 == 0) {
            errors += 1.0;
        }
    }
    Ok(errors)
}

fn bench_initialise(c: &mut Criterion) {
    let syntax = parity_syntax();
    let generator = TreeGenerator::new(&syntax, 6);
    let config = InitialisationConfig::default();

    c.bench_function("initialise_rhh_500", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| black_box(initialise(&generator, &config, DataType::Boolean, 500, &mut rng).unwrap()));
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let syntax = parity_syntax();
    let generator = TreeGenerator::new(&syntax, 6);
    let mut rng = StdRng::seed_from_u64(2);
    let population = initialise(
        &generator,
        &InitialisationConfig::default(),
        DataType::Boolean,
        500,
        &mut rng,
    )
    .unwrap();

    for (name, parallel) in [("evaluate_500_sequential", false), ("evaluate_500_parallel", true)] {
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut fresh = population.clone();
                black_box(evaluate_population(&mut fresh, &even_three_parity, parallel).unwrap())
            });
        });
    }
}

fn bench_breed(c: &mut Criterion) {
    let syntax = parity_syntax();
    let config = EvolutionConfig {
        population_size: 500,
        ..EvolutionConfig::default()
    };
    let generator = TreeGenerator::new(&syntax, 6);
    let mut rng = StdRng::seed_from_u64(3);
    let mut population = initialise(&generator, &config.initialisation, DataType::Boolean, 500, &mut rng).unwrap();
    evaluate_population(&mut population, &even_three_parity, true).unwrap();

    let breeder = Breeder::new(&config, &syntax, &generator);
    let bus = EventBus::new();
    c.bench_function("breed_generation_500", |b| {
        b.iter(|| black_box(breeder.breed(&population, &bus, 0, 1, &mut rng).unwrap()));
    });
}

criterion_group!(benches, bench_initialise, bench_evaluate, bench_breed);
criterion_main!(benches);
