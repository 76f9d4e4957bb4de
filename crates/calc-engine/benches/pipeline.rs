use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use calc_engine::{Engine, EngineOptions, Environment, ExecutionMode};

const FORMULA: &str = "2*sin(x+pi)/max(a,b) + logn(abs(x)+2, 2) - a^2";

fn env() -> Environment {
    let mut env = Environment::new();
    env.insert("x".to_string(), 1.5);
    env.insert("a".to_string(), 2.0);
    env.insert("b".to_string(), 3.0);
    env
}

fn bench_parse(c: &mut Criterion) {
    let engine = Engine::new();
    c.bench_function("parse", |b| {
        b.iter(|| engine.parse_formula(FORMULA).unwrap())
    });
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("build_cold", |b| {
        b.iter_batched(
            || {
                Engine::with_options(EngineOptions {
                    cache_enabled: false,
                    ..EngineOptions::default()
                })
            },
            |engine| engine.build(FORMULA).unwrap(),
            BatchSize::SmallInput,
        )
    });

    let cached = Engine::new();
    cached.build(FORMULA).unwrap();
    c.bench_function("build_cache_hit", |b| {
        b.iter(|| cached.build(FORMULA).unwrap())
    });
}

fn bench_eval(c: &mut Criterion) {
    let env = env();

    let compiled = Engine::new().build(FORMULA).unwrap();
    c.bench_function("eval_compiled", |b| {
        b.iter(|| compiled.evaluate(&env).unwrap())
    });

    let interpreted = Engine::with_options(EngineOptions {
        execution_mode: ExecutionMode::Interpreted,
        ..EngineOptions::default()
    })
    .build(FORMULA)
    .unwrap();
    c.bench_function("eval_interpreted", |b| {
        b.iter(|| interpreted.evaluate(&env).unwrap())
    });
}

fn bench_calculate(c: &mut Criterion) {
    let engine = Engine::new();
    let env = env();
    c.bench_function("calculate_cached", |b| {
        b.iter(|| engine.calculate_with(FORMULA, &env).unwrap())
    });
}

criterion_group!(benches, bench_parse, bench_build, bench_eval, bench_calculate);
criterion_main!(benches);
