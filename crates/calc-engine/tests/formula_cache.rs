use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use calc_engine::{Engine, EngineError, EngineOptions, Environment, Formula, FormulaCache};

#[test]
fn repeated_builds_share_one_callable() {
    let engine = Engine::new();
    let first = engine.build("2+3*4").unwrap();
    let second = engine.build("2+3*4").unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(
        first.evaluate(&Environment::new()).unwrap(),
        second.evaluate(&Environment::new()).unwrap()
    );
}

#[test]
fn distinct_texts_build_distinct_callables() {
    let engine = Engine::new();
    let a = engine.build("1+1").unwrap();
    // Keys are the exact text, no normalization.
    let b = engine.build("1 + 1").unwrap();
    assert!(!a.ptr_eq(&b));
}

#[test]
fn disabling_the_cache_rebuilds_every_time() {
    let engine = Engine::with_options(EngineOptions {
        cache_enabled: false,
        ..EngineOptions::default()
    });
    let first = engine.build("2+2").unwrap();
    let second = engine.build("2+2").unwrap();
    assert!(!first.ptr_eq(&second));
    assert_eq!(first.evaluate(&Environment::new()).unwrap(), 4.0);
    assert_eq!(second.evaluate(&Environment::new()).unwrap(), 4.0);
}

#[test]
fn failed_builds_are_retried_on_the_next_call() {
    let mut engine = Engine::new();
    assert!(matches!(
        engine.build("future(1)").unwrap_err(),
        EngineError::Parse(_)
    ));

    // The failure was not cached: once the function exists, the same text
    // builds cleanly.
    engine.add_function("future", |x: f64| x + 1.0).unwrap();
    assert_eq!(engine.calculate("future(1)").unwrap(), 2.0);
}

#[test]
fn same_key_builds_are_single_flight() {
    let cache = FormulaCache::new();
    let builds = AtomicUsize::new(0);
    let uncached = Engine::with_options(EngineOptions {
        cache_enabled: false,
        ..EngineOptions::default()
    });

    thread::scope(|scope| {
        let mut handles = Vec::new();
        for _ in 0..8 {
            handles.push(scope.spawn(|| {
                cache
                    .get_or_build("k", || {
                        builds.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        uncached.build("7")
                    })
                    .unwrap()
            }));
        }
        let formulas: Vec<Formula> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for formula in &formulas[1..] {
            assert!(formula.ptr_eq(&formulas[0]));
        }
    });

    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_distinct_keys_all_build() {
    let engine = Engine::new();

    thread::scope(|scope| {
        let mut handles = Vec::new();
        for i in 0..16 {
            let engine = &engine;
            handles.push(scope.spawn(move || {
                let formula = format!("{i} + 1");
                engine.calculate(&formula).unwrap()
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), i as f64 + 1.0);
        }
    });
}

#[test]
fn built_callables_are_concurrently_invocable() {
    let engine = Engine::new();
    let formula = engine.build("x*x + 1").unwrap();

    thread::scope(|scope| {
        for i in 0..8 {
            let formula = formula.clone();
            scope.spawn(move || {
                let mut env = Environment::new();
                env.insert("x".to_string(), i as f64);
                assert_eq!(formula.evaluate(&env).unwrap(), (i * i) as f64 + 1.0);
            });
        }
    });
}

#[test]
fn failed_evaluation_does_not_invalidate_the_cached_callable() {
    let engine = Engine::new();
    let first = engine.build("x + 1").unwrap();
    assert!(first.evaluate(&Environment::new()).is_err());

    let second = engine.build("x + 1").unwrap();
    assert!(first.ptr_eq(&second));
    let mut env = Environment::new();
    env.insert("x".to_string(), 1.0);
    assert_eq!(second.evaluate(&env).unwrap(), 2.0);
}
