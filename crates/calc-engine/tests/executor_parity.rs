//! Executor parity and optimizer soundness over generated formulas.

use calc_engine::{Engine, EngineOptions, Environment, ExecutionMode};
use proptest::prelude::*;

fn engine(execution_mode: ExecutionMode, optimizer_enabled: bool) -> Engine {
    Engine::with_options(EngineOptions {
        execution_mode,
        optimizer_enabled,
        ..EngineOptions::default()
    })
}

fn env(a: f64, b: f64) -> Environment {
    let mut env = Environment::new();
    env.insert("a".to_string(), a);
    env.insert("b".to_string(), b);
    env
}

/// Bitwise equality with NaN treated as equal to NaN.
fn same_result(x: f64, y: f64) -> bool {
    (x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits()
}

fn formula_for(choice: u8, digits: i32) -> String {
    match choice {
        0 => "a+b".to_string(),
        1 => "a-b".to_string(),
        2 => "a*b".to_string(),
        3 => "a/b".to_string(),
        4 => "a^b".to_string(),
        5 => "a%b".to_string(),
        6 => "-a^2 + b".to_string(),
        7 => "sin(a) + cos(b)".to_string(),
        8 => "max(a,b) * min(a,b)".to_string(),
        9 => "ifless(a,b,a,b)".to_string(),
        10 => "logn(abs(a)+2, 2)".to_string(),
        11 => "sqrt(abs(a*b))".to_string(),
        12 => "avg(a, b, a)".to_string(),
        13 => "ifequal(a, a, a*b, b)".to_string(),
        14 => format!("a * {digits} + b / (2^{digits})"),
        _ => "truncate(a) % ceiling(abs(b)+1)".to_string(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn compiled_matches_interpreted(
        a in -1000f64..1000f64,
        b in -1000f64..1000f64,
        digits in 1i32..6i32,
        choice in 0u8..16u8,
    ) {
        let formula = formula_for(choice, digits);
        let env = env(a, b);

        let compiled = engine(ExecutionMode::Compiled, true)
            .calculate_with(&formula, &env)
            .unwrap();
        let interpreted = engine(ExecutionMode::Interpreted, true)
            .calculate_with(&formula, &env)
            .unwrap();

        prop_assert!(
            same_result(compiled, interpreted),
            "{formula}: compiled {compiled} != interpreted {interpreted}"
        );
    }

    #[test]
    fn optimizer_preserves_results(
        a in -1000f64..1000f64,
        b in -1000f64..1000f64,
        digits in 1i32..6i32,
        choice in 0u8..16u8,
    ) {
        let formula = formula_for(choice, digits);
        let env = env(a, b);

        for mode in [ExecutionMode::Compiled, ExecutionMode::Interpreted] {
            let optimized = engine(mode, true).calculate_with(&formula, &env).unwrap();
            let unoptimized = engine(mode, false).calculate_with(&formula, &env).unwrap();
            prop_assert!(
                same_result(optimized, unoptimized),
                "{formula}: optimized {optimized} != unoptimized {unoptimized}"
            );
        }
    }

    #[test]
    fn folded_constant_formulas_match_direct_evaluation(
        x in -100f64..100f64,
        y in -100f64..100f64,
    ) {
        // A formula over literals only: the optimizer folds it to a single
        // constant, which must equal the unoptimized evaluation bit for bit.
        let formula = format!("({x}) * ({y}) + ({x}) / 2 - abs({y})");
        let optimized = engine(ExecutionMode::Compiled, true).calculate(&formula).unwrap();
        let unoptimized = engine(ExecutionMode::Compiled, false).calculate(&formula).unwrap();
        prop_assert!(same_result(optimized, unoptimized));
    }
}
