//! Scientific builtins: trigonometry, logarithms, roots and rounding.

use std::sync::Arc;

use super::{Arity, FunctionInfo, FunctionRegistry, NativeFn, Volatility};

fn fixed(registry: &mut FunctionRegistry, name: &str, arity: usize, callable: NativeFn) {
    let entry = FunctionInfo::new(
        name,
        Arity::Fixed(arity),
        callable,
        Volatility::NonVolatile,
        false,
    );
    registry
        .register(entry)
        .expect("default function names are unique");
}

fn unary(registry: &mut FunctionRegistry, name: &str, f: fn(f64) -> f64) {
    fixed(registry, name, 1, Arc::new(move |args| f(args[0])));
}

fn binary(registry: &mut FunctionRegistry, name: &str, f: fn(f64, f64) -> f64) {
    fixed(registry, name, 2, Arc::new(move |args| f(args[0], args[1])));
}

fn variadic(registry: &mut FunctionRegistry, name: &str, f: fn(&[f64]) -> f64) {
    let entry = FunctionInfo::new(
        name,
        Arity::Variadic,
        Arc::new(move |args| f(args)),
        Volatility::NonVolatile,
        false,
    );
    registry
        .register(entry)
        .expect("default function names are unique");
}

pub(crate) fn register_math_defaults(registry: &mut FunctionRegistry) {
    unary(registry, "sin", f64::sin);
    unary(registry, "cos", f64::cos);
    unary(registry, "tan", f64::tan);
    unary(registry, "csc", |x| 1.0 / x.sin());
    unary(registry, "sec", |x| 1.0 / x.cos());
    unary(registry, "cot", |x| 1.0 / x.tan());
    unary(registry, "asin", f64::asin);
    unary(registry, "acos", f64::acos);
    unary(registry, "atan", f64::atan);
    unary(registry, "acot", |x| (1.0 / x).atan());
    unary(registry, "loge", f64::ln);
    unary(registry, "log10", f64::log10);
    binary(registry, "logn", f64::log);
    unary(registry, "sqrt", f64::sqrt);
    unary(registry, "abs", f64::abs);
    binary(registry, "max", f64::max);
    binary(registry, "min", f64::min);
    unary(registry, "ceiling", f64::ceil);
    unary(registry, "floor", f64::floor);
    unary(registry, "truncate", f64::trunc);
    variadic(registry, "avg", average);
    variadic(registry, "median", median);
}

fn average(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
