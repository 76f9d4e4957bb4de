//! Branching intrinsics and the volatile `random` builtin.

use std::sync::Arc;

use super::{Arity, FunctionInfo, FunctionRegistry, Volatility};

fn fixed(
    registry: &mut FunctionRegistry,
    name: &str,
    arity: usize,
    volatility: Volatility,
    callable: Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>,
) {
    let entry = FunctionInfo::new(name, Arity::Fixed(arity), callable, volatility, false);
    registry
        .register(entry)
        .expect("default function names are unique");
}

pub(crate) fn register_logical_defaults(registry: &mut FunctionRegistry) {
    fixed(
        registry,
        "if",
        3,
        Volatility::NonVolatile,
        Arc::new(|args| if args[0] != 0.0 { args[1] } else { args[2] }),
    );
    fixed(
        registry,
        "ifless",
        4,
        Volatility::NonVolatile,
        Arc::new(|args| if args[0] < args[1] { args[2] } else { args[3] }),
    );
    fixed(
        registry,
        "ifmore",
        4,
        Volatility::NonVolatile,
        Arc::new(|args| if args[0] > args[1] { args[2] } else { args[3] }),
    );
    // Strict binary64 equality; no tolerance.
    fixed(
        registry,
        "ifequal",
        4,
        Volatility::NonVolatile,
        Arc::new(|args| if args[0] == args[1] { args[2] } else { args[3] }),
    );
    fixed(
        registry,
        "random",
        0,
        Volatility::Volatile,
        Arc::new(|_| rand::random::<f64>()),
    );
}
