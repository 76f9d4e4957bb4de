//! Function registry and registration plumbing.
//!
//! Built-in functions live in dedicated modules split by category.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{EngineError, NameKind};

mod builtins_logical;
mod builtins_math;

pub(crate) use builtins_logical::register_logical_defaults;
pub(crate) use builtins_math::register_math_defaults;

/// Variadic entries accept at least this many arguments.
pub const VARIADIC_MIN_ARGS: usize = 1;

/// Largest fixed arity a function entry may declare.
pub const MAX_FIXED_ARITY: usize = 16;

/// Whether a function may be constant-folded.
///
/// A [`Volatility::NonVolatile`] entry is idempotent: side-effect free and
/// deterministic on its arguments, so a call whose arguments are all
/// constants may be replaced by its value at build time. `Volatile` entries
/// (e.g. `random`) must be re-invoked on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volatility {
    NonVolatile,
    Volatile,
}

/// Declared argument count of a function entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

impl Arity {
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Arity::Fixed(n) => argc == n,
            Arity::Variadic => argc >= VARIADIC_MIN_ARGS,
        }
    }
}

/// The uniform native shape every function entry is stored as.
///
/// Fixed-arity registrations are adapted to this shape by [`IntoFunction`];
/// variadic entries receive the full packed argument slice.
pub type NativeFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// A registered function: name, arity, callable and folding/overwrite flags.
pub struct FunctionInfo {
    name: Arc<str>,
    arity: Arity,
    callable: NativeFn,
    volatility: Volatility,
    overwritable: bool,
}

impl FunctionInfo {
    /// Create an entry. The name is lowercased for case-insensitive lookup.
    pub fn new(
        name: &str,
        arity: Arity,
        callable: NativeFn,
        volatility: Volatility,
        overwritable: bool,
    ) -> Self {
        Self {
            name: Arc::from(name.to_ascii_lowercase()),
            arity,
            callable,
            volatility,
            overwritable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn volatility(&self) -> Volatility {
        self.volatility
    }

    pub fn is_idempotent(&self) -> bool {
        self.volatility == Volatility::NonVolatile
    }

    pub fn is_overwritable(&self) -> bool {
        self.overwritable
    }

    pub fn invoke(&self, args: &[f64]) -> f64 {
        (self.callable)(args)
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }
}

impl fmt::Debug for FunctionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionInfo")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("volatility", &self.volatility)
            .field("overwritable", &self.overwritable)
            .finish_non_exhaustive()
    }
}

/// Adapter from natively-typed closures (`Fn(f64, f64) -> f64`, ...) to the
/// registry's packed-slice shape. Implemented for all arities up to
/// [`MAX_FIXED_ARITY`]; the `Args` parameter only disambiguates the impls.
pub trait IntoFunction<Args> {
    const ARITY: usize;

    fn into_native(self) -> NativeFn;
}

macro_rules! f64_for {
    ($idx:tt) => {
        f64
    };
}

macro_rules! impl_into_function {
    ($count:expr => $($idx:tt)*) => {
        impl<F> IntoFunction<[f64; $count]> for F
        where
            F: Fn($(f64_for!($idx)),*) -> f64 + Send + Sync + 'static,
        {
            const ARITY: usize = $count;

            fn into_native(self) -> NativeFn {
                Arc::new(move |args: &[f64]| self($(args[$idx]),*))
            }
        }
    };
}

impl_into_function!(0 =>);
impl_into_function!(1 => 0);
impl_into_function!(2 => 0 1);
impl_into_function!(3 => 0 1 2);
impl_into_function!(4 => 0 1 2 3);
impl_into_function!(5 => 0 1 2 3 4);
impl_into_function!(6 => 0 1 2 3 4 5);
impl_into_function!(7 => 0 1 2 3 4 5 6);
impl_into_function!(8 => 0 1 2 3 4 5 6 7);
impl_into_function!(9 => 0 1 2 3 4 5 6 7 8);
impl_into_function!(10 => 0 1 2 3 4 5 6 7 8 9);
impl_into_function!(11 => 0 1 2 3 4 5 6 7 8 9 10);
impl_into_function!(12 => 0 1 2 3 4 5 6 7 8 9 10 11);
impl_into_function!(13 => 0 1 2 3 4 5 6 7 8 9 10 11 12);
impl_into_function!(14 => 0 1 2 3 4 5 6 7 8 9 10 11 12 13);
impl_into_function!(15 => 0 1 2 3 4 5 6 7 8 9 10 11 12 13 14);
impl_into_function!(16 => 0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15);

/// Case-insensitive function map with stable insertion-order iteration.
///
/// Replacing an overwritable entry keeps its original slot so iteration
/// order stays deterministic across re-registrations.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    slots: Vec<Arc<FunctionInfo>>,
    index: AHashMap<Arc<str>, usize>,
}

impl FunctionRegistry {
    pub fn register(&mut self, entry: FunctionInfo) -> Result<(), EngineError> {
        let name = entry.name_arc();
        if let Some(&slot) = self.index.get(name.as_ref()) {
            if !self.slots[slot].overwritable {
                return Err(EngineError::Registration {
                    kind: NameKind::Function,
                    name: name.to_string(),
                });
            }
            self.slots[slot] = Arc::new(entry);
        } else {
            self.index.insert(name, self.slots.len());
            self.slots.push(Arc::new(entry));
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<FunctionInfo>> {
        let key = name.to_ascii_lowercase();
        self.index.get(key.as_str()).map(|&slot| &self.slots[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionInfo> {
        self.slots.iter().map(|entry| entry.as_ref())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Register the default library. All entries are non-overwritable.
pub(crate) fn register_defaults(registry: &mut FunctionRegistry) {
    register_math_defaults(registry);
    register_logical_defaults(registry);
}
