use std::str::FromStr;
use std::sync::Arc;

use crate::ast::Expr;
use crate::builder::FormulaBuilder;
use crate::cache::FormulaCache;
use crate::compile::{self, Formula};
use crate::constants::{self, ConstantInfo, ConstantRegistry};
use crate::error::{EngineError, NameKind};
use crate::functions::{
    self, Arity, FunctionInfo, FunctionRegistry, IntoFunction, Volatility,
};
use crate::locale::LocaleConfig;
use crate::parser;
use crate::{interpret, optimizer, Environment};

/// Which executor [`Engine::build`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Walk the tree on every evaluation.
    Interpreted,
    /// Stage the tree into a closure chain at build time.
    Compiled,
}

impl FromStr for ExecutionMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("interpreted") {
            Ok(ExecutionMode::Interpreted)
        } else if s.eq_ignore_ascii_case("compiled") {
            Ok(ExecutionMode::Compiled)
        } else {
            Err(EngineError::Config(s.to_string()))
        }
    }
}

/// Construction-time engine configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub locale: LocaleConfig,
    pub execution_mode: ExecutionMode,
    pub cache_enabled: bool,
    pub optimizer_enabled: bool,
    /// Register the default scientific library.
    pub default_functions: bool,
    /// Register `e` and `pi`.
    pub default_constants: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            locale: LocaleConfig::en_us(),
            execution_mode: ExecutionMode::Compiled,
            cache_enabled: true,
            optimizer_enabled: true,
            default_functions: true,
            default_constants: true,
        }
    }
}

/// Formula evaluation engine.
///
/// Owns the function and constant registries and the formula cache.
/// Evaluation entry points take `&self` and are safe to call concurrently;
/// registration takes `&mut self`, so registries are populated during setup
/// and frozen once evaluation starts. Built callables keep invoking the
/// registry entries they were resolved against even if an overwritable
/// entry is later replaced.
pub struct Engine {
    options: EngineOptions,
    functions: FunctionRegistry,
    constants: ConstantRegistry,
    cache: FormulaCache,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        let mut funcs = FunctionRegistry::default();
        if options.default_functions {
            functions::register_defaults(&mut funcs);
        }
        let mut consts = ConstantRegistry::default();
        if options.default_constants {
            constants::register_defaults(&mut consts);
        }
        Self {
            options,
            functions: funcs,
            constants: consts,
            cache: FormulaCache::new(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Evaluate a formula with no caller variables.
    pub fn calculate(&self, formula: &str) -> Result<f64, EngineError> {
        self.calculate_with(formula, &Environment::new())
    }

    /// Evaluate a formula against caller variables.
    ///
    /// Variable names are lowercased, checked against the registries, and
    /// the build goes through the formula cache. The caller's map is copied,
    /// never aliased or mutated.
    pub fn calculate_with(
        &self,
        formula: &str,
        variables: &Environment,
    ) -> Result<f64, EngineError> {
        let variables = lowercase_names(variables);
        self.verify_normalized(formula, &variables)?;
        let built = self.build(formula)?;
        let env = self.compose_environment(variables);
        Ok(built.evaluate(&env)?)
    }

    /// Evaluate without lowercasing or verifying variable names.
    ///
    /// The caller is responsible for pre-normalized, collision-free names.
    /// The map is still copied before constants are overlaid.
    pub fn calculate_unchecked(
        &self,
        formula: &str,
        variables: &Environment,
    ) -> Result<f64, EngineError> {
        let built = self.build(formula)?;
        let env = self.compose_environment(variables.clone());
        Ok(built.evaluate(&env)?)
    }

    /// Check the formula text and that no variable shadows a registered
    /// function or a non-overwritable constant.
    pub fn verify(&self, formula: &str, variables: &Environment) -> Result<(), EngineError> {
        let variables = lowercase_names(variables);
        self.verify_normalized(formula, &variables)
    }

    fn verify_normalized(
        &self,
        formula: &str,
        variables: &Environment,
    ) -> Result<(), EngineError> {
        if formula.trim().is_empty() {
            return Err(EngineError::EmptyFormula);
        }
        for name in variables.keys() {
            self.check_variable_name(name)?;
        }
        Ok(())
    }

    pub(crate) fn check_variable_name(&self, name: &str) -> Result<(), EngineError> {
        if self.functions.contains(name) {
            return Err(EngineError::VariableName {
                kind: NameKind::Function,
                name: name.to_string(),
            });
        }
        if self
            .constants
            .lookup(name)
            .is_some_and(|c| !c.is_overwritable())
        {
            return Err(EngineError::VariableName {
                kind: NameKind::Constant,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Build the callable for a formula without invoking it.
    ///
    /// With caching enabled, repeated builds of the same text return the
    /// same shared callable and skip lexing entirely.
    pub fn build(&self, formula: &str) -> Result<Formula, EngineError> {
        if formula.trim().is_empty() {
            return Err(EngineError::EmptyFormula);
        }
        if self.options.cache_enabled {
            self.cache
                .get_or_build(formula, || self.build_uncached(formula))
        } else {
            self.build_uncached(formula)
        }
    }

    fn build_uncached(&self, formula: &str) -> Result<Formula, EngineError> {
        let mut ast = self.parse_formula(formula)?;
        if self.options.optimizer_enabled {
            ast = optimizer::optimize(ast);
        }
        Ok(match self.options.execution_mode {
            ExecutionMode::Compiled => compile::compile(&ast),
            ExecutionMode::Interpreted => {
                let ast = Arc::new(ast);
                Formula::from_fn(move |env| interpret::evaluate(&ast, env))
            }
        })
    }

    /// Parse a formula into its (unoptimized) tree against this engine's
    /// registries.
    pub fn parse_formula(&self, formula: &str) -> Result<Expr, EngineError> {
        if formula.trim().is_empty() {
            return Err(EngineError::EmptyFormula);
        }
        let expr = parser::parse_formula(
            formula,
            &self.options.locale,
            &self.functions,
            &self.constants,
        )?;
        Ok(expr)
    }

    /// Start a fluent builder that binds a formula to a pre-declared
    /// variable set.
    pub fn formula(&self, text: &str) -> FormulaBuilder<'_> {
        FormulaBuilder::new(self, text)
    }

    /// Register a fixed-arity function (arity 0..=16, inferred from the
    /// closure). The entry is idempotent and may be constant-folded.
    pub fn add_function<Args, F>(&mut self, name: &str, function: F) -> Result<(), EngineError>
    where
        F: IntoFunction<Args>,
    {
        self.functions.register(FunctionInfo::new(
            name,
            Arity::Fixed(F::ARITY),
            function.into_native(),
            Volatility::NonVolatile,
            true,
        ))
    }

    /// Register a fixed-arity function that must be re-invoked on every
    /// evaluation; it is never constant-folded.
    pub fn add_volatile_function<Args, F>(
        &mut self,
        name: &str,
        function: F,
    ) -> Result<(), EngineError>
    where
        F: IntoFunction<Args>,
    {
        self.functions.register(FunctionInfo::new(
            name,
            Arity::Fixed(F::ARITY),
            function.into_native(),
            Volatility::Volatile,
            true,
        ))
    }

    /// Register a variadic function receiving the packed argument slice
    /// (at least one argument at every call site).
    pub fn add_variadic_function<F>(&mut self, name: &str, function: F) -> Result<(), EngineError>
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.functions.register(FunctionInfo::new(
            name,
            Arity::Variadic,
            Arc::new(function),
            Volatility::NonVolatile,
            true,
        ))
    }

    pub fn add_constant(&mut self, name: &str, value: f64) -> Result<(), EngineError> {
        self.constants.register(ConstantInfo::new(name, value, true))
    }

    /// Registered functions, in insertion order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionInfo> {
        self.functions.iter()
    }

    /// Registered constants, in insertion order.
    pub fn constants(&self) -> impl Iterator<Item = &ConstantInfo> {
        self.constants.iter()
    }

    fn compose_environment(&self, mut variables: Environment) -> Environment {
        for constant in self.constants.iter() {
            variables.insert(constant.name().to_string(), constant.value());
        }
        variables
    }
}

fn lowercase_names(variables: &Environment) -> Environment {
    variables
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), *value))
        .collect()
}
