//! Fluent surface binding a formula to a pre-declared variable set.

use crate::compile::Formula;
use crate::engine::Engine;
use crate::error::{EngineError, EvalError};
use crate::Environment;

/// Accumulates variable declarations for a formula and produces a
/// [`BoundFormula`] that takes its values positionally.
///
/// Created by [`Engine::formula`]. Declared names are lowercased; a free
/// variable of the formula that was not declared fails the build.
pub struct FormulaBuilder<'e> {
    engine: &'e Engine,
    text: String,
    variables: Vec<String>,
}

impl<'e> FormulaBuilder<'e> {
    pub(crate) fn new(engine: &'e Engine, text: &str) -> Self {
        Self {
            engine,
            text: text.to_string(),
            variables: Vec::new(),
        }
    }

    /// Declare a variable. Redeclaring a name keeps its original position.
    #[must_use]
    pub fn variable(mut self, name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if !self.variables.contains(&name) {
            self.variables.push(name);
        }
        self
    }

    pub fn build(self) -> Result<BoundFormula, EngineError> {
        for name in &self.variables {
            self.engine.check_variable_name(name)?;
        }

        let ast = self.engine.parse_formula(&self.text)?;
        let mut undeclared = None;
        ast.for_each_variable(&mut |name| {
            if undeclared.is_none() && !self.variables.iter().any(|v| v == name.as_ref()) {
                undeclared = Some(name.to_string());
            }
        });
        if let Some(name) = undeclared {
            return Err(EngineError::Eval(EvalError::UnboundVariable(name)));
        }

        let formula = self.engine.build(&self.text)?;
        Ok(BoundFormula {
            formula,
            variables: self.variables,
        })
    }
}

/// A built formula bound to an ordered variable declaration set.
#[derive(Debug, Clone)]
pub struct BoundFormula {
    formula: Formula,
    variables: Vec<String>,
}

impl BoundFormula {
    /// Declared variable names, in declaration order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Evaluate with one value per declared variable, in declaration order.
    pub fn evaluate(&self, values: &[f64]) -> Result<f64, EvalError> {
        if values.len() != self.variables.len() {
            return Err(EvalError::ArgumentCount {
                expected: self.variables.len(),
                got: values.len(),
            });
        }
        let env: Environment = self
            .variables
            .iter()
            .cloned()
            .zip(values.iter().copied())
            .collect();
        self.formula.evaluate(&env)
    }
}
