//! Named-constant registry.

use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{EngineError, NameKind};

/// A registered named constant.
#[derive(Debug, Clone)]
pub struct ConstantInfo {
    name: Arc<str>,
    value: f64,
    overwritable: bool,
}

impl ConstantInfo {
    /// Create an entry. The name is lowercased for case-insensitive lookup.
    pub fn new(name: &str, value: f64, overwritable: bool) -> Self {
        Self {
            name: Arc::from(name.to_ascii_lowercase()),
            value,
            overwritable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_overwritable(&self) -> bool {
        self.overwritable
    }
}

/// Case-insensitive constant map with stable insertion-order iteration.
#[derive(Debug, Default)]
pub struct ConstantRegistry {
    slots: Vec<ConstantInfo>,
    index: AHashMap<Arc<str>, usize>,
}

impl ConstantRegistry {
    pub fn register(&mut self, entry: ConstantInfo) -> Result<(), EngineError> {
        let name = Arc::clone(&entry.name);
        if let Some(&slot) = self.index.get(name.as_ref()) {
            if !self.slots[slot].overwritable {
                return Err(EngineError::Registration {
                    kind: NameKind::Constant,
                    name: name.to_string(),
                });
            }
            self.slots[slot] = entry;
        } else {
            self.index.insert(name, self.slots.len());
            self.slots.push(entry);
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&ConstantInfo> {
        let key = name.to_ascii_lowercase();
        self.index.get(key.as_str()).map(|&slot| &self.slots[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConstantInfo> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Register `e` and `pi`. Both are non-overwritable.
pub(crate) fn register_defaults(registry: &mut ConstantRegistry) {
    registry
        .register(ConstantInfo::new("e", std::f64::consts::E, false))
        .expect("default constant names are unique");
    registry
        .register(ConstantInfo::new("pi", std::f64::consts::PI, false))
        .expect("default constant names are unique");
}
