//! Concurrent formula cache keyed by the exact formula text.

use std::sync::{Arc, Mutex, PoisonError};

use ahash::AHashMap;

use crate::compile::Formula;
use crate::error::EngineError;

type Slot = Arc<Mutex<Option<Formula>>>;

/// Map-of-lazies cache with per-key single-flight builds.
///
/// The outer lock is held only to look up or insert a key's slot; the build
/// itself runs under that key's own lock, so builds of distinct formulas
/// proceed fully in parallel while concurrent callers for the same text
/// block until the first build completes and then share its result. Failed
/// builds are not retained; the next call for the same text rebuilds.
#[derive(Debug, Default)]
pub struct FormulaCache {
    slots: Mutex<AHashMap<Arc<str>, Slot>>,
}

impl FormulaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached callable for `text`, if any.
    pub fn try_get(&self, text: &str) -> Option<Formula> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(text).cloned()?
        };
        let built = slot.lock().unwrap_or_else(PoisonError::into_inner);
        built.clone()
    }

    /// Return the cached callable for `text`, building it with `build` if
    /// absent. At most one build runs per key at a time.
    pub fn get_or_build<F>(&self, text: &str, build: F) -> Result<Formula, EngineError>
    where
        F: FnOnce() -> Result<Formula, EngineError>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            match slots.get(text) {
                Some(slot) => Arc::clone(slot),
                None => {
                    let slot = Slot::default();
                    slots.insert(Arc::from(text), Arc::clone(&slot));
                    slot
                }
            }
        };

        let mut built = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(formula) = built.as_ref() {
            return Ok(formula.clone());
        }
        match build() {
            Ok(formula) => {
                *built = Some(formula.clone());
                Ok(formula)
            }
            Err(err) => {
                drop(built);
                // Vacate the slot so the next call rebuilds, unless another
                // failure already replaced it.
                let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
                if slots.get(text).is_some_and(|cur| Arc::ptr_eq(cur, &slot)) {
                    slots.remove(text);
                }
                Err(err)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
