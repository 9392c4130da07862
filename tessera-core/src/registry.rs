//! Name-based lookup of conversion targets
//!
//! Consumers that configure their targets by name (for instance a cache
//! repository wired from settings) register model types here and convert
//! through [`ModelRegistry::convert_named`]. Unknown names fail with
//! `InvalidTarget` before any data is inspected.

use crate::convert::convert_auto;
use crate::error::{ConversionError, TesseraResult};
use crate::model::{Flatten, Model};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

type ConvertFn = fn(&Value) -> TesseraResult<Box<dyn Flatten>>;

fn convert_boxed<M: Model>(raw: &Value) -> TesseraResult<Box<dyn Flatten>> {
    let converted = convert_auto::<M>(raw)?;
    Ok(Box::new(converted))
}

/// Registry of model types addressable by [`Model::TYPE_NAME`].
#[derive(Default, Clone)]
pub struct ModelRegistry {
    converters: HashMap<&'static str, ConvertFn>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("types", &self.names())
            .finish()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `M` under its type name. Re-registering replaces the entry.
    pub fn register<M: Model>(&mut self) -> &mut Self {
        self.converters.insert(M::TYPE_NAME, convert_boxed::<M>);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<M: Model>(mut self) -> Self {
        self.register::<M>();
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.converters.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.converters.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Convert `raw` into the model (or collection) registered as
    /// `type_name`.
    pub fn convert_named(&self, type_name: &str, raw: &Value) -> TesseraResult<Box<dyn Flatten>> {
        let convert = self.converters.get(type_name).ok_or_else(|| {
            ConversionError::InvalidTarget {
                target: type_name.to_string(),
                reason: "not a registered model type".to_string(),
            }
        })?;
        convert(raw)
    }
}
