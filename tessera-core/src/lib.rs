//! Tessera Core - Typed Models and Collections
//!
//! Converts loosely-typed wire data (decoded JSON) into validated value
//! objects and homogeneous collections, and flattens them back into plain
//! nested data. Every other layer of the SDK (transport, cache, domain
//! repositories) consumes these types.
//!
//! - [`Collection`]: ordered, homogeneous, indexable container
//! - [`Model`] / [`Flatten`]: value objects and their flattening rules
//! - [`convert_to_model`], [`convert_to_collection`], [`convert_auto`]:
//!   the structural converter
//! - [`ModelRegistry`]: name-based conversion targets
//! - [`validation`]: domain checks used by model constructors

pub mod collection;
pub mod convert;
pub mod element;
pub mod error;
pub mod model;
pub mod registry;
pub mod validation;

#[cfg(test)]
mod test_models;

pub use collection::Collection;
pub use convert::{
    convert_auto, convert_auto_str, convert_to_collection, convert_to_model, decode_json, Choice,
    Converted, Fields, Scalar,
};
pub use element::{Element, ElementType};
pub use error::{
    CacheError, CollectionError, ConfigError, ConversionError, TesseraError, TesseraResult,
    ValidationError,
};
pub use model::{flatten_model, Attribute, Flat, Flatten, Model};
pub use registry::ModelRegistry;
