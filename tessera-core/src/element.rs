//! Element types carried by collections and model fields

use crate::model::Flat;
use serde_json::Value;
use std::fmt;

/// Runtime type tag of a value held by a [`Collection`](crate::Collection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Object,
    /// A model type, identified by its declared type name.
    Model(&'static str),
}

impl ElementType {
    /// Classify a plain JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ElementType::Null,
            Value::Bool(_) => ElementType::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => ElementType::Int,
            Value::Number(_) => ElementType::Float,
            Value::String(_) => ElementType::String,
            Value::Array(_) => ElementType::Array,
            Value::Object(_) => ElementType::Object,
        }
    }

    /// Returns true if this tag names a model type.
    pub fn is_model(&self) -> bool {
        matches!(self, ElementType::Model(_))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Null => "null",
            ElementType::Bool => "bool",
            ElementType::Int => "int",
            ElementType::Float => "float",
            ElementType::String => "string",
            ElementType::Array => "array",
            ElementType::Object => "object",
            ElementType::Model(name) => name,
        };
        f.write_str(name)
    }
}

/// A value that can live inside a [`Collection`](crate::Collection).
///
/// Statically typed elements (scalars, models) report the same
/// [`ElementType`] for every instance through [`Element::static_type`].
/// Dynamically typed elements (`serde_json::Value`) return `None` there and
/// are classified per value, which is where runtime type checks matter.
pub trait Element: Clone + fmt::Debug + Send + Sync + 'static {
    /// The type shared by every value of `Self`, if fixed at compile time.
    fn static_type() -> Option<ElementType>;

    /// The runtime type of this value.
    fn element_type(&self) -> ElementType;

    /// Flatten this element as a collection member.
    ///
    /// Shallow mode leaves model elements intact; deep mode resolves them.
    fn flatten_element(&self, deep: bool) -> Flat;
}

impl Element for Value {
    fn static_type() -> Option<ElementType> {
        None
    }

    fn element_type(&self) -> ElementType {
        ElementType::of(self)
    }

    fn flatten_element(&self, _deep: bool) -> Flat {
        Flat::Value(self.clone())
    }
}

macro_rules! impl_scalar_element {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(
            impl Element for $t {
                fn static_type() -> Option<ElementType> {
                    Some(ElementType::$kind)
                }

                fn element_type(&self) -> ElementType {
                    ElementType::$kind
                }

                fn flatten_element(&self, _deep: bool) -> Flat {
                    Flat::Value(Value::from(self.clone()))
                }
            }
        )*
    };
}

impl_scalar_element!(
    String => String,
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    u64 => Int,
    f64 => Float,
);
