//! Model capability: typed value objects and their flattening rules
//!
//! A model is an immutable value object built only through its validating
//! constructor. The structural converter reaches that constructor through
//! [`Model::bind`]; flattening walks the field table exposed by
//! [`Model::attributes`].
//!
//! # Flattening
//!
//! `flatten(deep)` turns a model graph back into plain nested data:
//!
//! - nested model fields are always flattened,
//! - collection fields are flattened only when `deep` is set, otherwise they
//!   are handed back intact as [`Flat::Nested`].
//!
//! Bulk collection fields therefore cost nothing on a shallow flatten while
//! single nested objects stay normalized. [`Flat::into_value`] resolves
//! anything left intact.

use crate::convert::Fields;
use crate::element::Element;
use crate::error::TesseraResult;
use serde_json::{Map, Value};
use std::fmt;

/// Something that can be flattened into plain nested data.
pub trait Flatten: fmt::Debug + Send + Sync {
    /// Flatten into a [`Flat`] tree. See the module docs for the rules.
    fn flatten(&self, deep: bool) -> Flat;

    /// Clone into a boxed trait object, used when a shallow flatten leaves
    /// a node intact.
    fn to_boxed(&self) -> Box<dyn Flatten>;

    /// Fully resolved plain data.
    fn to_value(&self) -> Value {
        self.flatten(true).into_value()
    }
}

/// Result of a flatten: plain data, possibly with intact nodes left by a
/// shallow pass.
#[derive(Debug)]
pub enum Flat {
    /// Plain data.
    Value(Value),
    /// The named fields of a model, in declaration order.
    Record(Vec<(String, Flat)>),
    /// Members of a collection, in index order.
    List(Vec<Flat>),
    /// A model or collection left unflattened.
    Nested(Box<dyn Flatten>),
}

impl Flat {
    /// Resolve into plain data, deep-flattening any intact nodes.
    pub fn into_value(self) -> Value {
        match self {
            Flat::Value(value) => value,
            Flat::Record(fields) => {
                let mut map = Map::with_capacity(fields.len());
                for (name, field) in fields {
                    map.insert(name, field.into_value());
                }
                Value::Object(map)
            }
            Flat::List(items) => Value::Array(items.into_iter().map(Flat::into_value).collect()),
            Flat::Nested(inner) => inner.flatten(true).into_value(),
        }
    }

    /// Returns true if no intact node remains anywhere in the tree.
    pub fn is_plain(&self) -> bool {
        match self {
            Flat::Value(_) => true,
            Flat::Record(fields) => fields.iter().all(|(_, f)| f.is_plain()),
            Flat::List(items) => items.iter().all(Flat::is_plain),
            Flat::Nested(_) => false,
        }
    }

    /// Look up a field of a record.
    pub fn field(&self, name: &str) -> Option<&Flat> {
        match self {
            Flat::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, f)| f),
            _ => None,
        }
    }
}

/// One field of a model, as exposed to flattening.
#[derive(Debug)]
pub enum Attribute<'a> {
    /// Scalar, optional scalar or choice, already in wire form.
    Value(Value),
    /// Raw nested structure carried through from the wire.
    Raw(&'a Value),
    /// A nested model.
    Model(&'a dyn Flatten),
    /// A collection.
    Collection(&'a dyn Flatten),
}

impl<'a> Attribute<'a> {
    /// Wrap anything convertible into a JSON value.
    pub fn value(value: impl Into<Value>) -> Self {
        Attribute::Value(value.into())
    }

    /// An optional scalar; `None` becomes `null`.
    pub fn optional(value: Option<impl Into<Value>>) -> Self {
        Attribute::Value(value.map(Into::into).unwrap_or(Value::Null))
    }

    /// An optional nested model; `None` becomes `null`.
    pub fn optional_model<M: Model>(model: Option<&'a M>) -> Self {
        match model {
            Some(model) => Attribute::Model(model),
            None => Attribute::Value(Value::Null),
        }
    }
}

/// A typed, validated value object.
///
/// Implementors provide the field table in both directions: [`Model::bind`]
/// reads declared fields from raw data and calls the validating
/// constructor, [`Model::attributes`] lists fields for flattening. Use
/// [`impl_model!`](crate::impl_model) to derive the [`Flatten`] and
/// [`Element`] impls.
pub trait Model: Flatten + Element + PartialEq {
    /// Declared type name, used in error messages and element type tags.
    const TYPE_NAME: &'static str;

    /// Build an instance from declared fields.
    fn bind(fields: &Fields<'_>) -> TesseraResult<Self>;

    /// Field table in declaration order.
    fn attributes(&self) -> Vec<(&'static str, Attribute<'_>)>;
}

/// Flatten a model per the field rules in the module docs.
pub fn flatten_model<M: Model>(model: &M, deep: bool) -> Flat {
    let fields = model
        .attributes()
        .into_iter()
        .map(|(name, attribute)| {
            let flat = match attribute {
                Attribute::Value(value) => Flat::Value(value),
                Attribute::Raw(value) => Flat::Value(value.clone()),
                Attribute::Model(nested) => nested.flatten(deep),
                Attribute::Collection(collection) if deep => collection.flatten(true),
                Attribute::Collection(collection) => Flat::Nested(collection.to_boxed()),
            };
            (name.to_string(), flat)
        })
        .collect();
    Flat::Record(fields)
}

/// Implement [`Flatten`] and [`Element`] for one or more [`Model`] types.
///
/// # Example
/// ```ignore
/// impl_model!(DiscountItem, Money);
/// ```
#[macro_export]
macro_rules! impl_model {
    ($($type:ty),+ $(,)?) => {
        $(
            impl $crate::Flatten for $type {
                fn flatten(&self, deep: bool) -> $crate::Flat {
                    $crate::model::flatten_model(self, deep)
                }

                fn to_boxed(&self) -> ::std::boxed::Box<dyn $crate::Flatten> {
                    ::std::boxed::Box::new(::std::clone::Clone::clone(self))
                }
            }

            impl $crate::Element for $type {
                fn static_type() -> ::std::option::Option<$crate::ElementType> {
                    ::std::option::Option::Some($crate::ElementType::Model(
                        <$type as $crate::Model>::TYPE_NAME,
                    ))
                }

                fn element_type(&self) -> $crate::ElementType {
                    $crate::ElementType::Model(<$type as $crate::Model>::TYPE_NAME)
                }

                fn flatten_element(&self, deep: bool) -> $crate::Flat {
                    if deep {
                        $crate::Flatten::flatten(self, true)
                    } else {
                        $crate::Flat::Nested($crate::Flatten::to_boxed(self))
                    }
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_models::{Basket, DiscountItem, Tier};
    use crate::Collection;
    use serde_json::json;

    fn basket() -> Basket {
        Basket::new(
            "b-1",
            Tier::Gold,
            DiscountItem::new(10.0, 5.0).expect("valid discount"),
            Collection::of_type(vec![
                DiscountItem::new(1.0, 0.0).expect("valid discount"),
                DiscountItem::new(2.0, 0.5).expect("valid discount"),
            ]),
            Some(json!({"channel": "web"})),
        )
        .expect("valid basket")
    }

    #[test]
    fn test_null_meta_round_trips_as_absent() {
        let with_null = Basket::new(
            "b-2",
            Tier::Bronze,
            DiscountItem::new(0.0, 0.0).expect("valid discount"),
            Collection::of_type(vec![]),
            Some(json!(null)),
        )
        .expect("valid basket");
        assert_eq!(with_null.meta(), None);

        let rebuilt: Basket =
            crate::convert::convert_to_model(&with_null.to_value()).expect("round trip");
        assert_eq!(rebuilt, with_null);
    }

    #[test]
    fn test_shallow_flatten_normalizes_nested_model() {
        let flat = basket().flatten(false);
        let headline = flat.field("headline").expect("headline field");
        assert!(headline.is_plain());
        assert_eq!(
            headline.to_owned_value(),
            json!({"rate": 10.0, "amount": 5.0})
        );
    }

    #[test]
    fn test_shallow_flatten_leaves_collection_intact() {
        let flat = basket().flatten(false);
        assert!(!flat.is_plain());
        assert!(matches!(flat.field("items"), Some(Flat::Nested(_))));
    }

    #[test]
    fn test_deep_flatten_is_plain() {
        let flat = basket().flatten(true);
        assert!(flat.is_plain());
        assert_eq!(
            flat.into_value(),
            json!({
                "id": "b-1",
                "tier": "gold",
                "headline": {"rate": 10.0, "amount": 5.0},
                "items": [
                    {"rate": 1.0, "amount": 0.0},
                    {"rate": 2.0, "amount": 0.5}
                ],
                "meta": {"channel": "web"}
            })
        );
    }

    #[test]
    fn test_into_value_resolves_shallow_output() {
        let shallow = basket().flatten(false).into_value();
        let deep = basket().flatten(true).into_value();
        assert_eq!(shallow, deep);
    }

    #[test]
    fn test_optional_attributes_become_null() {
        let attr = Attribute::optional(None::<String>);
        assert!(matches!(attr, Attribute::Value(Value::Null)));
        let attr = Attribute::optional_model::<DiscountItem>(None);
        assert!(matches!(attr, Attribute::Value(Value::Null)));
    }

    #[test]
    fn test_models_compare_by_value() {
        assert_eq!(basket(), basket());
        assert_ne!(
            DiscountItem::new(1.0, 0.0).expect("valid"),
            DiscountItem::new(1.0, 0.1).expect("valid")
        );
    }

    impl Flat {
        fn to_owned_value(&self) -> Value {
            match self {
                Flat::Value(v) => v.clone(),
                Flat::Record(fields) => Value::Object(
                    fields
                        .iter()
                        .map(|(n, f)| (n.clone(), f.to_owned_value()))
                        .collect(),
                ),
                Flat::List(items) => Value::Array(items.iter().map(Flat::to_owned_value).collect()),
                Flat::Nested(inner) => inner.to_value(),
            }
        }
    }
}
