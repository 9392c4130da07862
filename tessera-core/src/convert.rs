//! Structural converter: plain nested data to typed models and collections
//!
//! Conversion is a pure function of the raw data and the target type. Each
//! model declares its fields through [`Model::bind`], reading them from a
//! [`Fields`] view; there is no reflection and no global state.

use crate::collection::Collection;
use crate::element::ElementType;
use crate::error::{ConversionError, TesseraError, TesseraResult};
use crate::model::{Flat, Flatten, Model};
use serde_json::{Map, Value};

/// A scalar field type the converter can assign directly.
pub trait Scalar: Sized {
    /// Declared type, reported in `IllegalType` errors.
    const TYPE: ElementType;

    /// Type-checked extraction. Returns `None` on mismatch.
    fn from_json(value: &Value) -> Option<Self>;
}

impl Scalar for String {
    const TYPE: ElementType = ElementType::String;

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl Scalar for bool {
    const TYPE: ElementType = ElementType::Bool;

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl Scalar for i64 {
    const TYPE: ElementType = ElementType::Int;

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl Scalar for u64 {
    const TYPE: ElementType = ElementType::Int;

    fn from_json(value: &Value) -> Option<Self> {
        value.as_u64()
    }
}

impl Scalar for f64 {
    const TYPE: ElementType = ElementType::Float;

    // Integers widen to float; strings never coerce.
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

/// An enumerated value set, matched by raw wire value.
///
/// # Example
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Currency { Sek, Eur }
///
/// impl Choice for Currency {
///     const NAME: &'static str = "Currency";
///     fn cases() -> &'static [Self] { &[Currency::Sek, Currency::Eur] }
///     fn raw_value(&self) -> Value {
///         match self { Currency::Sek => "SEK".into(), Currency::Eur => "EUR".into() }
///     }
/// }
/// ```
pub trait Choice: Sized + Copy + 'static {
    /// Declared name of the value set.
    const NAME: &'static str;

    /// Every case, in declaration order.
    fn cases() -> &'static [Self];

    /// Wire value of this case.
    fn raw_value(&self) -> Value;

    /// Case whose raw value equals `raw`.
    fn from_raw(raw: &Value) -> Option<Self> {
        Self::cases().iter().copied().find(|case| case.raw_value() == *raw)
    }
}

/// Read-only view over the raw fields of one object being bound to a model.
///
/// Lookups are by declared field name. A key that is absent falls back to
/// the declared default; a key that is present is converted according to
/// the getter's declared kind.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    model: &'static str,
    raw: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Create a view over `raw` for the model named `model`.
    pub fn new(model: &'static str, raw: &'a Map<String, Value>) -> Self {
        Self { model, raw }
    }

    /// Name of the model being bound.
    pub fn model_name(&self) -> &'static str {
        self.model
    }

    /// Returns true if the raw data carries `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.raw.contains_key(name)
    }

    fn path(&self, name: &str) -> String {
        format!("{}.{}", self.model, name)
    }

    fn missing(&self, name: &str) -> TesseraError {
        ConversionError::MissingField {
            model: self.model.to_string(),
            field: name.to_string(),
        }
        .into()
    }

    fn required(&self, name: &str) -> TesseraResult<&'a Value> {
        self.raw.get(name).ok_or_else(|| self.missing(name))
    }

    /// Present and non-null value.
    fn non_null(&self, name: &str) -> Option<&'a Value> {
        self.raw.get(name).filter(|v| !v.is_null())
    }

    /// Required scalar.
    pub fn scalar<S: Scalar>(&self, name: &str) -> TesseraResult<S> {
        scalar_from(self.path(name), self.required(name)?)
    }

    /// Scalar with a declared default for when the field is absent.
    pub fn scalar_or<S: Scalar>(&self, name: &str, default: S) -> TesseraResult<S> {
        match self.raw.get(name) {
            Some(value) => scalar_from(self.path(name), value),
            None => Ok(default),
        }
    }

    /// Optional scalar; absent and `null` both yield `None`.
    pub fn optional<S: Scalar>(&self, name: &str) -> TesseraResult<Option<S>> {
        self.non_null(name)
            .map(|value| scalar_from(self.path(name), value))
            .transpose()
    }

    /// Required choice, matched by raw value.
    pub fn choice<C: Choice>(&self, name: &str) -> TesseraResult<C> {
        choice_from(self.path(name), self.required(name)?)
    }

    /// Choice with a declared default for when the field is absent.
    pub fn choice_or<C: Choice>(&self, name: &str, default: C) -> TesseraResult<C> {
        match self.raw.get(name) {
            Some(value) => choice_from(self.path(name), value),
            None => Ok(default),
        }
    }

    /// Optional choice; absent and `null` both yield `None`.
    pub fn optional_choice<C: Choice>(&self, name: &str) -> TesseraResult<Option<C>> {
        self.non_null(name)
            .map(|value| choice_from(self.path(name), value))
            .transpose()
    }

    /// Required nested model.
    pub fn model<M: Model>(&self, name: &str) -> TesseraResult<M> {
        convert_to_model(self.required(name)?)
    }

    /// Optional nested model; absent and `null` both yield `None`.
    pub fn optional_model<M: Model>(&self, name: &str) -> TesseraResult<Option<M>> {
        self.non_null(name).map(convert_to_model).transpose()
    }

    /// Required collection of models.
    pub fn collection<M: Model>(&self, name: &str) -> TesseraResult<Collection<M>> {
        convert_to_collection(self.required(name)?)
    }

    /// Collection of models defaulting to empty when absent or `null`.
    pub fn collection_or_empty<M: Model>(&self, name: &str) -> TesseraResult<Collection<M>> {
        match self.non_null(name) {
            Some(value) => convert_to_collection(value),
            None => Ok(Collection::of_type(Vec::new())),
        }
    }

    /// Raw nested structure, carried through unconverted. `null` yields
    /// `None`.
    pub fn raw(&self, name: &str) -> Option<Value> {
        self.non_null(name).cloned()
    }
}

fn scalar_from<S: Scalar>(path: String, value: &Value) -> TesseraResult<S> {
    S::from_json(value).ok_or_else(|| {
        TesseraError::illegal_type(path, S::TYPE.to_string(), ElementType::of(value).to_string())
    })
}

fn choice_from<C: Choice>(path: String, value: &Value) -> TesseraResult<C> {
    C::from_raw(value).ok_or_else(|| {
        TesseraError::illegal_value(path, format!("{} is not a valid {}", value, C::NAME))
    })
}

/// Convert raw data into a model of type `M`.
///
/// Fails with `IllegalType` when `raw` is not an object; otherwise every
/// error raised while binding fields (type mismatches, missing fields,
/// unknown choices, constructor validation) propagates unchanged.
pub fn convert_to_model<M: Model>(raw: &Value) -> TesseraResult<M> {
    match raw {
        Value::Object(map) => M::bind(&Fields::new(M::TYPE_NAME, map)),
        other => Err(TesseraError::illegal_type(
            M::TYPE_NAME,
            ElementType::Object.to_string(),
            ElementType::of(other).to_string(),
        )),
    }
}

/// Convert an ordered sequence of raw objects into a collection of `M`.
pub fn convert_to_collection<M: Model>(raw: &Value) -> TesseraResult<Collection<M>> {
    let items = match raw {
        Value::Array(items) => items,
        other => {
            return Err(TesseraError::illegal_type(
                format!("Collection<{}>", M::TYPE_NAME),
                ElementType::Array.to_string(),
                ElementType::of(other).to_string(),
            ))
        }
    };

    let models = items
        .iter()
        .map(convert_to_model::<M>)
        .collect::<TesseraResult<Vec<M>>>()?;
    Ok(Collection::of_type(models))
}

/// Result of [`convert_auto`]: one model or a collection of them.
#[derive(Debug, Clone, PartialEq)]
pub enum Converted<M: Model> {
    Model(M),
    Collection(Collection<M>),
}

impl<M: Model> Converted<M> {
    /// Returns true if the raw data was a sequence.
    pub fn is_collection(&self) -> bool {
        matches!(self, Converted::Collection(_))
    }

    /// The single model, if that is what was converted.
    pub fn into_model(self) -> Option<M> {
        match self {
            Converted::Model(model) => Some(model),
            Converted::Collection(_) => None,
        }
    }

    /// The collection, if that is what was converted.
    pub fn into_collection(self) -> Option<Collection<M>> {
        match self {
            Converted::Model(_) => None,
            Converted::Collection(collection) => Some(collection),
        }
    }
}

impl<M: Model> From<M> for Converted<M> {
    fn from(model: M) -> Self {
        Converted::Model(model)
    }
}

impl<M: Model> From<Collection<M>> for Converted<M> {
    fn from(collection: Collection<M>) -> Self {
        Converted::Collection(collection)
    }
}

impl<M: Model> Flatten for Converted<M> {
    fn flatten(&self, deep: bool) -> Flat {
        match self {
            Converted::Model(model) => model.flatten(deep),
            Converted::Collection(collection) => collection.flatten(deep),
        }
    }

    fn to_boxed(&self) -> Box<dyn Flatten> {
        Box::new(self.clone())
    }
}

/// Decode JSON text into plain data.
pub fn decode_json(text: &str) -> TesseraResult<Value> {
    serde_json::from_str(text).map_err(|e| TesseraError::malformed(e.to_string()))
}

/// Convert raw data of unknown shape into `M` or `Collection<M>`.
///
/// A JSON string is decoded first. A sequence becomes a collection, an
/// object becomes a model, anything else fails with `IllegalValue`.
pub fn convert_auto<M: Model>(raw: &Value) -> TesseraResult<Converted<M>> {
    match raw {
        Value::String(text) => dispatch(&decode_json(text)?),
        other => dispatch(other),
    }
}

/// Convert raw JSON text into `M` or `Collection<M>`.
pub fn convert_auto_str<M: Model>(text: &str) -> TesseraResult<Converted<M>> {
    dispatch(&decode_json(text)?)
}

fn dispatch<M: Model>(value: &Value) -> TesseraResult<Converted<M>> {
    match value {
        Value::Array(_) => convert_to_collection(value).map(Converted::Collection),
        Value::Object(_) => convert_to_model(value).map(Converted::Model),
        other => Err(TesseraError::illegal_value(
            M::TYPE_NAME,
            format!("neither object nor sequence: got {}", ElementType::of(other)),
        )),
    }
}
