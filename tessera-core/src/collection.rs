//! Typed collections
//!
//! A [`Collection`] is an ordered, homogeneous container. Its effective
//! element type is fixed at construction and checked on every mutation; a
//! rejected mutation leaves the collection untouched.
//!
//! Indices are stable and may be sparse: removing index 1 from `[a, b, c]`
//! leaves indices 0 and 2. Appends go to the highest index plus one.
//!
//! Besides borrowing iteration, a collection carries a cursor for
//! sequential access (`current`, `advance`, `rewind`, `is_valid`,
//! `position_key`). The cursor walks present indices in order.

use crate::element::{Element, ElementType};
use crate::error::{CollectionError, TesseraError, TesseraResult};
use crate::model::{Flat, Flatten, Model};
use std::collections::BTreeMap;

/// Ordered, homogeneous, indexable container.
#[derive(Debug, Clone)]
pub struct Collection<T: Element> {
    element_type: ElementType,
    items: BTreeMap<usize, T>,
    /// Ordinal position over present indices.
    cursor: usize,
}

impl<T: Element> Collection<T> {
    /// Create a collection.
    ///
    /// The effective element type is `explicit_type` if given, otherwise the
    /// static type of `T`, otherwise the runtime type of the first element.
    /// Fails with `IllegalType` when no type can be determined, when
    /// `explicit_type` contradicts the static type of `T`, or when any
    /// element disagrees with it.
    pub fn new(elements: Vec<T>, explicit_type: Option<ElementType>) -> TesseraResult<Self> {
        if let (Some(explicit), Some(fixed)) = (explicit_type, T::static_type()) {
            if explicit != fixed {
                return Err(TesseraError::illegal_type(
                    "collection",
                    fixed.to_string(),
                    explicit.to_string(),
                ));
            }
        }

        let element_type = explicit_type
            .or_else(T::static_type)
            .or_else(|| elements.first().map(Element::element_type))
            .ok_or_else(|| {
                TesseraError::illegal_type(
                    "collection",
                    "explicit element type",
                    "empty data",
                )
            })?;

        let mut collection = Self {
            element_type,
            items: BTreeMap::new(),
            cursor: 0,
        };
        collection.set_elements(elements)?;
        Ok(collection)
    }

    /// Create a collection whose type is inferred from the first element.
    pub fn infer(elements: Vec<T>) -> TesseraResult<Self> {
        Self::new(elements, None)
    }

    /// Create a collection with an explicit element type.
    pub fn with_type(element_type: ElementType, elements: Vec<T>) -> TesseraResult<Self> {
        Self::new(elements, Some(element_type))
    }

    /// Create an empty collection with an explicit element type.
    pub fn empty_of(element_type: ElementType) -> TesseraResult<Self> {
        Self::new(Vec::new(), Some(element_type))
    }

    /// The effective element type. Never changes.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    fn check(&self, index: usize, value: &T) -> TesseraResult<()> {
        let actual = value.element_type();
        if actual != self.element_type {
            return Err(TesseraError::illegal_type(
                format!("Collection<{}>[{}]", self.element_type, index),
                self.element_type.to_string(),
                actual.to_string(),
            ));
        }
        Ok(())
    }

    /// Replace the backing data after validating every element.
    pub fn set_elements(&mut self, elements: Vec<T>) -> TesseraResult<()> {
        for (index, element) in elements.iter().enumerate() {
            self.check(index, element)?;
        }
        self.items = elements.into_iter().enumerate().collect();
        self.cursor = 0;
        Ok(())
    }

    /// Element at `index`, if present. Never inserts.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(&index)
    }

    /// Write `value` at `index`, returning the previous element.
    pub fn set(&mut self, index: usize, value: T) -> TesseraResult<Option<T>> {
        self.check(index, &value)?;
        Ok(self.items.insert(index, value))
    }

    /// Append `value` after the highest index, returning its index.
    pub fn push(&mut self, value: T) -> TesseraResult<usize> {
        let index = self.next_index();
        self.check(index, &value)?;
        self.items.insert(index, value);
        Ok(index)
    }

    /// Remove the element at `index`. Later indices do not shift.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.items.remove(&index)
    }

    /// Returns true if `index` holds an element.
    pub fn exists(&self, index: usize) -> bool {
        self.items.contains_key(&index)
    }

    /// Number of present indices.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn next_index(&self) -> usize {
        self.items.keys().next_back().map_or(0, |last| last + 1)
    }

    /// Element under the cursor.
    pub fn current(&self) -> TesseraResult<&T> {
        self.items
            .values()
            .nth(self.cursor)
            .ok_or_else(|| self.access_error())
    }

    /// Index under the cursor, if in range.
    pub fn position_key(&self) -> Option<usize> {
        self.items.keys().nth(self.cursor).copied()
    }

    /// Move the cursor forward by one.
    pub fn advance(&mut self) {
        self.cursor = self.cursor.saturating_add(1);
    }

    /// Move the cursor back to the first element.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Returns true if the cursor points at an element.
    pub fn is_valid(&self) -> bool {
        self.cursor < self.items.len()
    }

    fn access_error(&self) -> TesseraError {
        CollectionError::Access {
            position: self.cursor,
            count: self.items.len(),
        }
        .into()
    }

    /// Iterate over elements in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.values()
    }

    /// Iterate over `(index, element)` pairs in index order.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.items.iter().map(|(index, element)| (*index, element))
    }

    /// Present indices in order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.keys().copied()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.values().next()
    }

    /// Consume into a vector of elements in index order.
    pub fn into_vec(self) -> Vec<T> {
        self.items.into_values().collect()
    }
}

impl<M: Model> Collection<M> {
    /// Create a collection of a model type. The element type comes from `M`,
    /// so this cannot fail.
    pub fn of_type(elements: Vec<M>) -> Self {
        Self {
            element_type: ElementType::Model(M::TYPE_NAME),
            items: elements.into_iter().enumerate().collect(),
            cursor: 0,
        }
    }
}

impl<T: Element + PartialEq> PartialEq for Collection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.element_type == other.element_type && self.items == other.items
    }
}

impl<T: Element> Flatten for Collection<T> {
    fn flatten(&self, deep: bool) -> Flat {
        Flat::List(
            self.items
                .values()
                .map(|element| element.flatten_element(deep))
                .collect(),
        )
    }

    fn to_boxed(&self) -> Box<dyn Flatten> {
        Box::new(self.clone())
    }
}

impl<'a, T: Element> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::collections::btree_map::Values<'a, usize, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}
