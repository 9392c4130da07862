//! Small models shared by the unit tests of this crate.

use crate::convert::{Choice, Fields};
use crate::model::{Attribute, Model};
use crate::validation::{ValidateNonEmpty, ValidateRange};
use crate::{impl_model, Collection, TesseraResult};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct DiscountItem {
    rate: f64,
    amount: f64,
}

impl DiscountItem {
    pub fn new(rate: f64, amount: f64) -> TesseraResult<Self> {
        rate.validate_range("rate", 0.0, 100.0)?;
        amount.validate_non_negative("amount")?;
        Ok(Self { rate, amount })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

impl Model for DiscountItem {
    const TYPE_NAME: &'static str = "DiscountItem";

    fn bind(fields: &Fields<'_>) -> TesseraResult<Self> {
        Self::new(fields.scalar("rate")?, fields.scalar_or("amount", 0.0)?)
    }

    fn attributes(&self) -> Vec<(&'static str, Attribute<'_>)> {
        vec![
            ("rate", Attribute::value(self.rate)),
            ("amount", Attribute::value(self.amount)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

impl Choice for Tier {
    const NAME: &'static str = "Tier";

    fn cases() -> &'static [Self] {
        &[Tier::Bronze, Tier::Silver, Tier::Gold]
    }

    fn raw_value(&self) -> Value {
        match self {
            Tier::Bronze => "bronze".into(),
            Tier::Silver => "silver".into(),
            Tier::Gold => "gold".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Basket {
    id: String,
    tier: Tier,
    headline: DiscountItem,
    items: Collection<DiscountItem>,
    meta: Option<Value>,
}

impl Basket {
    pub fn new(
        id: impl Into<String>,
        tier: Tier,
        headline: DiscountItem,
        items: Collection<DiscountItem>,
        meta: Option<Value>,
    ) -> TesseraResult<Self> {
        let id = id.into();
        id.validate_non_empty("id")?;
        Ok(Self {
            id,
            tier,
            headline,
            items,
            // A raw `null` reads back as no meta at all.
            meta: meta.filter(|value| !value.is_null()),
        })
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn headline(&self) -> &DiscountItem {
        &self.headline
    }

    pub fn items(&self) -> &Collection<DiscountItem> {
        &self.items
    }

    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }
}

impl Model for Basket {
    const TYPE_NAME: &'static str = "Basket";

    fn bind(fields: &Fields<'_>) -> TesseraResult<Self> {
        Self::new(
            fields.scalar::<String>("id")?,
            fields.choice("tier")?,
            fields.model("headline")?,
            fields.collection("items")?,
            fields.raw("meta"),
        )
    }

    fn attributes(&self) -> Vec<(&'static str, Attribute<'_>)> {
        let mut attributes = vec![
            ("id", Attribute::value(self.id.clone())),
            ("tier", Attribute::Value(self.tier.raw_value())),
            ("headline", Attribute::Model(&self.headline)),
            ("items", Attribute::Collection(&self.items)),
        ];
        if let Some(meta) = &self.meta {
            attributes.push(("meta", Attribute::Raw(meta)));
        }
        attributes
    }
}

impl_model!(DiscountItem, Basket);
