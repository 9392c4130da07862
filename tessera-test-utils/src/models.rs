//! Payment-domain models used as conversion and cache targets in tests.
//!
//! They exercise every field kind the converter supports: scalars with
//! defaults, choices, nested models, collections, optional values, raw
//! nested structures, and the uuid/date/pattern validators.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use tessera_core::validation::{
    validate_date, validate_pattern, validate_uuid, ValidateNonEmpty, ValidateRange,
};
use tessera_core::{impl_model, Attribute, Choice, Collection, Fields, Model, TesseraResult};

/// Wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static SKU_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9-]{3,32}$").expect("Invalid SKU regex"));

// ============================================================================
// CHOICES
// ============================================================================

/// ISO 4217 currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Eur,
    Usd,
    Gbp,
    Pln,
    Chf,
}

impl Choice for Currency {
    const NAME: &'static str = "Currency";

    fn cases() -> &'static [Self] {
        &[
            Currency::Eur,
            Currency::Usd,
            Currency::Gbp,
            Currency::Pln,
            Currency::Chf,
        ]
    }

    fn raw_value(&self) -> Value {
        match self {
            Currency::Eur => "EUR".into(),
            Currency::Usd => "USD".into(),
            Currency::Gbp => "GBP".into(),
            Currency::Pln => "PLN".into(),
            Currency::Chf => "CHF".into(),
        }
    }
}

/// Lifecycle of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Pending,
    Authorized,
    Captured,
    Refunded,
    Failed,
}

impl Choice for PaymentStatus {
    const NAME: &'static str = "PaymentStatus";

    fn cases() -> &'static [Self] {
        &[
            PaymentStatus::Pending,
            PaymentStatus::Authorized,
            PaymentStatus::Captured,
            PaymentStatus::Refunded,
            PaymentStatus::Failed,
        ]
    }

    fn raw_value(&self) -> Value {
        match self {
            PaymentStatus::Pending => "pending".into(),
            PaymentStatus::Authorized => "authorized".into(),
            PaymentStatus::Captured => "captured".into(),
            PaymentStatus::Refunded => "refunded".into(),
            PaymentStatus::Failed => "failed".into(),
        }
    }
}

// ============================================================================
// MODELS
// ============================================================================

/// Percentage discount with an optional fixed amount.
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

/// Amount in minor units of a currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    pub fn new(amount: i64, currency: Currency) -> TesseraResult<Self> {
        amount.validate_non_negative("amount")?;
        Ok(Self { amount, currency })
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }
}

impl Model for Money {
    const TYPE_NAME: &'static str = "Money";

    fn bind(fields: &Fields<'_>) -> TesseraResult<Self> {
        Self::new(fields.scalar("amount")?, fields.choice("currency")?)
    }

    fn attributes(&self) -> Vec<(&'static str, Attribute<'_>)> {
        vec![
            ("amount", Attribute::value(self.amount)),
            ("currency", Attribute::Value(self.currency.raw_value())),
        ]
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    sku: String,
    quantity: u64,
    unit_price: Money,
    discounts: Collection<DiscountItem>,
}

impl OrderLine {
    pub fn new(
        sku: impl Into<String>,
        quantity: u64,
        unit_price: Money,
        discounts: Collection<DiscountItem>,
    ) -> TesseraResult<Self> {
        let sku = sku.into();
        validate_pattern("sku", &sku, &SKU_PATTERN)?;
        quantity.validate_range("quantity", 1, 10_000)?;
        Ok(Self {
            sku,
            quantity,
            unit_price,
            discounts,
        })
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn unit_price(&self) -> &Money {
        &self.unit_price
    }

    pub fn discounts(&self) -> &Collection<DiscountItem> {
        &self.discounts
    }
}

impl Model for OrderLine {
    const TYPE_NAME: &'static str = "OrderLine";

    fn bind(fields: &Fields<'_>) -> TesseraResult<Self> {
        Self::new(
            fields.scalar::<String>("sku")?,
            fields.scalar_or("quantity", 1u64)?,
            fields.model("unit_price")?,
            fields.collection_or_empty("discounts")?,
        )
    }

    fn attributes(&self) -> Vec<(&'static str, Attribute<'_>)> {
        vec![
            ("sku", Attribute::value(self.sku.clone())),
            ("quantity", Attribute::value(self.quantity)),
            ("unit_price", Attribute::Model(&self.unit_price)),
            ("discounts", Attribute::Collection(&self.discounts)),
        ]
    }
}

/// A price shown to shoppers, the typical cached catalogue entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSign {
    id: Uuid,
    label: String,
    price: Money,
    valid_until: Option<NaiveDate>,
    discounts: Collection<DiscountItem>,
    meta: Option<Value>,
}

impl PriceSign {
    pub fn new(
        id: Uuid,
        label: impl Into<String>,
        price: Money,
        valid_until: Option<NaiveDate>,
        discounts: Collection<DiscountItem>,
        meta: Option<Value>,
    ) -> TesseraResult<Self> {
        let label = label.into();
        label.validate_non_empty("label")?;
        Ok(Self {
            id,
            label,
            price,
            valid_until,
            discounts,
            // A raw `null` reads back as no meta at all.
            meta: meta.filter(|value| !value.is_null()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn price(&self) -> &Money {
        &self.price
    }

    pub fn valid_until(&self) -> Option<NaiveDate> {
        self.valid_until
    }

    pub fn discounts(&self) -> &Collection<DiscountItem> {
        &self.discounts
    }

    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }
}

impl Model for PriceSign {
    const TYPE_NAME: &'static str = "PriceSign";

    fn bind(fields: &Fields<'_>) -> TesseraResult<Self> {
        let id = validate_uuid("id", &fields.scalar::<String>("id")?)?;
        let valid_until = fields
            .optional::<String>("valid_until")?
            .map(|raw| validate_date("valid_until", &raw, DATE_FORMAT))
            .transpose()?;
        Self::new(
            id,
            fields.scalar::<String>("label")?,
            fields.model("price")?,
            valid_until,
            fields.collection_or_empty("discounts")?,
            fields.raw("meta"),
        )
    }

    fn attributes(&self) -> Vec<(&'static str, Attribute<'_>)> {
        let mut attributes = vec![
            ("id", Attribute::value(self.id.to_string())),
            ("label", Attribute::value(self.label.clone())),
            ("price", Attribute::Model(&self.price)),
            (
                "valid_until",
                Attribute::optional(
                    self.valid_until
                        .map(|date| date.format(DATE_FORMAT).to_string()),
                ),
            ),
            ("discounts", Attribute::Collection(&self.discounts)),
        ];
        if let Some(meta) = &self.meta {
            attributes.push(("meta", Attribute::Raw(meta)));
        }
        attributes
    }
}

/// A payment with its order lines. Only `status` is mutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    id: Uuid,
    status: PaymentStatus,
    total: Money,
    lines: Collection<OrderLine>,
    reference: Option<String>,
}

impl Payment {
    pub fn new(
        id: Uuid,
        status: PaymentStatus,
        total: Money,
        lines: Collection<OrderLine>,
        reference: Option<String>,
    ) -> TesseraResult<Self> {
        if let Some(reference) = &reference {
            reference.validate_non_empty("reference")?;
        }
        Ok(Self {
            id,
            status,
            total,
            lines,
            reference,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn set_status(&mut self, status: PaymentStatus) {
        self.status = status;
    }

    pub fn total(&self) -> &Money {
        &self.total
    }

    pub fn lines(&self) -> &Collection<OrderLine> {
        &self.lines
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

impl Model for Payment {
    const TYPE_NAME: &'static str = "Payment";

    fn bind(fields: &Fields<'_>) -> TesseraResult<Self> {
        Self::new(
            validate_uuid("id", &fields.scalar::<String>("id")?)?,
            fields.choice_or("status", PaymentStatus::Pending)?,
            fields.model("total")?,
            fields.collection("lines")?,
            fields.optional("reference")?,
        )
    }

    fn attributes(&self) -> Vec<(&'static str, Attribute<'_>)> {
        vec![
            ("id", Attribute::value(self.id.to_string())),
            ("status", Attribute::Value(self.status.raw_value())),
            ("total", Attribute::Model(&self.total)),
            ("lines", Attribute::Collection(&self.lines)),
            ("reference", Attribute::optional(self.reference.clone())),
        ]
    }
}

impl_model!(DiscountItem, Money, OrderLine, PriceSign, Payment);
