//! Tessera Test Utilities
//!
//! Centralized test infrastructure for the Tessera workspace:
//! - Payment-domain fixture models used as conversion and cache targets
//! - Proptest generators for those models
//! - Test fixtures for common scenarios, including a driver per backend
//! - Custom assertions for Tessera-specific error variants
//! - A tracing subscriber for test output

pub mod models;

pub use models::{Currency, DiscountItem, Money, OrderLine, Payment, PaymentStatus, PriceSign};

// Re-export core types for convenience
pub use tessera_core::{
    convert_auto, convert_to_collection, convert_to_model, CacheError, Collection,
    ConfigError, ConversionError, Converted, Flatten, Model, TesseraError, TesseraResult,
    ValidationError,
};
pub use tessera_storage::{CacheConfig, CacheDriver, DriverKind, TypedCache};

use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`, defaulting to `warn`. Safe to call from every test.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Tessera fixture models.

    use super::*;
    use chrono::{Days, NaiveDate};
    use proptest::prelude::*;
    use serde_json::{json, Value};
    use uuid::Uuid;

    // === Scalar Generators ===

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a discount rate in `0.0..=100.0`.
    pub fn arb_rate() -> impl Strategy<Value = f64> {
        0.0f64..=100.0
    }

    /// Generate a non-negative decimal amount.
    pub fn arb_decimal_amount() -> impl Strategy<Value = f64> {
        0.0f64..=100_000.0
    }

    /// Generate a date between 2024-01-01 and roughly ten years later.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0u64..3650).prop_map(|offset| {
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|base| base.checked_add_days(Days::new(offset)))
                .expect("date offset stays in range")
        })
    }

    /// Generate a SKU matching the order line pattern.
    pub fn arb_sku() -> impl Strategy<Value = String> {
        "[A-Z0-9]{3,12}(-[A-Z0-9]{1,8})?"
    }

    /// Generate a non-blank label.
    pub fn arb_label() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ]{0,30}"
    }

    /// Generate a raw metadata blob (never `null`).
    pub fn arb_meta() -> impl Strategy<Value = Option<Value>> {
        prop::option::of(prop_oneof![
            Just(json!({"source": "catalogue"})),
            Just(Value::Null),
            any::<u32>().prop_map(|rank| json!({"rank": rank, "tags": ["promo", "seasonal"]})),
        ])
    }

    /// Generate a valid cache key suffix.
    pub fn arb_key_suffix() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{1,40}"
    }

    /// Generate a TTL in seconds, including 0 (no expiry).
    pub fn arb_ttl_secs() -> impl Strategy<Value = u64> {
        prop_oneof![Just(0u64), 60u64..86_400]
    }

    // === Choice Generators ===

    /// Generate a Currency variant.
    pub fn arb_currency() -> impl Strategy<Value = Currency> {
        prop_oneof![
            Just(Currency::Eur),
            Just(Currency::Usd),
            Just(Currency::Gbp),
            Just(Currency::Pln),
            Just(Currency::Chf),
        ]
    }

    /// Generate a PaymentStatus variant.
    pub fn arb_payment_status() -> impl Strategy<Value = PaymentStatus> {
        prop_oneof![
            Just(PaymentStatus::Pending),
            Just(PaymentStatus::Authorized),
            Just(PaymentStatus::Captured),
            Just(PaymentStatus::Refunded),
            Just(PaymentStatus::Failed),
        ]
    }

    // === Model Generators ===

    /// Generate a DiscountItem.
    pub fn arb_discount_item() -> impl Strategy<Value = DiscountItem> {
        (arb_rate(), arb_decimal_amount()).prop_map(|(rate, amount)| {
            DiscountItem::new(rate, amount).expect("generated discount is valid")
        })
    }

    /// Generate a collection of up to four discounts.
    pub fn arb_discounts() -> impl Strategy<Value = Collection<DiscountItem>> {
        prop::collection::vec(arb_discount_item(), 0..5).prop_map(Collection::of_type)
    }

    /// Generate Money.
    pub fn arb_money() -> impl Strategy<Value = Money> {
        (0i64..10_000_000, arb_currency()).prop_map(|(amount, currency)| {
            Money::new(amount, currency).expect("generated money is valid")
        })
    }

    /// Generate an OrderLine.
    pub fn arb_order_line() -> impl Strategy<Value = OrderLine> {
        (arb_sku(), 1u64..=10_000, arb_money(), arb_discounts()).prop_map(
            |(sku, quantity, unit_price, discounts)| {
                OrderLine::new(sku, quantity, unit_price, discounts)
                    .expect("generated order line is valid")
            },
        )
    }

    /// Generate a PriceSign.
    pub fn arb_price_sign() -> impl Strategy<Value = PriceSign> {
        (
            arb_uuid(),
            arb_label(),
            arb_money(),
            prop::option::of(arb_date()),
            arb_discounts(),
            arb_meta(),
        )
            .prop_map(|(id, label, price, valid_until, discounts, meta)| {
                PriceSign::new(id, label, price, valid_until, discounts, meta)
                    .expect("generated price sign is valid")
            })
    }

    /// Generate a collection of up to five price signs.
    pub fn arb_price_signs() -> impl Strategy<Value = Collection<PriceSign>> {
        prop::collection::vec(arb_price_sign(), 0..6).prop_map(Collection::of_type)
    }

    /// Generate a Payment.
    pub fn arb_payment() -> impl Strategy<Value = Payment> {
        (
            arb_uuid(),
            arb_payment_status(),
            arb_money(),
            prop::collection::vec(arb_order_line(), 0..4),
            prop::option::of("[A-Z]{2}-[0-9]{4,8}"),
        )
            .prop_map(|(id, status, total, lines, reference)| {
                Payment::new(id, status, total, Collection::of_type(lines), reference)
                    .expect("generated payment is valid")
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use serde_json::{json, Value};
    use std::path::Path;
    use std::sync::Arc;

    /// Key prefix used by fixture caches.
    pub const TEST_PREFIX: &str = "test_";

    /// Raw discount list as a catalogue endpoint would return it.
    pub fn discount_items_json() -> Value {
        json!([
            {"rate": 5.0},
            {"rate": 10.0, "amount": 2.5},
            {"rate": 25}
        ])
    }

    /// Raw price sign with every field populated.
    pub fn price_sign_json() -> Value {
        json!({
            "id": "6f1c2a9e-3b7d-4c5e-9a1f-2d3e4f5a6b7c",
            "label": "Winter sale",
            "price": {"amount": 1999, "currency": "EUR"},
            "valid_until": "2025-03-31",
            "discounts": [{"rate": 15.0}],
            "meta": {"source": "catalogue", "rank": 3}
        })
    }

    /// Raw payment with two order lines.
    pub fn payment_json() -> Value {
        json!({
            "id": "0b9e8d7c-6a5b-4c3d-8e2f-1a0b9c8d7e6f",
            "status": "authorized",
            "total": {"amount": 4500, "currency": "PLN"},
            "lines": [
                {"sku": "TSHIRT-M", "quantity": 2, "unit_price": {"amount": 1500, "currency": "PLN"}},
                {
                    "sku": "MUG-01",
                    "unit_price": {"amount": 1500, "currency": "PLN"},
                    "discounts": [{"rate": 10.0, "amount": 1.5}]
                }
            ],
            "reference": "PO-20250101"
        })
    }

    /// The converted form of [`price_sign_json`].
    pub fn price_sign() -> PriceSign {
        convert_to_model(&price_sign_json()).expect("fixture price sign is valid")
    }

    /// The converted form of [`payment_json`].
    pub fn payment() -> Payment {
        convert_to_model(&payment_json()).expect("fixture payment is valid")
    }

    /// The converted form of [`discount_items_json`].
    pub fn discount_items() -> Collection<DiscountItem> {
        convert_to_collection(&discount_items_json()).expect("fixture discounts are valid")
    }

    /// One driver kind per persistent or in-process backend, rooted at `dir`.
    pub fn driver_kinds(dir: &Path) -> Vec<DriverKind> {
        vec![
            DriverKind::Memory,
            DriverKind::File {
                dir: dir.join("files"),
            },
            DriverKind::Lmdb {
                path: dir.join("lmdb"),
                max_size_mb: 16,
            },
        ]
    }

    /// Cache configuration using [`TEST_PREFIX`].
    pub fn cache_config(driver: DriverKind) -> CacheConfig {
        CacheConfig::new()
            .with_prefix(TEST_PREFIX)
            .with_driver(driver)
    }

    /// Open every backend from [`driver_kinds`].
    pub fn open_drivers(dir: &Path) -> Vec<Arc<dyn CacheDriver>> {
        driver_kinds(dir)
            .into_iter()
            .map(|kind| {
                cache_config(kind)
                    .open_driver()
                    .expect("fixture driver opens")
            })
            .collect()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for Tessera-specific validation.

    use super::*;

    /// Assert that a TesseraResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a TesseraResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a TesseraResult is an EmptyValue validation error.
    #[track_caller]
    pub fn assert_empty_value<T: std::fmt::Debug>(result: &TesseraResult<T>, field: &str) {
        match result {
            Err(TesseraError::Validation(ValidationError::EmptyValue { field: f })) => {
                assert_eq!(f, field, "Wrong field in EmptyValue error");
            }
            other => panic!("Expected EmptyValue for {}, got: {:?}", field, other),
        }
    }

    /// Assert that a TesseraResult is an IllegalValue validation error.
    #[track_caller]
    pub fn assert_illegal_value<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        match result {
            Err(TesseraError::Validation(ValidationError::IllegalValue { .. })) => {}
            other => panic!("Expected IllegalValue error, got: {:?}", other),
        }
    }

    /// Assert that a TesseraResult is an IllegalType conversion error.
    #[track_caller]
    pub fn assert_illegal_type<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        match result {
            Err(TesseraError::Conversion(ConversionError::IllegalType { .. })) => {}
            other => panic!("Expected IllegalType error, got: {:?}", other),
        }
    }

    /// Assert that a TesseraResult is a MissingField error for `model.field`.
    #[track_caller]
    pub fn assert_missing_field<T: std::fmt::Debug>(
        result: &TesseraResult<T>,
        model: &str,
        field: &str,
    ) {
        match result {
            Err(TesseraError::Conversion(ConversionError::MissingField { model: m, field: f })) => {
                assert_eq!(m, model, "Wrong model in MissingField error");
                assert_eq!(f, field, "Wrong field in MissingField error");
            }
            other => panic!("Expected MissingField {}.{}, got: {:?}", model, field, other),
        }
    }

    /// Assert that a TesseraResult is a MalformedData error.
    #[track_caller]
    pub fn assert_malformed<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        match result {
            Err(TesseraError::Conversion(ConversionError::MalformedData { .. })) => {}
            other => panic!("Expected MalformedData error, got: {:?}", other),
        }
    }

    /// Assert that a TesseraResult is a cache key validation error.
    #[track_caller]
    pub fn assert_key_rejected<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        match result {
            Err(TesseraError::Cache(CacheError::KeyValidation { .. })) => {}
            other => panic!("Expected KeyValidation error, got: {:?}", other),
        }
    }

    /// Assert that a TesseraResult is a CacheCorrupt error.
    #[track_caller]
    pub fn assert_cache_corrupt<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        match result {
            Err(TesseraError::Cache(CacheError::Corrupt { .. })) => {}
            other => panic!("Expected Corrupt cache error, got: {:?}", other),
        }
    }

    /// Assert that a TesseraResult is a CacheTypeMismatch error.
    #[track_caller]
    pub fn assert_cache_type_mismatch<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        match result {
            Err(TesseraError::Cache(CacheError::TypeMismatch { .. })) => {}
            other => panic!("Expected TypeMismatch cache error, got: {:?}", other),
        }
    }

    /// Assert that a TesseraResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &TesseraResult<T>) {
        match result {
            Err(TesseraError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that deep-flattening `model` and converting it back yields an
    /// equal model.
    #[track_caller]
    pub fn assert_model_round_trip<M: Model>(model: &M) {
        let flattened = model.to_value();
        let rebuilt: TesseraResult<M> = convert_to_model(&flattened);
        match rebuilt {
            Ok(rebuilt) => assert_eq!(&rebuilt, model, "Round trip changed {}", M::TYPE_NAME),
            Err(e) => panic!("Round trip of {} failed: {} ({})", M::TYPE_NAME, e, flattened),
        }
    }

    /// Collection counterpart of [`assert_model_round_trip`].
    #[track_caller]
    pub fn assert_collection_round_trip<M: Model>(collection: &Collection<M>) {
        let flattened = collection.to_value();
        let rebuilt: TesseraResult<Collection<M>> = convert_to_collection(&flattened);
        match rebuilt {
            Ok(rebuilt) => assert_eq!(&rebuilt, collection, "Round trip changed collection"),
            Err(e) => panic!("Round trip of Collection<{}> failed: {}", M::TYPE_NAME, e),
        }
    }
}

// ============================================================================
// SELF-TESTS
// ============================================================================
