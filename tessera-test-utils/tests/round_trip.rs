//! Conversion and flattening across the fixture models.

use proptest::prelude::*;
use serde_json::{json, Value};
use tessera_core::{convert_auto_str, Collection, ElementType, Flat};
use tessera_test_utils::{
    assertions, convert_auto, convert_to_collection, convert_to_model, fixtures, generators,
    Converted, DiscountItem, Flatten, Payment, PriceSign,
};

#[test]
fn test_discount_item_defaults_amount() {
    let item: DiscountItem = convert_to_model(&json!({"rate": 25.0})).unwrap();
    assert_eq!(item, DiscountItem::new(25.0, 0.0).unwrap());
}

#[test]
fn test_discount_item_rejects_negative_rate() {
    assertions::assert_illegal_value(&convert_to_model::<DiscountItem>(&json!({"rate": -1.0})));
}

#[test]
fn test_dynamic_string_collection() {
    let mut strings = Collection::infer(vec![json!("foo"), json!("bar"), json!("baz")]).unwrap();
    assert_eq!(strings.element_type(), ElementType::String);
    assert_eq!(strings.count(), 3);

    assertions::assert_illegal_type(&strings.push(json!(42)));
    assert_eq!(strings.count(), 3);

    strings.advance();
    strings.advance();
    assert_eq!(strings.current().unwrap(), &json!("baz"));
}

#[test]
fn test_convert_auto_on_text_payloads() {
    let one = convert_auto_str::<DiscountItem>(r#"{"rate": 5}"#).unwrap();
    assert!(!one.is_collection());

    let many = convert_auto::<DiscountItem>(&json!("[{\"rate\": 5}, {\"rate\": 6}]")).unwrap();
    assert_eq!(many.into_collection().map(|c| c.count()), Some(2));

    assertions::assert_malformed(&convert_auto_str::<DiscountItem>("{oops"));
    assertions::assert_illegal_value(&convert_auto::<DiscountItem>(&json!(7)));
}

#[test]
fn test_shallow_flatten_keeps_collections_intact() {
    let sign = fixtures::price_sign();
    let shallow = sign.flatten(false);

    assert!(matches!(shallow.field("discounts"), Some(Flat::Nested(_))));
    // Nested models are flattened even in shallow mode.
    assert!(matches!(shallow.field("price"), Some(Flat::Record(_))));
    assert_eq!(shallow.into_value(), sign.to_value());
}

#[test]
fn test_deep_flatten_is_plain_data() {
    let payment = fixtures::payment();
    let value = payment.to_value();
    assert_eq!(value["status"], json!("authorized"));
    assert_eq!(value["lines"][0]["unit_price"], json!({"amount": 1500, "currency": "PLN"}));
    assert_eq!(value["lines"][1]["quantity"], json!(1));
    assert_eq!(value["lines"][0]["discounts"], json!([]));
}

#[test]
fn test_sparse_collection_flattens_in_index_order() {
    let mut items = fixtures::discount_items();
    items.remove(1);
    let flattened = items.to_value();
    assert_eq!(
        flattened,
        json!([{"rate": 5.0, "amount": 0.0}, {"rate": 25.0, "amount": 0.0}])
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_price_sign_round_trip(sign in generators::arb_price_sign()) {
        let rebuilt: PriceSign = convert_to_model(&sign.to_value()).unwrap();
        prop_assert_eq!(rebuilt, sign);
    }

    #[test]
    fn prop_payment_round_trip(payment in generators::arb_payment()) {
        let rebuilt: Payment = convert_to_model(&payment.to_value()).unwrap();
        prop_assert_eq!(rebuilt, payment);
    }

    #[test]
    fn prop_collection_round_trip(signs in generators::arb_price_signs()) {
        let rebuilt: Collection<PriceSign> = convert_to_collection(&signs.to_value()).unwrap();
        prop_assert_eq!(rebuilt, signs);
    }

    #[test]
    fn prop_conversion_is_deterministic(payment in generators::arb_payment()) {
        let raw: Value = payment.to_value();
        let first: Payment = convert_to_model(&raw).unwrap();
        let second: Payment = convert_to_model(&raw).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_convert_auto_follows_shape(signs in generators::arb_price_signs()) {
        let converted = convert_auto::<PriceSign>(&signs.to_value()).unwrap();
        prop_assert!(converted.is_collection());

        if let Some(first) = signs.first() {
            let single = convert_auto::<PriceSign>(&first.to_value()).unwrap();
            prop_assert_eq!(single, Converted::Model(first.clone()));
        }
    }

    #[test]
    fn prop_text_and_value_inputs_agree(payment in generators::arb_payment()) {
        let raw = payment.to_value();
        let from_value = convert_auto::<Payment>(&raw).unwrap();
        let from_text = convert_auto_str::<Payment>(&raw.to_string()).unwrap();
        prop_assert_eq!(from_value, from_text);
    }
}
