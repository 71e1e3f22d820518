use decision_core::{FieldValue, RequestContext};
use proptest::prelude::*;
use std::collections::HashMap;

pub fn symbol_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{2,6}"
}

pub fn field_value_strategy() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        any::<bool>().prop_map(FieldValue::Bool),
        (-1_000_000i64..1_000_000).prop_map(FieldValue::Integer),
        (-1.0e6f64..1.0e6).prop_map(FieldValue::Float),
        "[a-z]{0,8}".prop_map(FieldValue::Text),
    ]
}

pub fn fields_strategy() -> impl Strategy<Value = Vec<(String, FieldValue)>> {
    prop::collection::vec(("[a-z]{1,8}", field_value_strategy()), 0..8).prop_map(|pairs| {
        // keep the first occurrence of each name
        let mut seen = HashMap::new();
        pairs
            .into_iter()
            .filter(|(name, _)| seen.insert(name.clone(), ()).is_none())
            .collect()
    })
}

pub fn context_from(symbol: &str, fields: &[(String, FieldValue)]) -> RequestContext {
    fields
        .iter()
        .fold(RequestContext::new(symbol).expect("non-empty symbol"), |ctx, (name, value)| {
            ctx.field(name.clone(), value.clone())
        })
}

pub fn numbered_context(i: usize) -> RequestContext {
    RequestContext::new("BTC")
        .expect("non-empty symbol")
        .field("price", 100.0 + i as f64)
        .field("volume", 1_000i64)
}
