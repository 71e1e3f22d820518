mod common;

use common::strategies::*;
use decision_core::cache::{DecisionCache, Fingerprinter, InMemoryCacheStore};
use decision_core::{Decision, DecisionMetrics, DecisionServiceConfig, FieldValue};
use proptest::prelude::*;
use std::sync::Arc;

fn fingerprinter(fields: &[(String, FieldValue)]) -> Fingerprinter {
    Fingerprinter::new(fields.iter().map(|(name, _)| name.clone()))
}

#[derive(Debug, Clone)]
enum CacheOp {
    Get(usize),
    Set(usize),
    StoreDown,
    StoreUp,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (0usize..6).prop_map(CacheOp::Get),
        3 => (0usize..6).prop_map(CacheOp::Set),
        1 => Just(CacheOp::StoreDown),
        1 => Just(CacheOp::StoreUp),
    ]
}

proptest! {
    /// Property: field insertion order never changes the fingerprint
    #[test]
    fn fingerprint_is_insertion_order_independent(
        symbol in symbol_strategy(),
        fields in fields_strategy(),
    ) {
        let fingerprinter = fingerprinter(&fields);
        let mut reversed = fields.clone();
        reversed.reverse();

        prop_assert_eq!(
            fingerprinter.fingerprint(&context_from(&symbol, &fields)),
            fingerprinter.fingerprint(&context_from(&symbol, &reversed))
        );
    }

    /// Property: fields outside the fingerprinted subset do not affect the key
    #[test]
    fn unselected_fields_are_ignored(
        symbol in symbol_strategy(),
        fields in fields_strategy(),
        extra in field_value_strategy(),
    ) {
        let fingerprinter = fingerprinter(&fields);
        let base = context_from(&symbol, &fields);
        let widened = base.clone().field("zz_unselected_extra", extra);

        prop_assert_eq!(fingerprinter.fingerprint(&base), fingerprinter.fingerprint(&widened));
    }

    /// Property: fingerprints are fixed-width lowercase hex
    #[test]
    fn fingerprint_is_fixed_width_hex(symbol in symbol_strategy(), fields in fields_strategy()) {
        let key = fingerprinter(&fields).fingerprint(&context_from(&symbol, &fields));
        prop_assert_eq!(key.len(), 32);
        prop_assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    /// Property: hits + misses equals the number of GET calls, whatever fails
    #[test]
    fn lookup_counters_are_conserved(ops in prop::collection::vec(cache_op_strategy(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let (gets, hits, misses) = runtime.block_on(async {
            let store = Arc::new(InMemoryCacheStore::new());
            let metrics = Arc::new(DecisionMetrics::default());
            let cache = DecisionCache::new(
                store.clone(),
                metrics.clone(),
                &DecisionServiceConfig::for_test(),
            )
            .unwrap();
            let decision = Decision::new("BUY", 0.7, "property");

            let mut gets = 0u64;
            for op in &ops {
                match op {
                    CacheOp::Get(i) => {
                        gets += 1;
                        cache.get(&numbered_context(*i)).await;
                    }
                    CacheOp::Set(i) => {
                        cache.set(&numbered_context(*i), &decision).await;
                    }
                    CacheOp::StoreDown => store.set_available(false),
                    CacheOp::StoreUp => store.set_available(true),
                }
            }
            let snapshot = metrics.snapshot();
            (gets, snapshot.cache_hits, snapshot.cache_misses)
        });

        prop_assert_eq!(hits + misses, gets);
    }
}
