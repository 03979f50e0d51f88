//! Property-Based Tests for metric collection
//!
//! # Test Properties
//!
//! 1. **Conversion**: numeric values and their string forms convert exactly
//! 2. **Rejection**: non-numeric strings never convert
//! 3. **Determinism**: two passes over unchanged data produce the same samples
//! 4. **Isolation**: one broken query never hides the other metrics

#![cfg(test)]

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use super::definition::DefinitionStore;
use super::engine::CollectionEngine;
use crate::adapters::InMemoryGraphSource;
use crate::domain::ports::{FieldValue, ResultRow};

// =============================================================================
// Property Strategies
// =============================================================================

/// Strings that no float parser accepts.
fn word_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z]{1,12}".prop_filter("float literal", |s| {
        let lower = s.to_ascii_lowercase();
        !matches!(lower.as_str(), "inf" | "infinity" | "nan")
    })
}

/// Values per metric, one scripted query each.
fn values_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-1_000_000i64..1_000_000, 1..8)
}

/// Build an engine plus a source with one single-row query per value.
fn fixture(values: &[i64], broken: Option<usize>) -> (CollectionEngine, InMemoryGraphSource) {
    let mut definitions = Vec::new();
    let mut source = InMemoryGraphSource::new();

    for (i, value) in values.iter().enumerate() {
        let query = format!("RETURN {} AS c", i);
        let statement = if broken == Some(i) {
            format!("MATC {}", i)
        } else {
            query.clone()
        };
        definitions.push(json!({
            "name": format!("metric_{}", i),
            "help": "generated",
            "query": statement,
            "value_field": "c",
        }));
        source = source.with_rows(query, vec![ResultRow::new().with("c", *value)]);
    }

    let engine = CollectionEngine::new(Arc::new(DefinitionStore::new(definitions)));
    (engine, source)
}

// =============================================================================
// Conversion Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: integers convert without loss in the exact range.
    #[test]
    fn prop_integer_conversion(i in -(1i64 << 52)..(1i64 << 52)) {
        prop_assert_eq!(FieldValue::Integer(i).as_f64(), Ok(i as f64));
    }

    /// Property: the display form of any finite float converts back to it.
    #[test]
    fn prop_numeric_string_conversion(f in prop::num::f64::NORMAL, pad in 0usize..3) {
        let text = format!("{}{}{}", " ".repeat(pad), f, " ".repeat(pad));
        prop_assert_eq!(FieldValue::String(text).as_f64(), Ok(f));
    }

    /// Property: words are never numbers.
    #[test]
    fn prop_words_rejected(word in word_strategy()) {
        prop_assert!(FieldValue::String(word).as_f64().is_err());
    }
}

// =============================================================================
// Engine Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: collecting twice over unchanged inputs yields identical samples.
    #[test]
    fn prop_collect_is_deterministic(values in values_strategy()) {
        let (engine, source) = fixture(&values, None);

        let first = tokio_test::block_on(engine.collect(&source)).unwrap();
        let second = tokio_test::block_on(engine.collect(&source)).unwrap();

        prop_assert_eq!(&first.samples, &second.samples);
        prop_assert_eq!(
            first.encode().unwrap(),
            second.encode().unwrap()
        );

        let names: Vec<String> = first.samples.iter().map(|s| s.name.clone()).collect();
        let mut expected: Vec<String> = (0..values.len()).map(|i| format!("metric_{}", i)).collect();
        expected.push(super::CONNECTION_STATUS.to_string());
        expected.push(super::METRIC_ERRORS.to_string());
        prop_assert_eq!(names, expected);
    }

    /// Property: a single broken query costs exactly its own metric.
    #[test]
    fn prop_broken_query_is_isolated(
        values in values_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let broken = pick.index(values.len());
        let (engine, source) = fixture(&values, Some(broken));

        let outcome = tokio_test::block_on(engine.collect(&source)).unwrap();
        prop_assert_eq!(outcome.error_count, Some(1));

        for (i, value) in values.iter().enumerate() {
            let name = format!("metric_{}", i);
            let sample = outcome.sample(&name, &[]);
            if i == broken {
                prop_assert!(sample.is_none());
            } else {
                prop_assert_eq!(sample.map(|s| s.value), Some(*value as f64));
            }
        }
    }
}
