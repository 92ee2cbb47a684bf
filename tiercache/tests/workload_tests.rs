//! Workload Generator Integration Tests

use std::collections::HashMap;
use tiercache::{ParamValue, QueryTemplate, Regime, WorkloadGenerator};

#[test]
fn test_same_seed_same_sequence() {
    let a: Vec<_> = WorkloadGenerator::new(Some(77)).take(500).collect();
    let b: Vec<_> = WorkloadGenerator::new(Some(77)).take(500).collect();
    assert_eq!(a, b);
}

#[test]
fn test_adjacent_seeds_diverge() {
    let a: Vec<_> = WorkloadGenerator::new(Some(77)).take(100).collect();
    let b: Vec<_> = WorkloadGenerator::new(Some(78)).take(100).collect();
    assert_ne!(a, b);
}

#[test]
fn test_daily_sales_dominates() {
    let mut counts: HashMap<QueryTemplate, usize> = HashMap::new();
    for query in WorkloadGenerator::new(Some(3)).take(20_000) {
        *counts.entry(query.template).or_default() += 1;
    }

    let daily = counts[&QueryTemplate::DailySalesProduct];
    for template in QueryTemplate::ALL {
        if template != QueryTemplate::DailySalesProduct {
            assert!(daily > counts[&template], "{} outnumbers daily sales", template);
        }
    }
}

#[test]
fn test_hot_keys_repeat() {
    let hot_orders = vec![ParamValue::from("Delhi"), ParamValue::from("College Start")];
    let repeats = WorkloadGenerator::new(Some(4))
        .take(5_000)
        .filter(|q| q.template == QueryTemplate::OrdersByCityInSeason && q.params == hot_orders)
        .count();

    // Hot regime alone contributes about 0.54 * 0.05 of draws
    assert!(repeats > 50, "only {} hot order queries", repeats);
}

#[test]
fn test_unseeded_generators_produce_valid_queries() {
    for query in WorkloadGenerator::new(None).take(1000) {
        assert_eq!(query.params.len(), query.template.arity());
        assert!(matches!(query.regime, Regime::Burst | Regime::Hot | Regime::Cold));
    }
}
