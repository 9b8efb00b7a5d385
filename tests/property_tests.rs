//! Property-based tests using proptest.
//!
//! These check the DNS record merge for all inputs rather than a few
//! hand-picked ones.

use proptest::prelude::*;
use serde_json::{json, Value};
use wolfsync::model::Object;
use wolfsync::sync::merge::{is_excluded, merge_dns_records};

fn record_strategy() -> impl Strategy<Value = String> {
    (0u8..4, prop::sample::select(vec!["a.lan", "b.lan", "nas.home", "printer.home"]))
        .prop_map(|(host, domain)| format!("10.0.0.{} {}", host, domain))
}

fn records_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(record_strategy(), 0..8)
}

fn exclude_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::sample::select(vec!["a.lan", "home", "10.0.0.1", "nothing"]).prop_map(String::from),
        0..3,
    )
}

fn dns(hosts: &[String]) -> Object {
    match json!({ "hosts": hosts, "cnameRecords": [] }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn count(list: &[Value], item: &Value) -> usize {
    list.iter().filter(|v| *v == item).count()
}

proptest! {
    /// Every merged record comes from the right side and keeps its multiplicity
    #[test]
    fn merged_records_come_from_owner(
        primary in records_strategy(),
        replica in records_strategy(),
        exclude in exclude_strategy(),
    ) {
        let primary_dns = dns(&primary);
        let replica_dns = dns(&replica);
        let merged = merge_dns_records(Some(&primary_dns), Some(&replica_dns), &exclude).unwrap();
        let hosts = merged["hosts"].as_array().unwrap();

        let primary_values: Vec<Value> = primary.iter().map(|h| json!(h)).collect();
        let replica_values: Vec<Value> = replica.iter().map(|h| json!(h)).collect();

        for host in hosts {
            let from_primary = !is_excluded(host, &exclude);
            if from_primary {
                prop_assert!(primary_values.contains(host));
                prop_assert_eq!(count(hosts, host), count(&primary_values, host));
            } else {
                prop_assert!(replica_values.contains(host));
                prop_assert_eq!(count(hosts, host), count(&replica_values, host));
            }
        }

        let expected = primary_values.iter().filter(|h| !is_excluded(h, &exclude)).count()
            + replica_values.iter().filter(|h| is_excluded(h, &exclude)).count();
        prop_assert_eq!(hosts.len(), expected);
    }

    /// Primary-owned records always precede replica-owned ones
    #[test]
    fn primary_records_come_first(
        primary in records_strategy(),
        replica in records_strategy(),
        exclude in exclude_strategy(),
    ) {
        let merged = merge_dns_records(Some(&dns(&primary)), Some(&dns(&replica)), &exclude).unwrap();
        let hosts = merged["hosts"].as_array().unwrap();

        let first_replica = hosts.iter().position(|h| is_excluded(h, &exclude));
        if let Some(first) = first_replica {
            prop_assert!(hosts[first..].iter().all(|h| is_excluded(h, &exclude)));
        }
    }

    /// Merging is a pure function of its inputs
    #[test]
    fn merge_is_deterministic(
        primary in records_strategy(),
        replica in records_strategy(),
        exclude in exclude_strategy(),
    ) {
        let primary_dns = dns(&primary);
        let replica_dns = dns(&replica);
        let first = merge_dns_records(Some(&primary_dns), Some(&replica_dns), &exclude);
        let second = merge_dns_records(Some(&primary_dns), Some(&replica_dns), &exclude);
        prop_assert_eq!(first, second);
    }
}
