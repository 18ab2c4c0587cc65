use std::collections::HashMap;

use anyhow::Result;
use parking_lot::Mutex;

use fedplan::readwrite::{
    create_load_balancer, AlgorithmConfig, DiscoveryExport, ReadwriteSplittingRuleConfig,
    ReadwriteSplittingRuleQuery, RoutingError, SourceCell,
};

#[path = "../common/mod.rs"]
mod common;
use common::temp_file;

const RULES: &str = r#"{
    "data_sources": [
        {
            "name": "readwrite_ds",
            "static_strategy": {"write_data_source_name": "primary_ds", "read_data_source_names": ["replica_ds_0", "replica_ds_1"]},
            "load_balancer_name": "round_robin"
        },
        {
            "name": "auto_ds",
            "dynamic_strategy": {"auto_aware_data_source_name": "ha_group", "write_data_source_query_enabled": false},
            "load_balancer_name": "random"
        }
    ],
    "load_balancers": {
        "round_robin": {"type": "ROUND_ROBIN"},
        "random": {"type": "RANDOM", "props": {"seed": "7", "region": "east"}}
    }
}"#;

#[test]
fn test_round_robin_across_threads() -> Result<()> {
    let balancer = create_load_balancer(&AlgorithmConfig::new("ROUND_ROBIN"))?;
    let reads = vec!["replica_ds_0".to_string(), "replica_ds_1".to_string()];
    let counts: Mutex<HashMap<String, usize>> = Mutex::new(HashMap::new());

    crossbeam::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| {
                for _ in 0..100 {
                    let picked = balancer.select_data_source("readwrite_ds", "primary_ds", &reads, false).unwrap();
                    *counts.lock().entry(picked).or_insert(0) += 1;
                }
            });
        }
    }).unwrap();

    let counts = counts.into_inner();
    assert_eq!(counts.get("replica_ds_0"), Some(&200));
    assert_eq!(counts.get("replica_ds_1"), Some(&200));
    assert_eq!(balancer.select_data_source("readwrite_ds", "primary_ds", &reads, true)?, "primary_ds");
    Ok(())
}

#[test]
fn test_unknown_balancer_type() {
    let result = create_load_balancer(&AlgorithmConfig::new("LEAST_CONNECTIONS"));
    assert!(matches!(result, Err(RoutingError::UnknownLoadBalancer(_))));
}

#[test]
fn test_show_rules_without_discovery() -> Result<()> {
    let config = ReadwriteSplittingRuleConfig::from_json(RULES)?;
    let export = DiscoveryExport::default();
    let rows = ReadwriteSplittingRuleQuery::new(&config, &export).rows();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].cells(), vec![
        "readwrite_ds", "", "", "primary_ds", "replica_ds_0,replica_ds_1", "ROUND_ROBIN", "",
    ]);
    assert_eq!(rows[1].auto_aware_data_source_name, "ha_group");
    assert_eq!(rows[1].write_data_source_query_enabled, "false");
    assert_eq!(rows[1].write_data_source_name, SourceCell::Unknown);
    assert_eq!(rows[1].read_data_source_names, SourceCell::Unknown);
    assert_eq!(rows[1].load_balancer_type, "RANDOM");
    assert_eq!(rows[1].load_balancer_props, "seed=7,region=east");
    Ok(())
}

#[test]
fn test_show_rules_with_discovery() -> Result<()> {
    let file = temp_file(RULES)?;
    let config = ReadwriteSplittingRuleConfig::from_file(file.path())?;
    let export: DiscoveryExport = serde_json::from_str(r#"{
        "dynamic": {"auto_ds": {"primary_data_source_name": "ds_a", "replica_data_source_names": ["ds_b", "ds_c"]}},
        "static": {"readwrite_ds": {"primary_data_source_name": "primary_ds", "replica_data_source_names": ["replica_ds_1"]}}
    }"#)?;
    let rows = ReadwriteSplittingRuleQuery::new(&config, &export).rows();

    // Exported sources win over the static configuration
    assert_eq!(rows[0].read_data_source_names.to_string(), "replica_ds_1");
    assert_eq!(rows[1].write_data_source_name, SourceCell::Known("ds_a".to_string()));
    assert_eq!(rows[1].read_data_source_names.to_string(), "ds_b,ds_c");
    Ok(())
}

#[test]
fn test_invalid_rules_rejected() {
    let missing_balancer = r#"{"data_sources": [{"name": "ds", "static_strategy": {"write_data_source_name": "w"}, "load_balancer_name": "nope"}]}"#;
    assert!(matches!(
        ReadwriteSplittingRuleConfig::from_json(missing_balancer),
        Err(RoutingError::InvalidRule { name, .. }) if name == "ds"
    ));
}
