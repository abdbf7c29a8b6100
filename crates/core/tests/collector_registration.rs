//! Integration tests for collector construction and group scraping.

use std::sync::{Arc, Barrier};
use std::thread;

use poolstats_core::testing::{fixture_snapshot, RecordingSink, ScriptedSource, StaticSource};
use poolstats_core::{CollectorRegistry, SnapshotSource};
use poolstats_domain::{CollectorConfig, PoolStatsError, PoolStatsSnapshot, Statistic};

#[test]
fn repeated_construction_never_reports_duplicate() {
    let sink = Arc::new(RecordingSink::default());
    let registry = CollectorRegistry::new(sink.clone());

    for _ in 0..5 {
        let source: Arc<dyn SnapshotSource> = Arc::new(StaticSource::new(fixture_snapshot()));
        let result = registry.register_collector(&CollectorConfig::new("orders"), source);
        assert!(result.is_ok());
    }

    assert_eq!(sink.registration_count(), 1);
    assert_eq!(sink.groups().len(), 1);
}

#[test]
fn concurrent_construction_and_scrape() {
    let sink = Arc::new(RecordingSink::default());
    let registry = Arc::new(CollectorRegistry::new(sink.clone()));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let source = Arc::new(StaticSource::new(fixture_snapshot()));
                let collector = registry
                    .register_collector(&CollectorConfig::new(format!("db_{i}")), source)
                    .unwrap();
                let batch = collector.collect();
                (collector, batch)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(sink.registration_count(), 1);

    for (collector, batch) in &results {
        assert_eq!(batch.identity, collector.identity());
        assert_eq!(batch.len(), Statistic::ALL.len());
    }

    let scraped = sink.groups()[0].scrape();
    assert_eq!(scraped.len(), 8);
    assert!(scraped.windows(2).all(|w| w[0].identity < w[1].identity));
}

#[test]
fn failing_source_keeps_scrape_alive() {
    let registry = CollectorRegistry::new(Arc::new(RecordingSink::default()));
    let failing = ScriptedSource::new(vec![Err(PoolStatsError::SnapshotUnavailable(
        "pool closed".into(),
    ))])
    .with_fallback(PoolStatsSnapshot { open_connections: 2, idle: 2, ..PoolStatsSnapshot::zeroed() });

    let collector =
        registry.register_collector(&CollectorConfig::new("orders"), Arc::new(failing.clone())).unwrap();

    let first = collector.group().scrape();
    assert_eq!(first.len(), 1);
    assert!(first[0].stale);

    let second = collector.group().scrape();
    assert!(!second[0].stale);
    assert!((second[0].get(Statistic::Idle).unwrap().value - 2.0).abs() < f64::EPSILON);
    assert_eq!(failing.calls(), 2);
}

#[test]
fn custom_label_name_flows_into_descriptors() {
    let registry = CollectorRegistry::new(Arc::new(RecordingSink::default()));
    let config = CollectorConfig::new("orders")
        .with_namespace("app")
        .with_subsystem("pg")
        .with_label_name("db_stat");

    let collector = registry
        .register_collector(&config, Arc::new(StaticSource::new(fixture_snapshot())))
        .unwrap();

    assert!(collector.describe().iter().all(|d| d.label_names == vec!["db_stat".to_string()]));
    assert_eq!(collector.describe()[0].fq_name, "app_pg_max_open");
}
