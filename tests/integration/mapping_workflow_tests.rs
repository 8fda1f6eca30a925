/*!
 * End-to-end mapping tests: registry rows through the connection layer,
 * into the cache and onto disk.
 */

use std::sync::Arc;

use wikireplica::database::SqlValue;
use wikireplica::database::FailureKind;
use wikireplica::mapping::{MappingCache, REGISTRY_QUERY, ReplicaRegistry, load_snapshot, snapshot_path_in};

use crate::common::mock_driver::{MockDriver, raw_row, registry_row};
use crate::common::{TEST_HOST, create_temp_dir, init_logging, test_manager};

#[test]
fn test_mappingWorkflow_withMixedRegistryRows_shouldBuildExpectedMapping() {
    init_logging();
    let dir = create_temp_dir().unwrap();
    let driver = MockDriver::new();
    driver.return_rows(vec![
        registry_row(Some("fr"), Some("frwiki_p"), Some("https://fr.wikipedia.org")),
        registry_row(Some(""), Some("dewiki_p"), Some("https://de.wikipedia.org/")),
        registry_row(Some("es"), Some(""), Some("https://es.wikipedia.org")),
    ]);
    let manager = Arc::new(test_manager(dir.path(), &driver, 1).unwrap());
    let snapshot = snapshot_path_in(dir.path().join("out"));
    let cache = MappingCache::new(Box::new(ReplicaRegistry::from_manager(manager)), &snapshot);

    let mapping = cache.get();

    assert_eq!(mapping.get("fr"), Some("frwiki_p"));
    assert_eq!(mapping.get("de"), Some("dewiki_p"));
    assert!(!mapping.contains("es"));
    assert_eq!(mapping.get("en"), Some("enwiki"));

    let opened = driver.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].host, TEST_HOST);
    assert_eq!(opened[0].database, "meta_p");
    assert_eq!(driver.queries(), vec![REGISTRY_QUERY]);
    assert_eq!(driver.closed_count(), 1);

    let saved = load_snapshot(&snapshot).unwrap().unwrap();
    assert_eq!(saved.get("de"), Some("dewiki_p"));
}

#[test]
fn test_mappingWorkflow_withSnapshotFromEarlierRun_shouldSkipDatabase() {
    let dir = create_temp_dir().unwrap();
    let snapshot = snapshot_path_in(dir.path());

    let first = MockDriver::new();
    first.return_rows(vec![registry_row(Some("it"), Some("itwiki_p"), None)]);
    let manager = Arc::new(test_manager(dir.path(), &first, 1).unwrap());
    MappingCache::new(Box::new(ReplicaRegistry::from_manager(manager)), &snapshot).get();

    let second = MockDriver::new();
    let manager = Arc::new(test_manager(dir.path(), &second, 1).unwrap());
    let cache = MappingCache::new(Box::new(ReplicaRegistry::from_manager(manager)), &snapshot);

    assert_eq!(cache.name_for("it").as_deref(), Some("itwiki_p"));
    assert_eq!(second.open_count(), 0);
}

#[test]
fn test_mappingWorkflow_withRegistryUnreachable_shouldStillResolveEnglish() {
    let dir = create_temp_dir().unwrap();
    let driver = MockDriver::new();
    for _ in 0..3 {
        driver.fail_open(FailureKind::Transient, 2003);
    }
    let manager = Arc::new(test_manager(dir.path(), &driver, 3).unwrap());
    let cache = MappingCache::new(
        Box::new(ReplicaRegistry::from_manager(manager)),
        snapshot_path_in(dir.path()),
    );

    assert_eq!(cache.name_for("en").as_deref(), Some("enwiki"));
    assert_eq!(cache.name_for("fr"), None);
    assert_eq!(driver.open_count(), 3);
}

#[test]
fn test_mappingWorkflow_withByteColumns_shouldDecodeRegistryRows() {
    let dir = create_temp_dir().unwrap();
    let driver = MockDriver::new();
    driver.return_rows(vec![raw_row(&[
        ("lang", SqlValue::Bytes(b"pl".to_vec())),
        ("dbname", SqlValue::Bytes(b"plwiki_p".to_vec())),
        ("url", SqlValue::Null),
    ])]);
    let manager = Arc::new(test_manager(dir.path(), &driver, 1).unwrap());
    let cache = MappingCache::new(
        Box::new(ReplicaRegistry::from_manager(manager)),
        snapshot_path_in(dir.path()),
    );

    assert_eq!(cache.name_for("pl").as_deref(), Some("plwiki_p"));
}
