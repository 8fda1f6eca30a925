/*!
 * Common test utilities for the wikireplica test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use wikireplica::app_config::ReplicaConfig;
use wikireplica::credentials::CredentialStore;
use wikireplica::database::{ConnectionManager, RetryPolicy};


use mock_driver::MockDriver;

/// Host used throughout the suite
pub const TEST_HOST: &str = "replica.test";

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes a valid credential file for `host` into `dir`
pub fn write_credentials(dir: &Path, host: &str) -> Result<PathBuf> {
    let store = CredentialStore::new(dir);
    let path = store.path_for(host);
    fs::write(&path, "[client]\nuser = u1234\npassword = 'secret'\n")?;
    Ok(path)
}

/// Replica settings pointing at `TEST_HOST` with credentials in `dir`
pub fn test_replica_config(dir: &Path) -> ReplicaConfig {
    ReplicaConfig {
        host: TEST_HOST.to_string(),
        credentials_dir: Some(dir.to_path_buf()),
        ..ReplicaConfig::default()
    }
}

/// Manager over a mock driver with valid credentials and no retry delay
pub fn test_manager(dir: &Path, driver: &MockDriver, max_attempts: u32) -> Result<ConnectionManager> {
    write_credentials(dir, TEST_HOST)?;
    Ok(manager_with(dir, driver, test_replica_config(dir), max_attempts))
}

/// Manager over a mock driver with the given replica settings
pub fn manager_with(
    dir: &Path,
    driver: &MockDriver,
    replica: ReplicaConfig,
    max_attempts: u32,
) -> ConnectionManager {
    ConnectionManager::new(
        Arc::new(driver.clone()),
        CredentialStore::new(dir),
        RetryPolicy::immediate(max_attempts),
        replica,
    )
}

/// Manager over a mock driver with valid credentials and a real retry policy
pub fn manager_with_retry(dir: &Path, driver: &MockDriver, retry: RetryPolicy) -> Result<ConnectionManager> {
    write_credentials(dir, TEST_HOST)?;
    Ok(ConnectionManager::new(
        Arc::new(driver.clone()),
        CredentialStore::new(dir),
        retry,
        test_replica_config(dir),
    ))
}

/// Route library logs to the test harness; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
