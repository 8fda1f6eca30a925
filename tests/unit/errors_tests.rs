/*!
 * Tests for error types and conversions
 */

use std::path::PathBuf;
use std::time::Duration;

use wikireplica::errors::{AppError, ConnectionError, CredentialError, QueryError};

#[test]
fn test_credentialError_intoConnectionError_shouldWrap() {
    let err: ConnectionError = CredentialError::NotFound {
        path: PathBuf::from("/x/h.cnf"),
    }
    .into();
    assert!(matches!(err, ConnectionError::Credential(_)));
    assert!(!err.is_transient());
    assert!(err.to_string().contains("/x/h.cnf"));
}

#[test]
fn test_transientError_shouldExposeCodeAndAttempts() {
    let err = ConnectionError::Transient {
        target: "h/db:3306".to_string(),
        code: Some(2013),
        message: "lost".to_string(),
        attempts: 3,
    };
    assert!(err.is_transient());
    assert_eq!(err.code(), Some(2013));
    assert!(err.to_string().contains("3 attempt(s)"));
}

#[test]
fn test_appError_fromQueryError_shouldKeepMessage() {
    let err: AppError = QueryError::Timeout(Duration::from_secs(5)).into();
    assert!(matches!(err, AppError::Query(_)));
    assert!(err.to_string().contains("5s"));
}

#[test]
fn test_appError_fromAnyhow_shouldBeUnknown() {
    let err: AppError = anyhow::anyhow!("boom").into();
    assert!(matches!(err, AppError::Unknown(ref msg) if msg == "boom"));
}
