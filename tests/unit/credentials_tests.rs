/*!
 * Tests for credential file loading
 */

use std::fs;

use wikireplica::credentials::{CredentialStore, parse_credentials};
use wikireplica::errors::CredentialError;

use crate::common::{create_temp_dir, create_test_file};

/// Well-formed files load regardless of blank and unrecognised lines
#[test]
fn test_load_withInterleavedNoise_shouldReturnFileValues() {
    let dir = create_temp_dir().unwrap();
    create_test_file(
        dir.path(),
        "db.example.cnf",
        "[client]\n\n# comment\nuser = s52788\nhost = ignored\n\npassword = p@ss=word\n\n",
    )
    .unwrap();

    let store = CredentialStore::new(dir.path());
    let credential = store.load("db.example").unwrap();

    assert_eq!(credential.user(), "s52788");
    assert_eq!(credential.password(), "p@ss=word");
}

#[test]
fn test_load_withMissingFile_shouldReturnNotFoundWithPath() {
    let dir = create_temp_dir().unwrap();
    let store = CredentialStore::new(dir.path());

    let err = store.load("absent.host").unwrap_err();
    match err {
        CredentialError::NotFound { path } => {
            assert_eq!(path, dir.path().join("absent.host.cnf"));
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_load_withOnlyUser_shouldReportMissingPassword() {
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "h.cnf", "user=someone\n").unwrap();

    let err = CredentialStore::new(dir.path()).load("h").unwrap_err();
    assert!(err.to_string().contains("missing password"));
    match err {
        CredentialError::Malformed { missing, .. } => assert_eq!(missing, vec!["password"]),
        other => panic!("expected Malformed, got {:?}", other),
    }
}

#[test]
fn test_load_withDirectoryInPlaceOfFile_shouldReturnNotFound() {
    let dir = create_temp_dir().unwrap();
    fs::create_dir(dir.path().join("weird.cnf")).unwrap();

    let err = CredentialStore::new(dir.path()).load("weird").unwrap_err();
    assert!(matches!(err, CredentialError::NotFound { .. }));
}

#[test]
fn test_parseCredentials_withWhitespaceAroundEquals_shouldTrim() {
    let credential = parse_credentials("  user\t=\tbob  \npassword =   x y  \n").unwrap();
    assert_eq!(credential.user(), "bob");
    assert_eq!(credential.password(), "x y");
}

#[test]
fn test_credentialDebug_shouldNotLeakPassword() {
    let credential = parse_credentials("user=bob\npassword=hunter2\n").unwrap();
    let debug = format!("{:?}", credential);
    assert!(debug.contains("bob"));
    assert!(!debug.contains("hunter2"));
}
