//! Profile persistence through CLI invocations (non-interactive paths only)
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;

fn run_hostdash(config_home: &Path, args: &[&str]) -> String {
    let output = Command::cargo_bin("hostdash")
        .unwrap()
        .env("XDG_CONFIG_HOME", config_home)
        .args(args)
        .output()
        .expect("run hostdash");
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn profiles_path(config_home: &Path) -> PathBuf {
    config_home.join("hostdash").join("profiles.json")
}

#[test]
fn profile_created_on_first_use() {
    let td = tempfile::tempdir().unwrap();
    run_hostdash(td.path(), &["--profile", "unittest", "http://example:8000/api", "--dry-run"]);
    let data = fs::read_to_string(profiles_path(td.path())).expect("profiles.json created");
    assert!(data.contains("unittest"), "profiles.json missing profile entry: {data}");
    assert!(data.contains("http://example:8000/api"));
}

#[test]
fn profile_overwritten_only_when_changed() {
    let td = tempfile::tempdir().unwrap();
    run_hostdash(td.path(), &["--profile", "prod", "http://one/api", "--dry-run"]);
    let first = fs::read_to_string(profiles_path(td.path())).unwrap();
    run_hostdash(td.path(), &["--profile", "prod", "http://one/api", "--dry-run"]);
    let second = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert_eq!(first, second, "profile file changed despite identical input");

    run_hostdash(td.path(), &["--profile", "prod", "--save", "http://two/api", "--dry-run"]);
    let third = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert!(third.contains("two"), "updated URL not written: {third}");
}

#[test]
fn saved_profile_is_loaded_by_name() {
    let td = tempfile::tempdir().unwrap();
    run_hostdash(td.path(), &["--profile", "lab", "https://lab:8443/api", "--dry-run"]);
    let out = run_hostdash(td.path(), &["--profile", "lab", "--dry-run"]);
    assert!(out.contains("would connect to https://lab:8443/api"), "{out}");
}

#[test]
fn profile_tls_ca_persisted() {
    let td = tempfile::tempdir().unwrap();
    run_hostdash(
        td.path(),
        &["--profile", "secureX", "--tls-ca", "/tmp/cert.pem", "https://host/api", "--dry-run"],
    );
    let data = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert!(data.contains("secureX"));
    assert!(data.contains("cert.pem"));
}
