//! Tests for `ossuary init`.

use crate::support::*;

#[test]
fn test_init_creates_layout() {
    let t = Test::new();

    let output = t.init("alice");
    assert_success(&output);
    assert_stdout_contains(&output, "initialized");
    assert_stdout_contains(&output, "Next steps:");

    for folder in ["keys", "secrets", "templates"] {
        assert!(t.dir.path().join(folder).is_dir(), "{folder} missing");
    }
    let config = std::fs::read_to_string(t.dir.path().join("ossuary.toml")).unwrap();
    assert!(config.contains("keepers = [\"alice\"]"), "{config}");
}

#[test]
fn test_init_twice_fails() {
    let t = Test::new();
    assert_success(&t.init("alice"));

    let output = t.init("alice");
    assert_failure(&output);
    assert_stderr_contains(&output, "configuration already exists");
}

#[test]
fn test_init_missing_dir_fails() {
    let t = Test::new();

    let output = t.run(&["init", "does/not/exist", "--keeper", "alice"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "missing folder");
}

#[test]
fn test_init_into_root_env() {
    let t = Test::new();
    let root = tempfile::tempdir().unwrap();

    let output = t
        .cmd()
        .env("OSSUARY_ROOT", root.path())
        .args(["init", "--keeper", "alice"])
        .output()
        .unwrap();
    assert_success(&output);
    assert!(root.path().join("ossuary.toml").is_file());
    assert!(!t.dir.path().join("ossuary.toml").exists());
}

#[test]
fn test_new_vault_needs_keeper_key() {
    let t = Test::new();
    assert_success(&t.init("alice"));

    let output = t.list(&[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "'alice'");
    assert_stderr_contains(&output, "keys/<alias>.pub");

    t.add_key("alice");
    let output = t.list(&[]);
    assert_success(&output);
    assert_stdout_contains(&output, "no secrets found");
}
