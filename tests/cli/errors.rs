//! Tests for error handling and global flags.

use crate::support::*;

#[test]
fn test_help() {
    let t = Test::new();

    let output = t.run(&["--help"]);
    assert_success(&output);
    assert_stdout_contains(&output, "rebuild");
    assert_stdout_contains(&output, "Usage");
}

#[test]
fn test_version_flag() {
    let t = Test::new();

    let output = t.run(&["--version"]);
    assert_success(&output);
    assert_stdout_contains(&output, "ossuary");
}

#[test]
fn test_unknown_command_fails() {
    let t = Test::new();

    let output = t.run(&["unknown-command"]);
    assert_failure(&output);
}

#[test]
fn test_missing_config_hints_init() {
    let t = Test::new();

    let output = t.list(&[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "configuration not found");
    assert_stderr_contains(&output, "run: ossuary init");
}

#[test]
fn test_explicit_config_path() {
    let t = Test::vault(CONFIG);
    t.write_secret("notes", &[], &["alice"]);
    let config = t.dir.path().join("ossuary.toml");

    let output = t
        .cmd()
        .current_dir(t.home.path())
        .args(["list", "-c"])
        .arg(&config)
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "- notes\n");
}

#[test]
fn test_root_env_locates_config() {
    let t = Test::vault(CONFIG);
    t.write_secret("notes", &[], &["alice"]);

    let output = t
        .cmd()
        .current_dir(t.home.path())
        .env("OSSUARY_ROOT", t.dir.path())
        .arg("list")
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "- notes\n");
}

#[test]
fn test_unknown_grantee_is_fatal() {
    let t = Test::vault(&format!(
        "{CONFIG}\n[[permissions]]\nquery = 'uri ~ \"^x\"'\ngrants = [\"+nobody\"]\n"
    ));
    t.write_secret("notes", &[], &["alice", "dave"]);
    let before = t.snapshot();

    let output = t.rebuild(&[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "unknown key or team 'nobody'");
    assert!(stdout(&output).is_empty());
    assert_eq!(t.snapshot(), before);
}

#[test]
fn test_invalid_rule_query_is_fatal() {
    let t = Test::vault(&format!(
        "{CONFIG}\n[[permissions]]\nquery = 'uri ~ \"[\"'\ngrants = [\"+bob\"]\n"
    ));

    let output = t.list(&[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid query");
}

#[test]
fn test_unknown_config_field_is_fatal() {
    let t = Test::vault(&format!("{CONFIG}\nsurprise = true\n"));

    let output = t.list(&[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to parse configuration");
}

#[test]
fn test_verbose_enables_debug_logs() {
    let t = Test::vault(CONFIG);

    let output = t.run(&["--verbose", "list"]);
    assert_success(&output);
    assert_stderr_contains(&output, "vault opened");

    let output = t.list(&[]);
    assert_success(&output);
    assert!(!stderr(&output).contains("vault opened"));
}

#[test]
fn test_log_env_overrides_filter() {
    let t = Test::vault(CONFIG);

    let output = t
        .cmd()
        .env("OSSUARY_LOG", "ossuary=trace")
        .arg("list")
        .output()
        .unwrap();
    assert_success(&output);
    assert_stderr_contains(&output, "loading policy");
}
