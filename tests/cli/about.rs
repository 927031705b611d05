//! Tests for `ossuary about`.

use crate::support::*;
use ossuary::core::openpgp::KeyId;

#[test]
fn test_about_reports_drift_and_tags() {
    let t = Test::vault(CONFIG);
    t.write_secret(
        "app/token",
        &[("env", "prod"), ("owner", "web")],
        &["alice", "bob", "dave"],
    );

    let output = t.about("app/token");
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "- Expected recipients: alice, bob, carol\n\
         ! Rubbish recipients: dave\n\
         ! Missing recipients: carol\n\
         - Tags:\n  \
         + env: prod\n  \
         + owner: web\n"
    );
}

#[test]
fn test_about_compliant_secret() {
    let t = Test::vault(CONFIG);
    t.write_secret("notes", &[], &["alice"]);

    let output = t.about("notes");
    assert_success(&output);
    assert_eq!(stdout(&output), "- Expected recipients: alice\n- Tags:\n");
}

#[test]
fn test_about_unknown_recipients() {
    let t = Test::vault(CONFIG);
    t.write_secret_ids("legacy", &[], &[key_id("alice"), KeyId(0xfeed)]);

    let output = t.about("legacy");
    assert_success(&output);
    assert_stdout_contains(&output, "! Unknown rubbish recipients: 0x000000000000feed\n");
    assert_stdout_excludes(&output, "! Missing");
}

#[test]
fn test_about_shows_template() {
    let t = Test::vault(CONFIG);
    t.write_secret("db/main", &[], &["alice"]);

    let output = t.about("db/main");
    assert_success(&output);
    assert_stdout_contains(&output, "- Template: database\n");
}

#[test]
fn test_about_missing_secret_fails() {
    let t = Test::vault(CONFIG);

    let output = t.about("nope");
    assert_failure(&output);
    assert_stderr_contains(&output, "secret does not exist: nope");
}

#[test]
fn test_about_rejects_escaping_uri() {
    let t = Test::vault(CONFIG);

    let output = t.about("../ossuary");
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid secret uri");
}
