//! Tests for `ossuary list`.

use crate::support::*;

fn populate(t: &Test) {
    t.write_secret("app/prod", &[("env", "prod")], &["alice", "bob", "carol"]);
    t.write_secret("app/dev", &[("env", "dev")], &["alice", "dave"]);
    t.write_secret("db/main", &[], &["alice"]);
}

#[test]
fn test_list_all() {
    let t = Test::vault(CONFIG);
    populate(&t);

    let output = t.list(&[]);
    assert_success(&output);
    assert_eq!(stdout(&output), "- app/dev\n- app/prod\n- db/main\n");
}

#[test]
fn test_list_folder() {
    let t = Test::vault(CONFIG);
    populate(&t);

    let output = t.list(&["app/"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "- app/dev\n- app/prod\n");
}

#[test]
fn test_list_single_uri() {
    let t = Test::vault(CONFIG);
    populate(&t);

    let output = t.list(&["db/main"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "- db/main\n");
}

#[test]
fn test_list_missing_folder_fails() {
    let t = Test::vault(CONFIG);

    let output = t.list(&["nowhere"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "folder does not exist: nowhere");
}

#[test]
fn test_list_query() {
    let t = Test::vault(CONFIG);
    populate(&t);

    let output = t.list(&["--query", "tags.env == 'prod' || uri ~ '^db/'"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "- app/prod\n- db/main\n");
}

#[test]
fn test_list_query_syntax_error() {
    let t = Test::vault(CONFIG);

    let output = t.list(&["--query", "tags.env == "]);
    assert_failure(&output);
    assert_stderr_contains(&output, "syntax error at 1:");
}

#[test]
fn test_list_readable_by_key() {
    let t = Test::vault(CONFIG);
    populate(&t);

    // dave is not expected anywhere but app/dev is still addressed to him.
    let output = t.list(&["--key", "dave"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "- app/dev\n");

    let output = t.list(&["--key", "bob"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "- app/prod\n");
}

#[test]
fn test_list_defaults_to_identity() {
    let t = Test::vault(&CONFIG.replace("identity = \"alice\"", "identity = \"bob\""));
    populate(&t);

    let output = t.list(&[]);
    assert_success(&output);
    assert_eq!(stdout(&output), "- app/prod\n");
}

#[test]
fn test_list_unknown_key_fails() {
    let t = Test::vault(CONFIG);

    let output = t.list(&["--key", "mallory"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "unknown key 'mallory'");
}

#[test]
fn test_list_long_tree() {
    let t = Test::vault(CONFIG);
    t.write_secret("app/prod", &[("env", "prod"), ("team", "web")], &["alice", "dave"]);

    let output = t.list(&["--long"]);
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "- app/prod\n  \
         |-- recipients: alice, bob, carol\n  \
         |   |-- unknown: -\n  \
         |   |-- rubbish: dave\n  \
         |   `-- missing: bob, carol\n  \
         |-- template: -\n  \
         `-- tags\n      \
         |-- env: prod\n      \
         `-- team: web\n\n"
    );
}

#[test]
fn test_list_json() {
    let t = Test::vault(CONFIG);
    populate(&t);

    let output = t.list(&["--json"]);
    assert_success(&output);
    let listing: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();

    let object = listing.as_object().unwrap();
    assert_eq!(object.len(), 3);
    assert_eq!(
        listing["app/prod"]["recipients"]["expected"],
        serde_json::json!(["alice", "bob", "carol"])
    );
    assert_eq!(listing["app/dev"]["recipients"]["rubbish"], serde_json::json!(["dave"]));
    assert_eq!(listing["app/dev"]["tags"]["env"], "dev");
    assert_eq!(
        listing["db/main"]["template"],
        serde_json::json!({"alias": "database", "state": "valid"})
    );
    assert!(listing["app/prod"]["template"].is_null());
}

#[test]
fn test_list_ignore_schema_leaves_state_unknown() {
    let t = Test::vault(CONFIG);
    populate(&t);
    std::fs::write(
        t.dir.path().join("templates/database.schema"),
        r#"{"type": "object"}"#,
    )
    .unwrap();

    let output = t.list(&["--json", "--ignore-schema"]);
    assert_success(&output);
    let listing: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(listing["db/main"]["template"]["state"], "unknown");

    let output = t.list(&["--long", "--ignore-schema", "db"]);
    assert_success(&output);
    assert_stdout_contains(&output, "  |-- template: database ?\n");
}

#[test]
fn test_list_rejects_uncompilable_schema() {
    let t = Test::vault(CONFIG);
    std::fs::write(t.dir.path().join("templates/database.schema"), r#"{"type": 1}"#).unwrap();

    let output = t.list(&[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid template 'database'");
}

#[test]
fn test_list_skips_corrupt_secret() {
    let t = Test::vault(CONFIG);
    populate(&t);
    std::fs::write(t.secret_path("broken.secret"), b"not gzip").unwrap();

    let output = t.list(&[]);
    assert_success(&output);
    assert_stdout_excludes(&output, "broken");
    assert_stderr_contains(&output, "failed to load secret");
}

#[test]
fn test_list_empty() {
    let t = Test::vault(CONFIG);

    let output = t.list(&[]);
    assert_success(&output);
    assert_stdout_contains(&output, "no secrets found");
}
