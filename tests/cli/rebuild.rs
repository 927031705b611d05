//! Tests for `ossuary rebuild`.

use crate::support::*;
use ossuary::core::openpgp::KeyId;

#[test]
fn test_rebuild_compliant_tree() {
    let t = Test::vault(CONFIG);
    t.write_secret("app/prod", &[("env", "prod")], &["alice", "bob", "carol"]);
    t.write_secret("notes", &[], &["alice"]);
    let before = t.snapshot();

    let output = t.rebuild(&[]);
    assert_success(&output);
    assert_eq!(stdout(&output), "Done! 2 files checked.\n");
    assert_eq!(t.snapshot(), before);
}

#[test]
fn test_rebuild_dry_run_reports_without_changes() {
    let t = Test::vault(CONFIG);
    t.write_secret("app/prod", &[("env", "prod")], &["alice"]);
    t.write_secret("app/old", &[], &["alice", "dave"]);
    t.write_secret_ids("legacy", &[], &[key_id("alice"), KeyId(0xbeef)]);
    t.write_secret("ok", &[], &["alice"]);
    std::fs::write(t.secret_path("stray.txt"), b"junk").unwrap();
    let before = t.snapshot();

    let output = t.rebuild(&["--dry-run"]);
    assert_success(&output);
    let stray = t.secret_path("stray.txt");
    assert_eq!(
        sorted_lines(&output),
        [
            "- Re-encrypting 'app/old': rubbish recipients (dave, etc.)... ✓".to_string(),
            "- Re-encrypting 'app/prod': missing recipients (bob, carol)... ✓".to_string(),
            "- Re-encrypting 'legacy': unknown rubbish recipients (0x000000000000beef, etc.)... ✓"
                .to_string(),
            format!("- Removing unexpected file '{}'... ✓", stray.display()),
            "Done! 5 files checked.".to_string(),
        ]
    );
    assert_eq!(t.snapshot(), before);
}

#[test]
fn test_rebuild_dry_run_force() {
    let t = Test::vault(CONFIG);
    t.write_secret("ok", &[], &["alice"]);
    let before = t.snapshot();

    let output = t.rebuild(&["--dry-run", "--force"]);
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "- Re-encrypting 'ok': forced... ✓\nDone! 1 files checked.\n"
    );
    assert_eq!(t.snapshot(), before);
}

#[test]
fn test_rebuild_removes_unexpected_files() {
    let t = Test::vault(CONFIG);
    t.write_secret("ok", &[], &["alice"]);
    let stray = t.secret_path("nested/leftover.gpg");
    std::fs::create_dir_all(stray.parent().unwrap()).unwrap();
    std::fs::write(&stray, b"junk").unwrap();

    let output = t.rebuild(&["--workers", "1"]);
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        format!(
            "- Removing unexpected file '{}'... ✓\nDone! 2 files checked.\n",
            stray.display()
        )
    );
    assert!(!stray.exists());
    assert!(t.secret_path("ok.secret").exists());
}

#[test]
fn test_rebuild_failure_leaves_original() {
    let t = Test::vault(CONFIG);
    // alice, the configured identity, can't decrypt this one.
    t.write_secret("locked", &[], &["bob"]);
    let before = t.snapshot();

    let output = t.rebuild(&[]);
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "- Re-encrypting 'locked': rubbish recipients (bob, etc.)... ✗\nDone! 1 files checked.\n"
    );
    assert_stderr_contains(&output, "failed to decrypt secret for re-encryption");
    assert_eq!(t.snapshot(), before);
}

#[test]
fn test_rebuild_corrupt_secret() {
    let t = Test::vault(CONFIG);
    std::fs::write(t.secret_path("broken.secret"), b"not gzip").unwrap();

    let output = t.rebuild(&["--dry-run"]);
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "! Failed to determine recipients for 'broken'\nDone! 1 files checked.\n"
    );
}

#[test]
fn test_rebuild_filters_are_not_counted() {
    let t = Test::vault(CONFIG);
    t.write_secret("app/prod", &[("env", "prod")], &["alice"]);
    t.write_secret("app/dev", &[("env", "dev")], &["alice", "dave"]);
    t.write_secret("db/main", &[], &["alice", "bob"]);

    let output = t.rebuild(&["--dry-run", "--query", "tags.env == 'prod'"]);
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "- Re-encrypting 'app/prod': missing recipients (bob, carol)... ✓\nDone! 1 files checked.\n"
    );

    let output = t.rebuild(&["--dry-run", "--key", "dave"]);
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "- Re-encrypting 'app/dev': rubbish recipients (dave, etc.)... ✓\nDone! 1 files checked.\n"
    );

    let output = t.rebuild(&["--dry-run", "db"]);
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "- Re-encrypting 'db/main': rubbish recipients (bob, etc.)... ✓\nDone! 1 files checked.\n"
    );
}

#[cfg(feature = "test-cipher")]
#[test]
fn test_rebuild_repairs_and_is_idempotent() {
    let t = Test::vault(CONFIG);
    t.write_secret("app/prod", &[("env", "prod")], &["alice"]);
    t.write_secret("app/old", &[], &["alice", "dave"]);

    let output = t.rebuild(&[]);
    assert_success(&output);
    assert_eq!(
        sorted_lines(&output),
        [
            "- Re-encrypting 'app/old': rubbish recipients (dave, etc.)... ✓",
            "- Re-encrypting 'app/prod': missing recipients (bob, carol)... ✓",
            "Done! 2 files checked.",
        ]
    );

    let after = t.snapshot();
    let output = t.rebuild(&[]);
    assert_success(&output);
    assert_eq!(stdout(&output), "Done! 2 files checked.\n");
    assert_eq!(t.snapshot(), after);

    let output = t.about("app/prod");
    assert_stdout_excludes(&output, "!");
    let output = t.get("app/old");
    assert_success(&output);
    assert_eq!(stdout(&output), "value");
}
