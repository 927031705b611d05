//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create an ossuary command with an isolated environment.
    ///
    /// Returns a Command configured with:
    /// - HOME set to the temporary home directory, GNUPGHOME inside it
    /// - Current directory set to the vault root
    /// - Colors and inherited ossuary variables disabled
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("ossuary").expect("failed to find ossuary binary");
        cmd.env("HOME", self.home.path());
        cmd.env("GNUPGHOME", self.gnupg_home());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("OSSUARY_ROOT");
        cmd.env_remove("OSSUARY_LOG");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run `ossuary <args>`.
    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run ossuary")
    }

    /// Shortcut for `ossuary init --keeper <keeper>`.
    pub fn init(&self, keeper: &str) -> Output {
        self.run(&["init", "--keeper", keeper])
    }

    /// Shortcut for `ossuary set`, feeding `value` on stdin.
    pub fn set(&self, uri: &str, value: &str, tags: &[&str]) -> Output {
        let mut cmd = self.cmd();
        cmd.args(["set", uri]);
        for tag in tags {
            cmd.args(["--tag", tag]);
        }
        cmd.write_stdin(value)
            .output()
            .expect("failed to run ossuary set")
    }

    /// Shortcut for `ossuary get`.
    pub fn get(&self, uri: &str) -> Output {
        self.run(&["get", uri])
    }

    /// Shortcut for `ossuary about`.
    pub fn about(&self, uri: &str) -> Output {
        self.run(&["about", uri])
    }

    /// Shortcut for `ossuary list <args>`.
    pub fn list(&self, args: &[&str]) -> Output {
        let mut cmd = self.cmd();
        cmd.arg("list").args(args);
        cmd.output().expect("failed to run ossuary list")
    }

    /// Shortcut for `ossuary rebuild <args>`.
    pub fn rebuild(&self, args: &[&str]) -> Output {
        let mut cmd = self.cmd();
        cmd.arg("rebuild").args(args);
        cmd.output().expect("failed to run ossuary rebuild")
    }
}
