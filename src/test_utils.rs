//! Test utilities shared across modules.
//!
//! Helpers here drive the real `git` binary inside temporary directories so
//! tests never depend on the repository they are run from.

use std::fs;
use std::path::Path;
use std::process::Command;

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Initialize a repository on branch `main` with a local identity and one commit.
pub fn init_repo(dir: &Path) {
    git(dir, &["init", "--quiet"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    fs::write(dir.join("README.md"), "readme\n").unwrap();
    git(dir, &["add", "README.md"]);
    git(dir, &["commit", "--quiet", "-m", "initial"]);
}

/// Write `content` to `name` and commit it.
pub fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
    fs::write(dir.join(name), content).unwrap();
    git(dir, &["add", name]);
    git(dir, &["commit", "--quiet", "-m", message]);
}

/// Build a file body of `count` numbered lines.
pub fn lines(count: usize, tag: &str) -> String {
    (0..count).map(|i| format!("{tag} line {i}\n")).collect()
}

/// Run an arbitrary git command in `dir` and return trimmed stdout.
pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("git should be installed");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_repo_creates_initial_commit_on_main() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        assert_eq!(git_stdout(dir.path(), &["branch", "--show-current"]), "main");
        assert_eq!(git_stdout(dir.path(), &["rev-list", "--count", "HEAD"]), "1");
    }

    #[test]
    fn test_lines_builds_numbered_body() {
        let body = lines(3, "x");
        assert_eq!(body.lines().count(), 3);
        assert!(body.starts_with("x line 0\n"));
    }
}
