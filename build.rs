use std::process::{Command, Output};

/// Run `git` in the package directory, keeping only successful runs.
fn git(args: &[&str]) -> Option<Output> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
}

fn main() {
    for watched in [".git/HEAD", ".git/refs/heads/", ".git/refs/tags/"] {
        println!("cargo:rerun-if-changed={watched}");
    }

    let short_hash = git(&["rev-parse", "--short", "HEAD"])
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty());

    let dirty = git(&["status", "--porcelain"]).is_some_and(|output| !output.stdout.is_empty());

    let version_hash = match (short_hash, dirty) {
        (Some(hash), true) => format!("{hash}-dirty"),
        (Some(hash), false) => hash,
        (None, _) => "unknown".to_string(),
    };

    // A build is a release only when HEAD carries a tag
    let tagged = git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some();

    println!("cargo:rustc-env=STINT_GIT_HASH={version_hash}");
    println!("cargo:rustc-env=STINT_IS_RELEASE={tagged}");
}
