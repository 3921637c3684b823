//! Build script for ej-analyze
//!
//! Stamps the short git commit and build profile into the binary so a run's
//! log identifies the exact build that produced its tables.

use std::process::Command;

fn main() {
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=EJ_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=EJ_BUILD_PROFILE={}", profile);
    println!("cargo:rerun-if-changed=build.rs");
}
