use std::process::Command;

/// Embeds the short commit hash and the build timestamp so the demo binary
/// can print them in its startup log line.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=INPUBSUB_GIT_COMMIT={commit}");

    let built_at = chrono::Utc::now().to_rfc3339();
    println!("cargo:rustc-env=INPUBSUB_BUILD_TIME={built_at}");
}
