use std::process::Command;

fn git(args: &[&str]) -> Option<std::process::Output> {
    Command::new("git").args(args).output().ok()
}

/// Embed the short commit hash so `check_config` can report the build
fn main() {
    let version = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(out) if out.status.success() => {
            let hash = String::from_utf8_lossy(&out.stdout).trim().to_string();
            let dirty = git(&["diff", "--quiet"]).is_some_and(|o| !o.status.success());
            if dirty { format!("{hash}-dirty") } else { hash }
        }
        _ => "unknown".to_string(),
    };

    println!("cargo:rustc-env=BRIDGE_GIT_HASH={version}");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
