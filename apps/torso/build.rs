use std::process::Command;

fn main() {
    let revision = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|rev| rev.trim().to_owned())
        .filter(|rev| !rev.is_empty())
        .unwrap_or_else(|| "untracked".to_owned());
    println!("cargo:rustc-env=TORSO_REVISION={revision}");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
