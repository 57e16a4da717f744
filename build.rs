use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn main() {
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    let rustc = env::var_os("RUSTC").unwrap_or_else(|| "rustc".into());

    // `rustc 1.89.0 (29483883e 2025-08-04)` -> `1.89.0`
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .and_then(|stdout| stdout.split_whitespace().nth(1).map(str::to_owned))
        .unwrap_or_else(|| "unknown".to_owned());
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_owned());

    fs::write(out_dir.join("rustc_version"), format!("{version:?}")).unwrap();
    fs::write(out_dir.join("rustc_target"), format!("{target:?}")).unwrap();

    println!("cargo:rerun-if-changed=build.rs");
}
