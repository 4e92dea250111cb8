use std::process::Command;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_client(true)
        // Server stubs back the in-process coordinator used by the transport tests.
        .build_server(true)
        .compile_protos(&["../../proto_files/backup_api.proto"], &["../../proto_files"])?;

    // Release tooling can pin these; otherwise fall back to what git reports.
    for (key, args) in [
        ("BACKUPCTL_COMMIT", &["rev-parse", "--short", "HEAD"][..]),
        ("BACKUPCTL_BRANCH", &["rev-parse", "--abbrev-ref", "HEAD"][..]),
    ] {
        println!("cargo:rerun-if-env-changed={key}");
        if std::env::var_os(key).is_none() {
            if let Some(value) = command_output("git", args) {
                println!("cargo:rustc-env={key}={value}");
            }
        }
    }
    println!("cargo:rerun-if-env-changed=BACKUPCTL_BUILD");

    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    if let Some(version) = command_output(&rustc, &["--version"]) {
        println!("cargo:rustc-env=BACKUPCTL_RUSTC_VERSION={version}");
    }

    Ok(())
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!value.is_empty()).then_some(value)
}
