//! Binary smoke tests

use assert_cmd::Command;

#[test]
fn test_help_lists_options() {
    let output = Command::cargo_bin("podio-export")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for option in ["--config", "--secrets", "--output", "--download-files", "--metrics-addr"] {
        assert!(stdout.contains(option), "missing {option} in help");
    }
}

#[test]
fn test_missing_secrets_exits_with_error() {
    let temp = tempfile::tempdir().unwrap();

    let output = Command::cargo_bin("podio-export")
        .unwrap()
        .current_dir(temp.path())
        .args(["--secrets", "missing-secrets.json"])
        .env("RUST_LOG", "podio_export=info")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing-secrets.json"), "{stderr}");
}

#[test]
fn test_invalid_each_limit_is_rejected() {
    Command::cargo_bin("podio-export")
        .unwrap()
        .args(["--each-limit", "0"])
        .assert()
        .failure();
}
