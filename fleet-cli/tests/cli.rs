use assert_cmd::Command;
use std::fs;

#[test]
fn test_help_lists_subcommands() {
    let output = Command::cargo_bin("fleet-cli")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["deploy", "check", "introspect"] {
        assert!(stdout.contains(subcommand), "missing {subcommand} in help");
    }
}

#[test]
fn test_deploy_with_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("fleet-cli")
        .unwrap()
        .args(["deploy", "--config"])
        .arg(dir.path().join("missing.toml"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}

#[test]
fn test_deploy_rejects_unknown_environment_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("fleet.toml");
    fs::write(
        &config,
        r#"
[bootstrap]
compose = "fluence_bootstrap.yml"
keystore = "bootstrap.keys"

[fleet]
compose = "fluence.yml"
keystore = "fleet.keys"

[environments.stage]
bootstrap = ["10.0.0.5"]
"#,
    )
    .unwrap();

    let output = Command::cargo_bin("fleet-cli")
        .unwrap()
        .env_remove("FLEET_ENV")
        .args(["deploy", "--environment", "prod", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown environment 'prod'"));
}
