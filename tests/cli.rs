use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn tigger_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tigger");
    path
}

/// Temp workspace with a config pointing at a closed local port, so any
/// request that does go out fails fast.
fn setup_test_env(extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[api]
base_url = "http://127.0.0.1:9"

[credentials]
path = "{root}/state/storage.json"

[export]
dir = "{root}/exports"
{extra}"#,
        root = root.display(),
        extra = extra
    );
    let config_path = config_dir.join("tigger.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

fn run_tigger(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = tigger_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--notify")
        .arg("human")
        .args(args)
        .env_remove("ACTIVETIGGER_API_URL")
        .env_remove("TIGGER_PROJECT")
        .env_remove("TIGGER_SCHEME")
        .env_remove("TIGGER_PASSWORD")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run tigger binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_help_lists_commands() {
    let (_tmp, config) = setup_test_env("");
    let (stdout, _, success) = run_tigger(&config, &["--help"]);
    assert!(success);
    for command in ["login", "projects", "annotate", "export", "watch"] {
        assert!(stdout.contains(command), "help is missing {}: {}", command, stdout);
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("tigger.toml");
    fs::write(&config, "[api]\nbase_url = \"ftp://example.org\"\n").unwrap();

    let (_, stderr, success) = run_tigger(&config, &["queue"]);
    assert!(!success);
    assert!(
        stderr.contains("must start with http:// or https://"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_scheme_add_without_project_fails_before_any_request() {
    let (_tmp, config) = setup_test_env("");
    let (_, stderr, success) = run_tigger(&config, &["scheme", "add", "sentiment"]);
    assert!(!success);
    assert!(
        stderr.contains("[error] Select a project first"),
        "stderr: {}",
        stderr
    );
    assert!(!stderr.contains("unable to reach the server"));
}

#[test]
fn test_annotate_uses_configured_defaults() {
    let (_tmp, config) = setup_test_env("\n[defaults]\nproject = \"p1\"\n");
    // Project comes from the config, scheme is still missing.
    let (_, stderr, success) = run_tigger(&config, &["annotate", "42", "pos"]);
    assert!(!success);
    assert!(
        stderr.contains("[error] Select a scheme first"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_unreachable_server_is_reported() {
    let (_tmp, config) = setup_test_env("");
    let (_, stderr, success) = run_tigger(&config, &["queue"]);
    assert!(!success);
    assert!(
        stderr.contains("unable to reach the server"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_login_requires_password() {
    let (_tmp, config) = setup_test_env("");
    let (_, stderr, success) = run_tigger(&config, &["login", "--username", "ada"]);
    assert!(!success);
    assert!(stderr.contains("No password"), "stderr: {}", stderr);
}

#[test]
fn test_whoami_when_logged_out() {
    let (_tmp, config) = setup_test_env("");
    let (_, stderr, success) = run_tigger(&config, &["whoami"]);
    assert!(!success);
    assert!(stderr.contains("Not logged in"), "stderr: {}", stderr);
}

#[test]
fn test_export_rejects_unsafe_format() {
    let (_tmp, config) = setup_test_env("\n[defaults]\nproject = \"p1\"\nscheme = \"default\"\n");
    let (_, stderr, success) = run_tigger(
        &config,
        &["export", "annotations", "--format", "../csv"],
    );
    assert!(!success);
    assert!(
        stderr.contains("Select a valid export format"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_project_update_needs_a_change() {
    let (_tmp, config) = setup_test_env("\n[defaults]\nproject = \"p1\"\n");
    let (_, stderr, success) = run_tigger(&config, &["projects", "update"]);
    assert!(!success);
    assert!(stderr.contains("[error] Nothing to update"), "stderr: {}", stderr);
    assert!(!stderr.contains("unable to reach the server"));
}

#[test]
fn test_project_auth_requires_project() {
    let (_tmp, config) = setup_test_env("");
    let (_, stderr, success) = run_tigger(&config, &["projects", "auth"]);
    assert!(!success);
    assert!(stderr.contains("Select a project first"), "stderr: {}", stderr);
}
