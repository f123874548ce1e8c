use assert_cmd::Command;
use mockito::{Matcher, Server, ServerGuard};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use youtrack_updater::test_utils::ComposeFixture;

const TAGS_PATH: &str = "/v2/repositories/jetbrains/youtrack/tags";

/// Binary with a private HOME and no inherited updater settings.
fn updater(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("youtrack-updater").unwrap();
    cmd.env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .env("YOUTRACK_UPDATER_NO_PROGRESS", "1")
        .env_remove("YOUTRACK_UPDATER_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("updater.toml");
    std::fs::write(&path, content).unwrap();
    path
}

fn registry_with(tags: &[&str]) -> (ServerGuard, mockito::Mock) {
    let mut server = Server::new();
    let results: Vec<_> = tags.iter().map(|name| json!({ "name": name })).collect();
    let mock = server
        .mock("GET", TAGS_PATH)
        .match_query(Matcher::UrlEncoded("page_size".into(), "100".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "results": results }).to_string())
        .create();
    (server, mock)
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    updater(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_flags() {
    let home = TempDir::new().unwrap();
    updater(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--compose-file"))
        .stdout(predicate::str::contains("--yes"))
        .stdout(predicate::str::contains("--log-timeout"));
}

#[test]
fn test_missing_compose_file_exits_1() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("docker-compose.yml");

    updater(&home)
        .arg("--compose-file")
        .arg(&missing)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Compose file not found"));
}

#[test]
fn test_compose_file_without_image_exits_1() {
    let home = TempDir::new().unwrap();
    let fixture = ComposeFixture::with_content("services:\n  db:\n    image: postgres:15\n").unwrap();

    updater(&home)
        .arg("--compose-file")
        .arg(fixture.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No jetbrains/youtrack image found"));
}

#[test]
fn test_invalid_config_exits_1() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "page_size = \"many\"\n");

    updater(&home)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid config file syntax"));
}

#[test]
fn test_rejected_config_value_exits_1() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "image = \"youtrack\"\n");

    updater(&home)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("namespace"));
}

#[test]
fn test_up_to_date_exits_0() {
    let home = TempDir::new().unwrap();
    let (server, mock) = registry_with(&["2023.1.12345", "2023.2.9999", "bogus-tag"]);
    let config = write_config(&home, &format!("registry_url = \"{}\"\n", server.url()));
    let fixture = ComposeFixture::with_tag("2023.2.9999").unwrap();

    updater(&home)
        .arg("--config")
        .arg(&config)
        .arg("--compose-file")
        .arg(fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));

    mock.assert();
}

#[test]
fn test_no_progress_env_values_are_accepted() {
    let home = TempDir::new().unwrap();
    let (server, _mock) = registry_with(&["2023.2.9999"]);
    let config = write_config(&home, &format!("registry_url = \"{}\"\n", server.url()));
    let fixture = ComposeFixture::with_tag("2023.2.9999").unwrap();

    for value in ["1", "yes", "true", ""] {
        updater(&home)
            .env("YOUTRACK_UPDATER_NO_PROGRESS", value)
            .arg("--config")
            .arg(&config)
            .arg("--compose-file")
            .arg(fixture.path())
            .arg("--no-progress")
            .assert()
            .success()
            .stdout(predicate::str::contains("up to date"));
    }
}

#[test]
fn test_declined_exits_0_and_leaves_file() {
    let home = TempDir::new().unwrap();
    let (server, _mock) = registry_with(&["2023.1.12345", "2023.2.9999", "bogus-tag"]);
    let config = write_config(&home, &format!("registry_url = \"{}\"\n", server.url()));
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let before = fixture.read().unwrap();

    updater(&home)
        .arg("--config")
        .arg(&config)
        .arg("--compose-file")
        .arg(fixture.path())
        .write_stdin("maybe\nN\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Upgrade cancelled"));

    assert_eq!(fixture.read().unwrap(), before);
}

#[test]
fn test_missing_engine_exits_1_before_touching_anything() {
    let home = TempDir::new().unwrap();
    let (server, _mock) = registry_with(&["2023.2.9999"]);
    let config = write_config(
        &home,
        &format!(
            "registry_url = \"{}\"\nengine = \"definitely-not-a-container-engine-xyz\"\n",
            server.url()
        ),
    );
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let before = fixture.read().unwrap();

    updater(&home)
        .arg("--config")
        .arg(&config)
        .arg("--compose-file")
        .arg(fixture.path())
        .arg("--yes")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("definitely-not-a-container-engine-xyz"));

    assert_eq!(fixture.read().unwrap(), before);
}

#[test]
fn test_registry_failure_exits_1() {
    let home = TempDir::new().unwrap();
    let mut server = Server::new();
    let _mock = server
        .mock("GET", TAGS_PATH)
        .match_query(Matcher::Any)
        .with_status(503)
        .create();
    let config = write_config(&home, &format!("registry_url = \"{}\"\n", server.url()));
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();

    updater(&home)
        .arg("--config")
        .arg(&config)
        .arg("--compose-file")
        .arg(fixture.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to check the registry"));
}
