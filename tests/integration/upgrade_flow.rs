use mockito::{Matcher, Server};
use serde_json::json;
use youtrack_updater::config::UpdaterConfig;
use youtrack_updater::logwatch::WatchOutcome;
use youtrack_updater::registry::RegistryClient;
use youtrack_updater::test_utils::{
    ComposeFixture, LogScript, RecordingEngine, ScriptedPrompt, init_test_logging,
};
use youtrack_updater::upgrade::{UpgradeOutcome, UpgradeState, Upgrader};

const TAGS_PATH: &str = "/v2/repositories/jetbrains/youtrack/tags";

async fn mock_registry(server: &mut mockito::ServerGuard, hits: usize) -> mockito::Mock {
    server
        .mock("GET", TAGS_PATH)
        .match_query(Matcher::UrlEncoded("page_size".into(), "100".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "count": 3,
                "results": [
                    {"name": "2023.1.12345"},
                    {"name": "2023.2.9999"},
                    {"name": "bogus-tag"}
                ]
            })
            .to_string(),
        )
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn test_upgrade_against_mock_registry() {
    init_test_logging(None);
    let mut server = Server::new_async().await;
    let mock = mock_registry(&mut server, 1).await;

    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let config = UpdaterConfig {
        registry_url: server.url(),
        compose_file: fixture.path().display().to_string(),
        ..Default::default()
    };

    let engine = RecordingEngine::new().with_logs(LogScript::Lines(
        "youtrack-1  | Starting\n\
         youtrack-1  | Open [http://0.0.0.0:8080/?wizard_token=abc] to complete setup\n"
            .to_string(),
    ));
    let registry = RegistryClient::new(&config).unwrap();
    let mut upgrader =
        Upgrader::new(&config, engine, registry, ScriptedPrompt::answering(&[true])).unwrap();

    let outcome = upgrader.run().await.unwrap();
    let report = match outcome {
        UpgradeOutcome::Upgraded(report) => report,
        other => panic!("expected an upgrade, got {other:?}"),
    };

    assert_eq!(report.previous_tag, "2023.1.12345");
    assert_eq!(report.new_tag, "2023.2.9999");
    assert_eq!(report.setup, Some(WatchOutcome::SetupUrl("http://0.0.0.0:8080/?wizard_token=abc".to_string())));

    // The tag is the only textual change
    assert_eq!(fixture.read().unwrap(), ComposeFixture::content_for("2023.2.9999"));
    assert_eq!(
        upgrader.engine().calls(),
        vec![
            "pull jetbrains/youtrack:2023.2.9999",
            "down",
            "up",
            "logs",
            "rmi jetbrains/youtrack:2023.1.12345",
        ]
    );
    assert_eq!(upgrader.state(), UpgradeState::Done);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_second_run_is_up_to_date() {
    init_test_logging(None);
    let mut server = Server::new_async().await;
    let mock = mock_registry(&mut server, 2).await;

    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let config = UpdaterConfig {
        registry_url: server.url(),
        compose_file: fixture.path().display().to_string(),
        ..Default::default()
    };

    let mut first = Upgrader::new(
        &config,
        RecordingEngine::new(),
        RegistryClient::new(&config).unwrap(),
        ScriptedPrompt::answering(&[true]),
    )
    .unwrap();
    assert!(matches!(first.run().await.unwrap(), UpgradeOutcome::Upgraded(_)));

    let mut second = Upgrader::new(
        &config,
        RecordingEngine::new(),
        RegistryClient::new(&config).unwrap(),
        ScriptedPrompt::answering(&[true]),
    )
    .unwrap();
    let outcome = second.run().await.unwrap();
    assert!(matches!(outcome, UpgradeOutcome::UpToDate { ref current } if current == "2023.2.9999"));
    assert!(second.engine().calls().is_empty());

    mock.assert_async().await;
}
