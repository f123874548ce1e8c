use std::time::Duration;

use super::*;
use crate::config::UpdaterConfig;
use crate::core::UpdaterError;
use crate::test_utils::{
    ComposeFixture, FixedTags, LogScript, RecordingEngine, ScriptedPrompt, init_test_logging,
};

const REGISTRY_TAGS: [&str; 3] = ["2023.1.12345", "2023.2.9999", "bogus-tag"];
const SETUP_LINE: &str =
    "youtrack-1  | Open [http://0.0.0.0:8080/?wizard_token=pTXhkxVXi3k] to finish setup\n";

fn config_for(fixture: &ComposeFixture) -> UpdaterConfig {
    UpdaterConfig {
        compose_file: fixture.path().display().to_string(),
        ..Default::default()
    }
}

fn upgrader(
    fixture: &ComposeFixture,
    engine: RecordingEngine,
    answers: &[bool],
) -> Upgrader<RecordingEngine, FixedTags, ScriptedPrompt> {
    init_test_logging(None);
    Upgrader::new(
        &config_for(fixture),
        engine,
        FixedTags::new(REGISTRY_TAGS),
        ScriptedPrompt::answering(answers),
    )
    .unwrap()
}

#[tokio::test]
async fn test_check_reports_newer_version() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let mut upgrader = upgrader(&fixture, RecordingEngine::new(), &[]);

    let check = upgrader.check().await.unwrap();
    assert_eq!(check.current, "2023.1.12345");
    assert_eq!(check.latest.tag, "2023.2.9999");
    assert!(check.update_available);
    assert_eq!(upgrader.state(), UpgradeState::CheckedVersions);
}

#[tokio::test]
async fn test_up_to_date_makes_no_engine_calls() {
    let fixture = ComposeFixture::with_tag("2023.2.9999").unwrap();
    let mut upgrader = upgrader(&fixture, RecordingEngine::new(), &[true]);

    let outcome = upgrader.run().await.unwrap();
    assert!(matches!(outcome, UpgradeOutcome::UpToDate { ref current } if current == "2023.2.9999"));
    assert!(upgrader.engine().calls().is_empty());
    assert!(upgrader.prompt().questions().is_empty());
    assert_eq!(upgrader.state(), UpgradeState::Done);
}

#[tokio::test]
async fn test_deployed_newer_than_registry_is_up_to_date() {
    let fixture = ComposeFixture::with_tag("2024.1.1").unwrap();
    let mut upgrader = upgrader(&fixture, RecordingEngine::new(), &[true]);

    let outcome = upgrader.run().await.unwrap();
    assert!(matches!(outcome, UpgradeOutcome::UpToDate { .. }));
    assert!(!upgrader.engine().mutated());
}

#[tokio::test]
async fn test_declined_leaves_everything_untouched() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let before = fixture.read().unwrap();
    let mut upgrader = upgrader(&fixture, RecordingEngine::new(), &[false]);

    let outcome = upgrader.run().await.unwrap();
    match outcome {
        UpgradeOutcome::Declined { current, latest } => {
            assert_eq!(current, "2023.1.12345");
            assert_eq!(latest, "2023.2.9999");
        }
        other => panic!("expected Declined, got {other:?}"),
    }

    assert_eq!(fixture.read().unwrap(), before);
    assert!(upgrader.engine().calls().is_empty());
    assert_eq!(
        upgrader.prompt().questions(),
        vec!["Upgrade jetbrains/youtrack from 2023.1.12345 to 2023.2.9999?".to_string()]
    );
    assert_eq!(upgrader.state(), UpgradeState::Aborted);
}

#[tokio::test]
async fn test_full_upgrade() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let engine = RecordingEngine::new().with_logs(LogScript::Lines(format!(
        "youtrack-1  | starting\n{SETUP_LINE}youtrack-1  | more output\n"
    )));
    let mut upgrader = upgrader(&fixture, engine, &[true]);

    let outcome = upgrader.run().await.unwrap();
    let UpgradeOutcome::Upgraded(report) = outcome else {
        panic!("expected Upgraded");
    };

    assert_eq!(report.previous_tag, "2023.1.12345");
    assert_eq!(report.new_tag, "2023.2.9999");
    assert_eq!(report.references_rewritten, 1);
    assert_eq!(report.setup_url(), Some("http://0.0.0.0:8080/?wizard_token=pTXhkxVXi3k"));
    assert!(report.old_image_removed);

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

    // Only the tag changed
    assert_eq!(fixture.read().unwrap(), ComposeFixture::content_for("2023.2.9999"));
    assert_eq!(upgrader.state(), UpgradeState::Done);
}

fn upgrader_with_tags(
    fixture: &ComposeFixture,
    tags: &[&str],
) -> Upgrader<RecordingEngine, FixedTags, ScriptedPrompt> {
    init_test_logging(None);
    Upgrader::new(
        &config_for(fixture),
        RecordingEngine::new(),
        FixedTags::new(tags.iter().copied()),
        ScriptedPrompt::answering(&[true]),
    )
    .unwrap()
}

#[tokio::test]
async fn test_prerelease_tag_is_never_deployed() {
    let fixture = ComposeFixture::with_tag("2024.1.4").unwrap();
    let before = fixture.read().unwrap();
    let mut upgrader = upgrader_with_tags(&fixture, &["2024.1.4", "2024.2.0-rc.1"]);

    let outcome = upgrader.run().await.unwrap();
    assert!(matches!(outcome, UpgradeOutcome::UpToDate { ref current } if current == "2024.1.4"));
    assert!(upgrader.engine().calls().is_empty());
    assert_eq!(fixture.read().unwrap(), before);
}

#[tokio::test]
async fn test_written_tag_reads_back_on_next_run() {
    let fixture = ComposeFixture::with_tag("2024.1.4").unwrap();

    let mut first = upgrader_with_tags(&fixture, &["2024.1.4", "2024.2.0-rc.1", "2024.1.5"]);
    let UpgradeOutcome::Upgraded(report) = first.run().await.unwrap() else {
        panic!("expected Upgraded");
    };
    assert_eq!(report.new_tag, "2024.1.5");
    assert_eq!(fixture.read().unwrap(), ComposeFixture::content_for("2024.1.5"));

    // Once the release lands, the next run starts from exactly the tag written
    let mut second = upgrader_with_tags(&fixture, &["2024.2.0-rc.1", "2024.2.0", "2024.1.5"]);
    let check = second.check().await.unwrap();
    assert_eq!(check.current, report.new_tag);

    let mut third = upgrader_with_tags(&fixture, &["2024.2.0-rc.1", "2024.2.0", "2024.1.5"]);
    let UpgradeOutcome::Upgraded(report) = third.run().await.unwrap() else {
        panic!("expected Upgraded");
    };
    assert_eq!(report.previous_tag, "2024.1.5");
    assert_eq!(report.new_tag, "2024.2.0");
    assert!(third.engine().calls().contains(&"rmi jetbrains/youtrack:2024.1.5".to_string()));
    assert_eq!(fixture.read().unwrap(), ComposeFixture::content_for("2024.2.0"));
}

#[tokio::test(start_paused = true)]
async fn test_log_timeout_still_upgrades() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let engine = RecordingEngine::new().with_logs(LogScript::Silent);
    let mut upgrader = upgrader(&fixture, engine, &[true]);

    let outcome = upgrader.run().await.unwrap();
    let UpgradeOutcome::Upgraded(report) = outcome else {
        panic!("expected Upgraded");
    };

    assert_eq!(report.setup, Some(crate::logwatch::WatchOutcome::TimedOut));
    assert_eq!(report.setup_url(), None);
    assert!(report.old_image_removed);
    assert!(fixture.read().unwrap().contains("jetbrains/youtrack:2023.2.9999"));
}

#[tokio::test]
async fn test_custom_log_timeout_is_used() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let config = UpdaterConfig {
        log_timeout_secs: 1,
        ..config_for(&fixture)
    };
    let mut upgrader = Upgrader::new(
        &config,
        RecordingEngine::new().with_logs(LogScript::Silent),
        FixedTags::new(REGISTRY_TAGS),
        ScriptedPrompt::answering(&[true]),
    )
    .unwrap();

    let started = std::time::Instant::now();
    let outcome = upgrader.run().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(matches!(outcome, UpgradeOutcome::Upgraded(_)));
}

#[tokio::test]
async fn test_log_stream_closed_is_not_an_error() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let engine = RecordingEngine::new().with_logs(LogScript::Lines("nothing useful\n".to_string()));
    let mut upgrader = upgrader(&fixture, engine, &[true]);

    let UpgradeOutcome::Upgraded(report) = upgrader.run().await.unwrap() else {
        panic!("expected Upgraded");
    };
    assert_eq!(report.setup, Some(crate::logwatch::WatchOutcome::StreamClosed));
}

#[tokio::test]
async fn test_log_follower_spawn_failure_is_a_warning() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let engine = RecordingEngine::new().with_logs(LogScript::SpawnError);
    let mut upgrader = upgrader(&fixture, engine, &[true]);

    let UpgradeOutcome::Upgraded(report) = upgrader.run().await.unwrap() else {
        panic!("expected Upgraded");
    };
    assert!(report.setup.is_none());
    assert!(upgrader.engine().calls().contains(&"rmi jetbrains/youtrack:2023.1.12345".to_string()));
}

#[tokio::test]
async fn test_pull_failure_is_fatal_and_file_untouched() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let before = fixture.read().unwrap();
    let mut upgrader = upgrader(&fixture, RecordingEngine::new().with_pull_code(1), &[true]);

    let err = upgrader.run().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UpdaterError>(),
        Some(UpdaterError::PullFailed { reference, code: 1 }) if reference == "jetbrains/youtrack:2023.2.9999"
    ));
    assert_eq!(upgrader.engine().calls(), vec!["pull jetbrains/youtrack:2023.2.9999"]);
    assert_eq!(fixture.read().unwrap(), before);
    assert_eq!(upgrader.state(), UpgradeState::Failed);
}

#[tokio::test]
async fn test_stop_failure_is_fatal_and_file_untouched() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let before = fixture.read().unwrap();
    let mut upgrader = upgrader(&fixture, RecordingEngine::new().with_down_code(2), &[true]);

    let err = upgrader.run().await.unwrap_err();
    assert!(matches!(err.downcast_ref::<UpdaterError>(), Some(UpdaterError::StopFailed { code: 2 })));
    assert_eq!(upgrader.engine().calls(), vec!["pull jetbrains/youtrack:2023.2.9999", "down"]);
    assert_eq!(fixture.read().unwrap(), before);
}

#[tokio::test]
async fn test_start_failure_reports_previous_tag() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let mut upgrader = upgrader(&fixture, RecordingEngine::new().with_up_code(1), &[true]);

    let err = upgrader.run().await.unwrap_err();
    match err.downcast_ref::<UpdaterError>() {
        Some(UpdaterError::StartFailed { code, previous_tag, compose_file }) => {
            assert_eq!(*code, 1);
            assert_eq!(previous_tag, "2023.1.12345");
            assert_eq!(compose_file, &fixture.path().display().to_string());
        }
        other => panic!("expected StartFailed, got {other:?}"),
    }

    // No rollback: the file already names the new tag and nothing ran after up
    assert!(fixture.read().unwrap().contains("jetbrains/youtrack:2023.2.9999"));
    assert_eq!(upgrader.engine().calls().last().map(String::as_str), Some("up"));
    assert_eq!(upgrader.state(), UpgradeState::Failed);
}

#[tokio::test]
async fn test_old_image_removal_failure_is_not_fatal() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let mut upgrader = upgrader(&fixture, RecordingEngine::new().with_rmi_code(1), &[true]);

    let UpgradeOutcome::Upgraded(report) = upgrader.run().await.unwrap() else {
        panic!("expected Upgraded");
    };
    assert!(!report.old_image_removed);
    assert_eq!(upgrader.state(), UpgradeState::Done);
}

#[tokio::test]
async fn test_missing_engine_fails_before_any_mutation() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let before = fixture.read().unwrap();
    let mut upgrader = upgrader(&fixture, RecordingEngine::new().unavailable(), &[true]);

    let err = upgrader.run().await.unwrap_err();
    assert!(matches!(err.downcast_ref::<UpdaterError>(), Some(UpdaterError::EngineNotFound { .. })));
    assert!(upgrader.engine().calls().is_empty());
    assert_eq!(fixture.read().unwrap(), before);
}

#[tokio::test]
async fn test_missing_compose_file() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let config = UpdaterConfig {
        compose_file: fixture.dir().join("missing.yml").display().to_string(),
        ..Default::default()
    };
    let mut upgrader = Upgrader::new(
        &config,
        RecordingEngine::new(),
        FixedTags::new(REGISTRY_TAGS),
        ScriptedPrompt::answering(&[true]),
    )
    .unwrap();

    let err = upgrader.run().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UpdaterError>(),
        Some(UpdaterError::ComposeFileNotFound { .. })
    ));
    assert!(upgrader.engine().calls().is_empty());
}

#[tokio::test]
async fn test_no_valid_registry_tags() {
    let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
    let mut upgrader = Upgrader::new(
        &config_for(&fixture),
        RecordingEngine::new(),
        FixedTags::new(["latest", "bogus-tag"]),
        ScriptedPrompt::answering(&[true]),
    )
    .unwrap();

    let err = upgrader.run().await.unwrap_err();
    assert!(matches!(err.downcast_ref::<UpdaterError>(), Some(UpdaterError::NoValidVersion { .. })));
    assert!(upgrader.prompt().questions().is_empty());
}

#[tokio::test]
async fn test_unparsable_deployed_tag() {
    let fixture = ComposeFixture::with_tag("latest").unwrap();
    let mut upgrader = upgrader(&fixture, RecordingEngine::new(), &[true]);

    let err = upgrader.run().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UpdaterError>(),
        Some(UpdaterError::InvalidVersion { tag }) if tag == "latest"
    ));
    assert!(!upgrader.engine().mutated());
}
